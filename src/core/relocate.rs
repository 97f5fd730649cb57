//! Purpose: Namespace relocation over archive entries.
//! Exports: `RelocationRule`, `relocate_archive`, `rewrite_bytes`, `namespace_present`.
//! Role: Pure rewriting layer; no I/O, output depends only on entries and rules.
//! Invariants: Matches only at namespace boundaries, in dotted and slashed form.
//! Invariants: Destination prefixes are never rewritten, so applying a rule set
//! to its own output is byte-identical.
use crate::core::archive::{Archive, Entry};
use crate::core::error::{Error, ErrorKind};

const SERVICES_PREFIX: &str = "META-INF/services/";

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct RelocationRule {
    source: String,
    dest: String,
    source_slashed: String,
    dest_slashed: String,
}

impl RelocationRule {
    pub fn new(from: &str, to: &str) -> Result<Self, Error> {
        validate_namespace(from)?;
        validate_namespace(to)?;
        if from == to {
            return Err(Error::new(ErrorKind::Usage)
                .with_message("relocation source and destination are identical")
                .with_entry(from));
        }
        if is_namespace_prefix(to, from) {
            // A destination that prefixes its own source would shield the
            // source from matching and the rule could never fire.
            return Err(Error::new(ErrorKind::Usage)
                .with_message("relocation destination must not be a prefix of its source")
                .with_entry(from));
        }
        Ok(Self {
            source: from.to_string(),
            dest: to.to_string(),
            source_slashed: from.replace('.', "/"),
            dest_slashed: to.replace('.', "/"),
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn dest(&self) -> &str {
        &self.dest
    }
}

/// True when `prefix` equals `namespace` or leads it on a segment boundary.
pub fn is_namespace_prefix(prefix: &str, namespace: &str) -> bool {
    namespace == prefix
        || (namespace.len() > prefix.len()
            && namespace.starts_with(prefix)
            && namespace.as_bytes()[prefix.len()] == b'.')
}

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct RelocationStats {
    pub renamed_paths: usize,
    pub rewritten_entries: usize,
}

pub fn relocate_archive(archive: Archive, rules: &[RelocationRule]) -> (Archive, RelocationStats) {
    let mut stats = RelocationStats::default();
    let entries = archive
        .entries
        .into_iter()
        .map(|entry| relocate_entry(entry, rules, &mut stats))
        .collect();
    (Archive { entries }, stats)
}

/// Rewrites entry contents only, leaving paths alone. Applied to the plugin's
/// own classes, which reference relocated libraries but are never renamed.
pub fn rewrite_archive_contents(archive: Archive, rules: &[RelocationRule]) -> (Archive, usize) {
    let mut rewritten = 0;
    let entries = archive
        .entries
        .into_iter()
        .map(|entry| match rewrite_bytes(&entry.bytes, rules) {
            Some(bytes) => {
                rewritten += 1;
                Entry {
                    path: entry.path,
                    bytes,
                }
            }
            None => entry,
        })
        .collect();
    (Archive { entries }, rewritten)
}

fn relocate_entry(entry: Entry, rules: &[RelocationRule], stats: &mut RelocationStats) -> Entry {
    let path = match relocate_path(&entry.path, rules) {
        Some(renamed) => {
            stats.renamed_paths += 1;
            renamed
        }
        None => entry.path,
    };
    let bytes = match rewrite_bytes(&entry.bytes, rules) {
        Some(rewritten) => {
            stats.rewritten_entries += 1;
            rewritten
        }
        None => entry.bytes,
    };
    Entry { path, bytes }
}

/// Returns the renamed entry path, or `None` when no rule applies.
pub fn relocate_path(path: &str, rules: &[RelocationRule]) -> Option<String> {
    if let Some(name) = path.strip_prefix(SERVICES_PREFIX) {
        // Service descriptor file names are dotted class names.
        let rewritten = rewrite_bytes(name.as_bytes(), rules)?;
        let name = String::from_utf8(rewritten).ok()?;
        return Some(format!("{SERVICES_PREFIX}{name}"));
    }

    // Paths already under a destination prefix stay untouched.
    if rules
        .iter()
        .any(|rule| strip_segment_prefix(path, &rule.dest_slashed).is_some())
    {
        return None;
    }
    for rule in longest_source_first(rules) {
        if let Some(rest) = strip_segment_prefix(path, &rule.source_slashed) {
            return Some(format!("{}/{}", rule.dest_slashed, rest));
        }
    }
    None
}

fn strip_segment_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    path.strip_prefix(prefix)
        .and_then(|rest| rest.strip_prefix('/'))
}

fn longest_source_first(rules: &[RelocationRule]) -> Vec<&RelocationRule> {
    let mut ordered: Vec<&RelocationRule> = rules.iter().collect();
    ordered.sort_by(|a, b| b.source.len().cmp(&a.source.len()));
    ordered
}

/// Rewrites namespace occurrences in `bytes`, or `None` when nothing matched.
pub fn rewrite_bytes(bytes: &[u8], rules: &[RelocationRule]) -> Option<Vec<u8>> {
    let mut replacements: Vec<(&[u8], &[u8])> = Vec::with_capacity(rules.len() * 2);
    let mut protected: Vec<&[u8]> = Vec::with_capacity(rules.len() * 2);
    for rule in rules {
        replacements.push((rule.source.as_bytes(), rule.dest.as_bytes()));
        replacements.push((rule.source_slashed.as_bytes(), rule.dest_slashed.as_bytes()));
        protected.push(rule.dest.as_bytes());
        protected.push(rule.dest_slashed.as_bytes());
    }
    replacements.sort_by(|a, b| b.0.len().cmp(&a.0.len()));
    protected.sort_by(|a, b| b.len().cmp(&a.len()));

    let mut out: Option<Vec<u8>> = None;
    let mut i = 0;
    while i < bytes.len() {
        if !boundary_before(bytes, i) {
            if let Some(out) = out.as_mut() {
                out.push(bytes[i]);
            }
            i += 1;
            continue;
        }
        if let Some(skip) = protected
            .iter()
            .find(|dest| matches_at(bytes, i, dest))
            .map(|dest| dest.len())
        {
            if let Some(out) = out.as_mut() {
                out.extend_from_slice(&bytes[i..i + skip]);
            }
            i += skip;
            continue;
        }
        if let Some((source, dest)) = replacements
            .iter()
            .find(|(source, _)| matches_at(bytes, i, source))
        {
            let out = out.get_or_insert_with(|| bytes[..i].to_vec());
            out.extend_from_slice(dest);
            i += source.len();
            continue;
        }
        if let Some(out) = out.as_mut() {
            out.push(bytes[i]);
        }
        i += 1;
    }
    out
}

/// True when any of `dotted`/`slashed` occurs in `bytes` at a namespace boundary.
pub fn namespace_present(bytes: &[u8], dotted: &[u8], slashed: &[u8]) -> bool {
    let mut i = 0;
    while i < bytes.len() {
        if boundary_before(bytes, i) && (matches_at(bytes, i, dotted) || matches_at(bytes, i, slashed))
        {
            return true;
        }
        i += 1;
    }
    false
}

fn matches_at(bytes: &[u8], at: usize, pattern: &[u8]) -> bool {
    let end = at + pattern.len();
    if end > bytes.len() || &bytes[at..end] != pattern {
        return false;
    }
    end == bytes.len() || !is_ident_byte(bytes[end])
}

fn boundary_before(bytes: &[u8], at: usize) -> bool {
    if at == 0 {
        return true;
    }
    let prev = bytes[at - 1];
    !is_ident_byte(prev) && prev != b'.' && prev != b'/'
}

fn is_ident_byte(byte: u8) -> bool {
    byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'$'
}

fn validate_namespace(namespace: &str) -> Result<(), Error> {
    let valid = !namespace.is_empty()
        && namespace.split('.').all(|segment| {
            !segment.is_empty() && segment.bytes().all(is_ident_byte)
        });
    if valid {
        Ok(())
    } else {
        Err(Error::new(ErrorKind::Usage)
            .with_message("invalid namespace; expected dotted identifier segments")
            .with_entry(namespace))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        RelocationRule, is_namespace_prefix, namespace_present, relocate_path, rewrite_bytes,
    };

    fn rule(from: &str, to: &str) -> RelocationRule {
        RelocationRule::new(from, to).unwrap()
    }

    #[test]
    fn rule_validation() {
        assert!(RelocationRule::new("a.b", "a.b").is_err());
        assert!(RelocationRule::new("a..b", "x.y").is_err());
        assert!(RelocationRule::new("", "x.y").is_err());
        assert!(RelocationRule::new("a.b.c", "a.b").is_err());
        assert!(RelocationRule::new("a.b", "a.b.shaded").is_ok());
    }

    #[test]
    fn path_relocation_respects_segment_boundaries() {
        let rules = [rule("net.hunter.expr", "dev.oribuin.fishing.libs.expr")];
        assert_eq!(
            relocate_path("net/hunter/expr/Parser.class", &rules).as_deref(),
            Some("dev/oribuin/fishing/libs/expr/Parser.class")
        );
        assert_eq!(relocate_path("net/hunter/expressions/P.class", &rules), None);
        assert_eq!(relocate_path("net/hunter/Expr.class", &rules), None);
    }

    #[test]
    fn service_descriptor_names_are_renamed() {
        let rules = [rule("org.slf4j", "dev.oribuin.fishing.libs.slf4j")];
        assert_eq!(
            relocate_path("META-INF/services/org.slf4j.spi.SLF4JServiceProvider", &rules)
                .as_deref(),
            Some("META-INF/services/dev.oribuin.fishing.libs.slf4j.spi.SLF4JServiceProvider")
        );
    }

    #[test]
    fn content_rewriting_covers_both_separator_forms() {
        let rules = [rule("com.zaxxer", "pkg.libs.hikari")];
        let input = b"ref com.zaxxer.hikari.HikariConfig and com/zaxxer/hikari/HikariConfig done";
        let output = rewrite_bytes(input, &rules).unwrap();
        assert_eq!(
            output,
            b"ref pkg.libs.hikari.hikari.HikariConfig and pkg/libs/hikari/hikari/HikariConfig done"
                .to_vec()
        );
    }

    #[test]
    fn content_rewriting_skips_mid_identifier_matches() {
        let rules = [rule("com.zaxxer", "pkg.libs.hikari")];
        assert!(rewrite_bytes(b"telecom.zaxxer.X", &rules).is_none());
        assert!(rewrite_bytes(b"com.zaxxerish.X", &rules).is_none());
        assert!(rewrite_bytes(b"org.com.zaxxer.X", &rules).is_none());
    }

    #[test]
    fn rewriting_is_idempotent() {
        let rules = [
            rule("com.zaxxer", "pkg.libs.hikari"),
            rule("org.slf4j", "pkg.libs.slf4j"),
        ];
        let input = b"com.zaxxer.pool via org/slf4j/Logger";
        let once = rewrite_bytes(input, &rules).unwrap();
        assert!(rewrite_bytes(&once, &rules).is_none());
    }

    #[test]
    fn longest_source_wins() {
        let rules = [rule("a.b", "p.q"), rule("a.b.c", "p.r")];
        let output = rewrite_bytes(b"a.b.c.D a.b.E", &rules).unwrap();
        assert_eq!(output, b"p.r.D p.q.E".to_vec());
    }

    #[test]
    fn absent_namespace_is_a_noop() {
        let rules = [rule("does.not.exist", "pkg.libs.nothing")];
        assert!(rewrite_bytes(b"plain text without the prefix", &rules).is_none());
        assert_eq!(relocate_path("com/acme/Real.class", &rules), None);
    }

    #[test]
    fn namespace_presence_scan() {
        assert!(namespace_present(b"x com.acme.Foo y", b"com.acme.Foo", b"com/acme/Foo"));
        assert!(namespace_present(b"x com/acme/Foo y", b"com.acme.Foo", b"com/acme/Foo"));
        assert!(!namespace_present(b"x com.acme.Food y", b"com.acme.Foo", b"com/acme/Foo"));
        assert!(!namespace_present(b"x a.com.acme.Foo y", b"com.acme.Foo", b"com/acme/Foo"));
    }

    #[test]
    fn namespace_prefix_check() {
        assert!(is_namespace_prefix("a.b", "a.b"));
        assert!(is_namespace_prefix("a.b", "a.b.c"));
        assert!(!is_namespace_prefix("a.b", "a.bc"));
    }
}
