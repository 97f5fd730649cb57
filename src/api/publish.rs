//! Purpose: Upload the merged artifact to a remote repository.
//! Exports: `Credentials`, `select_base_url`, `artifact_url`, `publish`.
//! Role: Client-side publish stage; destination picked from the build context.
//! Invariants: Pre-release versions (SNAPSHOT suffix) go to the snapshot
//! repository, everything else to the release repository.
//! Invariants: Credentials are sent preemptively as basic auth; they are never
//! logged or echoed into reports.
use std::fs;
use std::path::Path;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use tracing::info;
use url::Url;

use crate::core::config::{PackageInfo, PublishConfig};
use crate::core::coordinate::Coordinate;
use crate::core::error::{Error, ErrorKind};
use crate::core::repo::artifact_rel_path;
use crate::core::stamp::BuildContext;

#[derive(Clone, Debug)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn from_env() -> Option<Self> {
        let user = std::env::var("SHADEPACK_MAVEN_USER").ok()?;
        let password = std::env::var("SHADEPACK_MAVEN_PASSWORD").ok()?;
        Some(Self { user, password })
    }

    fn basic_auth_header(&self) -> String {
        let encoded = BASE64.encode(format!("{}:{}", self.user, self.password));
        format!("Basic {encoded}")
    }
}

pub fn select_base_url<'a>(publish: &'a PublishConfig, context: &BuildContext) -> &'a str {
    if context.prerelease() {
        &publish.snapshot_url
    } else {
        &publish.release_url
    }
}

/// Repository-layout URL for the artifact under `base`.
pub fn artifact_url(base: &str, package: &PackageInfo, context: &BuildContext) -> Result<Url, Error> {
    let coordinate = Coordinate {
        group: package.group.clone(),
        name: package.name.clone(),
        version: context.version.clone(),
    };
    let mut base = base.to_string();
    if !base.ends_with('/') {
        base.push('/');
    }
    let parsed = Url::parse(&base).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid publish repository URL")
            .with_entry(base.clone())
            .with_source(err)
    })?;
    parsed.join(&artifact_rel_path(&coordinate)).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("cannot derive artifact URL")
            .with_entry(base)
            .with_source(err)
    })
}

pub fn publish(artifact: &Path, url: &Url, credentials: &Credentials) -> Result<(), Error> {
    let bytes = fs::read(artifact)
        .map_err(|err| Error::new(ErrorKind::Io).with_path(artifact).with_source(err))?;
    let response = ureq::put(url.as_str())
        .set("Authorization", &credentials.basic_auth_header())
        .set("Content-Type", "application/java-archive")
        .send_bytes(&bytes);
    match response {
        Ok(response) => {
            info!(status = response.status(), url = %url, "artifact published");
            Ok(())
        }
        Err(ureq::Error::Status(code, _)) => Err(Error::new(ErrorKind::Net)
            .with_message(format!("repository rejected upload with status {code}"))
            .with_entry(url.to_string())
            .with_hint("Check publish credentials and repository permissions.")),
        Err(err) => Err(Error::new(ErrorKind::Net)
            .with_message("failed to reach publish repository")
            .with_entry(url.to_string())
            .with_source(err)),
    }
}

#[cfg(test)]
mod tests {
    use std::io::{Read, Write};
    use std::net::TcpListener;
    use std::path::PathBuf;

    use super::{Credentials, artifact_url, publish, select_base_url};
    use crate::core::config::{PackageInfo, PublishConfig};
    use crate::core::stamp::BuildContext;

    fn package() -> PackageInfo {
        PackageInfo {
            name: "fishing".to_string(),
            group: "dev.oribuin".to_string(),
            version: "1.0".to_string(),
            entry_point: "dev.oribuin.fishing.FishingPlugin".to_string(),
            author: "Oribuin".to_string(),
            description: String::new(),
            api_version: "1.21".to_string(),
            depend: Vec::new(),
            soft_depend: Vec::new(),
            classes: PathBuf::from("classes"),
        }
    }

    fn config() -> PublishConfig {
        PublishConfig {
            release_url: "https://repo.example.io/releases/".to_string(),
            snapshot_url: "https://repo.example.io/snapshots/".to_string(),
        }
    }

    #[test]
    fn destination_selection_follows_prerelease_marker() {
        let release = BuildContext {
            version: "4f2c1d9".to_string(),
            stamped: true,
        };
        let snapshot = BuildContext {
            version: "1.1-SNAPSHOT".to_string(),
            stamped: false,
        };
        assert_eq!(
            select_base_url(&config(), &release),
            "https://repo.example.io/releases/"
        );
        assert_eq!(
            select_base_url(&config(), &snapshot),
            "https://repo.example.io/snapshots/"
        );
    }

    #[test]
    fn artifact_url_uses_repository_layout() {
        let context = BuildContext {
            version: "4f2c1d9".to_string(),
            stamped: true,
        };
        let url = artifact_url("https://repo.example.io/releases", &package(), &context).unwrap();
        assert_eq!(
            url.as_str(),
            "https://repo.example.io/releases/dev/oribuin/fishing/4f2c1d9/fishing-4f2c1d9.jar"
        );
    }

    #[test]
    fn basic_auth_header_is_preemptive() {
        let credentials = Credentials {
            user: "user".to_string(),
            password: "pass".to_string(),
        };
        assert_eq!(credentials.basic_auth_header(), "Basic dXNlcjpwYXNz");
    }

    #[test]
    fn publish_puts_artifact_with_auth() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let addr = listener.local_addr().expect("addr");
        let server = std::thread::spawn(move || {
            let (mut stream, _) = listener.accept().expect("accept");
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = stream.read(&mut buf).expect("read");
                request.extend_from_slice(&buf[..n]);
                if let Some(header_end) = find_header_end(&request) {
                    let headers = String::from_utf8_lossy(&request[..header_end]).to_string();
                    let body_len: usize = headers
                        .lines()
                        .find_map(|line| {
                            line.to_ascii_lowercase()
                                .strip_prefix("content-length:")
                                .map(|v| v.trim().parse().expect("length"))
                        })
                        .unwrap_or(0);
                    while request.len() < header_end + 4 + body_len {
                        let n = stream.read(&mut buf).expect("read body");
                        request.extend_from_slice(&buf[..n]);
                    }
                    stream
                        .write_all(b"HTTP/1.1 201 Created\r\nContent-Length: 0\r\n\r\n")
                        .expect("respond");
                    return headers;
                }
            }
        });

        let temp = tempfile::tempdir().expect("tempdir");
        let artifact = temp.path().join("fishing-1.0.jar");
        std::fs::write(&artifact, b"zip-bytes").expect("artifact");

        let url = url::Url::parse(&format!("http://{addr}/releases/fishing-1.0.jar")).unwrap();
        let credentials = Credentials {
            user: "user".to_string(),
            password: "pass".to_string(),
        };
        publish(&artifact, &url, &credentials).expect("publish");

        let headers = server.join().expect("server");
        assert!(headers.starts_with("PUT /releases/fishing-1.0.jar"));
        assert!(headers.contains("Basic dXNlcjpwYXNz"));
    }

    fn find_header_end(request: &[u8]) -> Option<usize> {
        request.windows(4).position(|window| window == b"\r\n\r\n")
    }
}
