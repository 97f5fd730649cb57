//! Purpose: Shared core library crate used by the `shadepack` CLI and tests.
//! Exports: `core` (resolution, relocation, merge, stamping, manifest, errors),
//! `api` (stable surface + publish client), `pipeline` (stage orchestration).
//! Role: Internal library backing the binary; not yet a stable public SDK.
//! Invariants: Treat the crate API as internal until a dedicated library release.
//! Invariants: Core stages prefer explicit inputs/outputs over hidden state.
#![allow(clippy::result_large_err)]
pub mod api;
pub mod core;
pub mod notice;
pub mod pipeline;
