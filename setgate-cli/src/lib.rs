//! Library target for the `setgate-cli` package.
//!
//! The primary deliverable of this package is the `setgate` CLI binary
//! (`src/main.rs`). This library exists so CI can run
//! `cargo test -p setgate-cli --doc` for feature/doctype validation.

#[doc(hidden)]
pub use setgate;
