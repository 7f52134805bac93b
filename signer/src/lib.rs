//! Release signer library.
//!
//! Signs every asset of a GitHub release, including the generated source
//! tarball and zip, with a detached ASCII-armoured gpg signature and uploads
//! the signatures back to the release. It is used by the `release-signer`
//! binary and can be driven programmatically with injected API and command
//! seams for testing.
//!
//! # Modules
//!
//! - [`asset_set`] - Merge release assets with generated source archives
//! - [`batch`] - Concurrent batch execution with outcome aggregation
//! - [`cli`] - Command-line argument definitions
//! - [`command`] - Timeout-bounded external command execution
//! - [`config`] - Run configuration and repository references
//! - [`error`] - Semantic error types
//! - [`github`] - Release API client and wire types
//! - [`gpg`] - Precondition probes, detached signing, and verification
//! - [`output`] - Progress, summary, and failure formatting
//! - [`pipeline`] - Signing run orchestration
//! - [`staging`] - Staged file layout and asset name validation
//! - [`transfer`] - Concurrent downloads and uploads
//! - [`version`] - Version extraction from release tags

pub mod asset_set;
pub mod batch;
pub mod cli;
pub mod command;
pub mod config;
pub mod error;
pub mod github;
pub mod gpg;
pub mod output;
pub mod pipeline;
pub mod staging;
pub mod transfer;
pub mod version;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
