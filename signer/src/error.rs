//! Error types for the release signer.
//!
//! Every failure is fatal to the run. Variants carry the HTTP status, asset
//! name, or tool output that explains what went wrong so the single error
//! line printed on exit is enough to diagnose the problem.

use camino::Utf8PathBuf;
use thiserror::Error;

/// Errors that can occur while signing a release.
#[derive(Debug, Error)]
pub enum SignerError {
    /// The `gpg` tool is missing or did not answer a version query.
    #[error("GPG not found: {reason}")]
    GpgUnavailable {
        /// Description of why the probe failed.
        reason: String,
    },

    /// The configured signing key is not present in the local keyring.
    #[error("GPG key not found: {key_id}")]
    SigningKeyMissing {
        /// The key id that `gpg --list-keys` could not find.
        key_id: String,
    },

    /// A repository reference was not of the form `owner/name`.
    #[error("invalid repository \"{value}\": expected owner/name")]
    InvalidRepository {
        /// The rejected value.
        value: String,
    },

    /// Neither the combined nor the split repository form was supplied.
    #[error("no repository given; pass --repository owner/name or both --owner and --repo")]
    MissingRepository,

    /// The release tag contains no `major.minor.patch` substring.
    #[error("tag did not match expected version format: {tag}")]
    TagVersion {
        /// The offending tag.
        tag: String,
    },

    /// Two entries in the merged asset set share a name.
    #[error("asset name {name} appears more than once in the release asset set")]
    AssetNameCollision {
        /// The duplicated asset name.
        name: String,
    },

    /// An asset name cannot be used as a staged file name.
    #[error("invalid asset name \"{name}\": {reason}")]
    InvalidAssetName {
        /// The rejected asset name.
        name: String,
        /// Why the name was rejected.
        reason: String,
    },

    /// The release lookup by tag returned a non-success status.
    #[error("failed to fetch release {tag}: HTTP {status}")]
    ReleaseFetch {
        /// The tag being resolved.
        tag: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// The release asset listing returned a non-success status.
    #[error("failed to fetch release assets for release {release_id}: HTTP {status}")]
    AssetList {
        /// The release whose assets were requested.
        release_id: u64,
        /// The HTTP status code returned.
        status: u16,
    },

    /// An asset download returned a non-success status.
    #[error("failed to download asset {name}: HTTP {status}")]
    DownloadFailed {
        /// Name of the asset being downloaded.
        name: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// A signature upload returned anything other than `201 Created`.
    #[error("failed to upload file {name}: HTTP {status}")]
    UploadFailed {
        /// Name of the file being uploaded.
        name: String,
        /// The HTTP status code returned.
        status: u16,
    },

    /// The request never produced an HTTP status (DNS, TLS, timeout, ...).
    #[error("request to {url} failed: {reason}")]
    Http {
        /// The URL that was requested.
        url: String,
        /// A human-readable description of the failure.
        reason: String,
    },

    /// The API answered with a body that could not be decoded.
    #[error("unexpected response from {url}: {reason}")]
    InvalidResponse {
        /// The URL that was requested.
        url: String,
        /// Description of the decoding failure.
        reason: String,
    },

    /// A gpg signing or verification invocation failed.
    #[error("gpg {operation} failed for {name}: {message}")]
    Gpg {
        /// The gpg operation (`sign` or `verify`).
        operation: &'static str,
        /// Name of the asset being processed.
        name: String,
        /// Captured stderr or a description of the failure.
        message: String,
    },

    /// An external command exceeded its execution timeout and was killed.
    #[error("{program} timed out after {seconds} seconds")]
    CommandTimeout {
        /// The program that was invoked.
        program: String,
        /// The timeout that was exceeded.
        seconds: u64,
    },

    /// Writing or reading a staged file failed.
    #[error("staging failed for {path}")]
    Staging {
        /// The staged file path.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// More than one member of a concurrent batch failed.
    #[error(
        "{stage} failed for {} of {total} assets: {}",
        .failures.len(),
        join_failures(.failures)
    )]
    BatchFailed {
        /// The batch stage (`download` or `upload`).
        stage: &'static str,
        /// Number of members in the batch.
        total: usize,
        /// Every member failure, in asset order.
        failures: Vec<SignerError>,
    },

    /// A batch worker thread panicked before reporting an outcome.
    #[error("{stage} worker panicked")]
    WorkerPanicked {
        /// The batch stage whose worker panicked.
        stage: &'static str,
    },

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A test double received an invocation it was not configured for.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

fn join_failures(failures: &[SignerError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Result type alias using [`SignerError`].
pub type Result<T> = std::result::Result<T, SignerError>;
