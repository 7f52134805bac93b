//! Run configuration.
//!
//! [`SigningConfig`] is built once from the command line and environment and
//! passed by reference to every component that needs it. Nothing below the
//! entrypoint reads process-wide state.

use crate::error::{Result, SignerError};
use camino::Utf8PathBuf;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default REST API base URL.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Default upload host base URL.
pub const DEFAULT_UPLOADS_URL: &str = "https://uploads.github.com";

/// Default web host base URL, used for source archive downloads.
pub const DEFAULT_SERVER_URL: &str = "https://github.com";

/// Default upper bound on a single gpg invocation.
pub const DEFAULT_GPG_TIMEOUT: Duration = Duration::from_secs(10);

/// A repository identified by owner and name.
///
/// # Examples
///
/// ```
/// use release_signer::config::RepositoryRef;
///
/// let repo: RepositoryRef = "acme/widget".parse()?;
/// assert_eq!(repo.owner(), "acme");
/// assert_eq!(repo.name(), "widget");
/// assert_eq!(repo.to_string(), "acme/widget");
/// # Ok::<(), release_signer::error::SignerError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryRef {
    owner: String,
    name: String,
}

impl RepositoryRef {
    /// Build a reference from separate owner and name values.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::InvalidRepository`] if either part is empty or
    /// contains a `/`.
    pub fn new(owner: &str, name: &str) -> Result<Self> {
        let owner = owner.trim();
        let name = name.trim();
        if !is_valid_part(owner) || !is_valid_part(name) {
            return Err(SignerError::InvalidRepository {
                value: format!("{owner}/{name}"),
            });
        }
        Ok(Self {
            owner: owner.to_owned(),
            name: name.to_owned(),
        })
    }

    /// Return the owning user or organisation.
    #[must_use]
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Return the repository name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

fn is_valid_part(part: &str) -> bool {
    !part.is_empty() && !part.contains('/')
}

impl FromStr for RepositoryRef {
    type Err = SignerError;

    fn from_str(value: &str) -> Result<Self> {
        let (owner, name) = value
            .split_once('/')
            .ok_or_else(|| SignerError::InvalidRepository {
                value: value.to_owned(),
            })?;
        Self::new(owner, name).map_err(|_| SignerError::InvalidRepository {
            value: value.to_owned(),
        })
    }
}

impl fmt::Display for RepositoryRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// The release being signed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseRef {
    /// Repository that owns the release.
    pub repository: RepositoryRef,
    /// Tag the release was published under.
    pub tag: String,
}

/// A string that must never appear in logs or debug output.
#[derive(Clone, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    /// Wrap a secret value.
    #[must_use]
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Return the secret value for use in a request or command.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(***)")
    }
}

/// How gpg obtains the key passphrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum PinentryMode {
    /// Pass `--pinentry-mode loopback` so `--passphrase` is honoured
    /// without an agent prompt.
    #[default]
    Loopback,
    /// Leave pinentry to the gpg agent configuration.
    Agent,
}

/// Settings for the external signing tool.
#[derive(Debug, Clone)]
pub struct GpgSettings {
    /// Program to invoke, usually `gpg`.
    pub program: String,
    /// Key id passed to `--local-user`.
    pub key_id: String,
    /// Passphrase for the signing key.
    pub passphrase: Secret,
    /// Pinentry mode for signing invocations.
    pub pinentry: PinentryMode,
    /// Upper bound on each invocation.
    pub timeout: Duration,
}

/// Base URLs of the hosting platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// REST API base, e.g. `https://api.github.com`.
    pub api: String,
    /// Upload host base, e.g. `https://uploads.github.com`.
    pub uploads: String,
    /// Web host base, e.g. `https://github.com`.
    pub server: String,
}

impl Endpoints {
    /// Build endpoints, dropping any trailing slash from each base URL.
    #[must_use]
    pub fn new(api: &str, uploads: &str, server: &str) -> Self {
        Self {
            api: api.trim_end_matches('/').to_owned(),
            uploads: uploads.trim_end_matches('/').to_owned(),
            server: server.trim_end_matches('/').to_owned(),
        }
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL, DEFAULT_UPLOADS_URL, DEFAULT_SERVER_URL)
    }
}

/// Everything a signing run needs, resolved once at startup.
#[derive(Debug, Clone)]
pub struct SigningConfig {
    /// API token sent as a bearer credential.
    pub token: Secret,
    /// The release to sign.
    pub release: ReleaseRef,
    /// Signing tool settings.
    pub gpg: GpgSettings,
    /// Hosting platform base URLs.
    pub endpoints: Endpoints,
    /// Directory that receives downloaded assets and signatures.
    pub staging_dir: Utf8PathBuf,
    /// Suppress progress output.
    pub quiet: bool,
}
