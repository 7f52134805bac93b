//! CLI argument definitions for the release signer.
//!
//! Every option can also be supplied through the environment so the tool
//! runs unchanged inside a CI job. The parsed [`Cli`] is converted once into
//! a [`SigningConfig`] by [`Cli::into_config`].

use crate::config::{
    DEFAULT_API_URL, DEFAULT_SERVER_URL, DEFAULT_UPLOADS_URL, Endpoints, GpgSettings,
    PinentryMode, ReleaseRef, RepositoryRef, Secret, SigningConfig,
};
use crate::error::{Result, SignerError};
use camino::Utf8PathBuf;
use clap::Parser;
use std::time::Duration;

/// Sign the assets of a GitHub release with detached GPG signatures.
#[derive(Parser, Debug, Clone)]
#[command(name = "release-signer")]
#[command(version, about)]
#[command(long_about = concat!(
    "Sign the assets of a GitHub release with detached GPG signatures.\n\n",
    "The release is resolved by tag, every attached asset plus the generated ",
    "source tarball and zip is downloaded, signed with the configured key, ",
    "verified, and the resulting .asc files are uploaded back to the release.",
))]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Sign a release using environment configuration:\n",
    "    $ GITHUB_TOKEN=... GITHUB_REPOSITORY=acme/widget RELEASE_TAG=v1.2.3 \\\n",
    "      GPG_KEY_ID=ABCD1234 GPG_KEY_PASSPHRASE=... release-signer\n\n",
    "  Preview the asset set without downloading anything:\n",
    "    $ release-signer --repository acme/widget --tag v1.2.3 --dry-run ...\n",
))]
pub struct Cli {
    /// API token used as a bearer credential.
    #[arg(long, env = "GITHUB_TOKEN", hide_env_values = true)]
    pub token: String,

    /// Repository in owner/name form.
    #[arg(long, env = "GITHUB_REPOSITORY", value_name = "OWNER/NAME")]
    pub repository: Option<String>,

    /// Repository owner; takes precedence over --repository when set with --repo.
    #[arg(long, env = "RELEASE_OWNER", requires = "repo")]
    pub owner: Option<String>,

    /// Repository name; used together with --owner.
    #[arg(long, env = "RELEASE_REPO", requires = "owner")]
    pub repo: Option<String>,

    /// Tag of the release to sign.
    #[arg(long, env = "RELEASE_TAG")]
    pub tag: String,

    /// Id of the signing key in the local keyring.
    #[arg(long, env = "GPG_KEY_ID")]
    pub key_id: String,

    /// Passphrase of the signing key.
    #[arg(long, env = "GPG_KEY_PASSPHRASE", hide_env_values = true)]
    pub passphrase: String,

    /// How gpg obtains the passphrase.
    #[arg(long, env = "GPG_PINENTRY_MODE", value_enum, default_value_t)]
    pub pinentry: PinentryMode,

    /// Signing program to invoke.
    #[arg(long, env = "GPG_PROGRAM", default_value = "gpg")]
    pub gpg: String,

    /// Timeout in seconds for each gpg invocation.
    #[arg(long, env = "GPG_TIMEOUT_SECS", value_name = "SECS", default_value_t = 10)]
    pub gpg_timeout: u64,

    /// Directory for downloaded assets and signatures [default: current directory].
    #[arg(long, env = "RELEASE_STAGING_DIR", value_name = "DIR")]
    pub staging_dir: Option<Utf8PathBuf>,

    /// REST API base URL.
    #[arg(long, env = "GITHUB_API_URL", default_value = DEFAULT_API_URL)]
    pub api_url: String,

    /// Upload host base URL.
    #[arg(long, env = "GITHUB_UPLOADS_URL", default_value = DEFAULT_UPLOADS_URL)]
    pub uploads_url: String,

    /// Web host base URL used for source archive links.
    #[arg(long, env = "GITHUB_SERVER_URL", default_value = DEFAULT_SERVER_URL)]
    pub server_url: String,

    /// Resolve the release and print the asset set without signing.
    #[arg(long)]
    pub dry_run: bool,

    /// Emit failures as CI error annotations.
    #[arg(long, env = "GITHUB_ACTIONS", hide = true)]
    pub annotate: bool,

    /// Increase log verbosity (repeatable: -v, -vv, -vvv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, conflicts_with = "verbosity")]
    pub quiet: bool,
}

impl Cli {
    /// Resolve the repository reference from either the split or the
    /// combined form. The split form wins when both are set, so an explicit
    /// `--owner`/`--repo` pair overrides `GITHUB_REPOSITORY`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::MissingRepository`] when neither form is set,
    /// or [`SignerError::InvalidRepository`] when the value is malformed.
    pub fn repository_ref(&self) -> Result<RepositoryRef> {
        match (&self.owner, &self.repo, &self.repository) {
            (Some(owner), Some(repo), _) => RepositoryRef::new(owner, repo),
            (_, _, Some(combined)) => combined.parse(),
            _ => Err(SignerError::MissingRepository),
        }
    }

    /// Return the log filter directive implied by `--quiet` and `-v`.
    #[must_use]
    pub fn log_level(&self) -> &'static str {
        if self.quiet {
            return "error";
        }
        match self.verbosity {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        }
    }

    /// Convert the parsed arguments into the run configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the repository reference cannot be resolved or
    /// the current directory is needed but not valid UTF-8.
    pub fn into_config(self) -> Result<SigningConfig> {
        let repository = self.repository_ref()?;
        let staging_dir = match self.staging_dir {
            Some(dir) => dir,
            None => current_dir()?,
        };

        Ok(SigningConfig {
            token: Secret::new(self.token),
            release: ReleaseRef {
                repository,
                tag: self.tag,
            },
            gpg: GpgSettings {
                program: self.gpg,
                key_id: self.key_id,
                passphrase: Secret::new(self.passphrase),
                pinentry: self.pinentry,
                timeout: Duration::from_secs(self.gpg_timeout),
            },
            endpoints: Endpoints::new(&self.api_url, &self.uploads_url, &self.server_url),
            staging_dir,
            quiet: self.quiet,
        })
    }
}

fn current_dir() -> Result<Utf8PathBuf> {
    let cwd = std::env::current_dir()?;
    Utf8PathBuf::try_from(cwd).map_err(|e| SignerError::Io(e.into_io_error()))
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
