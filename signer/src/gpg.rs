//! Detached signing and verification with gpg.
//!
//! Signing runs one asset at a time. Each signature is verified against its
//! asset straight after it is written, and only verified signatures are
//! handed on for upload.

use crate::command::{CommandExecutor, stderr_message};
use crate::config::{GpgSettings, PinentryMode};
use crate::error::{Result, SignerError};
use crate::staging::{SIGNATURE_EXTENSION, SignatureFile, StagedFile, signature_name};
use camino::{Utf8Path, Utf8PathBuf};
use log::{debug, info};
use std::process::Output;

/// Runs the signing tool for one configured key.
pub struct GpgSigner<'a> {
    executor: &'a dyn CommandExecutor,
    settings: &'a GpgSettings,
}

impl<'a> GpgSigner<'a> {
    /// Create a signer that invokes gpg through `executor`.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, settings: &'a GpgSettings) -> Self {
        Self { executor, settings }
    }

    /// Confirm the tool answers `--version` and the key is in the keyring.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::GpgUnavailable`] if the version probe fails and
    /// [`SignerError::SigningKeyMissing`] if the key lookup fails.
    pub fn check_preconditions(&self) -> Result<()> {
        let program = self.settings.program.as_str();
        let version = self
            .executor
            .run(program, &["--version".to_owned()])
            .map_err(|e| SignerError::GpgUnavailable {
                reason: e.to_string(),
            })?;
        if !version.status.success() {
            return Err(SignerError::GpgUnavailable {
                reason: stderr_message(&version),
            });
        }
        if let Some(first) = String::from_utf8_lossy(&version.stdout).lines().next() {
            debug!("using {first}");
        }

        let key_id = &self.settings.key_id;
        let lookup = self
            .executor
            .run(program, &["--list-keys".to_owned(), key_id.clone()]);
        match lookup {
            Ok(output) if output.status.success() => Ok(()),
            Ok(output) => {
                debug!("key lookup failed: {}", stderr_message(&output));
                Err(SignerError::SigningKeyMissing {
                    key_id: key_id.clone(),
                })
            }
            Err(err) => {
                debug!("key lookup failed: {err}");
                Err(SignerError::SigningKeyMissing {
                    key_id: key_id.clone(),
                })
            }
        }
    }

    /// Write a detached ASCII-armoured signature for `asset` to `signature`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Gpg`] if gpg exits unsuccessfully, times out,
    /// or reports success without writing the signature.
    pub fn sign(&self, name: &str, asset: &Utf8Path, signature: &Utf8Path) -> Result<()> {
        debug!(
            "gpg sign {name} as {} (pinentry {:?})",
            self.settings.key_id, self.settings.pinentry
        );
        let passphrase = self.settings.passphrase.expose().as_bytes();
        self.run_checked(
            "sign",
            name,
            &sign_args(self.settings, asset, signature),
            Some(passphrase),
        )?;
        if !signature.is_file() {
            return Err(SignerError::Gpg {
                operation: "sign",
                name: name.to_owned(),
                message: format!("no signature written to {signature}"),
            });
        }
        Ok(())
    }

    /// Check that `signature` is a good signature over `asset`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Gpg`] if verification fails or times out.
    pub fn verify(&self, name: &str, asset: &Utf8Path, signature: &Utf8Path) -> Result<()> {
        debug!("gpg verify {name}");
        self.run_checked("verify", name, &verify_args(asset, signature), None)
            .map(|_| ())
    }

    /// Sign a staged asset and verify the result.
    ///
    /// # Errors
    ///
    /// Returns the first signing or verification failure.
    pub fn sign_and_verify(&self, staged: &StagedFile) -> Result<SignatureFile> {
        let signature = signature_path_for(&staged.path);
        self.sign(&staged.name, &staged.path, &signature)?;
        self.verify(&staged.name, &staged.path, &signature)?;
        info!("signed and verified {}", staged.name);
        Ok(SignatureFile::verified(signature_name(&staged.name), signature))
    }

    /// Sign and verify every staged asset in order, stopping at the first
    /// failure.
    ///
    /// # Errors
    ///
    /// Returns the first failure; later assets are not signed.
    pub fn sign_all(&self, staged: &[StagedFile]) -> Result<Vec<SignatureFile>> {
        staged.iter().map(|file| self.sign_and_verify(file)).collect()
    }

    fn run_checked(
        &self,
        operation: &'static str,
        name: &str,
        args: &[String],
        input: Option<&[u8]>,
    ) -> Result<Output> {
        let gpg_error = |message: String| SignerError::Gpg {
            operation,
            name: name.to_owned(),
            message,
        };
        let program = self.settings.program.as_str();
        let outcome = match input {
            Some(bytes) => self.executor.run_with_input(program, args, bytes),
            None => self.executor.run(program, args),
        };
        let output = outcome
            .map_err(|err| match err {
                SignerError::CommandTimeout { seconds, .. } => {
                    gpg_error(format!("timed out after {seconds} seconds"))
                }
                other => gpg_error(other.to_string()),
            })?;
        if output.status.success() {
            Ok(output)
        } else {
            Err(gpg_error(stderr_message(&output)))
        }
    }
}

/// Return the signature path for a staged asset: the asset path with `.asc`
/// appended.
#[must_use]
pub fn signature_path_for(asset: &Utf8Path) -> Utf8PathBuf {
    Utf8PathBuf::from(format!("{asset}.{SIGNATURE_EXTENSION}"))
}

/// Build the argument vector for a detached signing invocation.
///
/// The passphrase is not part of the arguments; gpg reads it from stdin
/// (`--passphrase-fd 0`).
#[must_use]
pub fn sign_args(settings: &GpgSettings, asset: &Utf8Path, signature: &Utf8Path) -> Vec<String> {
    let mut args = vec!["--batch".to_owned()];
    if settings.pinentry == PinentryMode::Loopback {
        args.extend(["--pinentry-mode".to_owned(), "loopback".to_owned()]);
    }
    args.extend([
        "--yes".to_owned(),
        "--armor".to_owned(),
        "--output".to_owned(),
        signature.to_string(),
        "--local-user".to_owned(),
        settings.key_id.clone(),
        "--passphrase-fd".to_owned(),
        "0".to_owned(),
        "--detach-sig".to_owned(),
        asset.to_string(),
    ]);
    args
}

/// Build the argument vector for a verification invocation.
#[must_use]
pub fn verify_args(asset: &Utf8Path, signature: &Utf8Path) -> Vec<String> {
    vec![
        "--batch".to_owned(),
        "--verify".to_owned(),
        signature.to_string(),
        asset.to_string(),
    ]
}

#[cfg(test)]
#[path = "gpg_tests.rs"]
mod tests;
