//! Local staging of downloaded assets and their signatures.
//!
//! Each asset is written to `{staging_dir}/{asset name}` and its signature to
//! the same path with `.asc` appended. Files are left in place after the run.

use crate::error::{Result, SignerError};
use camino::{Utf8Path, Utf8PathBuf};
use std::fs;

/// Extension appended to an asset name to form its signature file name.
pub const SIGNATURE_EXTENSION: &str = "asc";

/// Resolves staged paths under a single root directory.
#[derive(Debug, Clone)]
pub struct Stager {
    root: Utf8PathBuf,
}

impl Stager {
    /// Create a stager rooted at `root`.
    #[must_use]
    pub fn new(root: Utf8PathBuf) -> Self {
        Self { root }
    }

    /// Ensure the staging directory exists and is writable.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::Staging`] if the directory cannot be created or
    /// a probe file cannot be written into it.
    pub fn prepare(&self) -> Result<()> {
        fs::create_dir_all(&self.root).map_err(|source| SignerError::Staging {
            path: self.root.clone(),
            source,
        })?;

        let probe = self.root.join(".release-signer-probe");
        match fs::write(&probe, b"probe") {
            Ok(()) => {
                let _ = fs::remove_file(&probe);
                Ok(())
            }
            Err(source) => Err(SignerError::Staging {
                path: self.root.clone(),
                source,
            }),
        }
    }

    /// Return the staging directory.
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Return the path an asset is staged at.
    #[must_use]
    pub fn asset_path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(name)
    }

    /// Return the path of the signature for an asset.
    #[must_use]
    pub fn signature_path(&self, name: &str) -> Utf8PathBuf {
        self.root.join(signature_name(name))
    }
}

/// An asset downloaded into the staging directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedFile {
    /// Asset name, also the staged file name.
    pub name: String,
    /// Location of the staged content.
    pub path: Utf8PathBuf,
    /// Number of bytes written.
    pub size: u64,
}

/// A detached signature that has passed verification.
///
/// Only the signing stage can construct one, so holding a `SignatureFile`
/// means the signature verified against its asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureFile {
    name: String,
    path: Utf8PathBuf,
}

impl SignatureFile {
    pub(crate) fn verified(name: String, path: Utf8PathBuf) -> Self {
        Self { name, path }
    }

    /// Return the upload name, `{asset}.asc`.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Return the signature's location on disk.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

/// Return the signature file name for an asset.
///
/// # Examples
///
/// ```
/// use release_signer::staging::signature_name;
///
/// assert_eq!(signature_name("widget.bin"), "widget.bin.asc");
/// ```
#[must_use]
pub fn signature_name(asset_name: &str) -> String {
    format!("{asset_name}.{SIGNATURE_EXTENSION}")
}

/// Check that an asset name is safe to use as a file name in the staging
/// directory.
///
/// # Errors
///
/// Returns [`SignerError::InvalidAssetName`] for empty names, `.` and `..`,
/// and names containing a path separator or NUL byte.
pub fn validate_asset_name(name: &str) -> Result<()> {
    let reason = if name.is_empty() {
        Some("name is empty")
    } else if name == "." || name == ".." {
        Some("name refers to a directory")
    } else if name.contains(['/', '\\']) {
        Some("name contains a path separator")
    } else if name.contains('\0') {
        Some("name contains a NUL byte")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(SignerError::InvalidAssetName {
            name: name.to_owned(),
            reason: reason.to_owned(),
        }),
        None => Ok(()),
    }
}
