//! Builds the full set of assets to sign for a release.
//!
//! The platform generates a `.tar.gz` and a `.zip` source archive for every
//! tag without listing them as release assets. Both are appended to the
//! release's own assets under the names `{repo}-{version}.tar.gz` and
//! `{repo}-{version}.zip`.

use crate::config::{Endpoints, ReleaseRef, RepositoryRef};
use crate::error::{Result, SignerError};
use crate::github::types::{AssetDescriptor, Release};
use crate::staging::validate_asset_name;
use crate::version::ReleaseVersion;
use log::debug;
use std::collections::HashSet;

/// Source archive formats generated for every tag, in the order they are
/// appended.
pub const ARCHIVE_FORMATS: [&str; 2] = ["tar.gz", "zip"];

/// Return the download URL of a generated source archive.
///
/// # Examples
///
/// ```
/// use release_signer::asset_set::source_archive_url;
/// use release_signer::config::{Endpoints, RepositoryRef};
///
/// let repo = RepositoryRef::new("acme", "widget")?;
/// assert_eq!(
///     source_archive_url(&Endpoints::default(), &repo, "v1.2.3", "zip"),
///     "https://github.com/acme/widget/archive/refs/tags/v1.2.3.zip"
/// );
/// # Ok::<(), release_signer::error::SignerError>(())
/// ```
#[must_use]
pub fn source_archive_url(
    endpoints: &Endpoints,
    repo: &RepositoryRef,
    tag: &str,
    format: &str,
) -> String {
    format!(
        "{}/{}/{}/archive/refs/tags/{tag}.{format}",
        endpoints.server,
        repo.owner(),
        repo.name()
    )
}

/// Merge the release's assets with the generated source archives.
///
/// The release's assets come first, in the order the API listed them,
/// followed by the `.tar.gz` and `.zip` archives.
///
/// # Errors
///
/// Returns [`SignerError::TagVersion`] if the tag has no `major.minor.patch`
/// substring, [`SignerError::InvalidAssetName`] if a name is unsafe to
/// stage, or [`SignerError::AssetNameCollision`] if two entries share a name.
pub fn build_asset_set(
    release: &Release,
    release_ref: &ReleaseRef,
    endpoints: &Endpoints,
) -> Result<Vec<AssetDescriptor>> {
    let version = ReleaseVersion::from_tag(&release_ref.tag)?;
    let repo = &release_ref.repository;

    let archives = ARCHIVE_FORMATS.iter().map(|format| {
        AssetDescriptor::source_archive(
            format!("{}-{version}.{format}", repo.name()),
            source_archive_url(endpoints, repo, &release_ref.tag, format),
        )
    });
    let assets: Vec<AssetDescriptor> = release.assets.iter().cloned().chain(archives).collect();

    let mut seen = HashSet::with_capacity(assets.len());
    for asset in &assets {
        validate_asset_name(&asset.name)?;
        if !seen.insert(asset.name.as_str()) {
            return Err(SignerError::AssetNameCollision {
                name: asset.name.clone(),
            });
        }
        debug!("asset {} ({:?})", asset.name, asset.origin);
    }

    Ok(assets)
}
