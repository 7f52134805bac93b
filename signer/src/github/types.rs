//! Release and asset types, and their JSON wire representation.
//!
//! Only the release id and each asset's name and browser download URL are
//! kept; the rest of the API payload is ignored.

use serde::Deserialize;

/// Where an asset descriptor came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetOrigin {
    /// A file attached to the release.
    Release,
    /// A source archive the platform generates for every tag.
    SourceArchive,
}

/// One file attached to, or synthesised for, a release.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetDescriptor {
    /// File name, unique within the release asset set.
    pub name: String,
    /// URL the content is fetched from.
    pub download_url: String,
    /// Whether the asset is attached or synthesised.
    pub origin: AssetOrigin,
}

impl AssetDescriptor {
    /// Describe an asset attached to the release.
    #[must_use]
    pub fn attached(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
            origin: AssetOrigin::Release,
        }
    }

    /// Describe a generated source archive.
    #[must_use]
    pub fn source_archive(name: impl Into<String>, download_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            download_url: download_url.into(),
            origin: AssetOrigin::SourceArchive,
        }
    }
}

/// A release resolved from its tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Release {
    /// Numeric release id used by the asset endpoints.
    pub id: u64,
    /// Assets currently attached to the release.
    pub assets: Vec<AssetDescriptor>,
}

#[derive(Debug, Deserialize)]
struct ReleasePayload {
    id: u64,
    #[serde(default)]
    assets: Vec<AssetPayload>,
}

#[derive(Debug, Deserialize)]
struct AssetPayload {
    name: String,
    browser_download_url: String,
}

impl From<AssetPayload> for AssetDescriptor {
    fn from(payload: AssetPayload) -> Self {
        Self::attached(payload.name, payload.browser_download_url)
    }
}

/// Decode a "get release" response body.
///
/// # Errors
///
/// Returns the `serde_json` error if the body is not a release object.
pub fn parse_release(json: &str) -> serde_json::Result<Release> {
    let payload: ReleasePayload = serde_json::from_str(json)?;
    Ok(Release {
        id: payload.id,
        assets: payload.assets.into_iter().map(Into::into).collect(),
    })
}

/// Decode a "list release assets" response body.
///
/// # Errors
///
/// Returns the `serde_json` error if the body is not an array of assets.
pub fn parse_asset_list(json: &str) -> serde_json::Result<Vec<AssetDescriptor>> {
    let payload: Vec<AssetPayload> = serde_json::from_str(json)?;
    Ok(payload.into_iter().map(Into::into).collect())
}
