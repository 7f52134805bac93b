//! REST client for release lookup, asset download, and asset upload.
//!
//! [`ReleaseApi`] is the seam the pipeline talks to; [`GitHubClient`] is the
//! `ureq` implementation. Every request carries the JSON accept header, the
//! bearer token, and the pinned API version.

use super::types::{AssetDescriptor, Release, parse_asset_list, parse_release};
use crate::config::{Endpoints, RepositoryRef, SigningConfig};
use crate::error::{Result, SignerError};
use camino::Utf8Path;
use log::debug;
use std::fs::File;
use std::time::Duration;

/// Media type requested from the API.
pub const ACCEPT_HEADER: &str = "application/vnd.github+json";

/// REST API version pinned on every request.
pub const API_VERSION: &str = "2022-11-28";

/// Network timeout applied to each request, including the body transfer.
const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Operations the signer needs from the hosting platform.
///
/// Abstractions allow tests to drive the pipeline without network access.
#[cfg_attr(test, mockall::automock)]
pub trait ReleaseApi {
    /// Resolve a release and its attached assets by tag.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::ReleaseFetch`] with the HTTP status on a
    /// response other than `200 OK`, or a transport error.
    fn release_by_tag(&self, tag: &str) -> Result<Release>;

    /// List the assets currently attached to a release.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::AssetList`] with the HTTP status on a
    /// response other than `200 OK`, or a transport error.
    fn list_assets(&self, release_id: u64) -> Result<Vec<AssetDescriptor>>;

    /// Download an asset's content into `dest`, returning the bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::DownloadFailed`] with the HTTP status on a
    /// response other than `200 OK`, or [`SignerError::Staging`] if writing
    /// fails. Nothing is written unless the status is 200.
    fn download_asset(&self, asset: &AssetDescriptor, dest: &Utf8Path) -> Result<u64>;

    /// Upload the file at `source` to a release under `name`.
    ///
    /// # Errors
    ///
    /// Returns [`SignerError::UploadFailed`] unless the API answers
    /// `201 Created`, or [`SignerError::Staging`] if the file cannot be read.
    fn upload_asset(&self, release_id: u64, name: &str, source: &Utf8Path) -> Result<()>;
}

/// HTTP implementation of [`ReleaseApi`] using `ureq`.
pub struct GitHubClient<'a> {
    config: &'a SigningConfig,
    agent: ureq::Agent,
}

impl<'a> GitHubClient<'a> {
    /// Create a client for the repository and endpoints in `config`.
    #[must_use]
    pub fn new(config: &'a SigningConfig) -> Self {
        let agent_config = ureq::Agent::config_builder()
            .timeout_global(Some(HTTP_TIMEOUT))
            .build();
        Self {
            config,
            agent: ureq::Agent::new_with_config(agent_config),
        }
    }

    fn repository(&self) -> &RepositoryRef {
        &self.config.release.repository
    }

    /// Attach the headers every API call carries.
    fn with_api_headers<B>(&self, request: ureq::RequestBuilder<B>) -> ureq::RequestBuilder<B> {
        request
            .header("Accept", ACCEPT_HEADER)
            .header(
                "Authorization",
                format!("Bearer {}", self.config.token.expose()),
            )
            .header("X-GitHub-Api-Version", API_VERSION)
            .header("User-Agent", user_agent())
    }

    fn get(&self, url: &str) -> std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error> {
        debug!("GET {url}");
        self.with_api_headers(self.agent.get(url)).call()
    }

    /// GET `url`, accepting only `200 OK`.
    fn get_ok(
        &self,
        url: &str,
        on_status: impl FnOnce(u16) -> SignerError,
    ) -> Result<ureq::http::Response<ureq::Body>> {
        let response = match self.get(url) {
            Ok(response) => response,
            Err(err) => return Err(map_ureq_error(url, &err, on_status)),
        };
        let status = response.status().as_u16();
        if status == 200 {
            Ok(response)
        } else {
            Err(on_status(status))
        }
    }

    fn get_text(&self, url: &str, on_status: impl FnOnce(u16) -> SignerError) -> Result<String> {
        self.get_ok(url, on_status)?
            .into_body()
            .read_to_string()
            .map_err(|e| SignerError::Http {
                url: url.to_owned(),
                reason: e.to_string(),
            })
    }
}

impl ReleaseApi for GitHubClient<'_> {
    fn release_by_tag(&self, tag: &str) -> Result<Release> {
        let url = release_by_tag_url(&self.config.endpoints, self.repository(), tag);
        let body = self.get_text(&url, |status| SignerError::ReleaseFetch {
            tag: tag.to_owned(),
            status,
        })?;
        parse_release(&body).map_err(|e| invalid_response(&url, &e))
    }

    fn list_assets(&self, release_id: u64) -> Result<Vec<AssetDescriptor>> {
        let url = asset_list_url(&self.config.endpoints, self.repository(), release_id);
        let body = self.get_text(&url, |status| SignerError::AssetList { release_id, status })?;
        parse_asset_list(&body).map_err(|e| invalid_response(&url, &e))
    }

    fn download_asset(&self, asset: &AssetDescriptor, dest: &Utf8Path) -> Result<u64> {
        let url = asset.download_url.as_str();
        let response = self.get_ok(url, |status| SignerError::DownloadFailed {
            name: asset.name.clone(),
            status,
        })?;

        let staging_error = |source| SignerError::Staging {
            path: dest.to_owned(),
            source,
        };
        let mut file = File::create(dest).map_err(staging_error)?;
        let written = std::io::copy(&mut response.into_body().as_reader(), &mut file)
            .map_err(staging_error)?;
        file.sync_all().map_err(staging_error)?;
        Ok(written)
    }

    fn upload_asset(&self, release_id: u64, name: &str, source: &Utf8Path) -> Result<()> {
        let url = upload_url(&self.config.endpoints, self.repository(), release_id);
        let body = std::fs::read(source).map_err(|e| SignerError::Staging {
            path: source.to_owned(),
            source: e,
        })?;

        debug!("POST {url}?name={name} ({} bytes)", body.len());
        let response = self
            .with_api_headers(self.agent.post(&url))
            .header("Content-Type", "application/octet-stream")
            .query("name", name)
            .send(body.as_slice())
            .map_err(|e| {
                map_ureq_error(&url, &e, |status| SignerError::UploadFailed {
                    name: name.to_owned(),
                    status,
                })
            })?;

        let status = response.status().as_u16();
        if status != 201 {
            return Err(SignerError::UploadFailed {
                name: name.to_owned(),
                status,
            });
        }
        Ok(())
    }
}

/// URL of the "get release by tag" endpoint.
///
/// # Examples
///
/// ```
/// use release_signer::config::{Endpoints, RepositoryRef};
/// use release_signer::github::api::release_by_tag_url;
///
/// let repo = RepositoryRef::new("acme", "widget")?;
/// let url = release_by_tag_url(&Endpoints::default(), &repo, "v1.2.3");
/// assert_eq!(url, "https://api.github.com/repos/acme/widget/releases/tags/v1.2.3");
/// # Ok::<(), release_signer::error::SignerError>(())
/// ```
#[must_use]
pub fn release_by_tag_url(endpoints: &Endpoints, repo: &RepositoryRef, tag: &str) -> String {
    format!(
        "{}/repos/{}/{}/releases/tags/{tag}",
        endpoints.api,
        repo.owner(),
        repo.name()
    )
}

/// URL of the "list release assets" endpoint.
#[must_use]
pub fn asset_list_url(endpoints: &Endpoints, repo: &RepositoryRef, release_id: u64) -> String {
    format!(
        "{}/repos/{}/{}/releases/{release_id}/assets",
        endpoints.api,
        repo.owner(),
        repo.name()
    )
}

/// URL of the asset upload endpoint, without the `name` query parameter.
#[must_use]
pub fn upload_url(endpoints: &Endpoints, repo: &RepositoryRef, release_id: u64) -> String {
    format!(
        "{}/repos/{}/{}/releases/{release_id}/assets",
        endpoints.uploads,
        repo.owner(),
        repo.name()
    )
}

fn user_agent() -> String {
    format!("release-signer/{}", env!("CARGO_PKG_VERSION"))
}

/// Map a ureq error to a [`SignerError`], using `on_status` for HTTP status
/// failures.
fn map_ureq_error(
    url: &str,
    err: &ureq::Error,
    on_status: impl FnOnce(u16) -> SignerError,
) -> SignerError {
    match err {
        ureq::Error::StatusCode(status) => on_status(*status),
        other => SignerError::Http {
            url: url.to_owned(),
            reason: other.to_string(),
        },
    }
}

fn invalid_response(url: &str, err: &serde_json::Error) -> SignerError {
    SignerError::InvalidResponse {
        url: url.to_owned(),
        reason: err.to_string(),
    }
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
