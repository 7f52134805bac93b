//! Hosting platform access: the release API seam and its wire types.

pub mod api;
pub mod types;

pub use api::{GitHubClient, ReleaseApi};
pub use types::{AssetDescriptor, AssetOrigin, Release};
