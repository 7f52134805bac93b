//! Signing run orchestration.
//!
//! A run moves through the [`RunStage`]s in order: check preconditions,
//! resolve the release, build the asset set, download everything, sign and
//! verify each asset, then upload the signatures. The first failure ends the
//! run. Nothing touches the network until gpg and the signing key have been
//! found.

use crate::asset_set::build_asset_set;
use crate::command::{CommandExecutor, SystemCommandExecutor};
use crate::config::SigningConfig;
use crate::error::Result;
use crate::github::api::{GitHubClient, ReleaseApi};
use crate::github::types::AssetDescriptor;
use crate::gpg::GpgSigner;
use crate::output::write_stderr_line;
use crate::staging::{SignatureFile, Stager, signature_name};
use crate::transfer::{download_all, upload_all};
use log::{debug, info};
use std::fmt;
use std::io::Write;

/// The stages of a signing run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStage {
    /// Probe gpg and the signing key, and prepare the staging directory.
    PreconditionCheck,
    /// Look the release up by tag.
    ResolveRelease,
    /// Merge release assets with the generated source archives.
    BuildAssetSet,
    /// Download every asset concurrently.
    DownloadAll,
    /// Sign and verify each asset in order.
    SignAndVerifyEach,
    /// Upload every signature concurrently.
    UploadAll,
}

impl fmt::Display for RunStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::PreconditionCheck => "precondition check",
            Self::ResolveRelease => "release lookup",
            Self::BuildAssetSet => "asset set",
            Self::DownloadAll => "download",
            Self::SignAndVerifyEach => "sign and verify",
            Self::UploadAll => "upload",
        };
        f.write_str(name)
    }
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    /// Id of the release that was signed.
    pub release_id: u64,
    /// Uploaded signatures, in asset order.
    pub signatures: Vec<SignatureFile>,
}

/// What a run would do, as reported by `--dry-run`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningPlan {
    /// Id the release resolved to.
    pub release_id: u64,
    /// Assets that would be signed, in order.
    pub assets: Vec<AssetDescriptor>,
    /// Signature names in the plan that the release already carries.
    pub existing_signatures: Vec<String>,
}

/// Run the full pipeline against the live API and the system gpg.
///
/// # Errors
///
/// Returns the first failure; see [`run_signing_with`].
pub fn run_signing(config: &SigningConfig, stderr: &mut dyn Write) -> Result<RunSummary> {
    let executor = SystemCommandExecutor::new(config.gpg.timeout);
    let api = GitHubClient::new(config);
    run_signing_with(config, &api, &executor, stderr)
}

/// Run the full pipeline with injected API and command seams.
///
/// # Errors
///
/// Returns the first failure. Preconditions fail before any API call; a
/// failed download stops the run before signing; a failed signature or
/// verification stops it before uploading.
pub fn run_signing_with(
    config: &SigningConfig,
    api: &(dyn ReleaseApi + Sync),
    executor: &dyn CommandExecutor,
    stderr: &mut dyn Write,
) -> Result<RunSummary> {
    let signer = GpgSigner::new(executor, &config.gpg);
    let stager = Stager::new(config.staging_dir.clone());
    let release_ref = &config.release;
    let mut progress = |message: String| {
        if !config.quiet {
            write_stderr_line(stderr, message);
        }
    };

    in_stage(RunStage::PreconditionCheck, || {
        signer.check_preconditions()?;
        stager.prepare()
    })?;

    progress(format!(
        "Resolving release {} in {}...",
        release_ref.tag, release_ref.repository
    ));
    let release = in_stage(RunStage::ResolveRelease, || {
        api.release_by_tag(&release_ref.tag)
    })?;
    let assets = in_stage(RunStage::BuildAssetSet, || {
        build_asset_set(&release, release_ref, &config.endpoints)
    })?;

    progress(format!(
        "Downloading {} asset(s) to {}...",
        assets.len(),
        stager.root()
    ));
    let staged = in_stage(RunStage::DownloadAll, || download_all(api, &stager, &assets))?;

    progress(format!(
        "Signing {} asset(s) with key {}...",
        staged.len(),
        config.gpg.key_id
    ));
    let signatures = in_stage(RunStage::SignAndVerifyEach, || signer.sign_all(&staged))?;

    progress(format!("Uploading {} signature(s)...", signatures.len()));
    in_stage(RunStage::UploadAll, || {
        upload_all(api, release.id, &signatures)
    })?;

    Ok(RunSummary {
        release_id: release.id,
        signatures,
    })
}

/// Resolve the release and asset set against the live API without
/// downloading, signing, or uploading anything.
///
/// # Errors
///
/// See [`plan_signing_with`].
pub fn plan_signing(config: &SigningConfig) -> Result<SigningPlan> {
    let executor = SystemCommandExecutor::new(config.gpg.timeout);
    let api = GitHubClient::new(config);
    plan_signing_with(config, &api, &executor)
}

/// Run the stages up to and including the asset set, then report the plan.
///
/// Preconditions are still checked so a dry run catches a missing key. The
/// staging directory is left untouched.
///
/// # Errors
///
/// Returns the first failure among the precondition check, the release
/// lookup, the asset listing, and the asset set.
pub fn plan_signing_with(
    config: &SigningConfig,
    api: &(dyn ReleaseApi + Sync),
    executor: &dyn CommandExecutor,
) -> Result<SigningPlan> {
    let signer = GpgSigner::new(executor, &config.gpg);
    in_stage(RunStage::PreconditionCheck, || signer.check_preconditions())?;

    let (release, attached) = in_stage(RunStage::ResolveRelease, || {
        let release = api.release_by_tag(&config.release.tag)?;
        let attached = api.list_assets(release.id)?;
        Ok((release, attached))
    })?;
    let assets = in_stage(RunStage::BuildAssetSet, || {
        build_asset_set(&release, &config.release, &config.endpoints)
    })?;

    let existing_signatures = assets
        .iter()
        .map(|asset| signature_name(&asset.name))
        .filter(|name| attached.iter().any(|a| &a.name == name))
        .collect();

    Ok(SigningPlan {
        release_id: release.id,
        assets,
        existing_signatures,
    })
}

fn in_stage<T>(stage: RunStage, op: impl FnOnce() -> Result<T>) -> Result<T> {
    info!("stage: {stage}");
    op().inspect_err(|err| debug!("{stage} stage failed: {err}"))
}

#[cfg(test)]
#[path = "pipeline_tests.rs"]
mod tests;
