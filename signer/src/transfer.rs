//! Concurrent asset downloads and signature uploads.

use crate::batch::run_batch;
use crate::error::Result;
use crate::github::api::ReleaseApi;
use crate::github::types::AssetDescriptor;
use crate::staging::{SignatureFile, StagedFile, Stager};
use log::{debug, info};

/// Download one asset into the staging directory.
///
/// The file is fully written before this returns.
///
/// # Errors
///
/// Returns the API error for a failed request, or a staging error if the
/// body cannot be written.
pub fn download(
    api: &(dyn ReleaseApi + Sync),
    stager: &Stager,
    asset: &AssetDescriptor,
) -> Result<StagedFile> {
    let path = stager.asset_path(&asset.name);
    let size = api.download_asset(asset, &path)?;
    debug!("downloaded {} ({size} bytes) to {path}", asset.name);
    Ok(StagedFile {
        name: asset.name.clone(),
        path,
        size,
    })
}

/// Download every asset concurrently, returning the staged files in asset
/// order.
///
/// # Errors
///
/// See [`crate::batch::run_batch`].
pub fn download_all(
    api: &(dyn ReleaseApi + Sync),
    stager: &Stager,
    assets: &[AssetDescriptor],
) -> Result<Vec<StagedFile>> {
    let staged = run_batch("download", assets, |asset| download(api, stager, asset))?;
    let total: u64 = staged.iter().map(|file| file.size).sum();
    info!("downloaded {} assets, {total} bytes", staged.len());
    Ok(staged)
}

/// Upload every verified signature to the release concurrently.
///
/// # Errors
///
/// See [`crate::batch::run_batch`].
pub fn upload_all(
    api: &(dyn ReleaseApi + Sync),
    release_id: u64,
    signatures: &[SignatureFile],
) -> Result<()> {
    run_batch("upload", signatures, |signature| {
        api.upload_asset(release_id, signature.name(), signature.path())?;
        debug!("uploaded {}", signature.name());
        Ok(())
    })?;
    info!("uploaded {} signatures", signatures.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SignerError;
    use crate::github::types::Release;
    use crate::test_utils::{ApiCall, StubReleaseApi};
    use camino::Utf8PathBuf;

    fn temp_stager() -> (tempfile::TempDir, Stager) {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Utf8PathBuf::try_from(temp.path().to_path_buf()).expect("UTF-8 path");
        (temp, Stager::new(root))
    }

    fn assets() -> Vec<AssetDescriptor> {
        ["a.bin", "b.bin", "c.bin"]
            .into_iter()
            .map(|name| AssetDescriptor::attached(name, format!("https://example.test/{name}")))
            .collect()
    }

    fn api() -> StubReleaseApi {
        StubReleaseApi::with_release("v1.0.0", Release {
            id: 9,
            assets: assets(),
        })
    }

    #[test]
    fn download_all_writes_every_asset() {
        let (_temp, stager) = temp_stager();
        let staged = download_all(&api(), &stager, &assets()).expect("downloads succeed");

        let names: Vec<&str> = staged.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["a.bin", "b.bin", "c.bin"]);
        for file in &staged {
            let content = std::fs::read_to_string(&file.path).expect("staged file exists");
            assert_eq!(content, format!("content of {}\n", file.name));
            assert_eq!(file.size, content.len() as u64);
        }
    }

    #[test]
    fn download_failure_names_asset_and_status() {
        let (_temp, stager) = temp_stager();
        let api = api().fail_download("b.bin", 503);

        let err = download_all(&api, &stager, &assets()).expect_err("download should fail");

        assert!(
            matches!(&err, SignerError::DownloadFailed { name, status: 503 } if name == "b.bin"),
            "unexpected error: {err}"
        );
        // Siblings still complete.
        assert!(stager.asset_path("a.bin").is_file());
        assert!(stager.asset_path("c.bin").is_file());
    }

    #[test]
    fn upload_all_sends_each_signature() {
        let (_temp, stager) = temp_stager();
        let signatures: Vec<SignatureFile> = ["a.bin.asc", "b.bin.asc"]
            .into_iter()
            .map(|name| {
                let path = stager.root().join(name);
                std::fs::write(&path, name).expect("write signature");
                SignatureFile::verified(name.to_owned(), path)
            })
            .collect();
        let api = api();

        upload_all(&api, 9, &signatures).expect("uploads succeed");

        assert_eq!(api.uploaded_names(), ["a.bin.asc", "b.bin.asc"]);
        assert_eq!(api.uploaded_body("a.bin.asc").as_deref(), Some(b"a.bin.asc".as_slice()));
        let uploads = api
            .calls()
            .into_iter()
            .filter(|call| matches!(call, ApiCall::Upload(_)))
            .count();
        assert_eq!(uploads, 2);
    }
}
