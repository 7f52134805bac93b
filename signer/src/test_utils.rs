//! Shared test doubles for the release signer.
//!
//! [`FakeGpg`] stands in for the gpg binary and [`StubReleaseApi`] for the
//! hosting API. Both record what they were asked to do so tests can assert
//! on ordering and side effects without a keyring or network.

use crate::command::CommandExecutor;
use crate::error::{Result, SignerError};
use crate::github::api::ReleaseApi;
use crate::github::types::{AssetDescriptor, Release};
use camino::Utf8Path;
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::process::{ExitStatus, Output};
use std::sync::Mutex;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(2),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Armoured placeholder written by [`FakeGpg`] in place of a real signature.
pub const FAKE_SIGNATURE: &str =
    "-----BEGIN PGP SIGNATURE-----\n\nZmFrZQ==\n-----END PGP SIGNATURE-----\n";

/// A gpg stand-in that answers probes, writes placeholder signatures, and
/// verifies them.
///
/// Signing and verification outcomes are keyed by the asset's file name.
#[derive(Debug)]
pub struct FakeGpg {
    installed: bool,
    keys: HashSet<String>,
    failing_sign: HashSet<String>,
    failing_verify: HashSet<String>,
    calls: RefCell<Vec<Vec<String>>>,
    inputs: RefCell<Vec<Vec<u8>>>,
}

impl FakeGpg {
    /// Creates a fake with `key_id` in its keyring.
    pub fn with_key(key_id: &str) -> Self {
        Self {
            installed: true,
            keys: HashSet::from([key_id.to_owned()]),
            failing_sign: HashSet::new(),
            failing_verify: HashSet::new(),
            calls: RefCell::new(Vec::new()),
            inputs: RefCell::new(Vec::new()),
        }
    }

    /// Creates a fake whose every invocation fails to spawn.
    pub fn not_installed() -> Self {
        Self {
            installed: false,
            ..Self::with_key("")
        }
    }

    /// Makes signing fail for the named asset.
    #[must_use]
    pub fn fail_sign_for(mut self, asset_name: &str) -> Self {
        self.failing_sign.insert(asset_name.to_owned());
        self
    }

    /// Makes verification fail for the named asset.
    #[must_use]
    pub fn fail_verify_for(mut self, asset_name: &str) -> Self {
        self.failing_verify.insert(asset_name.to_owned());
        self
    }

    /// Returns the argument vector of every invocation so far.
    pub fn calls(&self) -> Vec<Vec<String>> {
        self.calls.borrow().clone()
    }

    /// Returns the stdin bytes of every invocation that received input.
    pub fn inputs(&self) -> Vec<Vec<u8>> {
        self.inputs.borrow().clone()
    }

    /// Returns the file names passed to `--detach-sig`, in call order.
    pub fn signed_assets(&self) -> Vec<String> {
        self.calls
            .borrow()
            .iter()
            .filter(|args| args.iter().any(|a| a == "--detach-sig"))
            .filter_map(|args| args.last().map(|path| file_name(path)))
            .collect()
    }

    fn sign(&self, args: &[String], passphrase: Option<&[u8]>) -> Result<Output> {
        let asset = args.last().map(String::as_str).unwrap_or_default();
        let output = value_after(args, "--output").ok_or_else(|| SignerError::StubMismatch {
            message: format!("sign call without --output: {args:?}"),
        })?;
        let key = value_after(args, "--local-user").unwrap_or_default();

        if !self.keys.contains(key) {
            return Ok(failure_output(&format!("gpg: skipped \"{key}\": No secret key")));
        }
        if passphrase.is_none_or(<[u8]>::is_empty) {
            return Ok(failure_output("gpg: signing failed: No passphrase given"));
        }
        if self.failing_sign.contains(&file_name(asset)) {
            return Ok(failure_output("gpg: signing failed: Bad passphrase"));
        }
        fs::write(output, FAKE_SIGNATURE)?;
        Ok(success_output())
    }

    fn verify(&self, args: &[String]) -> Result<Output> {
        let (Some(signature), Some(asset)) = (args.get(2), args.get(3)) else {
            return Err(SignerError::StubMismatch {
                message: format!("verify call without signature and asset: {args:?}"),
            });
        };
        if !Utf8Path::new(signature).is_file() {
            return Ok(failure_output("gpg: can't open signature file"));
        }
        if self.failing_verify.contains(&file_name(asset)) {
            return Ok(failure_output("gpg: BAD signature"));
        }
        Ok(success_output())
    }

    fn dispatch(&self, args: &[String], input: Option<&[u8]>) -> Result<Output> {
        self.calls.borrow_mut().push(args.to_vec());
        if let Some(bytes) = input {
            self.inputs.borrow_mut().push(bytes.to_vec());
        }
        if !self.installed {
            return Err(SignerError::Io(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "No such file or directory",
            )));
        }

        let has = |flag: &str| args.iter().any(|a| a == flag);
        if has("--version") {
            Ok(Output {
                stdout: b"gpg (GnuPG) 2.4.4\n".to_vec(),
                ..success_output()
            })
        } else if has("--list-keys") {
            let key = value_after(args, "--list-keys").unwrap_or_default();
            if self.keys.contains(key) {
                Ok(success_output())
            } else {
                Ok(failure_output(&format!("gpg: error reading key: No public key ({key})")))
            }
        } else if has("--detach-sig") {
            self.sign(args, input)
        } else if has("--verify") {
            self.verify(args)
        } else {
            Err(SignerError::StubMismatch {
                message: format!("unexpected gpg invocation: {args:?}"),
            })
        }
    }
}

impl CommandExecutor for FakeGpg {
    fn run(&self, _program: &str, args: &[String]) -> Result<Output> {
        self.dispatch(args, None)
    }

    fn run_with_input(&self, _program: &str, args: &[String], input: &[u8]) -> Result<Output> {
        self.dispatch(args, Some(input))
    }
}

fn value_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    let position = args.iter().position(|a| a == flag)?;
    args.get(position + 1).map(String::as_str)
}

fn file_name(path: &str) -> String {
    Utf8Path::new(path).file_name().unwrap_or(path).to_owned()
}

/// A call received by [`StubReleaseApi`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiCall {
    /// `release_by_tag(tag)`.
    ReleaseByTag(String),
    /// `list_assets(release_id)`.
    ListAssets(u64),
    /// `download_asset` for the named asset.
    Download(String),
    /// `upload_asset` for the named file.
    Upload(String),
}

/// A release API that serves one fixed release.
///
/// Downloads write `content of {name}` into the destination; uploads read the
/// source file and keep its bytes. Calls may arrive from several threads.
#[derive(Debug)]
pub struct StubReleaseApi {
    tag: String,
    release: Option<Release>,
    download_failures: HashMap<String, u16>,
    upload_statuses: HashMap<String, u16>,
    calls: Mutex<Vec<ApiCall>>,
    uploads: Mutex<Vec<(String, Vec<u8>)>>,
}

impl StubReleaseApi {
    /// Serves `release` for `tag`; any other tag answers 404.
    pub fn with_release(tag: &str, release: Release) -> Self {
        Self {
            tag: tag.to_owned(),
            release: Some(release),
            download_failures: HashMap::new(),
            upload_statuses: HashMap::new(),
            calls: Mutex::new(Vec::new()),
            uploads: Mutex::new(Vec::new()),
        }
    }

    /// Answers every release lookup with 404.
    pub fn without_release() -> Self {
        Self {
            release: None,
            ..Self::with_release("", Release {
                id: 0,
                assets: Vec::new(),
            })
        }
    }

    /// Makes the download of the named asset answer `status`.
    #[must_use]
    pub fn fail_download(mut self, asset_name: &str, status: u16) -> Self {
        self.download_failures.insert(asset_name.to_owned(), status);
        self
    }

    /// Makes the upload of the named file answer `status` instead of 201.
    #[must_use]
    pub fn upload_status(mut self, file_name: &str, status: u16) -> Self {
        self.upload_statuses.insert(file_name.to_owned(), status);
        self
    }

    /// Returns every call received so far.
    ///
    /// Concurrent batches record in completion order; sort before comparing
    /// batch members.
    pub fn calls(&self) -> Vec<ApiCall> {
        self.calls.lock().expect("calls lock").clone()
    }

    /// Returns the names of files uploaded successfully, sorted.
    pub fn uploaded_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .uploads
            .lock()
            .expect("uploads lock")
            .iter()
            .map(|(name, _)| name.clone())
            .collect();
        names.sort();
        names
    }

    /// Returns the body uploaded under `name`, if any.
    pub fn uploaded_body(&self, name: &str) -> Option<Vec<u8>> {
        self.uploads
            .lock()
            .expect("uploads lock")
            .iter()
            .find(|(uploaded, _)| uploaded == name)
            .map(|(_, body)| body.clone())
    }

    fn record(&self, call: ApiCall) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl ReleaseApi for StubReleaseApi {
    fn release_by_tag(&self, tag: &str) -> Result<Release> {
        self.record(ApiCall::ReleaseByTag(tag.to_owned()));
        match &self.release {
            Some(release) if tag == self.tag => Ok(release.clone()),
            _ => Err(SignerError::ReleaseFetch {
                tag: tag.to_owned(),
                status: 404,
            }),
        }
    }

    fn list_assets(&self, release_id: u64) -> Result<Vec<AssetDescriptor>> {
        self.record(ApiCall::ListAssets(release_id));
        match &self.release {
            Some(release) if release.id == release_id => Ok(release.assets.clone()),
            _ => Err(SignerError::AssetList {
                release_id,
                status: 404,
            }),
        }
    }

    fn download_asset(&self, asset: &AssetDescriptor, dest: &Utf8Path) -> Result<u64> {
        self.record(ApiCall::Download(asset.name.clone()));
        if let Some(status) = self.download_failures.get(&asset.name) {
            return Err(SignerError::DownloadFailed {
                name: asset.name.clone(),
                status: *status,
            });
        }
        let content = format!("content of {}\n", asset.name);
        fs::write(dest, &content).map_err(|source| SignerError::Staging {
            path: dest.to_owned(),
            source,
        })?;
        Ok(content.len() as u64)
    }

    fn upload_asset(&self, release_id: u64, name: &str, source: &Utf8Path) -> Result<()> {
        self.record(ApiCall::Upload(name.to_owned()));
        if let Some(status) = self.upload_statuses.get(name) {
            return Err(SignerError::UploadFailed {
                name: name.to_owned(),
                status: *status,
            });
        }
        if self.release.as_ref().is_none_or(|release| release.id != release_id) {
            return Err(SignerError::StubMismatch {
                message: format!("upload to unknown release {release_id}"),
            });
        }
        let body = fs::read(source).map_err(|err| SignerError::Staging {
            path: source.to_owned(),
            source: err,
        })?;
        self.uploads
            .lock()
            .expect("uploads lock")
            .push((name.to_owned(), body));
        Ok(())
    }
}
