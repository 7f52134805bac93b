//! User-facing output for the signer CLI.
//!
//! Progress, summaries, and the final error line all go to stderr. When the
//! tool runs under GitHub Actions the error line is emitted as an `::error::`
//! workflow command so it is surfaced as an annotation on the run.

use crate::config::ReleaseRef;
use crate::github::types::{AssetDescriptor, AssetOrigin};
use camino::Utf8Path;
use std::error::Error;
use std::io::Write;

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl std::fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort logging; ignore write failures.
    }
}

/// Format the message printed after a successful run.
///
/// # Example
///
/// ```
/// use release_signer::output::success_message;
///
/// assert_eq!(
///     success_message(3, "v1.2.3"),
///     "Uploaded 3 signatures to release v1.2.3"
/// );
/// ```
#[must_use]
pub fn success_message(count: usize, tag: &str) -> String {
    let plural = if count == 1 { "signature" } else { "signatures" };
    format!("Uploaded {count} {plural} to release {tag}")
}

/// Information shown by `--dry-run`.
#[derive(Debug)]
pub struct DryRunInfo<'a> {
    /// The release being signed.
    pub release: &'a ReleaseRef,
    /// Numeric id the release resolved to.
    pub release_id: u64,
    /// Key that would produce the signatures.
    pub key_id: &'a str,
    /// Directory assets would be staged in.
    pub staging_dir: &'a Utf8Path,
    /// Assets that would be signed, in order.
    pub assets: &'a [AssetDescriptor],
    /// Signature names already attached to the release.
    pub existing_signatures: &'a [String],
}

impl DryRunInfo<'_> {
    /// Format the plan for display.
    #[must_use]
    pub fn display_text(&self) -> String {
        let mut lines = vec![
            "Dry run - nothing will be downloaded, signed, or uploaded".to_owned(),
            String::new(),
            format!(
                "Release: {} {} (id {})",
                self.release.repository, self.release.tag, self.release_id
            ),
            format!("Signing key: {}", self.key_id),
            format!("Staging directory: {}", self.staging_dir),
            String::new(),
            format!("Assets to sign ({}):", self.assets.len()),
        ];
        lines.extend(self.assets.iter().map(|asset| {
            let origin = match asset.origin {
                AssetOrigin::Release => "attached",
                AssetOrigin::SourceArchive => "source archive",
            };
            format!("  - {} ({origin})", asset.name)
        }));

        if !self.existing_signatures.is_empty() {
            lines.push(String::new());
            lines.push("Signatures already attached (upload would be rejected):".to_owned());
            lines.extend(
                self.existing_signatures
                    .iter()
                    .map(|name| format!("  - {name}")),
            );
        }
        lines.join("\n")
    }
}

/// Format an error and its source chain as a single line.
///
/// With `annotate` set the line is a GitHub Actions `::error::` command.
#[must_use]
pub fn failure_line(err: &(dyn Error + 'static), annotate: bool) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }

    if annotate {
        format!("::error::{}", escape_workflow_data(&message))
    } else {
        message
    }
}

/// Escape `%`, CR, and LF so a message survives as workflow command data.
fn escape_workflow_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RepositoryRef;
    use crate::error::SignerError;
    use camino::Utf8PathBuf;
    use rstest::rstest;

    #[rstest]
    #[case::one(1, "Uploaded 1 signature to release v2.0.0")]
    #[case::many(4, "Uploaded 4 signatures to release v2.0.0")]
    fn success_message_pluralises(#[case] count: usize, #[case] expected: &str) {
        assert_eq!(success_message(count, "v2.0.0"), expected);
    }

    #[test]
    fn write_stderr_line_appends_newline() {
        let mut buffer = Vec::new();
        write_stderr_line(&mut buffer, "hello");
        assert_eq!(buffer, b"hello\n");
    }

    #[test]
    fn failure_line_includes_source_chain() {
        let err = SignerError::Staging {
            path: Utf8PathBuf::from("/stage/widget.bin"),
            source: std::io::Error::other("disk full"),
        };
        assert_eq!(
            failure_line(&err, false),
            "staging failed for /stage/widget.bin: disk full"
        );
    }

    #[test]
    fn failure_line_annotates_and_escapes() {
        let err = SignerError::Gpg {
            operation: "sign",
            name: "widget.bin".to_owned(),
            message: "line one\nline two 100%".to_owned(),
        };
        assert_eq!(
            failure_line(&err, true),
            "::error::gpg sign failed for widget.bin: line one%0Aline two 100%25"
        );
    }

    #[test]
    fn dry_run_lists_assets_and_existing_signatures() {
        let release = ReleaseRef {
            repository: RepositoryRef::new("acme", "widget").expect("valid repository"),
            tag: "v1.2.3".to_owned(),
        };
        let assets = vec![
            AssetDescriptor::attached("widget.bin", "https://example.test/widget.bin"),
            AssetDescriptor::source_archive("widget-1.2.3.zip", "https://example.test/zip"),
        ];
        let existing = vec!["widget.bin.asc".to_owned()];
        let info = DryRunInfo {
            release: &release,
            release_id: 42,
            key_id: "ABCD1234",
            staging_dir: Utf8Path::new("/stage"),
            assets: &assets,
            existing_signatures: &existing,
        };

        let text = info.display_text();
        assert!(text.starts_with("Dry run"));
        assert!(text.contains("Release: acme/widget v1.2.3 (id 42)"));
        assert!(text.contains("  - widget.bin (attached)"));
        assert!(text.contains("  - widget-1.2.3.zip (source archive)"));
        assert!(text.contains("upload would be rejected"));
    }

    #[test]
    fn dry_run_omits_empty_existing_section() {
        let release = ReleaseRef {
            repository: RepositoryRef::new("acme", "widget").expect("valid repository"),
            tag: "v1.2.3".to_owned(),
        };
        let info = DryRunInfo {
            release: &release,
            release_id: 1,
            key_id: "K",
            staging_dir: Utf8Path::new("."),
            assets: &[],
            existing_signatures: &[],
        };
        assert!(!info.display_text().contains("already attached"));
    }
}
