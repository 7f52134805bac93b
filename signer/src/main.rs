//! Release signer CLI entrypoint.
//!
//! This binary signs the assets of one GitHub release with gpg and uploads
//! the detached signatures. Progress is written to stderr; any failure is
//! reported as a single line and exits with status 1.

use clap::Parser;
use release_signer::cli::Cli;
use release_signer::config::SigningConfig;
use release_signer::error::Result;
use release_signer::output::{DryRunInfo, failure_line, success_message, write_stderr_line};
use release_signer::pipeline::{plan_signing, run_signing};
use std::io::Write;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

fn main() {
    let cli = Cli::parse();
    init_logging(cli.log_level());

    let annotate = cli.annotate;
    let dry_run = cli.dry_run;
    let mut stderr = std::io::stderr();
    let run_result = cli
        .into_config()
        .and_then(|config| run(&config, dry_run, &mut stderr));
    let exit_code = exit_code_for_run_result(run_result, annotate, &mut stderr);
    if exit_code != 0 {
        std::process::exit(exit_code);
    }
}

/// Install the log subscriber. `RUST_LOG` overrides the CLI-derived level.
fn init_logging(default_level: &str) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .try_init();
}

fn run(config: &SigningConfig, dry_run: bool, stderr: &mut dyn Write) -> Result<()> {
    if dry_run {
        let plan = plan_signing(config)?;
        let info = DryRunInfo {
            release: &config.release,
            release_id: plan.release_id,
            key_id: &config.gpg.key_id,
            staging_dir: &config.staging_dir,
            assets: &plan.assets,
            existing_signatures: &plan.existing_signatures,
        };
        write_stderr_line(stderr, info.display_text());
        return Ok(());
    }

    let summary = run_signing(config, stderr)?;
    if !config.quiet {
        write_stderr_line(
            stderr,
            success_message(summary.signatures.len(), &config.release.tag),
        );
    }
    Ok(())
}

fn exit_code_for_run_result(result: Result<()>, annotate: bool, stderr: &mut dyn Write) -> i32 {
    match result {
        Ok(()) => 0,
        Err(err) => {
            write_stderr_line(stderr, failure_line(&err, annotate));
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use release_signer::error::SignerError;
    use rstest::rstest;

    #[test]
    fn exit_code_for_run_result_returns_zero_on_success() {
        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Ok(()), false, &mut stderr);
        assert_eq!(exit_code, 0);
        assert!(stderr.is_empty());
    }

    #[rstest]
    #[case::plain(false, "failed to upload file widget.bin.asc: HTTP 422\n")]
    #[case::annotated(true, "::error::failed to upload file widget.bin.asc: HTTP 422\n")]
    fn exit_code_for_run_result_prints_one_line_and_returns_one(
        #[case] annotate: bool,
        #[case] expected: &str,
    ) {
        let err = SignerError::UploadFailed {
            name: "widget.bin.asc".to_owned(),
            status: 422,
        };

        let mut stderr = Vec::new();
        let exit_code = exit_code_for_run_result(Err(err), annotate, &mut stderr);
        assert_eq!(exit_code, 1);

        let stderr_text = String::from_utf8(stderr).expect("stderr was not UTF-8");
        assert_eq!(stderr_text, expected);
    }
}
