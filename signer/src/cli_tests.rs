//! Tests for CLI parsing and conversion into the run configuration.

use super::*;
use rstest::rstest;

/// Environment variables the CLI reads; cleared so host CI settings do not
/// leak into parsing.
const CLI_ENV_VARS: [&str; 16] = [
    "GITHUB_TOKEN",
    "GITHUB_REPOSITORY",
    "RELEASE_OWNER",
    "RELEASE_REPO",
    "RELEASE_TAG",
    "GPG_KEY_ID",
    "GPG_KEY_PASSPHRASE",
    "GPG_PINENTRY_MODE",
    "GPG_PROGRAM",
    "GPG_TIMEOUT_SECS",
    "RELEASE_STAGING_DIR",
    "GITHUB_API_URL",
    "GITHUB_UPLOADS_URL",
    "GITHUB_SERVER_URL",
    "GITHUB_ACTIONS",
    "RUST_LOG",
];

const REQUIRED: [&str; 9] = [
    "release-signer",
    "--token",
    "t0ken",
    "--tag",
    "v1.2.3",
    "--key-id",
    "ABCD1234",
    "--passphrase",
    "secret",
];

fn parse_isolated(extra: &[&str]) -> std::result::Result<Cli, clap::Error> {
    let args: Vec<&str> = REQUIRED.iter().chain(extra).copied().collect();
    temp_env::with_vars_unset(CLI_ENV_VARS, || Cli::try_parse_from(args))
}

fn parse_ok(extra: &[&str]) -> Cli {
    parse_isolated(extra).expect("arguments should parse")
}

#[test]
fn cli_parses_defaults() {
    let cli = parse_ok(&["--repository", "acme/widget"]);
    assert_eq!(cli.pinentry, PinentryMode::Loopback);
    assert_eq!(cli.gpg, "gpg");
    assert_eq!(cli.gpg_timeout, 10);
    assert_eq!(cli.api_url, DEFAULT_API_URL);
    assert_eq!(cli.uploads_url, DEFAULT_UPLOADS_URL);
    assert_eq!(cli.server_url, DEFAULT_SERVER_URL);
    assert!(cli.staging_dir.is_none());
    assert!(!cli.dry_run);
    assert!(!cli.annotate);
    assert_eq!(cli.verbosity, 0);
    assert!(!cli.quiet);
}

#[rstest]
#[case::token("--token")]
#[case::tag("--tag")]
#[case::key_id("--key-id")]
#[case::passphrase("--passphrase")]
fn cli_requires_every_signing_value(#[case] missing: &str) {
    let mut args = Vec::new();
    let mut skip_value = false;
    for arg in REQUIRED {
        if skip_value {
            skip_value = false;
            continue;
        }
        if arg == missing {
            skip_value = true;
            continue;
        }
        args.push(arg);
    }
    let result = temp_env::with_vars_unset(CLI_ENV_VARS, || Cli::try_parse_from(args));
    let err = result.expect_err("missing required value should be rejected");
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}

#[test]
fn cli_reads_values_from_environment() {
    let cli = temp_env::with_vars(
        [
            ("GITHUB_TOKEN", Some("env-token")),
            ("GITHUB_REPOSITORY", Some("acme/widget")),
            ("RELEASE_TAG", Some("v2.0.0")),
            ("GPG_KEY_ID", Some("FEEDBEEF")),
            ("GPG_KEY_PASSPHRASE", Some("env-pass")),
            ("GPG_PINENTRY_MODE", Some("agent")),
            ("RELEASE_OWNER", None),
            ("RELEASE_REPO", None),
            ("GITHUB_ACTIONS", Some("true")),
        ],
        || Cli::try_parse_from(["release-signer"]),
    )
    .expect("environment should satisfy required values");

    assert_eq!(cli.token, "env-token");
    assert_eq!(cli.tag, "v2.0.0");
    assert_eq!(cli.key_id, "FEEDBEEF");
    assert_eq!(cli.pinentry, PinentryMode::Agent);
    assert!(cli.annotate);
    let repo = cli.repository_ref().expect("repository from environment");
    assert_eq!(repo.to_string(), "acme/widget");
}

#[test]
fn split_repository_form_takes_precedence() {
    let cli = parse_ok(&[
        "--repository",
        "other/project",
        "--owner",
        "acme",
        "--repo",
        "widget",
    ]);
    let repo = cli.repository_ref().expect("split form should resolve");
    assert_eq!(repo.owner(), "acme");
    assert_eq!(repo.name(), "widget");
}

#[test]
fn split_repository_form_overrides_environment_repository() {
    let cli = temp_env::with_vars(
        [
            ("GITHUB_REPOSITORY", Some("other/project")),
            ("RELEASE_OWNER", Some("acme")),
            ("RELEASE_REPO", Some("widget")),
        ],
        || {
            Cli::try_parse_from([
                "release-signer",
                "--token",
                "t0ken",
                "--tag",
                "v1.2.3",
                "--key-id",
                "ABCD1234",
                "--passphrase",
                "secret",
            ])
        },
    )
    .expect("both repository forms should parse");

    let repo = cli.repository_ref().expect("split form should resolve");
    assert_eq!(repo.to_string(), "acme/widget");
}

#[test]
fn combined_form_alone_resolves() {
    let cli = parse_ok(&["--repository", "acme/widget"]);
    let repo = cli.repository_ref().expect("combined form should resolve");
    assert_eq!(repo.owner(), "acme");
    assert_eq!(repo.name(), "widget");
}

#[test]
fn owner_without_repo_is_rejected() {
    let err = parse_isolated(&["--owner", "acme"]).expect_err("--owner requires --repo");
    assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);
}

#[test]
fn missing_repository_is_reported() {
    let cli = parse_ok(&[]);
    let err = cli.repository_ref().expect_err("no repository given");
    assert!(matches!(err, SignerError::MissingRepository));
}

#[test]
fn into_config_builds_context() {
    let cli = parse_ok(&[
        "--repository",
        "acme/widget",
        "--staging-dir",
        "/tmp/stage",
        "--gpg-timeout",
        "30",
        "--pinentry",
        "agent",
        "--api-url",
        "https://ghe.example/api/v3/",
    ]);
    let config = cli.into_config().expect("config should build");

    assert_eq!(config.release.repository.to_string(), "acme/widget");
    assert_eq!(config.release.tag, "v1.2.3");
    assert_eq!(config.token.expose(), "t0ken");
    assert_eq!(config.gpg.key_id, "ABCD1234");
    assert_eq!(config.gpg.passphrase.expose(), "secret");
    assert_eq!(config.gpg.pinentry, PinentryMode::Agent);
    assert_eq!(config.gpg.timeout, Duration::from_secs(30));
    assert_eq!(config.endpoints.api, "https://ghe.example/api/v3");
    assert_eq!(config.staging_dir, Utf8PathBuf::from("/tmp/stage"));
}

#[test]
fn config_debug_output_hides_secrets() {
    let config = parse_ok(&["--repository", "acme/widget"])
        .into_config()
        .expect("config should build");
    let debug = format!("{config:?}");
    assert!(!debug.contains("t0ken"));
    assert!(!debug.contains("secret\""));
}

#[rstest]
#[case::quiet(&["-q"], "error")]
#[case::default(&[], "warn")]
#[case::verbose(&["-v"], "info")]
#[case::very_verbose(&["-vv"], "debug")]
#[case::trace(&["-vvv"], "trace")]
fn log_level_follows_verbosity(#[case] extra: &[&str], #[case] expected: &str) {
    let cli = parse_ok(extra);
    assert_eq!(cli.log_level(), expected);
}

#[test]
fn cli_rejects_verbose_with_quiet() {
    parse_isolated(&["--verbose", "--quiet"])
        .expect_err("expected clap to reject conflicting flags");
}
