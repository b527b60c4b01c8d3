// tests/config.rs
use std::fs;
use std::time::Duration;

use clap::Parser;
use rerun::cli::CliArgs;
use rerun::config::{load_and_validate, load_optional, parse_duration, ConfigFile};
use rerun::errors::RerunError;
use rerun::supervisor::SupervisorOptions;
use tempfile::TempDir;

fn write_config(contents: &str) -> (TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("Rerun.toml");
    fs::write(&path, contents).expect("write config");
    (dir, path)
}

fn config_error(contents: &str) -> String {
    let (_dir, path) = write_config(contents);
    match load_and_validate(&path) {
        Err(RerunError::ConfigError(msg)) => msg,
        Err(other) => panic!("expected ConfigError, got {other:?}"),
        Ok(cfg) => panic!("expected an error, got {cfg:?}"),
    }
}

#[test]
fn durations_parse_with_units() {
    assert_eq!(parse_duration("250ms"), Ok(Duration::from_millis(250)));
    assert_eq!(parse_duration("3s"), Ok(Duration::from_secs(3)));
    assert_eq!(parse_duration(" 2m "), Ok(Duration::from_secs(120)));
    assert_eq!(parse_duration("1h"), Ok(Duration::from_secs(3600)));

    assert!(parse_duration("").is_err());
    assert!(parse_duration("10").is_err());
    assert!(parse_duration("5 fortnights").is_err());
}

#[test]
fn full_config_is_loaded() {
    let (_dir, path) = write_config(
        r#"
[supervisor]
stop_timeout = "5s"
relaunch_delay = "250ms"

[watch]
extensions = [".go", "tmpl"]
exclude = ["*_gen.go"]
reopen_delay = "2s"

[toolchain]
go = "/usr/local/go/bin/go"
"#,
    );

    let cfg = load_and_validate(&path).expect("valid config");

    assert_eq!(cfg.supervisor.stop_timeout, Some(Duration::from_secs(5)));
    assert_eq!(cfg.supervisor.relaunch_delay, Duration::from_millis(250));
    assert_eq!(cfg.watch.extensions, vec!["go", "tmpl"]);
    assert_eq!(cfg.watch.exclude, vec!["*_gen.go"]);
    assert_eq!(cfg.watch.reopen_delay, Duration::from_secs(2));
    assert_eq!(cfg.toolchain.go, "/usr/local/go/bin/go");

    let options = SupervisorOptions::from(&cfg);
    assert_eq!(options.stop_timeout, Some(Duration::from_secs(5)));
    assert_eq!(options.relaunch_delay, Duration::from_millis(250));
}

#[test]
fn empty_file_yields_defaults() {
    let (_dir, path) = write_config("");

    let cfg = load_and_validate(&path).expect("valid config");
    let defaults = ConfigFile::default();

    assert_eq!(cfg.supervisor, defaults.supervisor);
    assert_eq!(cfg.watch, defaults.watch);
    assert_eq!(cfg.supervisor.stop_timeout, None, "stops wait indefinitely by default");
    assert_eq!(cfg.watch.extensions, vec!["go"]);
    assert_eq!(cfg.toolchain.go, "go");
}

#[test]
fn invalid_duration_names_the_field() {
    let msg = config_error("[supervisor]\nstop_timeout = \"soon\"\n");
    assert!(msg.contains("supervisor.stop_timeout"), "got: {msg}");
}

#[test]
fn oversized_duration_is_a_config_error() {
    let err = parse_duration("307445734561825861m").expect_err("overflow must be rejected");
    assert!(err.contains("out of range"), "got: {err}");
    assert!(parse_duration("18446744073709551615h").is_err());
    assert_eq!(
        parse_duration("18446744073709551615s"),
        Ok(Duration::from_secs(u64::MAX))
    );

    let msg = config_error("[watch]\nreopen_delay = \"307445734561825861m\"\n");
    assert!(msg.contains("watch.reopen_delay"), "got: {msg}");
}

#[test]
fn empty_extension_list_is_rejected() {
    let msg = config_error("[watch]\nextensions = []\n");
    assert!(msg.contains("extensions"), "got: {msg}");
}

#[test]
fn empty_go_binary_is_rejected() {
    let msg = config_error("[toolchain]\ngo = \"  \"\n");
    assert!(msg.contains("toolchain"), "got: {msg}");
}

#[test]
fn invalid_exclude_glob_is_rejected() {
    let (_dir, path) = write_config("[watch]\nexclude = [\"[unclosed\"]\n");
    assert!(load_and_validate(&path).is_err());
}

#[test]
fn malformed_toml_is_a_toml_error() {
    let (_dir, path) = write_config("[supervisor\nstop_timeout = 1");
    assert!(matches!(load_and_validate(&path), Err(RerunError::TomlError(_))));
}

#[test]
fn explicit_config_path_must_exist() {
    let dir = tempfile::tempdir().expect("tempdir");
    let missing = dir.path().join("nope.toml");

    assert!(matches!(
        load_optional(Some(missing.as_path())),
        Err(RerunError::IoError(_))
    ));
}

#[test]
fn no_config_anywhere_means_defaults() {
    let cfg = load_optional(None).expect("defaults");
    assert_eq!(cfg.watch, ConfigFile::default().watch);
}

#[test]
fn cli_takes_import_path_and_program_args() {
    let args = CliArgs::try_parse_from([
        "rerun",
        "--test",
        "--race",
        "example.com/app",
        "-addr",
        ":8080",
        "--verbose",
    ])
    .expect("parse");

    assert!(args.test);
    assert!(args.race);
    assert!(!args.build);
    assert!(!args.no_run);
    assert_eq!(args.import_path, "example.com/app");
    assert_eq!(args.args, vec!["-addr", ":8080", "--verbose"]);
}

#[test]
fn cli_accepts_build_options() {
    let args = CliArgs::try_parse_from([
        "rerun",
        "--build",
        "--build-tags",
        "integration",
        "--no-run",
        "--config",
        "dev.toml",
        "--log-level",
        "debug",
        "example.com/app",
    ])
    .expect("parse");

    assert!(args.build);
    assert!(args.no_run);
    assert_eq!(args.build_tags.as_deref(), Some("integration"));
    assert_eq!(args.config.as_deref(), Some("dev.toml"));
    assert!(args.log_level.is_some());
    assert!(args.args.is_empty());
}

#[test]
fn cli_requires_an_import_path() {
    assert!(CliArgs::try_parse_from(["rerun", "--test"]).is_err());
}

#[test]
fn log_filter_from_environment() {
    use rerun::logging::filter_from_env;

    assert_eq!(filter_from_env(Some("debug")).to_string(), "debug");
    assert_eq!(
        filter_from_env(Some("rerun::supervisor=trace")).to_string(),
        "rerun::supervisor=trace"
    );
    assert_eq!(filter_from_env(Some("  ")).to_string(), "info");
    assert_eq!(filter_from_env(None).to_string(), "info");
}
