use std::io::Write;

use clap::Parser;
use serial_test::serial;

use super::*;

#[test]
fn defaults_target_the_public_demo_service() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "https://jsonplaceholder.typicode.com/");
    assert_eq!(settings.api.timeout, Duration::from_secs(10));
    assert_eq!(settings.api.retry_attempts, 2);
    assert_eq!(settings.api.retry_backoff, Duration::from_millis(200));
    assert_eq!(settings.cache.primary_stale_time, Duration::from_secs(300));
    assert_eq!(settings.cache.secondary_stale_time, Duration::from_secs(120));
    assert_eq!(settings.logging.level, LevelFilter::WARN);
    assert!(matches!(settings.logging.format, LogFormat::Compact));
}

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("https://file.example".to_string());
    raw.logging.level = Some("info".to_string());

    let overrides = GlobalOverrides {
        api_base_url: Some("http://127.0.0.1:9000".to_string()),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.api.base_url.as_str(), "http://127.0.0.1:9000/");
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = GlobalOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn rejects_unsupported_base_url_scheme() {
    let mut raw = RawSettings::default();
    raw.api.base_url = Some("ftp://files.example".to_string());

    let err = Settings::from_raw(raw).expect_err("invalid scheme");
    assert!(matches!(err, LoadError::Invalid { key: "api.base_url", .. }));
}

#[test]
fn rejects_zero_timeout_and_excessive_retries() {
    let mut raw = RawSettings::default();
    raw.api.timeout_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero timeout");
    assert!(matches!(err, LoadError::Invalid { key: "api.timeout_seconds", .. }));

    let mut raw = RawSettings::default();
    raw.api.retry_attempts = Some(11);
    let err = Settings::from_raw(raw).expect_err("too many retries");
    assert!(matches!(err, LoadError::Invalid { key: "api.retry_attempts", .. }));
}

#[test]
fn rejects_unknown_log_level() {
    let mut raw = RawSettings::default();
    raw.logging.level = Some("chatty".to_string());
    let err = Settings::from_raw(raw).expect_err("bad level");
    assert!(matches!(err, LoadError::Invalid { key: "logging.level", .. }));
}

#[test]
#[serial]
fn config_file_is_layered_under_cli() {
    let mut file = tempfile::Builder::new()
        .suffix(".toml")
        .tempfile()
        .expect("temp file");
    writeln!(
        file,
        "[api]\nbase_url = \"http://file.example\"\nretry_attempts = 0\n\n[cache]\nprimary_stale_seconds = 30"
    )
    .expect("write config");

    let path = file.path().to_str().expect("utf-8 path").to_string();
    let args = CliArgs::parse_from([
        "roster",
        "--config-file",
        path.as_str(),
        "--api-base-url",
        "http://cli.example",
        "users",
        "list",
    ]);
    let settings = load(&args).expect("settings");

    assert_eq!(settings.api.base_url.as_str(), "http://cli.example/");
    assert_eq!(settings.api.retry_attempts, 0);
    assert_eq!(settings.cache.primary_stale_time, Duration::from_secs(30));
    assert_eq!(settings.cache.secondary_stale_time, Duration::from_secs(120));
}

#[test]
fn parse_users_commands() {
    let args = CliArgs::parse_from(["roster", "users", "get", "5"]);
    match args.command {
        Command::Users(UsersCmd::Get { id }) => assert_eq!(id, "5"),
        other => panic!("wrong command parsed: {other:?}"),
    }

    let args = CliArgs::parse_from([
        "roster",
        "users",
        "update",
        "3",
        "--field",
        "name=Ann",
        "--field",
        "address.city=Bangkok",
        "--log-level",
        "debug",
    ]);
    match args.command {
        Command::Users(UsersCmd::Update { id, form }) => {
            assert_eq!(id, "3");
            assert_eq!(
                form.fields,
                vec![
                    ("name".to_string(), "Ann".to_string()),
                    ("address.city".to_string(), "Bangkok".to_string()),
                ]
            );
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
    assert_eq!(args.overrides.log_level.as_deref(), Some("debug"));
}

#[test]
fn rejects_field_without_separator() {
    let result = CliArgs::try_parse_from(["roster", "users", "create", "--field", "broken"]);
    assert!(result.is_err());
}

#[test]
fn parse_validate_command() {
    let args = CliArgs::parse_from([
        "roster",
        "validate",
        "--schema",
        "create-user",
        "payload.json",
    ]);
    match args.command {
        Command::Validate(validate) => {
            assert_eq!(validate.schema, SchemaKind::CreateUser);
            assert_eq!(validate.file, std::path::Path::new("payload.json"));
        }
        other => panic!("wrong command parsed: {other:?}"),
    }
}
