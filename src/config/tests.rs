use serial_test::serial;

use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.public_port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        public_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_describe_a_local_deployment() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.public_addr.port(), DEFAULT_PUBLIC_PORT);
    assert_eq!(settings.server.admin_addr.port(), DEFAULT_ADMIN_PORT);
    assert_eq!(settings.database.url, DEFAULT_DATABASE_URL);
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
    assert!(matches!(settings.logging.format, LogFormat::Compact));
    assert!(!settings.auth.cookie_secure);
}

#[test]
fn cache_settings_use_correct_defaults() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(settings.cache.enabled);
    assert_eq!(settings.cache.home_ttl, Duration::from_secs(20));
    assert_eq!(settings.cache.key_prefix, "index_page");
    assert_eq!(settings.cache.max_entries.get(), 256);
}

#[test]
fn cache_settings_can_be_overridden_via_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        cache_enabled: Some(false),
        cache_home_ttl_seconds: Some(90),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(!settings.cache.enabled);
    assert_eq!(settings.cache.home_ttl, Duration::from_secs(90));
}

#[test]
fn invalid_values_name_their_key() {
    let mut raw = RawSettings::default();
    raw.cache.home_ttl_seconds = Some(0);
    let err = Settings::from_raw(raw).expect_err("zero ttl rejected");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "cache.home_ttl_seconds",
            ..
        }
    ));

    let mut raw = RawSettings::default();
    raw.database.url = Some("postgres://localhost/blog".to_string());
    let err = Settings::from_raw(raw).expect_err("non-sqlite url rejected");
    assert!(matches!(err, LoadError::Invalid { key: "database.url", .. }));

    let mut raw = RawSettings::default();
    raw.server.admin_port = Some(DEFAULT_PUBLIC_PORT);
    let err = Settings::from_raw(raw).expect_err("shared address rejected");
    assert!(matches!(err, LoadError::Invalid { key: "server.admin_port", .. }));

    let mut raw = RawSettings::default();
    raw.cache.key_prefix = Some("Index Page".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["blogroll"]);
    assert!(args.command.is_none());
    assert!(args.config_file.is_none());
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "blogroll",
        "serve",
        "--server-public-port",
        "8080",
        "--cache-enabled",
        "false",
        "--auth-cookie-secure",
        "true",
    ]);

    let Some(Command::Serve(serve)) = args.command else {
        panic!("expected serve command");
    };
    assert_eq!(serve.overrides.public_port, Some(8080));
    assert_eq!(serve.overrides.cache_enabled, Some(false));
    assert_eq!(serve.overrides.auth_cookie_secure, Some(true));
}

#[test]
fn parse_create_group_arguments() {
    let args = CliArgs::parse_from([
        "blogroll",
        "create-group",
        "--title",
        "Tech Talk",
        "--database-url",
        "sqlite://other.db",
    ]);

    let Some(Command::CreateGroup(group)) = args.command.clone() else {
        panic!("expected create-group command");
    };
    assert_eq!(group.title, "Tech Talk");
    assert!(group.slug.is_none());

    let mut raw = RawSettings::default();
    raw.apply_command(args.command.as_ref());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert_eq!(settings.database.url, "sqlite://other.db");
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from(["blogroll", "migrate", "--database-url", "sqlite::memory:"]);
    let Some(Command::Migrate(database)) = args.command else {
        panic!("expected migrate command");
    };
    assert_eq!(database.database_url.as_deref(), Some("sqlite::memory:"));
}

#[test]
#[serial]
fn environment_overrides_files() {
    // SAFETY: serialised with every other test that touches the environment.
    unsafe {
        std::env::set_var("BLOGROLL__CACHE__HOME_TTL_SECONDS", "45");
        std::env::set_var("BLOGROLL__SERVER__PUBLIC_PORT", "8088");
    }

    let result = load(&CliArgs::parse_from(["blogroll"]));

    unsafe {
        std::env::remove_var("BLOGROLL__CACHE__HOME_TTL_SECONDS");
        std::env::remove_var("BLOGROLL__SERVER__PUBLIC_PORT");
    }

    let settings = result.expect("settings load");
    assert_eq!(settings.cache.home_ttl, Duration::from_secs(45));
    assert_eq!(settings.server.public_addr.port(), 8088);
}
