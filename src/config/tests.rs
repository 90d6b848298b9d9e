use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn route_policies_default_to_three_requests_per_minute() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    for policy in [settings.rate_limit.search, settings.rate_limit.listings] {
        assert_eq!(policy.max_requests.get(), 3);
        assert_eq!(policy.window, Duration::from_secs(60));
        assert_eq!(policy.ban, Duration::from_secs(60));
    }
}

#[test]
fn window_follows_ban_length_unless_set() {
    let mut raw = RawSettings::default();
    raw.rate_limit.search.banned_minutes = Some(5);
    raw.rate_limit.listings.banned_minutes = Some(5);
    raw.rate_limit.listings.window_minutes = Some(2);

    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.rate_limit.search.window, Duration::from_secs(300));
    assert_eq!(settings.rate_limit.listings.window, Duration::from_secs(120));
    assert_eq!(settings.rate_limit.listings.ban, Duration::from_secs(300));
}

#[test]
fn zero_request_ceiling_is_rejected() {
    let mut raw = RawSettings::default();
    raw.rate_limit.search.max_requests = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ceiling must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "rate_limit.search.max_requests",
            ..
        }
    ));
}

#[test]
fn zero_ban_is_rejected() {
    let mut raw = RawSettings::default();
    raw.rate_limit.listings.banned_minutes = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero ban must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "rate_limit.listings.banned_minutes",
            ..
        }
    ));
}

#[test]
fn query_cache_defaults() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert!(settings.query_cache.enabled);
    assert_eq!(settings.query_cache.threshold.get(), 3);
    assert_eq!(
        settings.query_cache.body_limit_bytes.get() as u64,
        DEFAULT_QUERY_CACHE_BODY_LIMIT_BYTES
    );
}

#[test]
fn query_cache_can_be_disabled_via_cli() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        query_cache_enabled: Some(false),
        query_cache_threshold: Some(5),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(!settings.query_cache.enabled);
    assert_eq!(settings.query_cache.threshold.get(), 5);
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
fn blank_database_url_is_ignored() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());

    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["blogwire"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "blogwire",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--search-max-requests",
        "10",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(serve.overrides.search_max_requests, Some(10));
        }
    }
}

#[test]
fn ban_longer_than_a_year_is_rejected() {
    let mut raw = RawSettings::default();
    raw.rate_limit.search.banned_minutes = Some(u64::MAX / 60);

    let err = Settings::from_raw(raw).expect_err("oversized ban must fail");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "rate_limit.search.banned_minutes",
            ..
        }
    ));
}
