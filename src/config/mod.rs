//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{
    net::SocketAddr,
    num::{NonZeroU32, NonZeroUsize},
    path::PathBuf,
    str::FromStr,
    time::Duration,
};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "blogwire";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 5000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_RATE_LIMIT_MAX_REQUESTS: u64 = 3;
const DEFAULT_RATE_LIMIT_BANNED_MINUTES: u64 = 1;
const DEFAULT_QUERY_CACHE_THRESHOLD: u64 = 3;
const DEFAULT_QUERY_CACHE_BODY_LIMIT_BYTES: u64 = 1024 * 1024;
const MAX_POLICY_MINUTES: u64 = 365 * 24 * 60;

/// Command-line arguments for the blogwire binary.
#[derive(Debug, Parser)]
#[command(name = "blogwire", version, about = "Blogwire read API server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "BLOGWIRE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP API.
    Serve(Box<ServeArgs>),
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override the search route request ceiling.
    #[arg(long = "search-max-requests", value_name = "COUNT")]
    pub search_max_requests: Option<u64>,

    /// Override the search route ban length.
    #[arg(long = "search-banned-minutes", value_name = "MINUTES")]
    pub search_banned_minutes: Option<u64>,

    /// Override the listing routes request ceiling.
    #[arg(long = "listings-max-requests", value_name = "COUNT")]
    pub listings_max_requests: Option<u64>,

    /// Override the listing routes ban length.
    #[arg(long = "listings-banned-minutes", value_name = "MINUTES")]
    pub listings_banned_minutes: Option<u64>,

    /// Toggle the adaptive search cache.
    #[arg(
        long = "query-cache-enabled",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub query_cache_enabled: Option<bool>,

    /// Override how many observations of a query precede caching it.
    #[arg(long = "query-cache-threshold", value_name = "COUNT")]
    pub query_cache_threshold: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub rate_limit: RateLimitSettings,
    pub query_cache: QueryCacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct RateLimitSettings {
    pub search: RoutePolicySettings,
    pub listings: RoutePolicySettings,
}

/// Limits for one group of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoutePolicySettings {
    pub max_requests: NonZeroU32,
    pub window: Duration,
    pub ban: Duration,
}

#[derive(Debug, Clone)]
pub struct QueryCacheSettings {
    pub enabled: bool,
    pub threshold: NonZeroU32,
    pub body_limit_bytes: NonZeroUsize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("BLOGWIRE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    rate_limit: RawRateLimitSettings,
    query_cache: RawQueryCacheSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(max) = overrides.search_max_requests {
            self.rate_limit.search.max_requests = Some(max);
        }
        if let Some(minutes) = overrides.search_banned_minutes {
            self.rate_limit.search.banned_minutes = Some(minutes);
        }
        if let Some(max) = overrides.listings_max_requests {
            self.rate_limit.listings.max_requests = Some(max);
        }
        if let Some(minutes) = overrides.listings_banned_minutes {
            self.rate_limit.listings.banned_minutes = Some(minutes);
        }
        if let Some(enabled) = overrides.query_cache_enabled {
            self.query_cache.enabled = Some(enabled);
        }
        if let Some(threshold) = overrides.query_cache_threshold {
            self.query_cache.threshold = Some(threshold);
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            rate_limit,
            query_cache,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            database: build_database_settings(database)?,
            rate_limit: RateLimitSettings {
                search: build_route_policy(rate_limit.search, RoutePolicyKeys::SEARCH)?,
                listings: build_route_policy(rate_limit.listings, RoutePolicyKeys::LISTINGS)?,
            },
            query_cache: build_query_cache_settings(query_cache)?,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = database.url.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    });

    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

struct RoutePolicyKeys {
    max_requests: &'static str,
    banned_minutes: &'static str,
    window_minutes: &'static str,
}

impl RoutePolicyKeys {
    const SEARCH: Self = Self {
        max_requests: "rate_limit.search.max_requests",
        banned_minutes: "rate_limit.search.banned_minutes",
        window_minutes: "rate_limit.search.window_minutes",
    };

    const LISTINGS: Self = Self {
        max_requests: "rate_limit.listings.max_requests",
        banned_minutes: "rate_limit.listings.banned_minutes",
        window_minutes: "rate_limit.listings.window_minutes",
    };
}

fn build_route_policy(
    raw: RawRoutePolicySettings,
    keys: RoutePolicyKeys,
) -> Result<RoutePolicySettings, LoadError> {
    let max_requests = non_zero_u32(
        raw.max_requests.unwrap_or(DEFAULT_RATE_LIMIT_MAX_REQUESTS),
        keys.max_requests,
    )?;

    let banned_minutes = raw
        .banned_minutes
        .unwrap_or(DEFAULT_RATE_LIMIT_BANNED_MINUTES);
    if banned_minutes == 0 {
        return Err(LoadError::invalid(
            keys.banned_minutes,
            "must be greater than zero",
        ));
    }

    // The counting window follows the ban length unless configured on its own.
    let window_minutes = raw.window_minutes.unwrap_or(banned_minutes);
    if window_minutes == 0 {
        return Err(LoadError::invalid(
            keys.window_minutes,
            "must be greater than zero",
        ));
    }

    let ban = minutes(banned_minutes, keys.banned_minutes)?;
    let window = minutes(window_minutes, keys.window_minutes)?;

    Ok(RoutePolicySettings {
        max_requests,
        window,
        ban,
    })
}

fn build_query_cache_settings(
    raw: RawQueryCacheSettings,
) -> Result<QueryCacheSettings, LoadError> {
    let threshold = non_zero_u32(
        raw.threshold.unwrap_or(DEFAULT_QUERY_CACHE_THRESHOLD),
        "query_cache.threshold",
    )?;

    let limit = raw
        .body_limit_bytes
        .unwrap_or(DEFAULT_QUERY_CACHE_BODY_LIMIT_BYTES);
    let limit = usize::try_from(limit).map_err(|_| {
        LoadError::invalid(
            "query_cache.body_limit_bytes",
            "value exceeds supported range for usize",
        )
    })?;
    let body_limit_bytes = NonZeroUsize::new(limit).ok_or_else(|| {
        LoadError::invalid("query_cache.body_limit_bytes", "must be greater than zero")
    })?;

    Ok(QueryCacheSettings {
        enabled: raw.enabled.unwrap_or(true),
        threshold,
        body_limit_bytes,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRateLimitSettings {
    search: RawRoutePolicySettings,
    listings: RawRoutePolicySettings,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRoutePolicySettings {
    max_requests: Option<u64>,
    banned_minutes: Option<u64>,
    window_minutes: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawQueryCacheSettings {
    enabled: Option<bool>,
    threshold: Option<u64>,
    body_limit_bytes: Option<u64>,
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

fn minutes(value: u64, key: &'static str) -> Result<Duration, LoadError> {
    if value > MAX_POLICY_MINUTES {
        return Err(LoadError::invalid(
            key,
            format!("must not exceed {MAX_POLICY_MINUTES} minutes"),
        ));
    }
    Ok(Duration::from_secs(value * 60))
}

#[cfg(test)]
mod tests;
