//! Layered runtime configuration.
//!
//! Settings are assembled from, in increasing precedence: the bundled
//! defaults file, a local `mnemo.toml`, an explicit `--config-file`,
//! `MNEMO_*` environment variables, and CLI flags. The raw layered value
//! is deserialized into `Raw*` structs and then validated into the typed
//! [`Settings`] the rest of the application consumes.

use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use clap::{Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing_subscriber::filter::LevelFilter;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "mnemo";
const ENV_PREFIX: &str = "MNEMO";

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_AGGREGATE_LIMIT: usize = 256;
const DEFAULT_MAX_BUFFERED_BODY_BYTES: usize = 256 * 1024;

#[derive(Debug, Parser)]
#[command(name = "mnemo", version, about = "Flashcard study API server")]
pub struct CliArgs {
    /// Extra configuration file (basename, TOML), highest-precedence file.
    #[arg(long, global = true)]
    pub config_file: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the API server (the default when no subcommand is given).
    Serve(ServeArgs),
}

#[derive(Debug, clap::Args)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Default, clap::Args)]
pub struct ServeOverrides {
    /// Bind host.
    #[arg(long)]
    pub server_host: Option<String>,

    /// Bind port.
    #[arg(long)]
    pub server_port: Option<u16>,

    /// Log level filter (trace, debug, info, warn, error, off).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log output format (json or compact).
    #[arg(long)]
    pub log_format: Option<String>,

    /// Enable or disable the aggregate cache.
    #[arg(long, value_parser = BoolishValueParser::new())]
    pub cache_enabled: Option<bool>,

    /// Maximum number of cached aggregates.
    #[arg(long)]
    pub cache_aggregate_limit: Option<usize>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub cache: CacheSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub enabled: bool,
    pub aggregate_limit: usize,
    pub max_buffered_body_bytes: usize,
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct RawSettings {
    server: RawServer,
    logging: RawLogging,
    cache: RawCache,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawServer {
    host: String,
    port: u16,
}

impl Default for RawServer {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawLogging {
    level: String,
    format: String,
}

impl Default for RawLogging {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "compact".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct RawCache {
    enabled: bool,
    aggregate_limit: usize,
    max_buffered_body_bytes: usize,
}

impl Default for RawCache {
    fn default() -> Self {
        Self {
            enabled: true,
            aggregate_limit: DEFAULT_AGGREGATE_LIMIT,
            max_buffered_body_bytes: DEFAULT_MAX_BUFFERED_BODY_BYTES,
        }
    }
}

/// Parse CLI arguments and load the full settings stack.
pub fn load_with_cli() -> Result<Settings, LoadError> {
    let cli = CliArgs::parse();
    let overrides = match cli.command {
        Some(Command::Serve(args)) => args.overrides,
        None => ServeOverrides::default(),
    };
    load(cli.config_file.as_deref(), &overrides)
}

/// Load settings from files, environment, and explicit overrides.
pub fn load(config_file: Option<&str>, overrides: &ServeOverrides) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = config_file {
        builder = builder.add_source(File::with_name(path).required(true));
    }

    builder = builder.add_source(
        Environment::with_prefix(ENV_PREFIX)
            .separator("__")
            .try_parsing(true),
    );

    if let Some(host) = &overrides.server_host {
        builder = builder.set_override("server.host", host.clone())?;
    }
    if let Some(port) = overrides.server_port {
        builder = builder.set_override("server.port", i64::from(port))?;
    }
    if let Some(level) = &overrides.log_level {
        builder = builder.set_override("logging.level", level.clone())?;
    }
    if let Some(format) = &overrides.log_format {
        builder = builder.set_override("logging.format", format.clone())?;
    }
    if let Some(enabled) = overrides.cache_enabled {
        builder = builder.set_override("cache.enabled", enabled)?;
    }
    if let Some(limit) = overrides.cache_aggregate_limit {
        builder = builder.set_override("cache.aggregate_limit", limit as i64)?;
    }

    let raw: RawSettings = builder.build()?.try_deserialize()?;
    build_settings(raw)
}

fn build_settings(raw: RawSettings) -> Result<Settings, LoadError> {
    let host: IpAddr = raw.server.host.parse().map_err(|_| LoadError::Invalid {
        key: "server.host",
        reason: format!("'{}' is not an IP address", raw.server.host),
    })?;

    let level = LevelFilter::from_str(&raw.logging.level).map_err(|_| LoadError::Invalid {
        key: "logging.level",
        reason: format!("'{}' is not a log level", raw.logging.level),
    })?;

    let format = match raw.logging.format.as_str() {
        "json" => LogFormat::Json,
        "compact" => LogFormat::Compact,
        other => {
            return Err(LoadError::Invalid {
                key: "logging.format",
                reason: format!("'{other}' is not one of: json, compact"),
            });
        }
    };

    if raw.cache.aggregate_limit == 0 {
        return Err(LoadError::Invalid {
            key: "cache.aggregate_limit",
            reason: "must be at least 1".to_string(),
        });
    }
    if raw.cache.max_buffered_body_bytes == 0 {
        return Err(LoadError::Invalid {
            key: "cache.max_buffered_body_bytes",
            reason: "must be at least 1".to_string(),
        });
    }

    Ok(Settings {
        server: ServerSettings {
            addr: SocketAddr::new(host, raw.server.port),
        },
        logging: LoggingSettings { level, format },
        cache: CacheSettings {
            enabled: raw.cache.enabled,
            aggregate_limit: raw.cache.aggregate_limit,
            max_buffered_body_bytes: raw.cache.max_buffered_body_bytes,
        },
    })
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn defaults_build_valid_settings() {
        let settings = build_settings(RawSettings::default()).expect("defaults are valid");
        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
        assert_eq!(settings.logging.level, LevelFilter::INFO);
        assert_eq!(settings.logging.format, LogFormat::Compact);
        assert!(settings.cache.enabled);
        assert_eq!(settings.cache.aggregate_limit, DEFAULT_AGGREGATE_LIMIT);
    }

    #[test]
    fn invalid_host_is_rejected() {
        let raw = RawSettings {
            server: RawServer {
                host: "not-a-host".to_string(),
                ..Default::default()
            },
            ..Default::default()
        };
        let error = build_settings(raw).expect_err("host should be rejected");
        assert!(matches!(
            error,
            LoadError::Invalid {
                key: "server.host",
                ..
            }
        ));
    }

    #[test]
    fn zero_aggregate_limit_is_rejected() {
        let raw = RawSettings {
            cache: RawCache {
                aggregate_limit: 0,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            build_settings(raw),
            Err(LoadError::Invalid {
                key: "cache.aggregate_limit",
                ..
            })
        ));
    }

    #[test]
    fn cli_overrides_take_precedence() {
        let overrides = ServeOverrides {
            server_port: Some(8080),
            log_format: Some("json".to_string()),
            cache_enabled: Some(false),
            ..Default::default()
        };
        let settings = load(None, &overrides).expect("settings load");
        assert_eq!(settings.server.addr.port(), 8080);
        assert_eq!(settings.logging.format, LogFormat::Json);
        assert!(!settings.cache.enabled);
    }

    #[test]
    fn serve_subcommand_parses_flags() {
        let cli = CliArgs::try_parse_from([
            "mnemo",
            "serve",
            "--server-port",
            "9000",
            "--cache-enabled",
            "no",
        ])
        .expect("flags parse");

        let Some(Command::Serve(args)) = cli.command else {
            panic!("expected serve subcommand");
        };
        assert_eq!(args.overrides.server_port, Some(9000));
        assert_eq!(args.overrides.cache_enabled, Some(false));
    }

    #[test]
    fn missing_subcommand_defaults_to_serve_behavior() {
        let cli = CliArgs::try_parse_from(["mnemo"]).expect("bare invocation parses");
        assert!(cli.command.is_none());
    }
}
