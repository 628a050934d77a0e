//! Configuration layer: typed settings with layered precedence
//! (file → environment → `PORT` → CLI).

mod cli;

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr};

use clap::Parser;
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;

use crate::application::{
    analytics::{
        AnalyticsLimits, DEFAULT_RECENT_VISITORS, DEFAULT_TOP_PAGES, DEFAULT_VISIT_CAPACITY,
    },
    render::{DEFAULT_SYNTAX_THEME, WikilinkRoute, WikilinkRouting},
};

pub use cli::{
    BuildArgs, CheckArgs, CliArgs, Command, ContentOverrides, RenderArgs, RenderOverrides,
    ServeArgs, ServeOverrides,
};

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "quaderno";
const ENV_PREFIX: &str = "QUADERNO";
const PORT_ENV: &str = "PORT";
const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_CONTENT_ROOT: &str = "content";
const DEFAULT_OUT_DIR: &str = "dist";

/// Fully-resolved settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub analytics: AnalyticsSettings,
    pub content: ContentSettings,
    pub render: RenderSettings,
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

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct AnalyticsSettings {
    pub capacity: NonZeroU32,
    pub top_pages: NonZeroU32,
    pub recent_visitors: NonZeroU32,
}

impl From<&AnalyticsSettings> for AnalyticsLimits {
    fn from(settings: &AnalyticsSettings) -> Self {
        Self {
            capacity: settings.capacity.get() as usize,
            top_pages: settings.top_pages.get() as usize,
            recent_visitors: settings.recent_visitors.get() as usize,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ContentSettings {
    pub root: PathBuf,
    pub out_dir: PathBuf,
}

#[derive(Debug, Clone)]
pub struct RenderSettings {
    pub default_base: String,
    pub routes: Vec<WikilinkRoute>,
    pub theme: String,
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

/// Load settings using the configured precedence (file → environment → `PORT` → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;
    raw.apply_port_env(std::env::var(PORT_ENV).ok().as_deref())?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Check(args)) => raw.apply_content_overrides(&args.content),
        Some(Command::Render(args)) => raw.apply_render_overrides(&args.render),
        Some(Command::Build(args)) => raw.apply_build_overrides(args),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    analytics: RawAnalyticsSettings,
    content: RawContentSettings,
    render: RawRenderSettings,
}

impl RawSettings {
    /// Hosting platforms announce the port through a bare `PORT` variable.
    fn apply_port_env(&mut self, value: Option<&str>) -> Result<(), LoadError> {
        let Some(value) = value.map(str::trim).filter(|value| !value.is_empty()) else {
            return Ok(());
        };
        let port = value
            .parse::<u16>()
            .map_err(|err| LoadError::invalid("PORT", format!("`{value}`: {err}")))?;
        self.server.port = Some(port);
        Ok(())
    }

    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(capacity) = overrides.analytics_capacity {
            self.analytics.capacity = Some(capacity);
        }
        if let Some(top_pages) = overrides.analytics_top_pages {
            self.analytics.top_pages = Some(top_pages);
        }
        if let Some(recent) = overrides.analytics_recent_visitors {
            self.analytics.recent_visitors = Some(recent);
        }
    }

    fn apply_content_overrides(&mut self, overrides: &ContentOverrides) {
        if let Some(root) = overrides.root.as_ref() {
            self.content.root = Some(root.clone());
        }
    }

    fn apply_render_overrides(&mut self, overrides: &RenderOverrides) {
        if let Some(theme) = overrides.theme.as_ref() {
            self.render.theme = Some(theme.clone());
        }
        if let Some(base) = overrides.default_base.as_ref() {
            self.render.default_base = Some(base.clone());
        }
    }

    fn apply_build_overrides(&mut self, args: &BuildArgs) {
        self.apply_content_overrides(&args.content);
        self.apply_render_overrides(&args.render);
        if let Some(out_dir) = args.out_dir.as_ref() {
            self.content.out_dir = Some(out_dir.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            analytics,
            content,
            render,
        } = raw;

        Ok(Self {
            server: build_server_settings(server)?,
            logging: build_logging_settings(logging)?,
            analytics: build_analytics_settings(analytics)?,
            content: build_content_settings(content)?,
            render: build_render_settings(render)?,
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

    Ok(ServerSettings { addr })
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

fn build_analytics_settings(
    analytics: RawAnalyticsSettings,
) -> Result<AnalyticsSettings, LoadError> {
    Ok(AnalyticsSettings {
        capacity: non_zero_u32(
            analytics.capacity.unwrap_or(DEFAULT_VISIT_CAPACITY as u64),
            "analytics.capacity",
        )?,
        top_pages: non_zero_u32(
            analytics.top_pages.unwrap_or(DEFAULT_TOP_PAGES as u64),
            "analytics.top_pages",
        )?,
        recent_visitors: non_zero_u32(
            analytics
                .recent_visitors
                .unwrap_or(DEFAULT_RECENT_VISITORS as u64),
            "analytics.recent_visitors",
        )?,
    })
}

fn build_content_settings(content: RawContentSettings) -> Result<ContentSettings, LoadError> {
    let root = non_empty_path(content.root, DEFAULT_CONTENT_ROOT, "content.root")?;
    let out_dir = non_empty_path(content.out_dir, DEFAULT_OUT_DIR, "content.out_dir")?;
    Ok(ContentSettings { root, out_dir })
}

fn build_render_settings(render: RawRenderSettings) -> Result<RenderSettings, LoadError> {
    let defaults = WikilinkRouting::default();

    let default_base = match render.default_base {
        Some(base) => normalize_base(&base, "render.default_base")?,
        None => defaults.default_base,
    };

    let routes = match render.routes {
        Some(routes) => routes
            .into_iter()
            .map(|route| {
                if route.marker.trim().is_empty() {
                    return Err(LoadError::invalid(
                        "render.routes",
                        "route marker must not be empty",
                    ));
                }
                let base = normalize_base(&route.base, "render.routes")?;
                Ok(WikilinkRoute::new(route.marker, base))
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => defaults.routes,
    };

    let theme = render
        .theme
        .map(|theme| theme.trim().to_string())
        .unwrap_or_else(|| DEFAULT_SYNTAX_THEME.to_string());
    if theme.is_empty() {
        return Err(LoadError::invalid("render.theme", "must not be empty"));
    }

    Ok(RenderSettings {
        default_base,
        routes,
        theme,
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawAnalyticsSettings {
    capacity: Option<u64>,
    top_pages: Option<u64>,
    recent_visitors: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawContentSettings {
    root: Option<PathBuf>,
    out_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawRenderSettings {
    default_base: Option<String>,
    routes: Option<Vec<WikilinkRoute>>,
    theme: Option<String>,
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

fn non_empty_path(
    value: Option<PathBuf>,
    default: &str,
    key: &'static str,
) -> Result<PathBuf, LoadError> {
    let path = value.unwrap_or_else(|| PathBuf::from(default));
    if path.as_os_str().is_empty() {
        return Err(LoadError::invalid(key, "path must not be empty"));
    }
    Ok(path)
}

/// Base paths are absolute and carry no trailing slash (`/notes`, not `notes/`).
fn normalize_base(value: &str, key: &'static str) -> Result<String, LoadError> {
    let trimmed = value.trim();
    if !trimmed.starts_with('/') {
        return Err(LoadError::invalid(
            key,
            format!("base path `{trimmed}` must start with `/`"),
        ));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}
