use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueHint, builder::BoolishValueParser};

/// Command-line arguments for the quaderno binary.
#[derive(Debug, Parser)]
#[command(
    name = "quaderno",
    version,
    about = "Notebook content toolchain and visitor analytics API"
)]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "QUADERNO_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the analytics HTTP API (default).
    Serve(Box<ServeArgs>),
    /// Validate every content collection.
    Check(CheckArgs),
    /// Render one markdown document to stdout.
    Render(RenderArgs),
    /// Validate, render and write the static build.
    Build(BuildArgs),
}

impl Default for Command {
    fn default() -> Self {
        Command::Serve(Box::default())
    }
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

    /// Override the listener port (takes precedence over `PORT`).
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

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

    /// Override how many visit records are retained in memory.
    #[arg(long = "analytics-capacity", value_name = "COUNT")]
    pub analytics_capacity: Option<u64>,

    /// Override how many pages the stats endpoint ranks.
    #[arg(long = "analytics-top-pages", value_name = "COUNT")]
    pub analytics_top_pages: Option<u64>,

    /// Override how many recent visits the stats endpoint lists.
    #[arg(long = "analytics-recent-visitors", value_name = "COUNT")]
    pub analytics_recent_visitors: Option<u64>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ContentOverrides {
    /// Override the content root directory.
    #[arg(long = "content-root", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub root: Option<PathBuf>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct RenderOverrides {
    /// Override the syntax highlighting theme.
    #[arg(long = "render-theme", value_name = "THEME")]
    pub theme: Option<String>,

    /// Override the wikilink base path used when no route matches.
    #[arg(long = "render-wikilink-base", value_name = "PATH")]
    pub default_base: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct CheckArgs {
    #[command(flatten)]
    pub content: ContentOverrides,
}

#[derive(Debug, Args, Clone)]
pub struct RenderArgs {
    #[command(flatten)]
    pub render: RenderOverrides,

    /// Markdown document to render.
    #[arg(value_name = "FILE", value_hint = ValueHint::FilePath)]
    pub file: PathBuf,
}

#[derive(Debug, Args, Default, Clone)]
pub struct BuildArgs {
    #[command(flatten)]
    pub content: ContentOverrides,

    #[command(flatten)]
    pub render: RenderOverrides,

    /// Override the output directory.
    #[arg(long = "out", value_name = "DIR", value_hint = ValueHint::DirPath)]
    pub out_dir: Option<PathBuf>,
}
