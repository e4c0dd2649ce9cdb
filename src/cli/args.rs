//! CLI argument definitions
//!
//! Global CLI options and configuration merging logic.

use std::io::IsTerminal;
use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use ratecard::Mode;
use serde::Deserialize;

use crate::config::Config;

use super::commands::Commands;

/// Environment variable naming the registry directory
pub(crate) const REGISTRY_ENV: &str = "RATECARD_REGISTRY";

const DEFAULT_REGISTRY_DIR: &str = "registry";

#[derive(Debug, Clone, Copy, Default, ValueEnum, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ColorMode {
    /// Auto-detect based on terminal (default)
    #[default]
    Auto,
    /// Always use colors
    Always,
    /// Never use colors
    Never,
}

#[derive(Debug, Clone, Copy, Default, ValueEnum, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum LogFormat {
    /// Single-line human readable events (default)
    #[default]
    Compact,
    /// One JSON object per event
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub(crate) enum ModeArg {
    /// Fail on usage the ratecard does not price
    Strict,
    /// Drop unpriced usage with a warning
    Lenient,
}

impl From<ModeArg> for Mode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Strict => Mode::Strict,
            ModeArg::Lenient => Mode::Lenient,
        }
    }
}

#[derive(Parser)]
#[command(name = "ratecard")]
#[command(about = "Decimal-exact cost estimation for LLM API usage", version)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,

    /// Pricing registry directory (default: $RATECARD_REGISTRY, config, ./registry)
    #[arg(long, global = true, value_name = "DIR")]
    pub(crate) registry: Option<PathBuf>,

    /// Output as JSON
    #[arg(short, long, global = true)]
    pub(crate) json: bool,

    /// Color output mode
    #[arg(long, global = true, value_enum, default_value = "auto")]
    pub(crate) color: ColorMode,

    /// Disable colored output (shorthand for --color=never)
    #[arg(long, global = true)]
    pub(crate) no_color: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub(crate) verbose: u8,

    /// Log event format on stderr
    #[arg(long, global = true, value_enum)]
    pub(crate) log_format: Option<LogFormat>,

    /// Default unpriced-usage policy for requests that do not set one
    #[arg(long, global = true, value_enum)]
    pub(crate) default_mode: Option<ModeArg>,

    #[arg(skip)]
    log_level: Option<String>,
}

impl Cli {
    /// Merge config file values into CLI (CLI args take precedence)
    pub(crate) fn with_config(mut self, config: &Config) -> Self {
        if self.registry.is_none() {
            self.registry = std::env::var_os(REGISTRY_ENV)
                .filter(|v| !v.is_empty())
                .map(PathBuf::from)
                .or_else(|| config.registry_dir.clone());
        }
        if !self.no_color
            && self.color == ColorMode::Auto
            && let Some(color) = config.color
        {
            self.color = color;
        }
        if self.log_format.is_none() {
            self.log_format = config.log_format;
        }
        if self.default_mode.is_none() {
            self.default_mode = config.mode;
        }
        self.log_level = config.log_level.clone();
        self
    }

    pub(crate) fn registry_dir(&self) -> PathBuf {
        self.registry
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_DIR))
    }

    pub(crate) fn default_mode(&self) -> Mode {
        self.default_mode.map(Mode::from).unwrap_or_default()
    }

    /// Filter directive for the log subscriber
    pub(crate) fn log_level(&self) -> &str {
        match self.verbose {
            0 => self.log_level.as_deref().unwrap_or("warn"),
            1 => "debug",
            _ => "trace",
        }
    }

    pub(crate) fn use_color(&self) -> bool {
        if self.no_color {
            return false;
        }
        match self.color {
            ColorMode::Always => true,
            ColorMode::Never => false,
            ColorMode::Auto => std::io::stdout().is_terminal(),
        }
    }
}
