use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// When to color diagnostic output on stderr.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    /// Color only when stderr is a terminal
    #[default]
    Auto,
    /// Always emit color escapes
    Always,
    /// Never emit color escapes
    Never,
}

/// Effective options for one run, merged from defaults, configuration file,
/// environment, and command line. Immutable after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOptions {
    /// Schema glob patterns, in the order given
    pub schema_patterns: Vec<String>,
    /// XML document glob patterns, in the order given
    pub document_patterns: Vec<String>,
    /// Surface validation warnings in addition to errors
    pub warn: bool,
    pub color: ColorMode,
}

/// Validate XML files against XML schemas
#[derive(Parser, Debug, Clone)]
#[command(name = "xmlvalidator")]
#[command(about = "Validate XML files against XML schemas.")]
#[command(override_usage = "xmlvalidator [OPTIONS]+ xmlFile...")]
#[command(
    after_help = "xmlFiles may contain globs, e.g. \"content/{xml,files}/**/*.xml\"."
)]
#[command(version)]
pub struct Cli {
    /// XML Schema to validate against (may contain globs)
    #[arg(
        short = 's',
        long = "schema",
        value_name = "PATTERN",
        action = clap::ArgAction::Append
    )]
    pub schemas: Vec<String>,

    /// Also report validation warnings
    #[arg(short = 'w', long = "warn")]
    pub warn: bool,

    /// When to color diagnostics
    #[arg(long = "color", value_name = "WHEN", value_enum)]
    pub color: Option<ColorMode>,

    /// Configuration file (TOML or JSON)
    #[arg(long = "config", value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// XML file patterns to validate (may contain globs)
    #[arg(value_name = "xmlFile")]
    pub documents: Vec<String>,
}

impl Cli {
    pub fn parse_args() -> Self {
        Self::parse()
    }
}
