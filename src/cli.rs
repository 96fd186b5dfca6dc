//! CLI argument parsing for culprit

use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Output format for the attribution report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format (default)
    Text,
    /// JSON format for machine parsing
    Json,
}

#[derive(Parser, Debug)]
#[command(name = "culprit")]
#[command(version)]
#[command(about = "Identify the mods responsible for a JVM crash", long_about = None)]
pub struct Cli {
    /// Crash report or stack trace to analyze ("-" reads stdin)
    #[arg(value_name = "REPORT")]
    pub report: PathBuf,

    /// TOML index of installed mods and their locations
    #[arg(short = 'm', long = "mods", value_name = "FILE")]
    pub mods: PathBuf,

    /// TOML class map exported by the launcher (repeatable)
    #[arg(long = "classmap", value_name = "FILE")]
    pub classmaps: Vec<PathBuf>,

    /// Classpath directory to search for class files (repeatable)
    #[arg(long = "classpath", value_name = "DIR")]
    pub classpath: Vec<PathBuf>,

    /// TOML attribution config
    #[arg(short = 'c', long = "config", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Game ran from a local development build
    #[arg(long = "dev")]
    pub dev: bool,

    /// Log how each code unit was resolved
    #[arg(long = "debug-attribution")]
    pub debug_attribution: bool,

    /// Also list which code units led to each mod
    #[arg(short = 'v', long = "verbose")]
    pub verbose: bool,

    /// Output format (text or json)
    #[arg(long = "format", value_enum, default_value = "text")]
    pub format: OutputFormat,

    /// Enable debug tracing output to stderr
    #[arg(long = "debug")]
    pub debug: bool,
}
