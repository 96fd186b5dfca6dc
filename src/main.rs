use anyhow::{Context, Result};
use clap::Parser;
use culprit::cli::{Cli, OutputFormat};
use culprit::config::AttributionConfig;
use culprit::crash_report;
use culprit::failure::Throwable;
use culprit::identify::identify;
use culprit::index::ModIndex;
use culprit::locator::{ClassMapLocator, DirectoryLocator, LocatorChain};
use culprit::report::{render_text, JsonReport};
use culprit::resolver::UnitOriginResolver;
use std::io::Read;
use std::path::Path;
use tracing_subscriber::EnvFilter;

/// Initialize tracing subscriber for debug output
fn init_tracing(debug: bool) {
    if debug {
        tracing_subscriber::fmt()
            .with_env_filter(
                EnvFilter::from_default_env().add_directive(tracing::Level::DEBUG.into()),
            )
            .with_writer(std::io::stderr)
            .init();
    }
}

/// Read the report from a file, or stdin for "-"
fn read_report(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut text = String::new();
        std::io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read report from stdin")?;
        return Ok(text);
    }
    std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report: {}", path.display()))
}

/// Bare stack traces parse directly; full crash reports are searched
fn parse_failure(text: &str) -> Result<Throwable> {
    crash_report::find_stack_trace(text)
        .or_else(|_| crash_report::parse_stack_trace(text))
        .context("Report does not contain a JVM stack trace")
}

fn load_config(args: &Cli) -> Result<AttributionConfig> {
    let mut config = match &args.config {
        Some(path) => AttributionConfig::from_toml(path)?,
        None => AttributionConfig::default(),
    };
    // Flags only ever switch things on
    config.development_mode |= args.dev;
    config.debug_attribution_logging |= args.debug_attribution;
    Ok(config)
}

fn build_locator(args: &Cli) -> Result<LocatorChain> {
    let mut chain = LocatorChain::new();
    for path in &args.classmaps {
        chain.push(Box::new(ClassMapLocator::from_toml(path)?));
    }
    if !args.classpath.is_empty() {
        chain.push(Box::new(DirectoryLocator::new(args.classpath.iter().cloned())));
    }
    // Runtime classes are recognized even without a class map
    chain.push(Box::new(ClassMapLocator::new()));
    Ok(chain)
}

fn main() -> Result<()> {
    let args = Cli::parse();
    let config = load_config(&args)?;

    // Initialize tracing if --debug or --debug-attribution is set
    init_tracing(args.debug || config.debug_attribution_logging);

    let index = ModIndex::from_toml(&args.mods)?;
    let locator = build_locator(&args)?;
    let failure = parse_failure(&read_report(&args.report)?)?;

    let resolver = UnitOriginResolver::new(&locator, &index, &config);
    let attribution = identify(&failure, &resolver);

    match args.format {
        OutputFormat::Text => print!("{}", render_text(&failure, &attribution, args.verbose)),
        OutputFormat::Json => println!("{}", JsonReport::new(&failure, &attribution).to_json()?),
    }

    Ok(())
}
