//! Share extension CLI - Register the ShareExt target in a Cordova Xcode project
//!
//! Usage:
//!   share-ext                         # Project in the current directory
//!   share-ext <path>                  # Project at <path>
//!   share-ext --pref KEY=VALUE        # Override a __KEY__ substitution
//!   share-ext --json                  # Print the run report as JSON

use std::env;
use std::path::{Path, PathBuf};

use clap::Parser;
use console::style;
use tracing::debug;

use share_ext_hook::logging::{init_logging, LoggingConfig};
use share_ext_hook::{run, HookConfig, HookContext, HookReport, HookResult, Preferences};

#[derive(Parser, Debug)]
#[command(name = "share-ext")]
#[command(about = "Register the ShareExt target in a Cordova-generated Xcode project")]
#[command(version)]
struct Cli {
    /// Cordova project root (defaults to current directory)
    #[arg(value_name = "PROJECT_ROOT")]
    path: Option<PathBuf>,

    /// Config file (defaults to share-ext.toml in the project root)
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Value for a __KEY__ token in the extension files (repeatable)
    #[arg(long = "pref", value_name = "KEY=VALUE")]
    prefs: Vec<String>,

    /// Output the run report as JSON
    #[arg(long)]
    json: bool,

    /// Log every step
    #[arg(short, long)]
    verbose: bool,

    /// Only log errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

fn main() {
    let cli = Cli::parse();
    init_logging(&LoggingConfig {
        level: cli.log_level.clone(),
        verbose: cli.verbose,
        quiet: cli.quiet,
    });
    debug!("Arguments: {:?}", cli);

    let root = match &cli.path {
        Some(path) => path.clone(),
        None => match env::current_dir() {
            Ok(dir) => dir,
            Err(e) => fail(&format!("Failed to get current directory: {}", e)),
        },
    };

    let report = match run_hook(&root, &cli) {
        Ok(report) => report,
        Err(e) => fail(&e.to_string()),
    };

    if cli.json {
        match serde_json::to_string_pretty(&report) {
            Ok(json) => println!("{}", json),
            Err(e) => fail(&format!("Failed to serialize report: {}", e)),
        }
        return;
    }

    print_summary(&report);
}

fn run_hook(root: &Path, cli: &Cli) -> HookResult<HookReport> {
    let config = match &cli.config {
        Some(path) => HookConfig::load(path)?,
        None => HookConfig::discover(root)?,
    };
    let preferences = Preferences::collect(root, &config, &cli.prefs)?;
    run(HookContext::new(root, preferences))
}

fn print_summary(report: &HookReport) {
    let target_state = if report.target.created {
        style("created").green()
    } else {
        style("already present").yellow()
    };
    let registered = report.files.iter().filter(|f| f.registered).count();

    eprintln!(
        "{} {} target {}, {}/{} files registered, {} configurations patched",
        style("✓").green(),
        style(&report.target.name).bold(),
        target_state,
        registered,
        report.files.len(),
        report.configurations_patched
    );
    eprintln!("  {}", style(report.project_path.display()).dim());
}

fn fail(message: &str) -> ! {
    eprintln!("{} {}", style("✗").red(), message);
    std::process::exit(1);
}
