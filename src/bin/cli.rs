//! Exhibit Crawler CLI
//!
//! Local execution entry point.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use chrono::Local;
use clap::{Args, Parser, Subcommand};
use exhibit_crawler::{
    error::Result,
    models::Config,
    pipeline, report,
    utils::{date::DateRange, http::HttpFetcher, progress},
};

/// Exhibit Crawler - 8-K press release discovery
#[derive(Parser, Debug)]
#[command(
    name = "exhibit-crawler",
    version,
    about = "Find current reports carrying a press-release exhibit"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Command>,

    #[command(flatten)]
    run: RunArgs,
}

/// Run overrides, accepted before or after the subcommand.
#[derive(Args, Debug, Default)]
struct RunArgs {
    /// First filing date to scan (YYYY-MM-DD)
    #[arg(long, global = true)]
    from: Option<String>,

    /// Last filing date to scan (YYYY-MM-DD, default: today)
    #[arg(long, global = true)]
    to: Option<String>,

    /// Lookback window in days when --from is not given
    #[arg(long, global = true)]
    days: Option<u32>,

    /// Minimum metric value; 0 disables filtering
    #[arg(long, global = true)]
    min_metric: Option<u64>,

    /// Report output path
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Scan, screen and write the report (default)
    Run,

    /// Validate the configuration file
    Validate,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn apply_overrides(config: &mut Config, args: &RunArgs) {
    if let Some(days) = args.days {
        config.scan.lookback_days = days;
    }
    if let Some(min_metric) = args.min_metric {
        config.screen.min_metric = min_metric;
    }
    if let Some(output) = &args.output {
        config.output.path = output.display().to_string();
    }
}

async fn run(config: Config, args: &RunArgs) -> Result<()> {
    config.validate()?;

    let today = Local::now().date_naive();
    let range = DateRange::resolve(
        args.from.as_deref(),
        args.to.as_deref(),
        config.scan.lookback_days,
        today,
    )?;

    let fetcher = Arc::new(HttpFetcher::new(&config.crawler)?);
    let run_report = pipeline::run_pipeline(&config, range, fetcher).await?;

    report::write_csv(
        &config.output.path,
        &run_report.records,
        &config.exhibit.designator,
    )?;

    let mut items = run_report.summary_items();
    items.push(("Report", config.output.path.clone()));
    progress::summary("Run complete", &items);
    Ok(())
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let mut config = Config::load_or_default(&cli.config);
    apply_overrides(&mut config, &cli.run);

    let result = match cli.command.unwrap_or(Command::Run) {
        Command::Run => run(config, &cli.run).await,
        Command::Validate => {
            log::info!("Validating configuration...");
            config.validate().map(|()| log::info!("✓ Config OK"))
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "exhibit-crawler",
            "run",
            "--from",
            "2024-03-01",
            "--to",
            "2024-03-08",
            "--min-metric",
            "10000",
            "-o",
            "out.csv",
        ])
        .unwrap();

        assert!(matches!(cli.command, Some(Command::Run)));
        assert_eq!(cli.run.from.as_deref(), Some("2024-03-01"));
        assert_eq!(cli.run.to.as_deref(), Some("2024-03-08"));
        assert_eq!(cli.run.min_metric, Some(10_000));
        assert_eq!(cli.run.output, Some(PathBuf::from("out.csv")));
    }

    #[test]
    fn test_run_is_default_command() {
        let cli = Cli::try_parse_from(["exhibit-crawler", "--days", "7"]).unwrap();
        assert!(cli.command.is_none());
        assert_eq!(cli.run.days, Some(7));

        let mut config = Config::default();
        apply_overrides(&mut config, &cli.run);
        assert_eq!(config.scan.lookback_days, 7);
    }
}
