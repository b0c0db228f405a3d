use clap::Parser;
use harness::{run_suite, ConfigResult, HarnessConfig, Tier};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

#[derive(Parser)]
#[command(name = "harness")]
#[command(about = "Contract tests for the defect-tracking API")]
struct Cli {
    /// Tier to run (runs every tier when omitted)
    #[arg(value_enum)]
    tier: Option<Tier>,

    /// TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Service root URL, without the /api suffix
    #[arg(long, env = "HARNESS_BASE_URL")]
    base_url: Option<String>,

    /// Write a plain-text report to this file
    #[arg(long)]
    report: Option<PathBuf>,
}

fn load_config(cli: &Cli) -> ConfigResult<HarnessConfig> {
    let mut config = match &cli.config {
        Some(path) => HarnessConfig::from_file(path)?,
        None => HarnessConfig::default(),
    };

    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url);
    }
    if let Some(report) = &cli.report {
        config = config.with_report_path(report);
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    let config = match load_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let report = run_suite(cli.tier, &config).await;
    report.print_summary();

    let mut success = report.is_success();
    if let Some(path) = &config.report_path {
        if let Err(e) = report.write_to(path) {
            error!("{}", e);
            success = false;
        }
    }

    if success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
