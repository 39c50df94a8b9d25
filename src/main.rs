use std::path::PathBuf;
use std::str::FromStr;

use anyhow::{anyhow, Result};
use clap::{Parser, Subcommand};
use pagewatch::config::{Config, ConfigOverrides};
use pagewatch::evaluate::run_once;
use pagewatch::fetch::HttpFetcher;
use pagewatch::report::{extract_latest_block, render_run, write_report, ReportMode};
use pagewatch::snapshot::store::SnapshotStore;
use tracing::info;

#[derive(Debug, Parser)]
#[command(name = "pagewatch", about = "Watches web pages for visible text changes")]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    #[arg(short, long)]
    sources: Option<String>,
    #[arg(long = "snapshot-dir")]
    snapshot_dir: Option<String>,
    #[arg(long)]
    report: Option<String>,
    #[arg(short, long)]
    mode: Option<String>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Run {
        #[arg(long = "extract-latest")]
        extract_latest: bool,
    },
    Extract,
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        sources: cli
            .sources
            .as_deref()
            .map(parse_source_list)
            .transpose()?,
        report_mode: cli
            .mode
            .as_deref()
            .map(ReportMode::from_str)
            .transpose()?,
        snapshot_dir: cli.snapshot_dir.clone(),
        report_path: cli.report.clone(),
    });

    match &cli.command {
        Commands::Config { init, show } => handle_config_command(*init, *show, &config, &config_path),
        Commands::Extract => {
            extract_latest_block(
                &config.resolved_report_path(),
                &config.resolved_latest_path(),
            )?;
            Ok(())
        }
        Commands::Run { extract_latest } => run_command(&config, *extract_latest).await,
    }
}

async fn run_command(config: &Config, extract_latest: bool) -> Result<()> {
    let sources = config.sources.urls.clone();
    if sources.is_empty() {
        return Err(anyhow!(
            "no sources configured; add [sources] urls to the config or pass --sources"
        ));
    }

    let store = SnapshotStore::open(config.resolved_snapshot_dir())?;
    let fetcher = HttpFetcher::new(&config.fetch);
    let run = run_once(&sources, &fetcher, &store).await?;

    let rendered = render_run(&run);
    let report_path = config.resolved_report_path();
    write_report(&report_path, &rendered, config.report.mode)?;
    info!("wrote report to {}", report_path.display());

    if extract_latest || config.report.extract_latest {
        extract_latest_block(&report_path, &config.resolved_latest_path())?;
    }
    Ok(())
}

fn handle_config_command(
    init: bool,
    show: bool,
    config: &Config,
    config_path: &PathBuf,
) -> Result<()> {
    if init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if show || !init {
        println!("{}", serde_json::to_string_pretty(config)?);
    }
    Ok(())
}

fn parse_source_list(raw: &str) -> Result<Vec<String>> {
    let mut out = Vec::new();
    for piece in raw.split(',') {
        let trimmed = piece.trim();
        if trimmed.is_empty() {
            continue;
        }
        out.push(trimmed.to_string());
    }
    if out.is_empty() {
        return Err(anyhow!("source list is empty"));
    }
    Ok(out)
}
