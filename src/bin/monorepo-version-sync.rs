use anyhow::{Context, Result};
use clap::builder::NonEmptyStringValueParser;
use clap::Parser;
use colored::Colorize;
use monorepo_version_sync::{
    ArtifactStamper, SyncConfig, VersionResolver, VersionSync, WorkspaceScanner,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(
    name = "monorepo-version-sync",
    version,
    about = "Set one release version on every public package of a monorepo"
)]
struct Cli {
    /// Version to release, written verbatim into every manifest
    #[arg(value_name = "VERSION", value_parser = NonEmptyStringValueParser::new())]
    target_version: String,

    /// Keep the distinguished package at the unreleased sentinel version
    #[arg(long)]
    skip_distinguished: bool,

    /// Workspace root
    #[arg(long, value_name = "DIR", default_value = ".")]
    root: PathBuf,

    /// Distinguished package name (overrides the configuration file)
    #[arg(long, value_name = "NAME")]
    distinguished: Option<String>,

    /// Configuration file (defaults to <root>/version-sync.toml)
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Show the changes without writing anything
    #[arg(long)]
    dry_run: bool,

    /// Print the result as JSON
    #[arg(long)]
    json: bool,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match run(&cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{} Failed to set version {}",
                "✗".red().bold(),
                cli.target_version.bright_white()
            );
            eprintln!("{e:#}");
            ExitCode::from(1)
        }
    }
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(cli: &Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => SyncConfig::load(path)?,
        None => SyncConfig::discover(&cli.root)?,
    };

    let distinguished = cli
        .distinguished
        .clone()
        .or(config.distinguished.clone())
        .context(
            "no distinguished package configured \
             (use --distinguished or set `distinguished` in version-sync.toml)",
        )?;

    let snapshot = WorkspaceScanner::new(&cli.root)
        .with_distinguished(&distinguished)
        .with_excludes(&config.exclude)?
        .snapshot()
        .await
        .context("Failed to scan the workspace")?;
    let resolver = VersionResolver::new(&distinguished).with_sentinel(&config.sentinel);

    let stamper = ArtifactStamper::locate(
        snapshot.all(),
        &cli.root,
        &distinguished,
        config.artifacts.clone(),
    )
    .context("Failed to locate the distinguished package")?;
    let sync = VersionSync::new(Arc::new(snapshot), Arc::new(stamper), resolver);

    if cli.dry_run {
        let plan = sync.plan(&cli.target_version, cli.skip_distinguished).await?;
        if cli.json {
            println!("{}", serde_json::to_string_pretty(&plan)?);
        } else {
            plan.print();
        }
        return Ok(());
    }

    let report = sync.apply(&cli.target_version, cli.skip_distinguished).await?;
    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        report.print();
    }
    Ok(())
}
