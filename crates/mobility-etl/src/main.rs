use std::env;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use mobility_core::config::DbConfig;
use mobility_core::loader::{self, LoadReceipt};
use mobility_core::normalize::TransformReport;
use mobility_core::{classify, db, ConflictAction, DatasetKind, Dispatcher, RenderedStatement};
use mobility_parser::{parse_csv, Dataset};
use serde::Serialize;
use tracing::{error, info, info_span, Instrument};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Mobility export loader for the dashboard database", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List the recognised exports and where they land
    Datasets,
    /// Show which pipeline a file name would be routed to
    Classify(ClassifyArgs),
    /// Parse and render a file without touching the database
    Render(RenderArgs),
    /// Load one or more exports into the database
    Load(LoadArgs),
}

#[derive(Args, Debug)]
struct ClassifyArgs {
    file_name: String,
}

#[derive(Args, Debug)]
struct RenderArgs {
    path: PathBuf,
    /// Classify under this name instead of the path
    #[arg(long)]
    name: Option<String>,
}

#[derive(Args, Debug)]
struct LoadArgs {
    #[arg(required = true)]
    paths: Vec<PathBuf>,
}

#[derive(Serialize)]
struct RenderOutput<'a> {
    file_name: &'a str,
    pipeline: Option<DatasetKind>,
    report: Option<&'a TransformReport>,
    statement: Option<&'a RenderedStatement>,
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();

    match cli.command {
        Command::Datasets => {
            print_datasets();
            Ok(ExitCode::SUCCESS)
        }
        Command::Classify(args) => {
            match classify(&args.file_name) {
                Some(kind) => println!("{kind}"),
                None => println!("skipped"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Render(args) => handle_render(args).await,
        Command::Load(args) => handle_load(args).await,
    }
}

fn init_tracing() {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());
    if env::var("RUN_ENV").is_ok_and(|value| value == "dev") {
        builder.pretty().init();
    } else {
        builder.json().init();
    }
}

fn print_datasets() {
    println!(
        "{:<26} {:<32} {:<34} CONFLICT",
        "PIPELINE", "PATTERN", "TABLE"
    );
    for kind in DatasetKind::all() {
        let layout = kind.layout();
        let action = match layout.action {
            ConflictAction::DoNothing => "DO NOTHING",
            ConflictAction::DoUpdate => "DO UPDATE",
        };
        println!(
            "{:<26} {:<32} {:<34} {action} ({})",
            kind.pipeline_name(),
            kind.pattern(),
            layout.table,
            layout.conflict_columns.join(", ")
        );
    }
}

async fn handle_render(args: RenderArgs) -> Result<ExitCode> {
    let file_name = args
        .name
        .unwrap_or_else(|| args.path.to_string_lossy().into_owned());
    let dataset = read_dataset(&args.path).await?;

    let dispatch = Dispatcher::default()
        .dispatch(&file_name, &dataset)
        .with_context(|| format!("failed to transform {file_name}"))?;

    let output = RenderOutput {
        file_name: &file_name,
        pipeline: dispatch.kind(),
        report: dispatch.report(),
        statement: dispatch.statement(),
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(ExitCode::SUCCESS)
}

async fn handle_load(args: LoadArgs) -> Result<ExitCode> {
    let config = DbConfig::from_env().context("database configuration is incomplete")?;
    let pool = db::connect(&config)
        .await
        .context("failed to connect to the dashboard database")?;

    let mut failed = 0usize;
    for path in &args.paths {
        let span = info_span!("load", path = %path.display());
        let dispatcher = Dispatcher::new(span.clone());

        match load_file(&pool, &dispatcher, path)
            .instrument(span.clone())
            .await
        {
            Ok(Some(receipt)) => println!("{}", serde_json::to_string(&receipt)?),
            Ok(None) => info!(parent: &span, "not a csv file; skipping"),
            Err(err) => {
                failed += 1;
                error!(parent: &span, error = %format!("{err:#}"), "file failed");
            }
        }
    }

    info!(files = args.paths.len(), failed, "load finished");
    if failed > 0 {
        Ok(ExitCode::FAILURE)
    } else {
        Ok(ExitCode::SUCCESS)
    }
}

async fn load_file(
    pool: &db::DbPool,
    dispatcher: &Dispatcher,
    path: &Path,
) -> Result<Option<LoadReceipt>> {
    if !is_csv(path) {
        return Ok(None);
    }
    let file_name = path.to_string_lossy();
    let dataset = read_dataset(path).await?;
    let receipt = loader::load_dataset(pool, dispatcher, &file_name, &dataset)
        .await
        .with_context(|| format!("failed to load {file_name}"))?;
    Ok(Some(receipt))
}

async fn read_dataset(path: &Path) -> Result<Dataset> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    parse_csv(&bytes).with_context(|| format!("failed to parse {}", path.display()))
}

fn is_csv(path: &Path) -> bool {
    path.extension().is_some_and(|ext| ext == "csv")
}
