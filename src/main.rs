use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use uuid::Uuid;

use feature_lens::config::LensConfig;
use feature_lens::db::ModelStore;
use feature_lens::export::{self, ExportFormat};
use feature_lens::models::{CreateSnapshotInput, SourceDocument, SourceTree};
use feature_lens::validation::FailOn;
use feature_lens::{build, scan};

/// Exit status when diagnostics reach the failure threshold.
const EXIT_DIAGNOSTICS: u8 = 1;
/// Exit status for malformed input, I/O and store failures.
const EXIT_FATAL: u8 = 2;

#[derive(Parser)]
#[command(name = "flens")]
#[command(about = "Recover feature models from annotated source elements")]
struct Cli {
    /// Config file (defaults to the user config directory)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan a source tree, build its feature model and export it
    Build {
        /// Source tree JSON produced by a parser
        #[arg(short, long)]
        input: PathBuf,

        /// Output format
        #[arg(short, long, value_enum)]
        format: Option<ExportFormat>,

        /// Output file (stdout when omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Lowest diagnostic severity that fails the run
        #[arg(long, value_enum)]
        fail_on: Option<FailOn>,
    },
    /// Print the scanned (element, metadata) pairs without building a model
    Scan {
        #[arg(short, long)]
        input: PathBuf,
    },
    /// Manage stored model snapshots
    Store {
        /// Model store path
        #[arg(long, global = true)]
        db: Option<PathBuf>,

        #[command(subcommand)]
        command: StoreCommands,
    },
}

#[derive(Subcommand)]
enum StoreCommands {
    /// Build a model and save it as a snapshot
    Save {
        #[arg(short, long)]
        input: PathBuf,

        /// Snapshot label (defaults to the input file name)
        #[arg(short, long)]
        label: Option<String>,
    },
    /// List stored snapshots
    List,
    /// Print a stored snapshot as JSON
    Show { id: Uuid },
    /// Delete a stored snapshot
    Delete { id: Uuid },
}

/// Initialize tracing on stderr; stdout carries exported models.
fn init_tracing(default_filter: Option<&str>) {
    let filter = tracing_subscriber::EnvFilter::new(std::env::var("RUST_LOG").unwrap_or_else(
        |_| default_filter.unwrap_or("feature_lens=info").to_string(),
    ));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => match LensConfig::load_from(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error: {:#}", e);
                return ExitCode::from(EXIT_FATAL);
            }
        },
        None => LensConfig::load(),
    };
    init_tracing(config.log_filter.as_deref());

    match run(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            ExitCode::from(EXIT_FATAL)
        }
    }
}

fn run(command: Commands, config: &LensConfig) -> anyhow::Result<ExitCode> {
    match command {
        Commands::Build {
            input,
            format,
            output,
            fail_on,
        } => {
            let tree = read_source_tree(&input)?;
            let scan = scan(&tree)?;
            let (model, diagnostics) = build(&scan);

            let format = format.unwrap_or(config.format);
            match output.or_else(|| config.output.clone()) {
                Some(path) => export::export_to_path(&model, format, &path)?,
                None => export::export(&model, format, std::io::stdout().lock())?,
            }

            if fail_on.unwrap_or(config.fail_on).is_failure(&diagnostics) {
                tracing::error!(
                    "{} diagnostic(s) reported; failing run",
                    diagnostics.len()
                );
                return Ok(ExitCode::from(EXIT_DIAGNOSTICS));
            }
        }
        Commands::Scan { input } => {
            let tree = read_source_tree(&input)?;
            let scan = scan(&tree)?;
            let json = serde_json::to_string_pretty(&scan.records())?;
            println!("{}", json);
        }
        Commands::Store { db, command } => {
            let store = match db.or_else(|| config.store_path.clone()) {
                Some(path) => ModelStore::open(path)?,
                None => ModelStore::open_default()?,
            };
            store.migrate()?;
            run_store(&store, command)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}

fn run_store(store: &ModelStore, command: StoreCommands) -> anyhow::Result<()> {
    match command {
        StoreCommands::Save { input, label } => {
            let tree = read_source_tree(&input)?;
            let scan = scan(&tree)?;
            let (model, _) = build(&scan);

            let label = label.unwrap_or_else(|| {
                input
                    .file_stem()
                    .map(|s| s.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "model".to_string())
            });
            let snapshot = store.save_snapshot(
                CreateSnapshotInput {
                    label,
                    source: Some(input.display().to_string()),
                },
                &model,
            )?;
            println!("{}", snapshot.id);
        }
        StoreCommands::List => {
            for snapshot in store.list_snapshots()? {
                println!(
                    "{}  {}  {} nodes  {} diagnostics  {}",
                    snapshot.id,
                    snapshot.created_at.to_rfc3339(),
                    snapshot.node_count,
                    snapshot.diagnostic_count,
                    snapshot.label
                );
            }
        }
        StoreCommands::Show { id } => {
            let document = store
                .load_document(id)?
                .ok_or_else(|| anyhow::anyhow!("Snapshot {} not found", id))?;
            println!("{}", serde_json::to_string_pretty(&document)?);
        }
        StoreCommands::Delete { id } => {
            if !store.delete_snapshot(id)? {
                anyhow::bail!("Snapshot {} not found", id);
            }
            tracing::info!("Deleted snapshot {}", id);
        }
    }
    Ok(())
}

fn read_source_tree(path: &Path) -> anyhow::Result<SourceTree> {
    let file = File::open(path)
        .with_context(|| format!("Failed to open source tree {}", path.display()))?;
    let document: SourceDocument = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse source tree {}", path.display()))?;
    Ok(SourceTree::from_document(document))
}
