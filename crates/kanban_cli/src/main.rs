//! Command-line entry point over a kanban store file.
//!
//! # Responsibility
//! - Open a store, hydrate the registries and print summaries.
//! - Move snapshots in and out of the store as export documents.

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand};
use kanban_core::model::now_epoch_ms;
use kanban_core::service::dashboard::{board_summary, overall};
use kanban_core::service::kanban_service::PERSISTENCE_ERROR_KEY;
use kanban_core::{
    init_logging, open_db, BoardId, ExportDocument, KanbanConfig, KanbanService,
    SqliteKvRepository,
};
use log::info;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "kanban")]
#[command(about = "Inspect, export and import a local kanban store")]
#[command(version)]
struct Cli {
    /// Path of the SQLite store file
    #[arg(long)]
    db: PathBuf,

    /// Optional JSON config file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Absolute directory for log files; logging is off when omitted
    #[arg(long)]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print dashboard totals, or one board's summary
    Stats {
        /// Board ID
        #[arg(short, long)]
        board: Option<BoardId>,
    },
    /// List boards, starred first
    Boards,
    /// Write every stored registry into an export document
    Export {
        /// Destination file
        file: PathBuf,
    },
    /// Replace the store with the contents of an export document
    Import {
        /// Source file
        file: PathBuf,
    },
}

impl Commands {
    fn label(&self) -> &'static str {
        match self {
            Self::Stats { .. } => "stats",
            Self::Boards => "boards",
            Self::Export { .. } => "export",
            Self::Import { .. } => "import",
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if let Some(log_dir) = &cli.log_dir {
        let log_dir = log_dir
            .to_str()
            .ok_or_else(|| anyhow!("log directory is not valid UTF-8"))?;
        init_logging(&config.log_level, log_dir).map_err(|err| anyhow!(err))?;
    }

    let conn = open_db(&cli.db).with_context(|| format!("opening {}", cli.db.display()))?;
    let repo = SqliteKvRepository::with_quota(&conn, config.storage_quota_bytes);
    let mut service = KanbanService::open(repo, &config).context("loading registries")?;

    let command = cli.command.label();
    match cli.command {
        Commands::Stats { board } => {
            let now = now_epoch_ms();
            let rendered = match board {
                Some(board_id) => {
                    let summary = board_summary(service.registries(), board_id, now)
                        .ok_or_else(|| anyhow!("board not found: {board_id}"))?;
                    serde_json::to_string_pretty(&summary)?
                }
                None => serde_json::to_string_pretty(&overall(service.registries(), now))?,
            };
            println!("{rendered}");
        }
        Commands::Boards => {
            let registries = service.registries();
            if registries.boards.is_empty() {
                println!("No boards.");
            }
            for board in registries.boards.list() {
                let star = if board.starred { "*" } else { " " };
                println!(
                    "{} {} {} ({}/{} done, {} in progress)",
                    star,
                    board.id,
                    board.name,
                    board.tasks_count.completed,
                    board.tasks_count.total,
                    board.tasks_count.in_progress
                );
            }
        }
        Commands::Export { file } => {
            let document = service.export_snapshot().context("exporting snapshot")?;
            let rendered = document.to_json_pretty()?;
            std::fs::write(&file, rendered)
                .with_context(|| format!("writing {}", file.display()))?;
            println!(
                "Exported {} key(s) to {}",
                document.data.len(),
                file.display()
            );
        }
        Commands::Import { file } => {
            let raw = std::fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let document = ExportDocument::from_json_str(&raw)?;
            service
                .import_snapshot(&document)
                .context("importing snapshot")?;
            let registries = service.registries();
            println!(
                "Imported {} board(s), {} task(s), {} column(s), {} tag(s)",
                registries.boards.len(),
                registries.tasks.tasks().len(),
                registries.columns.columns().len(),
                registries.tags.tags().len()
            );
        }
    }

    let report = service.flush();
    info!(
        "event=cli_command module=cli status={} command={}",
        if report.is_ok() { "ok" } else { "error" },
        command
    );
    if !report.is_ok() {
        return Err(anyhow!(
            "failed to save {} key(s): {}",
            report.failed.len(),
            service
                .ui()
                .error(PERSISTENCE_ERROR_KEY)
                .unwrap_or("unknown error")
        ));
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<KanbanConfig> {
    let Some(path) = path else {
        return Ok(KanbanConfig::default());
    };
    let raw =
        std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    KanbanConfig::from_json_str(&raw).with_context(|| format!("parsing {}", path.display()))
}
