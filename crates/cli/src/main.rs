use anyhow::{bail, Result};
use clap::{Parser, Subcommand};
use cli::{apply, history, paths};
use organizer_core::config;
use organizer_core::pipeline::{self, Organizer};
use organizer_core::{batch, Analysis};
use std::path::{Path, PathBuf};
use storage::{FileRecord, SettingsStore};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    let cfg = config::load(cli.config.as_deref())?;
    let mut settings = SettingsStore::open(&cfg.settings.path);

    if let Commands::Select { directory } = &cli.command {
        return run_select(&mut settings, directory);
    }

    let organizer = pipeline::build_organizer(&cfg).await?;
    let dir = || paths::resolve_dir(cli.dir.as_deref(), &settings);

    match &cli.command {
        Commands::Select { .. } => Ok(()),
        Commands::List {
            standardized,
            batch,
            size,
            json,
        } => run_list(&organizer, &dir()?, *standardized, *batch, *size, *json).await,
        Commands::Analyze { file, json } => {
            let path = paths::resolve_file(file, dir().ok().as_deref())?;
            print_analysis(&organizer.analyze(&path), *json)
        }
        Commands::Propose { batch, size, json } => {
            run_propose(&organizer, &dir()?, *batch, *size, *json).await
        }
        Commands::Accept { file, name } => {
            let path = paths::resolve_file(file, dir().ok().as_deref())?;
            let view = apply::accept(&organizer, &path, name.as_deref()).await?;
            print_views(&[view], false)
        }
        Commands::Reject { file } => {
            let path = paths::resolve_file(file, dir().ok().as_deref())?;
            let view = apply::reject(&organizer, &path).await?;
            print_views(&[view], false)
        }
        Commands::UpdateMetadata { file, reject, json } => {
            let files = match file {
                Some(f) => vec![paths::resolve_file(f, dir().ok().as_deref())?],
                None => organizer.standardized(&dir()?).await?,
            };
            let views = apply::update_metadata(&organizer, &files, *reject).await?;
            print_views(&views, *json)
        }
        Commands::History { json } => {
            let entries = organizer.history().await?;
            if *json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                for line in history::render(&entries) {
                    println!("{line}");
                }
            }
            Ok(())
        }
    }
}

#[derive(Parser)]
#[command(name = "pdf-organizer")]
#[command(about = "Classifies PDFs and proposes standardized file names", long_about = None)]
struct Cli {
    /// Path to config TOML
    #[arg(short, long)]
    config: Option<String>,

    /// Directory to work in (defaults to the last selected one)
    #[arg(short, long, global = true)]
    dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Select the working directory and remember it
    Select {
        #[arg(value_name = "DIR")]
        directory: PathBuf,
    },
    /// List files awaiting review
    List {
        /// List already standardized files instead
        #[arg(long, default_value_t = false)]
        standardized: bool,
        /// 1-based batch number; all files when omitted
        #[arg(long)]
        batch: Option<usize>,
        /// Batch size (defaults to the configured size)
        #[arg(long)]
        size: Option<usize>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show type scores, metadata candidates and the proposed name for one file
    Analyze {
        file: PathBuf,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Record name proposals for non-standardized files
    Propose {
        /// 1-based batch number; every batch when omitted
        #[arg(long)]
        batch: Option<usize>,
        /// Batch size (defaults to the configured size)
        #[arg(long)]
        size: Option<usize>,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Rename a file to its proposed (or the given) name
    Accept {
        file: PathBuf,
        /// Use this name instead of the proposal
        #[arg(long)]
        name: Option<String>,
    },
    /// Reject the proposed rename for a file; it will not be offered again
    Reject { file: PathBuf },
    /// Write author and title from standardized names into `_updated.pdf` copies
    UpdateMetadata {
        /// Only this file; every standardized file when omitted
        #[arg(long)]
        file: Option<PathBuf>,
        /// Record a metadata rejection instead of writing
        #[arg(long, default_value_t = false)]
        reject: bool,
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
    /// Show the decision history
    History {
        /// Output JSON
        #[arg(long)]
        json: bool,
    },
}

fn run_select(settings: &mut SettingsStore, dir: &Path) -> Result<()> {
    let dir = paths::absolute(dir)?;
    if !settings.set_last_directory(&dir)? {
        bail!("not a directory: {}", dir.display());
    }
    info!(dir = %dir.display(), "directory selected");
    println!("selected {}", dir.display());
    Ok(())
}

/// Converts a 1-based batch number to an index.
fn batch_index(batch: usize) -> Result<usize> {
    match batch.checked_sub(1) {
        Some(i) => Ok(i),
        None => bail!("batch numbers start at 1"),
    }
}

async fn run_list(
    organizer: &Organizer,
    dir: &Path,
    standardized: bool,
    batch_no: Option<usize>,
    size: Option<usize>,
    json: bool,
) -> Result<()> {
    let size = size.unwrap_or(organizer.batch_size());
    let files = if standardized {
        organizer.standardized(dir).await?
    } else {
        organizer.non_standardized(dir).await?
    };
    let total = batch::total_batches(files.len(), size);
    let shown: &[PathBuf] = match batch_no {
        Some(b) => batch::batch(&files, batch_index(b)?, size),
        None => &files,
    };
    if json {
        let out = serde_json::json!({
            "directory": dir,
            "count": files.len(),
            "batchSize": size,
            "totalBatches": total,
            "batch": batch_no,
            "files": shown,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
    } else {
        for f in shown {
            println!("{}", f.display());
        }
        println!("{} file(s), {} batch(es) of {}", files.len(), total, size);
    }
    Ok(())
}

async fn run_propose(
    organizer: &Organizer,
    dir: &Path,
    batch_no: Option<usize>,
    size: Option<usize>,
    json: bool,
) -> Result<()> {
    let size = size.unwrap_or(organizer.batch_size());
    let files = organizer.non_standardized(dir).await?;
    let processed = match batch_no {
        Some(b) => {
            let chunk = batch::batch(&files, batch_index(b)?, size);
            organizer.process_files(chunk).await?
        }
        None => organizer.process_in_batches(&files, size).await?,
    };
    let records: Vec<FileRecord> = processed.into_iter().map(|(_, r)| r).collect();
    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
    } else {
        for r in &records {
            println!("{} -> {} [{}]", r.original_name, r.proposed_name, r.document_type);
        }
    }
    Ok(())
}

fn print_analysis(analysis: &Analysis, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(analysis)?);
        return Ok(());
    }
    println!("{}", analysis.path.display());
    if !analysis.readable {
        println!("  (document could not be read)");
    }
    println!("  pages: {}", analysis.page_count);
    for s in &analysis.scores {
        println!("  {:<16} {:>5.1}", s.doc_type.as_str(), s.confidence);
    }
    for (label, candidates) in [
        ("title", &analysis.title_candidates),
        ("author", &analysis.author_candidates),
    ] {
        for c in candidates {
            println!("  {label} {:>5.1} {:<22} {}", c.confidence, c.method, c.value);
        }
    }
    println!("  proposed: {}", analysis.proposed_name);
    Ok(())
}

fn print_views(views: &[apply::ActionView], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(views)?);
        return Ok(());
    }
    for v in views {
        match (&v.target, &v.error) {
            (_, Some(err)) => println!("{} {}: {} ({})", v.kind, v.status, v.path, err),
            (Some(target), None) => println!("{} {}: {} -> {}", v.kind, v.status, v.path, target),
            (None, None) => println!("{} {}: {}", v.kind, v.status, v.path),
        }
    }
    Ok(())
}
