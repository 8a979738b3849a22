use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Parser, Subcommand};
use color_eyre::eyre::{eyre, Result, WrapErr};
use indicatif::{ProgressBar, ProgressStyle};
use repograph_core::{
    AnalysisJob, AnalysisManager, Config, DocType, DocumentStore, FileDocumentStore, JobState, LocalProvider,
    MemoryDocumentStore, MemoryGraphStore, Repository,
};
use serde::Serialize;
use tokio_stream::StreamExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "repograph")]
#[command(about = "Analyze a repository into a knowledge graph and generated documentation", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze a local checkout and write its documents
    Analyze {
        /// Path to the repository
        path: PathBuf,
        /// Repository name (defaults to the directory name)
        #[arg(long)]
        name: Option<String>,
        /// Branch to record
        #[arg(long)]
        branch: Option<String>,
        /// Output directory for documents (defaults to the configured data dir)
        #[arg(long)]
        out: Option<PathBuf>,
        /// Print the analysis report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Analyze, then print the graph snapshot as JSON
    Graph {
        path: PathBuf,
        /// Maximum number of nodes
        #[arg(long)]
        limit: Option<usize>,
    },
    /// Analyze, then print the neighbors of a node as JSON
    Neighbors {
        path: PathBuf,
        /// Node id, e.g. `function:demo:app.py:main`
        node_id: String,
    },
    /// Print the effective configuration
    Config,
}

/// Machine-readable result of `analyze --json`.
#[derive(Serialize)]
struct AnalyzeReport {
    repository: Repository,
    job: AnalysisJob,
    documents: Vec<DocumentSummary>,
}

#[derive(Serialize)]
struct DocumentSummary {
    doc_type: DocType,
    title: String,
    confidence: u8,
    version: u32,
    path: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| "repograph=info,repograph_core=info".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::load().wrap_err("failed to load configuration")?;

    match cli.command {
        Commands::Analyze {
            path,
            name,
            branch,
            out,
            json,
        } => {
            let out = out.unwrap_or_else(|| config.storage.data_path());
            let documents: Arc<dyn DocumentStore> = Arc::new(FileDocumentStore::new(&out));
            let (manager, repository, job) =
                analyze(&config, documents, &path, name.as_deref(), branch.as_deref(), !json).await?;

            let dir = out.join(repository.id.as_str());
            let documents: Vec<DocumentSummary> = manager
                .documents(&repository.id)
                .await?
                .into_iter()
                .map(|d| DocumentSummary {
                    doc_type: d.doc_type,
                    path: dir.join(format!("{}.md", d.doc_type)),
                    title: d.title,
                    confidence: d.confidence,
                    version: d.version,
                })
                .collect();

            if json {
                let report = AnalyzeReport {
                    repository,
                    job,
                    documents,
                };
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_outcome(&repository, &job);
                println!("Documents:");
                for document in &documents {
                    println!(
                        "  {:<28} confidence {:>3}  v{}  {}",
                        document.title,
                        document.confidence,
                        document.version,
                        document.path.display()
                    );
                }
            }
        }
        Commands::Graph { path, limit } => {
            let documents: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
            let (manager, repository, _job) = analyze(&config, documents, &path, None, None, false).await?;

            let mut snapshot = manager.snapshot(&repository.id).await?;
            if let Some(limit) = limit {
                snapshot = snapshot.limited(limit);
            }
            println!("{}", serde_json::to_string_pretty(&snapshot.to_wire())?);
        }
        Commands::Neighbors { path, node_id } => {
            let documents: Arc<dyn DocumentStore> = Arc::new(MemoryDocumentStore::new());
            let (manager, _repository, _job) = analyze(&config, documents, &path, None, None, false).await?;

            let neighborhood = manager.neighbors(&node_id).await?;
            println!("{}", serde_json::to_string_pretty(&neighborhood.to_wire())?);
        }
        Commands::Config => {
            print!("{}", config.to_toml_string());
        }
    }

    Ok(())
}

/// Register `path` and run one analysis to completion.
async fn analyze(
    config: &Config,
    documents: Arc<dyn DocumentStore>,
    path: &Path,
    name: Option<&str>,
    branch: Option<&str>,
    show_progress: bool,
) -> Result<(AnalysisManager, Repository, AnalysisJob)> {
    let path = path
        .canonicalize()
        .wrap_err_with(|| format!("cannot access {}", path.display()))?;
    let name = match name {
        Some(name) => name.to_string(),
        None => path
            .file_name()
            .and_then(|n| n.to_str())
            .map(str::to_string)
            .ok_or_else(|| eyre!("cannot derive a repository name from {}", path.display()))?,
    };

    debug!(path = %path.display(), name = %name, "registering checkout");
    let provider = Arc::new(LocalProvider::from_config(&config.analysis));
    let manager = AnalysisManager::with_stores(config, provider, Arc::new(MemoryGraphStore::new()), documents);

    let location = path.to_string_lossy();
    let repository = manager.register_repository(&name, &location, branch)?;
    let job_id = manager.start_analysis(&repository.id).await?;

    let pb = if show_progress {
        let pb = ProgressBar::new(100);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.cyan} [{bar:40.cyan/blue}] {pos:>3}% {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("=> "),
        );
        pb
    } else {
        ProgressBar::hidden()
    };

    let mut updates = manager.subscribe(&job_id)?;
    while let Some(status) = updates.next().await {
        pb.set_position(status.progress as u64);
        pb.set_message(status.state.to_string());
    }
    pb.finish_and_clear();

    let job = manager.wait(&job_id).await?;
    if job.state == JobState::Failed {
        let cause = job
            .error
            .as_ref()
            .map(|e| e.to_string())
            .unwrap_or_else(|| "unknown error".to_string());
        return Err(eyre!("analysis of {} failed: {}", repository.name, cause));
    }

    let repository = manager.repository(&repository.id)?;
    Ok((manager, repository, job))
}

fn print_outcome(repository: &Repository, job: &AnalysisJob) {
    println!("Analyzed {} ({})", repository.name, repository.id);
    println!("  Job:       {}", job.id);
    if let Some(language) = repository.language {
        println!("  Language:  {}", language);
    }
    if let Some(at) = repository.last_analyzed {
        println!("  Analyzed:  {}", at.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M:%S"));
    }

    let Some(outcome) = &job.outcome else {
        return;
    };
    println!("  Modules:   {}", outcome.modules);
    println!("  Classes:   {}", outcome.classes);
    println!("  Functions: {}", outcome.functions);
    println!("  APIs:      {}", outcome.apis);
    println!("  Features:  {}", outcome.features);
    println!("  Calls:     {}", outcome.calls);
    println!("  Parsed:    {} files", outcome.parsed_files);
    if outcome.unsupported_files > 0 {
        println!("  Ignored:   {} files without a parser", outcome.unsupported_files);
    }
    if !outcome.skipped_files.is_empty() {
        println!("  Skipped:   {} files", outcome.skipped_files.len());
        for skipped in &outcome.skipped_files {
            println!("    {} ({})", skipped.path, skipped.reason);
        }
    }
}
