use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::sync::Arc;
use tokio::sync::watch;

use notegate::approval::{ApprovalSurface, LocalApprovalSurface};
use notegate::config::NotegateConfig;
use notegate::generation::DraftGenerator;
use notegate::item::ItemState;
use notegate::orchestrator::Orchestrator;
use notegate::providers::{CommandGenerator, CommandPublisher, Unconfigured};
use notegate::publish::Publisher;
use notegate::store::{ItemFilter, JsonFileBackend, QueueStore};
use notegate::telemetry::init_telemetry;

#[derive(Parser)]
#[command(name = "notegate")]
#[command(about = "Content lifecycle orchestrator: AI drafts through human approval to publication")]
#[command(long_about = "notegate generates social content drafts on a schedule, mirrors them to an \
                       approval surface for human review, and dispatches approved items to a \
                       publishing agent. Run 'notegate status' for a queue overview.")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the orchestrator loops (scheduler, reconciler, dispatcher) until interrupted
    Run,
    /// Display queue counts by state
    Status,
    /// List queued items
    Queue {
        /// Filter by state (pending_review, approved, rejected, publishing, published, publish_failed)
        #[arg(long)]
        state: Option<ItemState>,
        /// Filter by keyword or tag
        #[arg(long)]
        keyword: Option<String>,
    },
    /// Approve an item manually
    Approve { id: String },
    /// Reject an item manually
    Reject { id: String },
    /// Trigger an immediate generation run
    Generate,
    /// Run one reconciliation cycle against the approval surface
    Reconcile,
    /// Run one publish dispatch sweep
    Publish,
    /// Set the status field on a local approval-surface record (reviewer action)
    Review {
        external_ref: String,
        /// approved, rejected, or pending
        status: String,
    },
    /// Write a default notegate.toml in the working directory
    Init {
        /// Overwrite an existing notegate.toml
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    NotegateConfig::load_env_file()?;
    let config = NotegateConfig::load()?;
    init_telemetry(&config.observability)?;

    if let Commands::Init { force } = &cli.command {
        if std::path::Path::new("notegate.toml").exists() && !force {
            anyhow::bail!("notegate.toml already exists (use --force to overwrite)");
        }
        config.save_to_file("notegate.toml")?;
        println!("Wrote notegate.toml");
        return Ok(());
    }

    // The store is the only fatal dependency: without it nothing can run.
    let backend = Arc::new(JsonFileBackend::new(config.queue_path()));
    let store = Arc::new(
        QueueStore::open(backend)
            .await
            .context("failed to open queue store")?,
    );

    let surface: Arc<LocalApprovalSurface> = Arc::new(
        LocalApprovalSurface::open(config.approval_path())
            .await
            .context("failed to open approval surface")?,
    );

    let generator: Arc<dyn DraftGenerator> = match &config.generation.command {
        Some(command) => Arc::new(CommandGenerator::new(command.clone())),
        None => Arc::new(Unconfigured("generation.command")),
    };
    let publisher: Arc<dyn Publisher> = match &config.publish.command {
        Some(command) => Arc::new(CommandPublisher::new(command.clone())),
        None => Arc::new(Unconfigured("publish.command")),
    };

    let orchestrator = Arc::new(Orchestrator::new(
        &config,
        store,
        generator,
        surface.clone() as Arc<dyn ApprovalSurface>,
        publisher,
    ));

    match cli.command {
        Commands::Run => {
            let (shutdown_tx, shutdown_rx) = watch::channel(false);
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("shutdown signal received");
                    let _ = shutdown_tx.send(true);
                }
            });
            orchestrator.run(shutdown_rx).await?;
        }
        Commands::Status => {
            let summary = orchestrator.status().await;
            println!("Queue: {} items", summary.total());
            println!("  pending_review: {}", summary.pending_review);
            println!("  approved:       {}", summary.approved);
            println!("  publishing:     {}", summary.publishing);
            println!("  published:      {}", summary.published);
            println!("  publish_failed: {}", summary.publish_failed);
            println!("  rejected:       {}", summary.rejected);
        }
        Commands::Queue { state, keyword } => {
            let mut filter = ItemFilter::all();
            if let Some(state) = state {
                filter = filter.with_state(state);
            }
            if let Some(keyword) = keyword {
                filter = filter.with_keyword(keyword);
            }
            for item in orchestrator.list_items(&filter).await {
                println!(
                    "{}  {:<15} {}  {}",
                    item.id,
                    item.state.as_str(),
                    item.created_at.format("%Y-%m-%d %H:%M"),
                    item.title
                );
            }
        }
        Commands::Approve { id } => {
            let item = orchestrator.approve(&id).await?;
            println!("Approved {} ({})", item.id, item.title);
        }
        Commands::Reject { id } => {
            let item = orchestrator.reject(&id).await?;
            println!("Rejected {} ({})", item.id, item.title);
        }
        Commands::Generate => {
            let run = orchestrator.generate_now().await?;
            println!("Created {} item(s) pending review", run.created.len());
            for failure in &run.failures {
                eprintln!("  failed: {failure}");
            }
        }
        Commands::Reconcile => {
            let report = orchestrator.reconcile_now().await;
            println!(
                "Reconciled: {} pushed, {} approved, {} rejected",
                report.pushed.len(),
                report.approved.len(),
                report.rejected.len()
            );
            for (id, status) in &report.anomalies {
                eprintln!("  anomaly: {id} has unrecognized status '{status}'");
            }
            for (id, error) in &report.failures {
                eprintln!("  failed: {id}: {error}");
            }
        }
        Commands::Publish => {
            let report = orchestrator.dispatch_now().await;
            println!(
                "Dispatched: {} published, {} failed, {} parked past retry bound",
                report.published.len(),
                report.failed.len(),
                report.retry_exhausted.len()
            );
            for (id, error) in &report.failed {
                eprintln!("  failed: {id}: {error}");
            }
        }
        Commands::Review {
            external_ref,
            status,
        } => {
            surface.set_status(&external_ref, &status).await?;
            println!("Set {external_ref} to '{status}'");
        }
        Commands::Init { .. } => unreachable!("handled above"),
    }

    Ok(())
}
