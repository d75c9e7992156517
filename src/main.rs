use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use navsync::audit::{self, AuditMode};
use navsync::cli::{Cli, Commands};
use navsync::config::Config;
use navsync::decide::{Decider, Policy, Prompt};
use navsync::sync::{Engine, ScreenOp, SyncService};
use navsync::{detect, journal, serve, watch};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let root = detect::find_project_root(cli.root).await?;
    let config = Config::load(&root).await?;

    let interactive = !cli.yes && Prompt::available();
    let decider: Arc<dyn Decider> = if interactive {
        Arc::new(Prompt::new())
    } else {
        Arc::new(Policy::accept_defaults())
    };

    match cli.command.unwrap_or(Commands::Watch) {
        Commands::Watch => {
            let layout = config.layout_path();
            let debounce = Duration::from_millis(config.debounce_ms);
            let mut engine = Engine::open(config, decider).await;
            match engine.start().await {
                Ok(()) => {
                    let mode = if interactive {
                        AuditMode::Interactive
                    } else {
                        AuditMode::Report
                    };
                    match engine.audit(mode).await {
                        Ok(report) => audit::print_report(&report, engine.project()),
                        Err(e) => warn!("startup audit failed: {e:#}"),
                    }
                }
                Err(e) => warn!("{e:#}"),
            }
            let service = Arc::new(SyncService::new(engine));
            watch::run(service, layout, debounce).await?;
        }
        Commands::Add {
            names,
            parent,
            dry_run,
        } => {
            let mut engine = Engine::open(config, decider).await;
            engine.start().await?;
            engine
                .run_command(ScreenOp::Add, &names, parent.as_deref(), dry_run)
                .await?;
        }
        Commands::Delete {
            names,
            parent,
            dry_run,
        } => {
            let mut engine = Engine::open(config, decider).await;
            engine.start().await?;
            engine
                .run_command(ScreenOp::Delete, &names, parent.as_deref(), dry_run)
                .await?;
        }
        Commands::InitialRoute {
            navigator,
            route,
            dry_run,
        } => {
            let mut engine = Engine::open(config, decider).await;
            engine.set_initial_route(&navigator, &route, dry_run).await?;
        }
        Commands::Audit { fix } => {
            let mode = if fix {
                AuditMode::ApplyAll
            } else if interactive {
                AuditMode::Interactive
            } else {
                AuditMode::Report
            };
            let mut engine = Engine::open(config, decider).await;
            let report = engine.audit(mode).await?;
            audit::print_report(&report, engine.project());
        }
        Commands::Journal { limit } => {
            journal::print_recent(&config.state_dir(), limit).await?;
        }
        Commands::Serve { port } => {
            let host = config.server.host.clone();
            let port = port.unwrap_or(config.server.port);
            let decider: Arc<dyn Decider> = Arc::new(Policy::accept_defaults());
            let mut engine = Engine::open(config, decider).await;
            if let Err(e) = engine.start().await {
                warn!("{e:#}");
            }
            let service = Arc::new(SyncService::new(engine));
            serve::serve(service, &host, port).await?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_env("NAVSYNC_LOG").unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
