use std::sync::atomic::Ordering;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use estuary::app::AppContext;
use estuary::cli::{commands, Cli, Commands};
use estuary::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::List => {
            let config = Config::load(&cli.config)?;
            commands::list_users(&config);
        }
        Commands::Sync { user } => {
            let ctx = AppContext::new(&cli.config).await?;

            // Ctrl-C lets the in-flight push-then-cache-insert pair finish,
            // then jobs stop between items.
            let shutdown = ctx.orchestrator.shutdown_flag();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    shutdown.store(true, Ordering::SeqCst);
                }
            });

            let any_failed = commands::sync(&ctx, user.as_deref()).await?;
            if any_failed {
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
