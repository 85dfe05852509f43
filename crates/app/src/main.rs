use std::{net::SocketAddr, sync::Arc};

use clap::Parser;
use engine::{EventBus, LedgerEvent};
use migration::{Migrator, MigratorTrait};
use tokio::sync::broadcast::{self, error::RecvError};

mod settings;

#[derive(Parser, Debug)]
#[command(name = "ledger")]
#[command(about = "Target & fund ledger service")]
struct Cli {
    /// Settings file, without extension (also read from `LEDGER_CONFIG`).
    #[arg(long, env = "LEDGER_CONFIG", default_value = "settings")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let cli = Cli::parse();
    let settings = settings::Settings::new(&cli.config)?;

    tracing_subscriber::fmt()
        .with_env_filter(format!(
            "ledger={level},server={level},engine={level}",
            level = settings.app.level
        ))
        .init();

    let db = sea_orm::Database::connect(settings.database.url()).await?;
    Migrator::up(&db, None).await?;

    let bus = EventBus::new(settings.engine.event_capacity);
    tokio::spawn(log_events(bus.subscribe()));

    let mut builder = engine::Engine::builder()
        .database(db)
        .publisher(Arc::new(bus))
        .max_retries(settings.engine.max_retries);
    if let Some(timeout) = settings.engine.tx_timeout() {
        builder = builder.tx_timeout(timeout);
    }
    let engine = builder.build().await?;

    let addr: SocketAddr = format!("{}:{}", settings.server.bind, settings.server.port).parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    server::run_with_listener(engine, listener).await?;

    Ok(())
}

/// Stand-in subscriber until a broadcast layer is attached: logs every
/// committed ledger event.
async fn log_events(mut rx: broadcast::Receiver<LedgerEvent>) {
    loop {
        match rx.recv().await {
            Ok(event) => tracing::info!(event = event.name(), "ledger event"),
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log lagging behind");
            }
            Err(RecvError::Closed) => return,
        }
    }
}
