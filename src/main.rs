use clap::Parser;
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::path::PathBuf;
use tmp_relay::config::RelayConfig;
use tmp_relay::infrastructure::storage;
use tmp_relay::services::retention::RetentionSweeper;
use tmp_relay::{AppState, create_app};
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port for the HTTP server (overrides PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Directory uploaded files are stored in (overrides STORAGE_DIR)
    #[arg(short, long)]
    storage_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();
    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tmp_relay=info,retention=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("🚀 Starting tmp-relay...");

    let mut config = RelayConfig::from_env();
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(dir) = args.storage_dir {
        config.storage_dir = dir;
    }
    info!(
        "🛡️  Relay Config: Max Size={}MB, Retention={}min, Sweep Interval={}min",
        config.max_upload_size / 1024 / 1024,
        config.retention.as_secs() / 60,
        config.sweep_interval.as_secs() / 60
    );

    let storage_service = storage::setup_storage(&config).await?;
    let state = AppState::new(storage_service.clone(), config.clone());

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let sweeper = RetentionSweeper::new(
        storage_service.root(),
        config.retention,
        config.sweep_interval,
        shutdown_rx,
    );
    let sweeper_handle = tokio::spawn(async move {
        sweeper.run().await;
    });

    let app = create_app(state);

    let addr = SocketAddr::new(config.host, config.port);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("✅ Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            let _ = shutdown_tx.send(true);
        })
        .await?;

    if let Err(e) = sweeper_handle.await {
        error!("❌ Retention sweeper ended abnormally: {}", e);
    }

    info!("🛑 Server shut down gracefully.");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("⌨️  Ctrl+C received, starting graceful shutdown...");
        },
        _ = terminate => {
            info!("💤 SIGTERM received, starting graceful shutdown...");
        },
    }
}
