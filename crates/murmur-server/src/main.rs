mod compaction;
mod config;

use std::sync::Arc;

use tracing::{info, warn};

use murmur_api::mailer::{BrevoMailer, LogMailer, Mailer};
use murmur_api::session::SessionConfig;
use murmur_api::state::{AppState, AppStateInner};
use murmur_db::Database;
use murmur_gateway::dispatcher::Dispatcher;

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "murmur=debug,murmur_api=debug,murmur_db=debug,murmur_gateway=debug,tower_http=debug".into()
            }),
        )
        .init();

    let config = Config::from_env()?;
    let addr = config.addr()?;

    let db = Database::open(&config.db_path)?;
    info!("Database ready at {}", config.db_path.display());

    let mailer: Arc<dyn Mailer> = match config.brevo.clone() {
        Some(brevo) => {
            info!("Sending verification mail through Brevo as {}", brevo.sender_email);
            Arc::new(BrevoMailer::new(brevo))
        }
        None => {
            warn!("Brevo is not configured, verification codes will only be logged");
            Arc::new(LogMailer)
        }
    };

    let dispatcher = Dispatcher::new(config.fanout_scope);
    let state: AppState = Arc::new(AppStateInner {
        db,
        dispatcher: dispatcher.clone(),
        mailer,
        session: SessionConfig::new(config.session_secret.clone(), config.secure_cookies),
    });

    if let Some(interval_secs) = config.compaction_interval_secs {
        info!("Compacting fully deleted messages every {}s", interval_secs);
        tokio::spawn(compaction::run_compaction_loop(state.clone(), interval_secs));
    }

    let app = murmur_api::router(state);

    info!("Murmur listening on {} (fan-out: {:?})", addr, dispatcher.scope());
    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Closes every open gateway socket.
            dispatcher.shutdown().await;
        })
        .await?;

    info!("Murmur stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();
    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("Received Ctrl+C, shutting down..."),
                    _ = sigterm.recv() => info!("Received SIGTERM, shutting down..."),
                }
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                ctrl_c.await.ok();
                info!("Received Ctrl+C, shutting down...");
            }
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        info!("Received Ctrl+C, shutting down...");
    }
}
