use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::sync::watch;

use mirrorgate_backend::logging::init_tracing;
use mirrorgate_backend::{
    build_router, AppState, ClerkClient, Config, JwksClient, Reconciler, UserStore,
};

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("Shutdown signal received");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load configuration
    let config = Config::load()?;

    init_tracing(&config.logging);
    tracing::info!("Starting mirrorgate");

    // Initialize components
    let store = Arc::new(UserStore::new(&config.database.url, config.database.max_connections)?);
    let sessions = Arc::new(
        JwksClient::new(&config.clerk.issuer, config.clerk.authorized_parties.clone()).await?,
    );
    let identity = Arc::new(ClerkClient::new(&config.clerk.api_url, &config.clerk.secret_key));

    if config.clerk.webhook_secret.is_none() {
        tracing::warn!("clerk.webhook_secret is not set, webhook deliveries will be rejected");
    }

    let state = Arc::new(AppState::new(config.clone(), sessions, identity, store.clone())?);

    // Background reconciliation
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let reconciler = Reconciler::new(store.clone(), &config.reconcile, &config.webhook);
    let reconcile_task = tokio::spawn(async move { reconciler.run(shutdown_rx).await });

    let app = build_router(state);

    // Start server
    let addr = format!("{}:{}", config.host, config.port);
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(&addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    let _ = shutdown_tx.send(true);
    if let Err(e) = reconcile_task.await {
        tracing::error!("Reconciler task failed: {}", e);
    }
    drop(store);

    tracing::info!("Shutdown complete");
    Ok(())
}
