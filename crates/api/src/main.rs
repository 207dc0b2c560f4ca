use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use cruisemall_api::background::{backup_scheduler, message_dispatch, passport_expiry};
use cruisemall_api::config::{BackupConfig, DispatchConfig, ServerConfig};
use cruisemall_api::router::build_app_router;
use cruisemall_api::state::AppState;
use cruisemall_backup::{BackupSink, HttpSink, LocalDirSink};
use cruisemall_events::{EventBus, EventPersistence, OutboundDispatcher};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cruisemall_api=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let dispatch_config = DispatchConfig::from_env();
    let backup_config = BackupConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = cruisemall_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    cruisemall_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    cruisemall_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Event bus ---
    let event_bus = Arc::new(EventBus::default());
    let persistence_handle = tokio::spawn(EventPersistence::run(pool.clone(), event_bus.subscribe()));

    // --- Outbound delivery and backups ---
    let dispatcher = Arc::new(OutboundDispatcher::from_env());
    let backup_sink: Arc<dyn BackupSink> = match &backup_config.upload_url {
        Some(url) => {
            tracing::info!(url = %url, "Backups upload over HTTP");
            Arc::new(HttpSink::new(url.clone(), backup_config.upload_token.clone()))
        }
        None => {
            tracing::info!(dir = %backup_config.dir, "Backups write to local directory");
            Arc::new(LocalDirSink::new(backup_config.dir.clone()))
        }
    };

    // --- Background jobs ---
    let cancel = CancellationToken::new();
    let mut job_handles = Vec::new();

    if dispatch_config.enabled {
        job_handles.push(tokio::spawn(message_dispatch::run(
            pool.clone(),
            Arc::clone(&dispatcher),
            dispatch_config.clone(),
            config.public_base_url.clone(),
            cancel.clone(),
        )));
    } else {
        tracing::info!("Message dispatch disabled");
    }

    if backup_config.enabled {
        job_handles.push(tokio::spawn(backup_scheduler::run(
            pool.clone(),
            Arc::clone(&backup_sink),
            Arc::clone(&event_bus),
            backup_config.clone(),
            cancel.clone(),
        )));
    } else {
        tracing::info!("Scheduled backups disabled");
    }

    job_handles.push(tokio::spawn(passport_expiry::run(pool.clone(), cancel.clone())));

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::clone(&event_bus),
        dispatcher,
        backup_sink,
    };
    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");
    let grace = Duration::from_secs(config.shutdown_timeout_secs);

    cancel.cancel();
    for handle in job_handles {
        if tokio::time::timeout(grace, handle).await.is_err() {
            tracing::warn!("Background job did not stop within the shutdown timeout");
        }
    }
    tracing::info!("Background jobs stopped");

    // Dropping the last sender closes the channel and ends persistence.
    drop(event_bus);
    let _ = tokio::time::timeout(grace, persistence_handle).await;
    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT (Ctrl-C) or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
