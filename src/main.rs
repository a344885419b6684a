use std::net::SocketAddr;
use std::time::Duration;

use tokio::signal;
use tracing_subscriber::EnvFilter;

use estop_records::config::Config;
use estop_records::credentials::CredentialStore;
use estop_records::db;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    let config = Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(&config.log_level)
        }))
        .init();

    tracing::info!("Starting E-Stop function record system");

    let pool = db::connect(&config.database).await?;
    db::migrate(&pool).await?;
    tracing::info!("Migrations applied");

    if config.seed_sample_data {
        match db::seed::insert_sample_data(&pool).await {
            Ok(inserted) => tracing::info!("Sample data ready ({inserted} devices added)"),
            Err(e) => tracing::error!("Error inserting sample data: {e}"),
        }
    }

    let users = CredentialStore::load(config.users_file.clone()).await;

    let addr = SocketAddr::new(config.host, config.port);
    let (app, state) = estop_records::build_app(pool, config, users);

    // Sweep expired lockout windows.
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(5 * 60));
        loop {
            interval.tick().await;
            state.login_limiter.cleanup();
            tracing::debug!(tracked = state.login_limiter.len(), "Login limiter swept");
        }
    });

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!("failed to install signal handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
