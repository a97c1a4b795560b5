mod api;
mod bootstrap;
mod health;

use std::time::Duration;

use anyhow::Result;

use clerky_core::config::{AppConfig, LoadOptions, LogFormat};

fn init_logging(config: &AppConfig) {
    use tracing::Level;

    let level = config.logging.level.parse::<Level>().unwrap_or(Level::INFO);
    let builder = tracing_subscriber::fmt().with_target(false).with_max_level(level);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let router = health::router(app.db_pool.clone())
        .merge(api::router(api::ApiState::new(app.runtime.clone())));

    let address = format!("{}:{}", app.config.server.bind_address, app.config.server.port);
    let listener = tokio::net::TcpListener::bind(&address).await?;
    tracing::info!(
        event_name = "server_started",
        correlation_id = "bootstrap",
        bind_address = %address,
        "clerky-server listening"
    );

    let grace = Duration::from_secs(app.config.server.graceful_shutdown_secs);
    let drain_deadline = async {
        // Same signal the graceful path waits on, without the duplicate log.
        let _ = tokio::signal::ctrl_c().await;
        tokio::time::sleep(grace).await;
    };

    tokio::select! {
        result = axum::serve(listener, router).with_graceful_shutdown(wait_for_shutdown()) => {
            result?;
            tracing::info!(
                event_name = "server_stopped",
                correlation_id = "shutdown",
                "all connections drained, shutting down"
            );
        }
        _ = drain_deadline => {
            tracing::warn!(
                event_name = "server_drain_timeout",
                correlation_id = "shutdown",
                grace_secs = grace.as_secs(),
                "graceful shutdown window elapsed, exiting with connections open"
            );
        }
    }

    Ok(())
}

async fn wait_for_shutdown() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(
            event_name = "shutdown_signal_error",
            correlation_id = "shutdown",
            error = %error,
            "failed to listen for the shutdown signal"
        );
        return;
    }
    tracing::info!(
        event_name = "server_stopping",
        correlation_id = "shutdown",
        "shutdown signal received, draining connections"
    );
}
