use std::time::Duration;

use anyhow::Context;
use pocket_pilot_backend::config::Settings;
use pocket_pilot_backend::{create_router, initialize_backend, spawn_due_check};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let (settings, config_path) = Settings::load().context("Failed to load configuration")?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&settings.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    info!("Loaded configuration (file: {})", config_path.display());

    let app_state = initialize_backend(&settings).await?;

    spawn_due_check(
        app_state.reminder_service.clone(),
        Duration::from_secs(settings.notifications.due_check_interval_secs),
    );

    let app = create_router(app_state, &settings.server.allowed_origin);

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
