use anyhow::{Context, Result};
use callcoach::app::{self, AppState};
use callcoach::config::Config;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("callcoach=info,server=info,tower_http=info")),
        )
        .init();

    let config = Config::from_env()?;
    let state = Arc::new(AppState::from_config(&config).context("Failed to initialize storage")?);
    info!(data_dir = %config.data_dir.display(), uploads = %config.upload_dir.display(), "storage ready");

    let reaper_state = state.clone();
    let reaper_interval = config.reaper_interval;
    tokio::spawn(async move {
        app::reaper_service(reaper_state, reaper_interval).await;
    });

    let listener = tokio::net::TcpListener::bind(&config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", config.bind_addr))?;

    info!("🚀 Call coaching service running on http://{}", listener.local_addr()?);
    info!("   POST   /auth/signup | /auth/login | /auth/logout");
    info!("   GET    /documents        - List your documents");
    info!("   POST   /documents/upload - Upload a file (multipart)");
    info!("   POST   /documents/url    - Save a link");
    info!("   GET    /documents/:id    - Fetch, PATCH/PUT to update, DELETE to remove");
    info!("   GET    /calls, POST /calls, GET /dashboard/analytics");

    axum::serve(listener, app::router(state))
        .await
        .context("Server error")?;

    Ok(())
}
