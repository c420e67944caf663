//! PromptPrint Server
//!
//! Serves the estimation API, the session endpoints and one proxy route per
//! configured model

use anyhow::{Context, Result};
use promptprint::utils::logging::init_logging;
use promptprint::{create_router, version_info, AppConfig, Settings};
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Settings come first; they carry the log level and format
    let settings = Settings::new().context("Failed to load server settings")?;
    init_logging(&settings.logging);
    info!("{}", version_info());

    let catalog = AppConfig::load_default().context("Failed to load model catalog")?;
    info!("📁 Catalog loaded with {} models", catalog.models.len());

    let addr = format!("{}:{}", settings.server.host, settings.server.port);
    let app = create_router(settings, catalog.clone()).await?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    info!("🚀 PromptPrint server started!");
    info!("📝 Health check: http://{}/health", addr);
    info!("🧮 Estimate endpoint: http://{}/api/estimate", addr);
    for model in &catalog.models {
        info!("🔄 {} proxy: http://{}{}", model.id, addr, model.endpoint.route);
    }

    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to start server: {}", e))?;

    Ok(())
}
