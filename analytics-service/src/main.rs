use analytics_service::{
    api::{self, AppState},
    config::AppConfig,
    efficiency::EfficiencyCalculator,
    metrics_server, observability,
};
use anyhow::Result;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;

#[tokio::main]
async fn main() -> Result<()> {
    observability::init_tracing();

    // Load configuration
    let cfg = AppConfig::load()?;

    // Start metrics server if configured
    if let Some(metrics_cfg) = &cfg.metrics {
        metrics_server::init(&metrics_cfg.bind_addr);
    }

    let pool = PgPoolOptions::new()
        .max_connections(cfg.database.max_connections)
        .connect(&cfg.database.uri)
        .await?;

    // The panel area is validated once at startup; every efficiency request
    // served by the API shares it.
    let calculator = EfficiencyCalculator::new(cfg.panel_data.panel_area_m2)?;

    let state = AppState { pool, calculator };
    let app = api::router(state);

    let addr: SocketAddr = cfg
        .api
        .bind_addr
        .parse()
        .map_err(|e| anyhow::anyhow!("invalid api.bind_addr: {e}"))?;

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "serving dataset API");
    axum::serve(listener, app.into_make_service()).await?;

    Ok(())
}
