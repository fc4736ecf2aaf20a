use actix_web::web;
use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use power_advisor::activity_prediction::activity_model::load_model;
use power_advisor::activity_prediction::min_max_scaler::MinMaxScaler;
use power_advisor::advisor_session::AdvisorSession;
use power_advisor::server::run_server;
use power_advisor::system_monitoring::SystemMonitor;
use power_advisor::utils::load_config;

#[actix_web::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let config = load_config()?;
    let scaler = MinMaxScaler::new(&config.bounds).context("invalid normalization bounds")?;

    // A failed model load is reported on /status, the server still starts
    let model = load_model(&config.model, &scaler);
    info!(
        "Server started (window size {}, model loaded: {})",
        config.window_size,
        model.is_loaded()
    );

    let session = web::Data::new(AdvisorSession::new(config.window_size, scaler, model));
    let monitor = web::Data::new(SystemMonitor::new());
    run_server(&config, session, monitor).await.context("HTTP server failed")
}
