use actix_web::http::Method;
use actix_web::{App, HttpServer, middleware, web};
use tracing::info;

use crate::advisor_session::AdvisorSession;
use crate::api::api_handlers::{
    handle_analyze, handle_client_system, handle_predicted, handle_preflight, handle_status, handle_system,
};
use crate::errors::AdvisorError;
use crate::system_monitoring::SystemMonitor;
use crate::utils::Config;

/// JSON extraction failures answer with the same error body as validation failures.
pub fn json_config() -> web::JsonConfig {
    web::JsonConfig::default().error_handler(|err, _req| AdvisorError::InvalidPayload(err.to_string()).into())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .route("/analyze", web::post().to(handle_analyze))
        .route("/predicted", web::get().to(handle_predicted))
        .route("/client-system", web::get().to(handle_client_system))
        .route("/status", web::get().to(handle_status))
        .route("/system", web::get().to(handle_system))
        .route("/{tail:.*}", web::method(Method::OPTIONS).to(handle_preflight));
}

// Dashboards poll from other origins
fn cors_headers() -> middleware::DefaultHeaders {
    middleware::DefaultHeaders::new()
        .add(("Access-Control-Allow-Origin", "*"))
        .add(("Access-Control-Allow-Methods", "GET, POST, OPTIONS"))
        .add(("Access-Control-Allow-Headers", "Content-Type"))
}

pub async fn run_server(
    config: &Config,
    session: web::Data<AdvisorSession>,
    monitor: web::Data<SystemMonitor>,
) -> std::io::Result<()> {
    info!("Server listening on {}:{}", config.host, config.port);
    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .wrap(cors_headers())
            .app_data(session.clone())
            .app_data(monitor.clone())
            .configure(configure_routes)
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await
}
