use actix_web::{HttpResponse, web};
use serde_json::Value;

use crate::advisor_session::AdvisorSession;
use crate::api::api_objects::{AnalyzeResponse, ServiceStatusResponse, WarmingUpResponse};
use crate::errors::AdvisorError;
use crate::system_monitoring::SystemMonitor;

pub async fn handle_analyze(
    payload: web::Json<Value>,
    session: web::Data<AdvisorSession>,
) -> Result<HttpResponse, AdvisorError> {
    // Reads one agent sample, buffers it and refreshes the prediction once the window is full
    let receipt = session.submit_sample(&payload).await?;
    Ok(HttpResponse::Ok().json(AnalyzeResponse::received(receipt.buffer_size)))
}

pub async fn handle_predicted(session: web::Data<AdvisorSession>) -> Result<HttpResponse, AdvisorError> {
    match session.last_prediction().await? {
        Some(prediction) => Ok(HttpResponse::Ok().json(prediction)),
        None => Ok(HttpResponse::Ok().json(WarmingUpResponse::new(Some(
            "Collecting sufficient data for prediction",
        )))),
    }
}

pub async fn handle_client_system(session: web::Data<AdvisorSession>) -> HttpResponse {
    match session.last_sample().await {
        Some(sample) => HttpResponse::Ok().json(sample),
        None => HttpResponse::Ok().json(WarmingUpResponse::new(None)),
    }
}

pub async fn handle_status(session: web::Data<AdvisorSession>) -> HttpResponse {
    HttpResponse::Ok().json(ServiceStatusResponse::from(session.model()))
}

pub async fn handle_system(monitor: web::Data<SystemMonitor>) -> HttpResponse {
    HttpResponse::Ok().json(monitor.snapshot())
}

pub async fn handle_preflight() -> HttpResponse {
    HttpResponse::NoContent().finish()
}
