use axum::{Json, response::IntoResponse};
use chrono::{Local, SecondsFormat};
use serde::Serialize;
use utoipa::ToSchema;

#[derive(Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    /// RFC 3339 timestamp, local time
    pub time: String,
    pub version: String,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service is up", body = HealthResponse)
    ),
    tag = "system"
)]
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        time: Local::now().to_rfc3339_opts(SecondsFormat::Secs, false),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
