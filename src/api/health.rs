use axum::{extract::State, http::StatusCode, Json};
use serde::{Deserialize, Serialize};

use crate::config::Config;
use crate::payments::payment::Currency;

#[derive(Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub environment: String,
    pub gateway_configured: bool,
    pub supported_currencies: Vec<String>,
}

pub async fn health_check(
    State(config): State<Config>,
) -> Result<Json<HealthResponse>, StatusCode> {
    let version = env!("CARGO_PKG_VERSION").to_string();

    let gateway_configured =
        !config.gateway.secret_key.is_empty() && !config.gateway.base_url.is_empty();

    let response = HealthResponse {
        status: "healthy".to_string(),
        version,
        environment: config.server.environment.clone(),
        gateway_configured,
        supported_currencies: Currency::ALL
            .iter()
            .map(|c| c.as_str().to_string())
            .collect(),
    };

    Ok(Json(response))
}
