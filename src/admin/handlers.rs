use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::resilience::circuit_breaker::CircuitSnapshot;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub services: usize,
}

#[derive(Debug, Serialize)]
pub struct BreakerStatus {
    #[serde(flatten)]
    pub circuit: CircuitSnapshot,
    pub in_flight: usize,
    pub max_concurrent_calls: usize,
}

#[derive(Debug, Serialize)]
pub struct RateLimitSummary {
    pub enabled: bool,
    pub capacity: u32,
    pub window_secs: u64,
    pub tracked_keys: usize,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        services: state.pipeline.invokers().len(),
    })
}

pub async fn get_breakers(State(state): State<AppState>) -> Json<Vec<BreakerStatus>> {
    let statuses = state
        .pipeline
        .invokers()
        .all()
        .iter()
        .map(|invoker| BreakerStatus {
            circuit: invoker.breaker().snapshot(),
            in_flight: invoker.bulkhead().in_flight(),
            max_concurrent_calls: invoker.bulkhead().max_concurrent_calls(),
        })
        .collect();

    Json(statuses)
}

pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(service): Path<String>,
) -> Result<Json<CircuitSnapshot>, (StatusCode, Json<serde_json::Value>)> {
    let Some(invoker) = state.pipeline.invokers().get(&service) else {
        return Err((
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": format!("unknown service `{}`", service) })),
        ));
    };

    invoker.breaker().reset();
    tracing::info!(service = %invoker.name(), "Circuit breaker reset via admin API");
    Ok(Json(invoker.breaker().snapshot()))
}

pub async fn get_rate_limits(State(state): State<AppState>) -> Json<RateLimitSummary> {
    let admission = state.pipeline.admission();
    Json(RateLimitSummary {
        enabled: admission.enabled(),
        capacity: admission.capacity(),
        window_secs: admission.window().as_secs(),
        tracked_keys: admission.limiter().len(),
    })
}
