//! Liveness endpoint. Reports monitor lifecycle state alongside "ok" so a
//! stuck shutdown is visible from outside.

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::routes::ApiState;
use crate::monitor::MonitorState;

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub monitor: MonitorState,
    pub cycles_completed: u64,
}

pub async fn health(State(state): State<ApiState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        monitor: state.monitor.state(),
        cycles_completed: state.status.cycles_completed(),
    })
}
