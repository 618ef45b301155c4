//! `/health` and `/status` handlers (§10.5).

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;
use axum::routing::get;
use axum::Router;
use serde::Serialize;

use crate::lifecycle::{LifecycleController, LifecycleSnapshot};
use crate::model::BotConfig;
use crate::trigger::{MatchRoundRecord, MatchStatus};

/// The running pieces of one configured bot that the status endpoint reports
/// on. Constructed once at startup by `main` and shared read-only.
#[derive(Clone)]
pub struct BotHandle {
    pub config: Arc<BotConfig>,
    pub lifecycle: Arc<LifecycleController>,
    pub match_status: Arc<MatchStatus>,
}

#[derive(Clone)]
pub struct AppState {
    pub bots: Arc<HashMap<u64, BotHandle>>,
}

#[derive(Debug, Serialize)]
struct BotStatus {
    steam_id: u64,
    nickname: Option<String>,
    lifecycle: LifecycleSnapshot,
    last_match_round: Option<MatchRoundRecord>,
}

#[derive(Debug, Serialize)]
struct StatusResponse {
    bots: Vec<BotStatus>,
}

/// Bypasses request logging by host convention (see `middleware::logging`).
async fn health() -> StatusCode {
    StatusCode::OK
}

async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    let mut bots = Vec::with_capacity(state.bots.len());
    for handle in state.bots.values() {
        bots.push(BotStatus {
            steam_id: handle.config.steam_id,
            nickname: handle.config.nickname.clone(),
            lifecycle: handle.lifecycle.snapshot().await,
            last_match_round: handle.match_status.snapshot(),
        });
    }
    Json(StatusResponse { bots })
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(state)
}
