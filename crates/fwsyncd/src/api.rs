//! Administrative HTTP surface
//!
//! Thin handlers over the [`Reconciler`]; no reconciliation logic lives here.
//!
//! | Route | Behavior |
//! |---|---|
//! | `GET /health`, `/health/live`, `/health/ready` | always `{"status":"ok"}` |
//! | `GET /ip` | current public IP, 503 when unavailable |
//! | `GET /targets` | configured targets without secrets |
//! | `GET /targets/{name}/rules` | current allow-list entries of a target |
//! | `POST /targets/{name}/ensure` | one reconciliation pass for a target |

use std::net::IpAddr;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use fwsync_core::{
    AllowListEntry, Error, FwSyncConfig, ReconciliationOutcome, Reconciler, TargetDefinition,
    TargetSummary,
};
use serde::Serialize;
use tracing::warn;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub reconciler: Arc<Reconciler>,
    pub config: Arc<FwSyncConfig>,
}

impl AppState {
    pub fn new(reconciler: Arc<Reconciler>, config: Arc<FwSyncConfig>) -> Self {
        Self { reconciler, config }
    }

    fn target(&self, name: &str) -> Result<&TargetDefinition, ApiError> {
        self.config
            .target(name)
            .ok_or_else(|| ApiError::UnknownTarget(name.to_string()))
    }
}

#[derive(Serialize)]
struct HealthBody {
    status: &'static str,
}

#[derive(Serialize)]
struct IpBody {
    ip: IpAddr,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

/// Handler error mapped onto a status code
#[derive(Debug)]
pub enum ApiError {
    UnknownTarget(String),
    Incomplete(String),
    IpUnavailable(Error),
    Upstream(Error),
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        match err {
            Error::ConfigurationIncomplete(msg) => ApiError::Incomplete(msg),
            other => ApiError::Upstream(other),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            ApiError::UnknownTarget(name) => {
                (StatusCode::NOT_FOUND, format!("Unknown target: {}", name))
            }
            ApiError::Incomplete(msg) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                format!("Target configuration incomplete: {}", msg),
            ),
            ApiError::IpUnavailable(err) => (StatusCode::SERVICE_UNAVAILABLE, err.to_string()),
            ApiError::Upstream(err) => {
                warn!("Upstream request failed ({}): {}", err.kind(), err);
                (StatusCode::BAD_GATEWAY, err.to_string())
            }
        };

        (status, Json(ErrorBody { error })).into_response()
    }
}

/// Build the admin router
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/health/live", get(health))
        .route("/health/ready", get(health))
        .route("/ip", get(public_ip))
        .route("/targets", get(list_targets))
        .route("/targets/{name}/rules", get(target_rules))
        .route("/targets/{name}/ensure", post(ensure_target))
        .with_state(state)
}

async fn health() -> Json<HealthBody> {
    Json(HealthBody { status: "ok" })
}

async fn public_ip(State(state): State<AppState>) -> Result<Json<IpBody>, ApiError> {
    let ip = state
        .reconciler
        .public_ip()
        .await
        .map_err(ApiError::IpUnavailable)?;
    Ok(Json(IpBody { ip }))
}

async fn list_targets(State(state): State<AppState>) -> Json<Vec<TargetSummary>> {
    Json(state.config.targets.iter().map(TargetDefinition::summary).collect())
}

async fn target_rules(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Vec<AllowListEntry>>, ApiError> {
    let target = state.target(&name)?;
    let entries = state.reconciler.list_target_entries(target).await?;
    Ok(Json(entries))
}

async fn ensure_target(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<ReconciliationOutcome>, ApiError> {
    let target = state.target(&name)?.clone();

    let report = state.reconciler.reconcile_all(std::slice::from_ref(&target)).await;
    let outcome = report
        .outcomes
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::Upstream(Error::Other("pass produced no outcome".to_string())))?;

    Ok(Json(outcome))
}
