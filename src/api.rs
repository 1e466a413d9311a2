//! HTTP API
//!
//! `POST /query` answers a question; failures other than an unsupported
//! `db_type` are reported as `200 {"error": ...}`, so callers must inspect the
//! payload rather than the status code. Unreadable bodies keep their 4xx
//! status but use the same `{"error": ...}` shape.

use crate::service::QueryService;
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::value::RawValue;
use std::collections::BTreeMap;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

#[derive(Clone)]
pub struct ApiState {
    pub service: Arc<QueryService>,
}

pub fn create_router(state: ApiState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/query", post(query))
        .route("/health", get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub question: String,
    #[serde(default)]
    pub db_type: String,
}

#[derive(Serialize)]
struct ResultsBody<'a> {
    results: &'a RawValue,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

async fn query(
    State(state): State<ApiState>,
    payload: Result<Json<QueryRequest>, JsonRejection>,
) -> Response {
    let request = match payload {
        Ok(Json(request)) => request,
        Err(rejection) => {
            warn!(error = %rejection.body_text(), "rejected query body");
            return (
                rejection.status(),
                Json(ErrorBody {
                    error: rejection.body_text(),
                }),
            )
                .into_response();
        }
    };

    match state.service.answer(&request.question, &request.db_type).await {
        Ok(answer) => Json(ResultsBody {
            results: &answer.results,
        })
        .into_response(),
        Err(e) => {
            warn!(db_type = %request.db_type, error = %e, "query failed");
            let status = if e.is_client_error() {
                StatusCode::BAD_REQUEST
            } else {
                StatusCode::OK
            };
            (status, Json(ErrorBody { error: e.to_string() })).into_response()
        }
    }
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub backends: BTreeMap<String, String>,
}

async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let backends = state
        .service
        .health()
        .await
        .into_iter()
        .map(|(kind, up)| (kind.name().to_string(), if up { "up" } else { "down" }.to_string()))
        .collect();

    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        backends,
    })
}
