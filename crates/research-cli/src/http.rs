//! HTTP entry point
//!
//! `GET /api/recommendation?symbol=AAPL` and `POST /api/recommendation`
//! with `{"symbol": "AAPL"}` both run the pipeline once.
//!
//! | outcome                         | status | body                       |
//! |---------------------------------|--------|----------------------------|
//! | success (stored or not)         | 200    | `{recommendation, report}` |
//! | missing symbol / bad JSON body  | 400    | `{error}`                  |
//! | any pipeline failure            | 500    | `{error, details}`         |

use axum::{Json, Router};
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use research_stock::{ResearchPipeline, normalize_symbol};
use serde::Deserialize;
use serde_json::json;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Debug, Default, Deserialize)]
struct SymbolInput {
    symbol: Option<String>,
}

pub fn router(pipeline: Arc<ResearchPipeline>) -> Router {
    Router::new()
        .route(
            "/api/recommendation",
            get(recommend_from_query).post(recommend_from_body),
        )
        .with_state(pipeline)
}

async fn recommend_from_query(
    State(pipeline): State<Arc<ResearchPipeline>>,
    Query(input): Query<SymbolInput>,
) -> Response {
    recommend(&pipeline, input.symbol).await
}

async fn recommend_from_body(
    State(pipeline): State<Arc<ResearchPipeline>>,
    body: Bytes,
) -> Response {
    let input = if body.iter().all(u8::is_ascii_whitespace) {
        SymbolInput::default()
    } else {
        match serde_json::from_slice::<SymbolInput>(&body) {
            Ok(input) => input,
            Err(e) => {
                return bad_request(format!("invalid JSON body: {e}"));
            }
        }
    };
    recommend(&pipeline, input.symbol).await
}

async fn recommend(pipeline: &ResearchPipeline, symbol: Option<String>) -> Response {
    let Ok(symbol) = normalize_symbol(symbol.as_deref().unwrap_or_default()) else {
        return bad_request("symbol is required".to_string());
    };

    match pipeline.execute(&symbol).await {
        Ok(run) => {
            if !run.persisted {
                warn!(symbol = %run.record.symbol, "responding with an unsaved recommendation");
            }
            info!(symbol = %run.record.symbol, recommendation = %run.record.recommendation, "request served");
            (
                StatusCode::OK,
                Json(json!({
                    "recommendation": run.record.recommendation,
                    "report": run.record.report,
                })),
            )
                .into_response()
        }
        Err(e) => {
            error!(%symbol, error = %e, "pipeline failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({
                    "error": "analysis failed",
                    "details": e.to_string(),
                })),
            )
                .into_response()
        }
    }
}

fn bad_request(reason: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(json!({ "error": reason }))).into_response()
}
