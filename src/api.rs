//! HTTP surface: `POST /predict` and `GET /health`.

use axum::{
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::features::StudentRecord;
use crate::service::{PredictError, PredictorContext};

/// Returned verbatim while no artifacts are loaded; clients match on it.
pub const MODEL_NOT_LOADED: &str = "Model not loaded. Run train.py.";

pub type SharedContext = Arc<PredictorContext>;

#[derive(Debug)]
pub enum ApiError {
    NotLoaded,
    BadRequest(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotLoaded => (StatusCode::INTERNAL_SERVER_ERROR, MODEL_NOT_LOADED.to_string()),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<PredictError> for ApiError {
    fn from(err: PredictError) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub prediction: String,
    pub confidence: String,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub fn router(ctx: SharedContext) -> Router {
    Router::new()
        .route("/predict", post(predict))
        .route("/health", get(health))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(ctx)
}

/// The body is parsed by hand so readiness is checked before the payload,
/// and malformed JSON is reported with the parser's message.
pub async fn predict(State(ctx): State<SharedContext>, body: Bytes) -> Result<Json<PredictResponse>, ApiError> {
    let Some(predictor) = ctx.predictor() else {
        return Err(ApiError::NotLoaded);
    };

    let result = parse_record(&body).and_then(|record| predictor.predict(&record).map_err(ApiError::from));

    match result {
        Ok(prediction) => {
            log::debug!("prediction {} ({:.4})", prediction.outcome, prediction.confidence);
            Ok(Json(PredictResponse {
                prediction: prediction.outcome.to_string(),
                confidence: prediction.confidence_percent(),
            }))
        }
        Err(e) => {
            if let ApiError::BadRequest(msg) = &e {
                log::warn!("rejected predict request: {}", msg);
            }
            Err(e)
        }
    }
}

/// Only a JSON object is a record; arrays would otherwise bind positionally.
fn parse_record(body: &[u8]) -> Result<StudentRecord, ApiError> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(serde_json::from_value(Value::Object(map))?),
        _ => Err(ApiError::BadRequest("request body must be a JSON object".to_string())),
    }
}

pub async fn health(State(ctx): State<SharedContext>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: if ctx.is_ready() { "ready" } else { "unready" },
    })
}
