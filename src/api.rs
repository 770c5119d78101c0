//! HTTP API for the inference endpoint.
//!
//! ## Endpoints
//!
//! - `POST /prediction` - Validate four measurements and score them
//! - `GET /healthz` - Liveness check, no dependency probe
//! - `GET /openapi.json` - Generated API schema with gateway extensions
//!
//! ## Example
//!
//! ```rust,ignore
//! use iris_serve::{create_router, AppState, IrisModel, RuntimeConfig};
//! use std::sync::Arc;
//!
//! let model = IrisModel::load("modelfiles/iris_gbm.onnx", &RuntimeConfig::default())?;
//! let app = create_router(AppState::new(Arc::new(model)));
//! axum::serve(listener, app).await?;
//! ```

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use log::debug;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{ErrorResponse, ServeError};
use crate::model::{Features, Scorer};
use crate::schema;

/// Closed interval every measurement must fall into, in centimeters.
pub const MEASUREMENT_MIN: f32 = 0.5;
pub const MEASUREMENT_MAX: f32 = 10.0;

/// Application state shared across handlers.
///
/// Holds the one read-only scorer handle constructed at startup.
#[derive(Clone)]
pub struct AppState {
    scorer: Arc<dyn Scorer>,
}

impl AppState {
    pub fn new(scorer: Arc<dyn Scorer>) -> Self {
        Self { scorer }
    }
}

/// Inbound prediction request.
///
/// Measurements accept JSON numbers or numeric strings; the string form is
/// coerced during deserialization. `requestID` is opaque and passed through
/// untouched.
#[derive(Debug, Clone, Deserialize)]
pub struct PredictionRequest {
    #[serde(rename = "requestID")]
    pub request_id: String,
    #[serde(deserialize_with = "lenient_f32")]
    pub sepal_length_cm: f32,
    #[serde(deserialize_with = "lenient_f32")]
    pub sepal_width_cm: f32,
    #[serde(deserialize_with = "lenient_f32")]
    pub petal_length_cm: f32,
    #[serde(deserialize_with = "lenient_f32")]
    pub petal_width_cm: f32,
}

impl PredictionRequest {
    /// Checks every measurement against the closed service interval.
    ///
    /// # Errors
    /// - `ValidationError` naming the first out-of-range field; the model is
    ///   never invoked for a rejected request.
    pub fn validate(&self) -> Result<Features, ServeError> {
        let features = Features {
            sepal_length_cm: self.sepal_length_cm,
            sepal_width_cm: self.sepal_width_cm,
            petal_length_cm: self.petal_length_cm,
            petal_width_cm: self.petal_width_cm,
        };

        for (field, value) in [
            ("sepal_length_cm", features.sepal_length_cm),
            ("sepal_width_cm", features.sepal_width_cm),
            ("petal_length_cm", features.petal_length_cm),
            ("petal_width_cm", features.petal_width_cm),
        ] {
            if !(MEASUREMENT_MIN..=MEASUREMENT_MAX).contains(&value) {
                return Err(ServeError::Validation {
                    field,
                    message: format!(
                        "must be within [{}, {}] inclusive, got {}",
                        MEASUREMENT_MIN, MEASUREMENT_MAX, value
                    ),
                });
            }
        }

        Ok(features)
    }
}

/// Outbound prediction response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResponse {
    #[serde(rename = "requestID")]
    pub request_id: String,
    pub status: String,
    pub prediction: String,
    pub setosa_proba: f32,
    pub versicolor_proba: f32,
    pub virginica_proba: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub api_health: bool,
}

fn lenient_f32<'de, D>(deserializer: D) -> Result<f32, D::Error>
where
    D: Deserializer<'de>,
{
    struct LenientF32;

    impl serde::de::Visitor<'_> for LenientF32 {
        type Value = f32;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or a numeric string")
        }

        fn visit_f64<E: serde::de::Error>(self, value: f64) -> Result<f32, E> {
            Ok(value as f32)
        }

        fn visit_i64<E: serde::de::Error>(self, value: i64) -> Result<f32, E> {
            Ok(value as f32)
        }

        fn visit_u64<E: serde::de::Error>(self, value: u64) -> Result<f32, E> {
            Ok(value as f32)
        }

        fn visit_str<E: serde::de::Error>(self, value: &str) -> Result<f32, E> {
            value
                .trim()
                .parse::<f32>()
                .map_err(|_| E::custom(format!("invalid numeric string {:?}", value)))
        }
    }

    deserializer.deserialize_any(LenientF32)
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/prediction", post(prediction_handler))
        .route("/healthz", get(health_handler))
        .route("/openapi.json", get(openapi_handler))
        .with_state(state)
}

/// Prediction handler: validate, score, reshape. Straight-line, no retries.
async fn prediction_handler(
    State(state): State<AppState>,
    Json(request): Json<PredictionRequest>,
) -> Result<Json<PredictionResponse>, (StatusCode, Json<ErrorResponse>)> {
    let features = request.validate().map_err(ServeError::into_parts)?;

    debug!("Scoring request {}", request.request_id);
    let prediction = state
        .scorer
        .score(features)
        .map_err(ServeError::into_parts)?;

    Ok(Json(PredictionResponse {
        request_id: request.request_id,
        status: "Success".to_string(),
        prediction: prediction.label,
        setosa_proba: prediction.probabilities[0],
        versicolor_proba: prediction.probabilities[1],
        virginica_proba: prediction.probabilities[2],
    }))
}

/// Liveness handler. Answers unconditionally, regardless of model state.
async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse { api_health: true })
}

async fn openapi_handler() -> Json<serde_json::Value> {
    Json(schema::openapi_document().clone())
}
