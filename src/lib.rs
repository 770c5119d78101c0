//! A minimal inference endpoint serving a pretrained iris classifier over HTTP.
//!
//! The service loads one ONNX model artifact at startup, validates four
//! bounded measurements per request, forwards them to the runtime, and
//! returns the predicted class with per-class probabilities.
//!
//! # Basic Usage
//!
//! ```rust,ignore
//! use iris_serve::{create_router, AppState, IrisModel, RuntimeConfig};
//! use std::sync::Arc;
//!
//! iris_serve::runtime::ensure_initialized()?;
//! let model = IrisModel::load("modelfiles/iris_gbm.onnx", &RuntimeConfig::default())?;
//! let app = create_router(AppState::new(Arc::new(model)));
//!
//! let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! # Thread Safety
//!
//! The loaded model is an immutable, shared, read-only handle. It is
//! constructed once during startup and read concurrently by every request
//! handler thereafter; no re-initialization and no mutation.

pub mod api;
pub mod error;
pub mod model;
pub mod runtime;
pub mod schema;

pub use api::{create_router, AppState, HealthResponse, PredictionRequest, PredictionResponse};
pub use error::{ErrorResponse, ServeError};
pub use model::{Features, IrisModel, Prediction, Scorer, CLASS_LABELS};
pub use runtime::{create_session_builder, ensure_initialized, RuntimeConfig};

pub fn init_logger() {
    env_logger::init();
}
