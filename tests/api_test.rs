use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use tower::util::ServiceExt;

use iris_serve::{create_router, AppState, Features, Prediction, Scorer, ServeError};

/// Scorer with canned probabilities, standing in for the loaded artifact.
struct StubScorer {
    calls: AtomicUsize,
}

impl StubScorer {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
        })
    }
}

impl Scorer for StubScorer {
    fn score(&self, _features: Features) -> Result<Prediction, ServeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Prediction {
            label: "setosa".to_string(),
            probabilities: [0.9, 0.08, 0.02],
        })
    }
}

/// Scorer whose runtime always fails.
struct FailingScorer;

impl Scorer for FailingScorer {
    fn score(&self, _features: Features) -> Result<Prediction, ServeError> {
        Err(ServeError::Prediction("runtime unavailable".to_string()))
    }
}

fn prediction_request(body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/prediction")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn valid_body(request_id: &str) -> serde_json::Value {
    serde_json::json!({
        "requestID": request_id,
        "sepal_length_cm": 5.1,
        "sepal_width_cm": 3.5,
        "petal_length_cm": 1.4,
        "petal_width_cm": 0.2,
    })
}

async fn body_json(response: axum::response::Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_healthz_always_true() {
    let app = create_router(AppState::new(StubScorer::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, serde_json::json!({ "api_health": true }));
}

#[tokio::test]
async fn test_healthz_independent_of_model() {
    // A broken scorer must not affect liveness.
    let app = create_router(AppState::new(Arc::new(FailingScorer)));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/healthz")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_prediction_success() {
    let app = create_router(AppState::new(StubScorer::new()));

    let response = app.oneshot(prediction_request(valid_body("t1"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["requestID"], "t1");
    assert_eq!(body["status"], "Success");
    assert_eq!(body["prediction"], "setosa");

    let total = body["setosa_proba"].as_f64().unwrap()
        + body["versicolor_proba"].as_f64().unwrap()
        + body["virginica_proba"].as_f64().unwrap();
    assert!((total - 1.0).abs() < 1e-3);
}

#[tokio::test]
async fn test_request_id_echoed_verbatim() {
    let app = create_router(AppState::new(StubScorer::new()));
    let opaque_id = "  not-a-uuid / with spaces & symbols!  ";

    let response = app
        .oneshot(prediction_request(valid_body(opaque_id)))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["requestID"], opaque_id);
}

#[tokio::test]
async fn test_numeric_string_measurements_accepted() {
    let app = create_router(AppState::new(StubScorer::new()));

    let response = app
        .oneshot(prediction_request(serde_json::json!({
            "requestID": "t2",
            "sepal_length_cm": "5.1",
            "sepal_width_cm": "3.5",
            "petal_length_cm": "1.4",
            "petal_width_cm": "0.7",
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_below_minimum_rejected_without_reaching_model() {
    let scorer = StubScorer::new();
    let app = create_router(AppState::new(scorer.clone()));

    let mut body = valid_body("t3");
    body["sepal_length_cm"] = serde_json::json!(0.1);

    let response = app.oneshot(prediction_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["field"], "sepal_length_cm");
    assert_eq!(scorer.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_above_maximum_rejected() {
    let app = create_router(AppState::new(StubScorer::new()));

    let mut body = valid_body("t4");
    body["petal_width_cm"] = serde_json::json!(10.5);

    let response = app.oneshot(prediction_request(body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = body_json(response).await;
    assert_eq!(body["field"], "petal_width_cm");
}

#[tokio::test]
async fn test_boundary_values_accepted() {
    let app = create_router(AppState::new(StubScorer::new()));

    let response = app
        .oneshot(prediction_request(serde_json::json!({
            "requestID": "edge",
            "sepal_length_cm": 0.5,
            "sepal_width_cm": 10.0,
            "petal_length_cm": 0.5,
            "petal_width_cm": 10.0,
        })))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_runtime_failure_surfaces_as_500() {
    let app = create_router(AppState::new(Arc::new(FailingScorer)));

    let response = app.oneshot(prediction_request(valid_body("t5"))).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains("runtime unavailable"));
}

#[tokio::test]
async fn test_concurrent_requests_keep_their_ids() {
    let app = create_router(AppState::new(StubScorer::new()));

    let (first, second) = tokio::join!(
        app.clone().oneshot(prediction_request(valid_body("alpha"))),
        app.clone().oneshot(prediction_request(valid_body("beta"))),
    );

    let first = body_json(first.unwrap()).await;
    let second = body_json(second.unwrap()).await;
    assert_eq!(first["requestID"], "alpha");
    assert_eq!(second["requestID"], "beta");
}

#[tokio::test]
async fn test_openapi_document_served() {
    let app = create_router(AppState::new(StubScorer::new()));

    let response = app
        .oneshot(
            Request::builder()
                .uri("/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["info"]["title"], "iris-serve");
    assert!(body["x-google-backend"]["address"].is_string());
    assert!(body["x-google-backend"]["deadline"].is_string());
    assert_eq!(
        body["paths"]["/prediction"]["options"]["operationId"],
        "corsPreflight"
    );
}
