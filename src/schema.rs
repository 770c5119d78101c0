//! Generated OpenAPI document for the service.
//!
//! Built once per process and cached. Two gateway extension fields are
//! injected at the top level, sourced from the environment with unresolved
//! placeholder literals as fallbacks, plus a hand-injected CORS preflight
//! stub under `/prediction`.

use std::env;
use std::sync::OnceLock;

use serde_json::{json, Value};

use crate::api::{MEASUREMENT_MAX, MEASUREMENT_MIN};

static DOCUMENT: OnceLock<Value> = OnceLock::new();

pub fn openapi_document() -> &'static Value {
    DOCUMENT.get_or_init(build_document)
}

fn placeholder(var: &str) -> String {
    env::var(var).unwrap_or_else(|_| format!("${{{}}}", var))
}

fn measurement_schema() -> Value {
    json!({
        "type": "number",
        "minimum": MEASUREMENT_MIN,
        "maximum": MEASUREMENT_MAX,
    })
}

fn build_document() -> Value {
    let mut document = json!({
        "openapi": "3.0.2",
        "info": {
            "title": "iris-serve",
            "version": env!("CARGO_PKG_VERSION"),
        },
        "paths": {
            "/prediction": {
                "post": {
                    "operationId": "prediction",
                    "requestBody": {
                        "required": true,
                        "content": {
                            "application/json": {
                                "schema": { "$ref": "#/components/schemas/PredictionRequest" }
                            }
                        }
                    },
                    "responses": {
                        "200": {
                            "description": "Successful Response",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/PredictionResponse" }
                                }
                            }
                        },
                        "422": {
                            "description": "Validation Error",
                            "content": {
                                "application/json": {
                                    "schema": { "$ref": "#/components/schemas/ErrorResponse" }
                                }
                            }
                        }
                    }
                }
            },
            "/healthz": {
                "get": {
                    "operationId": "health_check",
                    "responses": {
                        "200": { "description": "Successful Response" }
                    }
                }
            }
        },
        "components": {
            "schemas": {
                "PredictionRequest": {
                    "type": "object",
                    "required": [
                        "requestID",
                        "sepal_length_cm",
                        "sepal_width_cm",
                        "petal_length_cm",
                        "petal_width_cm"
                    ],
                    "properties": {
                        "requestID": { "type": "string" },
                        "sepal_length_cm": measurement_schema(),
                        "sepal_width_cm": measurement_schema(),
                        "petal_length_cm": measurement_schema(),
                        "petal_width_cm": measurement_schema(),
                    }
                },
                "PredictionResponse": {
                    "type": "object",
                    "properties": {
                        "requestID": { "type": "string" },
                        "status": { "type": "string" },
                        "prediction": { "type": "string" },
                        "setosa_proba": { "type": "number" },
                        "versicolor_proba": { "type": "number" },
                        "virginica_proba": { "type": "number" },
                    }
                },
                "ErrorResponse": {
                    "type": "object",
                    "properties": {
                        "error": { "type": "string" },
                        "field": { "type": "string" },
                    }
                }
            }
        },
        "x-google-backend": {
            "address": placeholder("CLOUD_RUN_URL"),
            "deadline": placeholder("TIMEOUT"),
        }
    });

    // The API gateway expects an OPTIONS operation it can route preflight
    // requests to; the generator has no handler to derive it from.
    document["paths"]["/prediction"]["options"] = json!({
        "operationId": "corsPreflight",
        "responses": {
            "200": { "description": "Successful Response" }
        }
    });

    document
}
