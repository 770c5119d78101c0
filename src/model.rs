use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use log::info;
use ndarray::Array2;
use ort::session::Session;
use ort::value::Tensor;

use crate::error::ServeError;
use crate::runtime::{create_session_builder, RuntimeConfig};

/// Class labels in the column order of the artifact's probabilities output.
///
/// The probability row is unpacked positionally; nothing in the artifact is
/// checked against these labels, so a reordered export would silently
/// mislabel predictions. This mirrors how the artifact is produced upstream.
pub const CLASS_LABELS: [&str; 3] = ["setosa", "versicolor", "virginica"];

/// Name of the artifact's single feature input.
pub const INPUT_NAME: &str = "float_input";

/// The four validated measurements, in the artifact's feature schema order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Features {
    pub sepal_length_cm: f32,
    pub sepal_width_cm: f32,
    pub petal_length_cm: f32,
    pub petal_width_cm: f32,
}

impl Features {
    /// Returns the measurements as a single tabular row.
    pub fn as_row(&self) -> [f32; 4] {
        [
            self.sepal_length_cm,
            self.sepal_width_cm,
            self.petal_length_cm,
            self.petal_width_cm,
        ]
    }
}

/// Result of scoring one feature row.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub label: String,
    /// Per-class probabilities in `CLASS_LABELS` order. Not re-normalized.
    pub probabilities: [f32; 3],
}

/// The seam between the HTTP layer and the model runtime.
///
/// Handlers only see this trait, so the service can be exercised end-to-end
/// without a model artifact on disk.
pub trait Scorer: Send + Sync {
    fn score(&self, features: Features) -> Result<Prediction, ServeError>;
}

/// A thread-safe handle to the loaded iris classifier.
///
/// Loaded once at startup and shared read-only across all concurrent
/// requests for the life of the process. There is no reload or hot-swap.
#[derive(Debug)]
pub struct IrisModel {
    session: Arc<Session>,
    model_path: String,
}

// Compile-time verification of thread-safety
const _: () = {
    fn assert_send_sync<T: Send + Sync>() {}
    fn verify_thread_safety() {
        assert_send_sync::<IrisModel>();
    }
};

impl IrisModel {
    /// Loads the packaged model artifact into the ONNX Runtime environment.
    ///
    /// # Errors
    /// - `ModelError` if the runtime cannot be initialized or the artifact
    ///   cannot be read; startup should abort on either.
    pub fn load<P: AsRef<Path>>(path: P, config: &RuntimeConfig) -> Result<Self, ServeError> {
        let path = path.as_ref();
        info!("Loading model artifact from {:?}", path);

        let session = create_session_builder(config)?.commit_from_file(path)?;
        Self::validate_session(&session)?;

        info!("Model artifact loaded");
        Ok(Self {
            session: Arc::new(session),
            model_path: path.display().to_string(),
        })
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }

    fn validate_session(session: &Session) -> Result<(), ServeError> {
        let inputs = &session.inputs;
        if inputs.len() != 1 {
            return Err(ServeError::Model(format!(
                "Model must have exactly 1 feature input, found {}",
                inputs.len()
            )));
        }

        let outputs = &session.outputs;
        if outputs.is_empty() {
            return Err(ServeError::Model(
                "Model must have at least 1 output for class probabilities".to_string(),
            ));
        }

        Ok(())
    }
}

impl Scorer for IrisModel {
    fn score(&self, features: Features) -> Result<Prediction, ServeError> {
        let row = features.as_row();
        let input_array = Array2::from_shape_vec((1, row.len()), row.to_vec())
            .map_err(|e| ServeError::Prediction(format!("Failed to build input row: {}", e)))?;
        let input_dyn = input_array.into_dyn();
        let input = input_dyn.as_standard_layout();

        let mut input_tensors = HashMap::new();
        input_tensors.insert(
            INPUT_NAME,
            Tensor::from_array(&input).map_err(|e| {
                ServeError::Prediction(format!("Failed to create input tensor: {}", e))
            })?,
        );

        let outputs = self
            .session
            .run(input_tensors)
            .map_err(|e| ServeError::Prediction(format!("Failed to run model: {}", e)))?;

        // The artifact exports the probability matrix as its first output.
        let probability_tensor = outputs[0].try_extract_tensor::<f32>().map_err(|e| {
            ServeError::Prediction(format!("Failed to extract probabilities: {}", e))
        })?;

        let shape = probability_tensor.shape();
        if shape.len() != 2 || shape[1] != CLASS_LABELS.len() {
            return Err(ServeError::Prediction(format!(
                "Unexpected probabilities shape {:?}, want [1, {}]",
                shape,
                CLASS_LABELS.len()
            )));
        }

        let mut probabilities = [0.0f32; 3];
        let probability_row = probability_tensor.slice(ndarray::s![0, ..]);
        for (slot, value) in probabilities.iter_mut().zip(probability_row.iter()) {
            *slot = *value;
        }

        let best = argmax(&probabilities);
        Ok(Prediction {
            label: CLASS_LABELS[best].to_string(),
            probabilities,
        })
    }
}

/// Index of the largest probability; the first maximal index wins on ties.
fn argmax(probabilities: &[f32; 3]) -> usize {
    let mut best = 0;
    for (i, value) in probabilities.iter().enumerate().skip(1) {
        if *value > probabilities[best] {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_row_order() {
        let features = Features {
            sepal_length_cm: 5.1,
            sepal_width_cm: 3.5,
            petal_length_cm: 1.4,
            petal_width_cm: 0.2,
        };
        assert_eq!(features.as_row(), [5.1, 3.5, 1.4, 0.2]);
    }

    #[test]
    fn test_argmax_picks_largest() {
        assert_eq!(argmax(&[0.1, 0.7, 0.2]), 1);
        assert_eq!(argmax(&[0.05, 0.05, 0.9]), 2);
        assert_eq!(argmax(&[0.9, 0.05, 0.05]), 0);
    }

    #[test]
    fn test_argmax_tie_takes_first() {
        assert_eq!(argmax(&[0.5, 0.5, 0.0]), 0);
        assert_eq!(argmax(&[0.0, 0.5, 0.5]), 1);
    }

    #[test]
    fn test_class_label_order_matches_response_fields() {
        assert_eq!(CLASS_LABELS, ["setosa", "versicolor", "virginica"]);
    }
}
