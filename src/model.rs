//! Pre-trained churn classifier loading and inference

use crate::data::{ChurnLabel, FREQUENCY, MONETARY, RECENCY};
use crate::error::{InferenceError, LoadError};
use linfa::prelude::*;
use linfa_trees::DecisionTree;
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::debug;

/// Artifact layout revision understood by this build
pub const ARTIFACT_FORMAT_VERSION: u32 = 1;

/// Column order the classifier was fitted on
pub const FEATURE_ORDER: [&str; 3] = [RECENCY, FREQUENCY, MONETARY];

/// On-disk model artifact: the fitted classifier plus the metadata needed to
/// check it matches the dashboard's input schema
#[derive(Debug, Serialize, Deserialize)]
pub struct ChurnModelArtifact {
    pub format_version: u32,
    pub features: Vec<String>,
    /// Recency threshold the training labels were derived with, if recorded
    #[serde(default)]
    pub churn_threshold_days: Option<f64>,
    pub classifier: DecisionTree<f64, usize>,
}

impl ChurnModelArtifact {
    pub fn new(classifier: DecisionTree<f64, usize>, churn_threshold_days: Option<f64>) -> Self {
        Self {
            format_version: ARTIFACT_FORMAT_VERSION,
            features: FEATURE_ORDER.iter().map(|f| f.to_string()).collect(),
            churn_threshold_days,
            classifier,
        }
    }
}

/// Inclusive range and initial value of one prediction form input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InputBounds {
    pub label: &'static str,
    pub name: &'static str,
    pub min: u32,
    pub max: u32,
    pub default: u32,
}

impl InputBounds {
    /// Round to a whole number and pin into range. NaN falls back to the default.
    pub fn clamp(&self, value: f64) -> u32 {
        if value.is_nan() {
            return self.default;
        }
        value.round().clamp(self.min as f64, self.max as f64) as u32
    }
}

pub const RECENCY_INPUT: InputBounds = InputBounds {
    label: "Recency (days)",
    name: "recency",
    min: 0,
    max: 365,
    default: 90,
};

pub const FREQUENCY_INPUT: InputBounds = InputBounds {
    label: "Frequency",
    name: "frequency",
    min: 1,
    max: 100,
    default: 10,
};

pub const MONETARY_INPUT: InputBounds = InputBounds {
    label: "Monetary",
    name: "monetary",
    min: 1,
    max: 10_000,
    default: 500,
};

/// A single (Recency, Frequency, Monetary) triple submitted for prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PredictionRequest {
    pub recency: u32,
    pub frequency: u32,
    pub monetary: u32,
}

impl Default for PredictionRequest {
    fn default() -> Self {
        Self {
            recency: RECENCY_INPUT.default,
            frequency: FREQUENCY_INPUT.default,
            monetary: MONETARY_INPUT.default,
        }
    }
}

impl PredictionRequest {
    /// Build a request from raw input values, each pinned to its input bounds
    pub fn clamped(recency: f64, frequency: f64, monetary: f64) -> Self {
        Self {
            recency: RECENCY_INPUT.clamp(recency),
            frequency: FREQUENCY_INPUT.clamp(frequency),
            monetary: MONETARY_INPUT.clamp(monetary),
        }
    }

    /// Feature row in [`FEATURE_ORDER`]
    pub fn features(&self) -> [f64; 3] {
        [
            self.recency as f64,
            self.frequency as f64,
            self.monetary as f64,
        ]
    }
}

/// Loaded classifier, shared read-only for the process lifetime
#[derive(Debug)]
pub struct ChurnModel {
    classifier: DecisionTree<f64, usize>,
    threshold_days: Option<f64>,
}

impl ChurnModel {
    pub fn from_artifact(artifact: ChurnModelArtifact) -> Self {
        Self {
            classifier: artifact.classifier,
            threshold_days: artifact.churn_threshold_days,
        }
    }

    /// Recency threshold recorded at training time, if the artifact carries one
    pub fn threshold_days(&self) -> Option<f64> {
        self.threshold_days
    }

    /// Classify one customer
    pub fn predict(&self, request: &PredictionRequest) -> Result<ChurnLabel, InferenceError> {
        self.predict_features(request.features())
    }

    /// Classify a raw feature row in [`FEATURE_ORDER`]
    pub fn predict_features(&self, features: [f64; 3]) -> Result<ChurnLabel, InferenceError> {
        for (value, name) in features.iter().zip(FEATURE_ORDER) {
            if !value.is_finite() {
                return Err(InferenceError::NonFiniteFeature { feature: name });
            }
        }

        let row = Array2::from_shape_fn((1, 3), |(_, j)| features[j]);
        let predictions = self.classifier.predict(&row);
        let class = *predictions.get(0).ok_or(InferenceError::EmptyPrediction)?;
        let label = ChurnLabel::from_class(class).ok_or(InferenceError::UnexpectedLabel(class))?;

        debug!(?features, ?label, "Churn prediction");
        Ok(label)
    }
}

/// Load and validate the churn model artifact
///
/// # Arguments
/// * `file_path` - Path to the JSON artifact
///
/// # Returns
/// * `ChurnModel` ready for inference
pub fn load_churn_model(file_path: impl AsRef<Path>) -> Result<ChurnModel, LoadError> {
    let path = file_path.as_ref();
    if !path.is_file() {
        return Err(LoadError::Missing {
            what: "churn model",
            path: path.to_path_buf(),
        });
    }

    let bytes = std::fs::read(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let artifact: ChurnModelArtifact =
        serde_json::from_slice(&bytes).map_err(|source| LoadError::Artifact {
            path: path.to_path_buf(),
            source,
        })?;

    check_compatibility(&artifact).map_err(|reason| LoadError::Incompatible {
        path: path.to_path_buf(),
        reason,
    })?;

    Ok(ChurnModel::from_artifact(artifact))
}

fn check_compatibility(artifact: &ChurnModelArtifact) -> Result<(), String> {
    if artifact.format_version != ARTIFACT_FORMAT_VERSION {
        return Err(format!(
            "format version {} is not supported (expected {})",
            artifact.format_version, ARTIFACT_FORMAT_VERSION
        ));
    }

    if artifact.features.iter().map(String::as_str).ne(FEATURE_ORDER) {
        return Err(format!(
            "features {:?} do not match {:?}",
            artifact.features, FEATURE_ORDER
        ));
    }

    Ok(())
}
