//! Error kinds raised at the loading and inference seams

use std::path::PathBuf;
use thiserror::Error;

/// Failure to bring up one of the two process-wide inputs (customer table or
/// churn model). Always fatal: the dashboard does not start without both.
#[derive(Error, Debug)]
pub enum LoadError {
    /// Source file does not exist
    #[error("{what} not found at {}", .path.display())]
    Missing { what: &'static str, path: PathBuf },

    /// Source file exists but could not be read
    #[error("failed to read {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// CSV could not be parsed or lacks a required column
    #[error("malformed customer table {}: {source}", .path.display())]
    Table {
        path: PathBuf,
        #[source]
        source: polars::error::PolarsError,
    },

    /// Model artifact is not valid JSON or does not match the artifact layout
    #[error("corrupt model artifact {}: {source}", .path.display())]
    Artifact {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Model artifact decoded but was produced for a different input schema
    #[error("incompatible model artifact {}: {reason}", .path.display())]
    Incompatible { path: PathBuf, reason: String },
}

/// Failure of a single prediction. Only the Predict Churn action is affected.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    #[error("feature {feature} is not a finite number")]
    NonFiniteFeature { feature: &'static str },

    #[error("classifier returned no label")]
    EmptyPrediction,

    #[error("classifier returned unexpected label {0}, expected 0 or 1")]
    UnexpectedLabel(usize),
}
