//! churnscope: customer segmentation and churn dashboard
//!
//! Loads a pre-computed RFM customer table (with externally assigned clusters)
//! and a pre-trained churn classifier, then serves descriptive statistics,
//! charts and a prediction form over HTTP.

pub mod cli;
pub mod data;
pub mod error;
pub mod model;
pub mod server;
pub mod stats;
pub mod views;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{load_customer_table, ChurnLabel, CustomerRecord, CustomerTable, TableCache};
pub use error::{InferenceError, LoadError};
pub use model::{load_churn_model, ChurnModel, PredictionRequest};
pub use server::{build_router, AppState};
pub use views::Section;

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;

/// Load both process-wide inputs. Either failing aborts startup.
pub fn initialize(cache: &TableCache, model_path: &Path) -> std::result::Result<AppState, LoadError> {
    let table = cache.load()?;
    let model = load_churn_model(model_path)?;
    info!("Loaded churn model from {}", model_path.display());

    match model.threshold_days() {
        Some(days) if days != data::CHURN_RECENCY_THRESHOLD_DAYS => warn!(
            "Model was trained with a {} day churn threshold but the dashboard labels customers at {} days",
            days,
            data::CHURN_RECENCY_THRESHOLD_DAYS
        ),
        Some(_) => {}
        None => warn!("Model artifact does not record its churn threshold; cannot confirm it matches the dashboard"),
    }

    Ok(AppState::new(table, Arc::new(model)))
}
