//! Command-line interface definitions and argument parsing

use crate::model::{PredictionRequest, FREQUENCY_INPUT, MONETARY_INPUT, RECENCY_INPUT};
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;

/// Customer segmentation and churn dashboard
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the clustered customer CSV
    #[arg(short, long, default_value = "data/processed/clustered_customers.csv")]
    pub data: PathBuf,

    /// Path to the churn model artifact (JSON)
    #[arg(short, long, default_value = "model/churn_prediction_model.json")]
    pub model: PathBuf,

    /// Address the dashboard listens on
    #[arg(short, long, default_value = "127.0.0.1:8501")]
    pub bind: SocketAddr,

    /// Prediction mode: provide R,F,M values as comma-separated string
    /// Example: --predict "90,10,500" for Recency=90, Frequency=10, Monetary=500
    #[arg(short, long)]
    pub predict: Option<String>,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl Args {
    /// Parse the prediction triple, pinned to the form input bounds
    /// Expected format: "recency,frequency,monetary"
    pub fn prediction_request(&self) -> crate::Result<Option<PredictionRequest>> {
        let Some(ref predict_str) = self.predict else {
            return Ok(None);
        };

        let parts: Vec<&str> = predict_str.split(',').map(str::trim).collect();
        if parts.len() != 3 {
            anyhow::bail!("Predict values must be in format 'recency,frequency,monetary'");
        }

        let mut values = [0.0; 3];
        let inputs = [RECENCY_INPUT, FREQUENCY_INPUT, MONETARY_INPUT];
        for ((value, raw), input) in values.iter_mut().zip(&parts).zip(inputs) {
            *value = raw
                .parse()
                .map_err(|_| anyhow::anyhow!("Invalid {} value: {}", input.name, raw))?;
        }

        let [recency, frequency, monetary] = values;
        Ok(Some(PredictionRequest::clamped(recency, frequency, monetary)))
    }
}
