//! churnscope: serves the customer segmentation and churn dashboard
//!
//! Loads the customer table and churn model once, then either answers a single
//! prediction on stdout or serves the dashboard over HTTP.

use anyhow::Result;
use churnscope::{build_router, initialize, Args, TableCache};
use clap::Parser;
use std::time::Instant;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse();

    let default_level = if args.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env().add_directive(default_level.into()),
        )
        .init();

    info!(
        "Starting churnscope v{} (data: {}, model: {})",
        env!("CARGO_PKG_VERSION"),
        args.data.display(),
        args.model.display()
    );

    let start_time = Instant::now();
    let cache = TableCache::new(&args.data);
    let state = match initialize(&cache, &args.model) {
        Ok(state) => state,
        Err(e) => {
            error!("Dashboard failed to initialize: {}", e);
            return Err(e.into());
        }
    };
    info!(
        "✓ Inputs loaded in {:.2}s",
        start_time.elapsed().as_secs_f64()
    );

    // Check if in prediction mode
    if let Some(request) = args.prediction_request()? {
        println!(
            "Input RFM values: R={}, F={}, M={}",
            request.recency, request.frequency, request.monetary
        );
        let label = state.model.predict(&request)?;
        println!("Prediction Result: {}", label.outcome());
        return Ok(());
    }

    let app = build_router(state);
    let listener = tokio::net::TcpListener::bind(args.bind).await?;
    info!("churnscope listening on http://{}", args.bind);
    info!("Health check: http://{}/health", args.bind);

    axum::serve(listener, app).await?;

    Ok(())
}
