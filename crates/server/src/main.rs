use detector::{Detector, DetectorConfig, backend::DetectorBackend, backend::ort::OrtBackend};
use server::{config::get_configuration, logging::setup_logging, routes, state::AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = get_configuration()?;
    setup_logging(&config)?;

    let detector_config = DetectorConfig::from_env()?;
    tracing::info!(config = ?detector_config, "Loaded detector configuration");

    tracing::info!("Loading detection model");
    let backend = match OrtBackend::load_model(&detector_config.model_path) {
        Ok(backend) => backend,
        Err(e) => {
            // Without a model the service has no function: fail fast
            tracing::error!(
                error = %e,
                model_path = %detector_config.model_path,
                "Failed to load detection model"
            );
            return Err(e);
        }
    };
    tracing::info!("Model loaded successfully");

    let state = AppState {
        detector: Arc::new(Detector::new(backend, detector_config)),
    };

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "Detection server listening");

    axum::serve(listener, routes::app(state)).await?;

    Ok(())
}
