pub mod backend;
pub mod config;
pub mod labels;
pub mod postprocessing;
pub mod preprocessing;
pub mod service;

// Re-export commonly used types for convenience
pub use backend::DetectorBackend;
pub use config::DetectorConfig;
pub use postprocessing::Detection;
pub use service::Detector;
