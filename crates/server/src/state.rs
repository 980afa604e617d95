use detector::{Detector, backend::DetectorBackend};
use std::sync::Arc;

pub struct AppState<B: DetectorBackend> {
    pub detector: Arc<Detector<B>>,
}

// Manual impl: `#[derive(Clone)]` would demand `B: Clone` the Arc never needs
impl<B: DetectorBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            detector: Arc::clone(&self.detector),
        }
    }
}
