use ndarray::{Array, ArrayD, IxDyn};

pub mod ort;

pub trait DetectorBackend {
    fn load_model(path: &str) -> anyhow::Result<Self>
    where
        Self: Sized;

    /// Run the model over a preprocessed NCHW tensor.
    ///
    /// Returns the raw prediction tensor `[1, 4 + num_classes, num_anchors]`
    /// with boxes in cxcywh format, in model-input pixel coordinates.
    fn infer(&mut self, input: &Array<f32, IxDyn>) -> anyhow::Result<ArrayD<f32>>;
}
