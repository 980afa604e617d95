use crate::{
    backend::DetectorBackend,
    config::DetectorConfig,
    postprocessing::{Detection, PostProcessor, TransformParams},
    preprocessing::PreProcessor,
};
use image::RgbImage;
use std::sync::Mutex;

/// Process-wide detection handle: one loaded model plus its pre- and
/// postprocessing, shared read-only across requests.
///
/// The ORT session needs `&mut` for `run`, so the backend sits behind a
/// mutex; everything else is immutable after construction.
pub struct Detector<B: DetectorBackend> {
    backend: Mutex<B>,
    preprocessor: PreProcessor,
    postprocessor: PostProcessor,
}

impl<B: DetectorBackend> Detector<B> {
    pub fn new(backend: B, config: DetectorConfig) -> Self {
        let preprocessor = PreProcessor::new(config.input_size);
        let postprocessor = PostProcessor::new(config.confidence_threshold, config.iou_threshold);
        Self {
            backend: Mutex::new(backend),
            preprocessor,
            postprocessor,
        }
    }

    /// Run the full pipeline over one decoded frame:
    /// letterbox -> infer -> parse, with boxes in original-frame coordinates.
    pub fn detect(&self, frame: &RgbImage) -> anyhow::Result<Vec<Detection>> {
        let (width, height) = frame.dimensions();

        let (input, scale, offset_x, offset_y) = self.preprocessor.prepare(frame)?;

        let preds = {
            let mut backend = self
                .backend
                .lock()
                .map_err(|_| anyhow::anyhow!("Model session lock poisoned"))?;
            backend.infer(&input)?
        };

        let transform = TransformParams {
            orig_width: width,
            orig_height: height,
            scale,
            offset_x,
            offset_y,
        };

        let detections = self
            .postprocessor
            .parse_detections(&preds.view(), &transform)?;

        tracing::debug!(count = detections.len(), width, height, "Frame processed");

        Ok(detections)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{Array, ArrayD, IxDyn};

    /// Backend that replays a canned prediction tensor
    struct CannedBackend {
        preds: ArrayD<f32>,
    }

    impl DetectorBackend for CannedBackend {
        fn load_model(_path: &str) -> anyhow::Result<Self> {
            Err(anyhow::anyhow!("canned backend has no model file"))
        }

        fn infer(&mut self, _input: &Array<f32, IxDyn>) -> anyhow::Result<ArrayD<f32>> {
            Ok(self.preds.clone())
        }
    }

    fn canned_preds(anchors: &[([f32; 4], usize, f32)]) -> ArrayD<f32> {
        let mut preds = Array::zeros(IxDyn(&[1, 84, anchors.len()]));
        for (i, (bbox, class_id, score)) in anchors.iter().enumerate() {
            for (row, coord) in bbox.iter().enumerate() {
                preds[[0, row, i]] = *coord;
            }
            preds[[0, 4 + class_id, i]] = *score;
        }
        preds
    }

    fn test_detector(anchors: &[([f32; 4], usize, f32)]) -> Detector<CannedBackend> {
        let backend = CannedBackend {
            preds: canned_preds(anchors),
        };
        Detector::new(backend, DetectorConfig::test_default())
    }

    #[test]
    fn detections_respect_threshold_and_bounds() {
        // One strong dog, one weak anchor that must be filtered
        let detector = test_detector(&[
            ([320.0, 320.0, 100.0, 100.0], 16, 0.9),
            ([100.0, 100.0, 40.0, 40.0], 0, 0.2),
        ]);
        let frame = RgbImage::from_pixel(640, 640, image::Rgb([50, 80, 120]));

        let detections = detector.detect(&frame).unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert_eq!(det.label(), "dog");
        assert!(det.confidence >= 0.5);
        assert!(det.x1 >= 0.0 && det.y1 >= 0.0);
        assert!(det.x2 <= 640.0 && det.y2 <= 640.0);
        assert!(det.x1 < det.x2 && det.y1 < det.y2);
    }

    #[test]
    fn boxes_map_back_onto_letterboxed_frame() {
        // 320x240 frame: scale 2.0, 80px vertical letterbox bands.
        // Input-space box (220,220,420,420) -> frame (110, 70, 210, 170).
        let detector = test_detector(&[([320.0, 320.0, 200.0, 200.0], 0, 0.9)]);
        let frame = RgbImage::from_pixel(320, 240, image::Rgb([0, 0, 0]));

        let detections = detector.detect(&frame).unwrap();

        assert_eq!(detections.len(), 1);
        let det = &detections[0];
        assert!((det.x1 - 110.0).abs() < 0.1);
        assert!((det.y1 - 70.0).abs() < 0.1);
        assert!((det.x2 - 210.0).abs() < 0.1);
        assert!((det.y2 - 170.0).abs() < 0.1);
    }

    #[test]
    fn detection_is_deterministic() {
        let detector = test_detector(&[
            ([320.0, 320.0, 100.0, 100.0], 16, 0.9),
            ([150.0, 150.0, 80.0, 80.0], 2, 0.7),
        ]);
        let frame = RgbImage::from_pixel(640, 640, image::Rgb([128, 128, 128]));

        let first = detector.detect(&frame).unwrap();
        let second = detector.detect(&frame).unwrap();

        assert_eq!(first, second);
    }
}
