use crate::labels;

/// Letterbox geometry needed to map model-space boxes back onto the frame.
#[derive(Debug, Clone, Copy)]
pub struct TransformParams {
    pub orig_width: u32,
    pub orig_height: u32,
    pub scale: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
    pub confidence: f32,
    pub class_id: usize,
}

impl Detection {
    pub fn label(&self) -> &'static str {
        labels::class_name(self.class_id)
    }

    /// Integer pixel corners `[x1, y1, x2, y2]`.
    ///
    /// Floors the top-left corner and ceils the bottom-right one (clamped to
    /// the frame) so thin boxes keep x1 < x2 and y1 < y2 after conversion.
    pub fn pixel_bbox(&self, frame_width: u32, frame_height: u32) -> [i32; 4] {
        [
            self.x1.floor() as i32,
            self.y1.floor() as i32,
            (self.x2.ceil() as i32).min(frame_width as i32),
            (self.y2.ceil() as i32).min(frame_height as i32),
        ]
    }

    fn area(&self) -> f32 {
        (self.x2 - self.x1) * (self.y2 - self.y1)
    }

    fn intersection_area(&self, other: &Detection) -> f32 {
        let x1 = self.x1.max(other.x1);
        let y1 = self.y1.max(other.y1);
        let x2 = self.x2.min(other.x2);
        let y2 = self.y2.min(other.y2);

        if x2 > x1 && y2 > y1 {
            (x2 - x1) * (y2 - y1)
        } else {
            0.0
        }
    }

    pub fn iou(&self, other: &Detection) -> f32 {
        let intersection = self.intersection_area(other);
        let union = self.area() + other.area() - intersection;

        if union > 0.0 { intersection / union } else { 0.0 }
    }
}

pub struct PostProcessor {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl PostProcessor {
    pub fn new(confidence_threshold: f32, iou_threshold: f32) -> Self {
        Self {
            confidence_threshold,
            iou_threshold,
        }
    }

    /// Parse raw YOLO predictions into detections in original-frame
    /// coordinates.
    ///
    /// The tensor layout is `[1, 4 + num_classes, num_anchors]`: rows 0..4
    /// hold cxcywh boxes in model-input pixels, the remaining rows hold
    /// per-class scores already in [0,1].
    pub fn parse_detections(
        &self,
        preds: &ndarray::ArrayViewD<f32>,
        transform: &TransformParams,
    ) -> anyhow::Result<Vec<Detection>> {
        let shape = preds.shape();
        if shape.len() != 3 || shape[0] != 1 || shape[1] <= 4 {
            return Err(anyhow::anyhow!(
                "Unexpected prediction tensor shape {:?}",
                shape
            ));
        }
        let num_classes = shape[1] - 4;
        let num_anchors = shape[2];

        let mut candidates = Vec::new();

        for i in 0..num_anchors {
            // Argmax over class scores for this anchor
            let mut confidence = f32::NEG_INFINITY;
            let mut class_id = 0usize;
            for c in 0..num_classes {
                let score = preds[[0, 4 + c, i]];
                if score > confidence {
                    confidence = score;
                    class_id = c;
                }
            }

            if confidence < self.confidence_threshold {
                continue;
            }

            let cx = preds[[0, 0, i]];
            let cy = preds[[0, 1, i]];
            let w = preds[[0, 2, i]];
            let h = preds[[0, 3, i]];

            let (x1_input, y1_input, x2_input, y2_input) = cxcywh_to_xyxy(cx, cy, w, h);

            // Apply inverse letterbox transform to original image coordinates
            let x1 = ((x1_input - transform.offset_x) / transform.scale)
                .max(0.0)
                .min(transform.orig_width as f32);
            let y1 = ((y1_input - transform.offset_y) / transform.scale)
                .max(0.0)
                .min(transform.orig_height as f32);
            let x2 = ((x2_input - transform.offset_x) / transform.scale)
                .max(0.0)
                .min(transform.orig_width as f32);
            let y2 = ((y2_input - transform.offset_y) / transform.scale)
                .max(0.0)
                .min(transform.orig_height as f32);

            // Boxes clamped to nothing (entirely outside the frame) are dropped
            if x2 <= x1 || y2 <= y1 {
                continue;
            }

            candidates.push(Detection {
                x1,
                y1,
                x2,
                y2,
                confidence,
                class_id,
            });
        }

        Ok(non_max_suppression(candidates, self.iou_threshold))
    }
}

/// Greedy class-aware NMS: candidates are visited in descending confidence
/// and dropped when they overlap an already kept box of the same class above
/// the IoU threshold.
fn non_max_suppression(mut candidates: Vec<Detection>, iou_threshold: f32) -> Vec<Detection> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(candidates.len());
    'candidates: for det in candidates {
        for prev in &kept {
            if prev.class_id == det.class_id && prev.iou(&det) > iou_threshold {
                continue 'candidates;
            }
        }
        kept.push(det);
    }
    kept
}

/// Convert bounding box from center-width-height format to corner format
#[inline]
fn cxcywh_to_xyxy(cx: f32, cy: f32, w: f32, h: f32) -> (f32, f32, f32, f32) {
    let x1 = cx - w / 2.0;
    let y1 = cy - h / 2.0;
    let x2 = cx + w / 2.0;
    let y2 = cy + h / 2.0;
    (x1, y1, x2, y2)
}
