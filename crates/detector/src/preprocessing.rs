use image::{ImageBuffer, Rgb, RgbImage};
use ndarray::{Array, IxDyn};

const LETTERBOX_FILL: u8 = 114;

pub struct PreProcessor {
    input_size: (u32, u32),
}

impl PreProcessor {
    pub fn new(input_size: (u32, u32)) -> Self {
        Self { input_size }
    }

    /// Letterbox the frame into the model input size and produce a
    /// normalized NCHW f32 tensor.
    ///
    /// Returns `(tensor, scale, offset_x, offset_y)` so the caller can map
    /// model-space boxes back onto the original frame.
    pub fn prepare(&self, frame: &RgbImage) -> anyhow::Result<(Array<f32, IxDyn>, f32, f32, f32)> {
        let (width, height) = frame.dimensions();
        if width == 0 || height == 0 {
            return Err(anyhow::anyhow!("Empty frame ({}x{})", width, height));
        }

        let (input_w, input_h) = self.input_size;

        let scale = (input_w as f32 / width as f32).min(input_h as f32 / height as f32);
        // Extreme aspect ratios truncate to zero; the content region must
        // keep at least one pixel per axis
        let new_width = ((width as f32 * scale) as u32).max(1);
        let new_height = ((height as f32 * scale) as u32).max(1);

        let resized = image::imageops::resize(
            frame,
            new_width,
            new_height,
            image::imageops::FilterType::Triangle,
        );

        let mut letterboxed = ImageBuffer::from_pixel(
            input_w,
            input_h,
            Rgb([LETTERBOX_FILL, LETTERBOX_FILL, LETTERBOX_FILL]),
        );
        let offset_x = (input_w - new_width) / 2;
        let offset_y = (input_h - new_height) / 2;
        image::imageops::overlay(&mut letterboxed, &resized, offset_x as i64, offset_y as i64);

        let mut input = Array::zeros(IxDyn(&[1, 3, input_h as usize, input_w as usize]));
        for y in 0..input_h {
            for x in 0..input_w {
                let pixel = letterboxed.get_pixel(x, y);
                input[[0, 0, y as usize, x as usize]] = pixel[0] as f32 / 255.0;
                input[[0, 1, y as usize, x as usize]] = pixel[1] as f32 / 255.0;
                input[[0, 2, y as usize, x as usize]] = pixel[2] as f32 / 255.0;
            }
        }

        Ok((input, scale, offset_x as f32, offset_y as f32))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn solid_frame(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
        ImageBuffer::from_pixel(width, height, Rgb(color))
    }

    #[test]
    fn square_frame_fills_input_without_padding() {
        let pre = PreProcessor::new((640, 640));
        let frame = solid_frame(320, 320, [255, 128, 0]);

        let (input, scale, offset_x, offset_y) = pre.prepare(&frame).unwrap();

        assert_eq!(input.shape(), &[1, 3, 640, 640]);
        assert_eq!(scale, 2.0);
        assert_eq!(offset_x, 0.0);
        assert_eq!(offset_y, 0.0);

        // Center pixel keeps the frame color, normalized to [0,1]
        assert!((input[[0, 0, 320, 320]] - 1.0).abs() < 1e-6);
        assert!((input[[0, 1, 320, 320]] - 128.0 / 255.0).abs() < 1e-6);
        assert!((input[[0, 2, 320, 320]] - 0.0).abs() < 1e-6);
    }

    #[test]
    fn wide_frame_is_letterboxed_vertically() {
        let pre = PreProcessor::new((640, 640));
        let frame = solid_frame(320, 240, [10, 10, 10]);

        let (input, scale, offset_x, offset_y) = pre.prepare(&frame).unwrap();

        // scale = min(640/320, 640/240) = 2.0 -> 640x480 content, 80px bands
        assert_eq!(scale, 2.0);
        assert_eq!(offset_x, 0.0);
        assert_eq!(offset_y, 80.0);

        let fill = LETTERBOX_FILL as f32 / 255.0;
        // Top band is letterbox fill, content region is frame color
        assert!((input[[0, 0, 0, 320]] - fill).abs() < 1e-6);
        assert!((input[[0, 0, 320, 320]] - 10.0 / 255.0).abs() < 1e-6);
    }

    #[test]
    fn extreme_aspect_ratio_keeps_one_pixel_of_content() {
        let pre = PreProcessor::new((640, 640));

        // 1x10000: scale = 0.064, width would truncate to 0 without the clamp
        let tall = solid_frame(1, 10000, [10, 10, 10]);
        let (input, scale, offset_x, _) = pre.prepare(&tall).unwrap();
        assert_eq!(input.shape(), &[1, 3, 640, 640]);
        assert!(scale < 1.0);
        assert_eq!(offset_x, 319.0, "1px content column centered");

        let wide = solid_frame(10000, 1, [10, 10, 10]);
        let (input, _, _, offset_y) = pre.prepare(&wide).unwrap();
        assert_eq!(input.shape(), &[1, 3, 640, 640]);
        assert_eq!(offset_y, 319.0, "1px content row centered");
    }

    #[test]
    fn oversized_frame_is_scaled_down() {
        let pre = PreProcessor::new((640, 640));
        let frame = solid_frame(1280, 960, [200, 200, 200]);

        let (_, scale, offset_x, offset_y) = pre.prepare(&frame).unwrap();

        assert_eq!(scale, 0.5);
        assert_eq!(offset_x, 0.0);
        assert_eq!(offset_y, 80.0);
    }
}
