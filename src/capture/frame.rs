//! Image frame wrapper for captured pixel data
//!
//! [`Frame`] wraps `image::DynamicImage` with the transformations the
//! constraint pass needs: aspect-preserving downscale and proportional
//! shrink. Transformations return new frames; the original is unchanged.
//!
//! # Examples
//!
//! ```
//! use winshot::capture::Frame;
//!
//! let frame = Frame::from_test_pattern(1920, 1080);
//! let fitted = frame.scale_to_fit(800);
//! assert_eq!(fitted.dimensions(), (800, 450));
//! ```

use image::DynamicImage;

use crate::error::{CaptureError, CaptureResult};

/// Wrapper around `image::DynamicImage` with capture-oriented transformations
#[derive(Clone, Debug)]
pub struct Frame {
    inner: DynamicImage,
}

impl Frame {
    /// Creates a frame from a decoded image
    pub fn new(image: DynamicImage) -> Self {
        Self { inner: image }
    }

    /// Decodes PNG bytes produced by a capture strategy
    ///
    /// Decode failures are reported as [`CaptureError::EncodingFailed`];
    /// strategies hand over opaque byte buffers and a truncated or corrupt
    /// buffer is indistinguishable from a codec fault at this point.
    pub fn from_png_bytes(bytes: &[u8]) -> CaptureResult<Self> {
        let image = image::load_from_memory_with_format(bytes, image::ImageFormat::Png).map_err(
            |e| CaptureError::EncodingFailed {
                format: "png".to_string(),
                reason: format!("decode failed: {}", e),
            },
        )?;
        Ok(Self::new(image))
    }

    /// Returns (width, height) in pixels
    pub fn dimensions(&self) -> (u32, u32) {
        (self.inner.width(), self.inner.height())
    }

    /// Access to the wrapped image
    pub fn inner(&self) -> &DynamicImage {
        &self.inner
    }

    /// Downscales so that neither dimension exceeds `max_dimension`
    ///
    /// Aspect ratio is preserved. Frames already within the bound are
    /// returned unchanged (cheap clone of the same pixel data).
    pub fn scale_to_fit(&self, max_dimension: u32) -> Frame {
        let (width, height) = self.dimensions();
        if width <= max_dimension && height <= max_dimension {
            return self.clone();
        }

        // DynamicImage::resize preserves aspect ratio within the bounds.
        let resized = self
            .inner
            .resize(max_dimension, max_dimension, image::imageops::FilterType::Lanczos3);
        Frame::new(resized)
    }

    /// Shrinks both dimensions by `factor` (0 < factor < 1)
    pub fn scale_by(&self, factor: f32) -> CaptureResult<Frame> {
        if !(factor > 0.0 && factor < 1.0) {
            return Err(CaptureError::EncodingFailed {
                format: "png".to_string(),
                reason: format!("invalid shrink factor {}", factor),
            });
        }

        let (width, height) = self.dimensions();
        let new_width = ((width as f32 * factor) as u32).max(1);
        let new_height = ((height as f32 * factor) as u32).max(1);

        let resized =
            self.inner
                .resize_exact(new_width, new_height, image::imageops::FilterType::Lanczos3);
        Ok(Frame::new(resized))
    }

    /// Generates a gradient test pattern, used by the mock backend and tests
    pub fn from_test_pattern(width: u32, height: u32) -> Frame {
        let buffer = image::RgbaImage::from_fn(width, height, |x, y| {
            let r = (x * 255 / width.max(1)) as u8;
            let g = (y * 255 / height.max(1)) as u8;
            let b = ((x + y) * 255 / (width + height).max(1)) as u8;
            image::Rgba([r, g, b, 255])
        });
        Frame::new(DynamicImage::ImageRgba8(buffer))
    }
}
