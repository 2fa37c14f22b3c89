//! PNG encoding and the size-constraint pass
//!
//! Capture strategies hand over raw PNG bytes at whatever resolution the
//! platform produced. [`constrain`] turns those into delivery bytes that
//! honor both limits from the request:
//!
//! 1. Downscale (aspect-preserving) if either dimension exceeds
//!    `max_dimension`.
//! 2. Re-encode at rising PNG compression, then at progressively smaller
//!    scales, until the encoded size fits `max_bytes`.
//!
//! If no attempt fits before the image would shrink below a usable floor,
//! the request fails with `SizeConstraintUnsatisfiable` rather than silently
//! exceeding its limits.

use std::io::Cursor;

use image::{
    ImageEncoder,
    codecs::png::{CompressionType, FilterType, PngEncoder},
};

use crate::{
    capture::Frame,
    error::{CaptureError, CaptureResult},
};

/// Shrink factor applied per re-encode attempt when over the byte budget
const SHRINK_STEP: f32 = 0.7;

/// Images are never shrunk below this edge length; past it the content is
/// unreadable anyway and the constraint is declared unsatisfiable.
const MIN_DIMENSION: u32 = 64;

/// Encodes a frame as PNG with the given compression level
pub fn encode_png(frame: &Frame, compression: CompressionType) -> CaptureResult<Vec<u8>> {
    let (width, height) = frame.dimensions();
    if width == 0 || height == 0 {
        return Err(CaptureError::EncodingFailed {
            format: "png".to_string(),
            reason: "image dimensions must be > 0".to_string(),
        });
    }

    let mut output = Vec::new();
    let encoder =
        PngEncoder::new_with_quality(Cursor::new(&mut output), compression, FilterType::Adaptive);

    let rgba = frame.inner().to_rgba8();
    encoder
        .write_image(rgba.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .map_err(|e| CaptureError::EncodingFailed {
            format: "png".to_string(),
            reason: e.to_string(),
        })?;

    Ok(output)
}

/// Applies the dimension and byte-size constraints to raw capture bytes
///
/// Returns the final encoded bytes together with their dimensions. The
/// returned bytes always satisfy `width <= max_dimension`,
/// `height <= max_dimension`, and `len <= max_bytes`.
pub fn constrain(
    raw: &[u8],
    max_dimension: u32,
    max_bytes: u64,
) -> CaptureResult<(Vec<u8>, u32, u32)> {
    // Resizing floors at one pixel, so a zero bound could never be met and
    // would otherwise slip through as a 1x1 image.
    if max_dimension == 0 {
        return Err(CaptureError::EncodingFailed {
            format: "png".to_string(),
            reason: "max_dimension must be > 0".to_string(),
        });
    }

    let mut frame = Frame::from_png_bytes(raw)?.scale_to_fit(max_dimension);

    // Default compression first: much faster, usually fits.
    let bytes = encode_png(&frame, CompressionType::Default)?;
    if bytes.len() as u64 <= max_bytes {
        let (width, height) = frame.dimensions();
        return Ok((bytes, width, height));
    }

    let bytes = encode_png(&frame, CompressionType::Best)?;
    let mut best_bytes = bytes.len() as u64;
    if best_bytes <= max_bytes {
        let (width, height) = frame.dimensions();
        return Ok((bytes, width, height));
    }

    // Compression alone is not enough; trade resolution for size.
    loop {
        let (width, height) = frame.dimensions();
        if width.min(height) <= MIN_DIMENSION {
            return Err(CaptureError::SizeConstraintUnsatisfiable {
                max_bytes,
                best_bytes,
            });
        }

        frame = frame.scale_by(SHRINK_STEP)?;
        let bytes = encode_png(&frame, CompressionType::Best)?;
        best_bytes = best_bytes.min(bytes.len() as u64);

        if bytes.len() as u64 <= max_bytes {
            let (width, height) = frame.dimensions();
            return Ok((bytes, width, height));
        }
    }
}
