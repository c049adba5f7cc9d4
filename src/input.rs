//! Encoded image input.
//!
//! Every classification starts from an [`ImageInput`]. Validation only reads
//! the container header, so the pixel payload is decoded at most once, by the
//! backend that needs it.

use std::io::Cursor;
use std::sync::Arc;

use image::{ImageFormat, ImageReader};
use sha2::{Digest, Sha256};

use crate::detect::DetectError;

/// Encoded formats accepted by the pipeline.
pub const SUPPORTED_FORMATS: [ImageFormat; 2] = [ImageFormat::Jpeg, ImageFormat::Png];

/// Validated, immutable image bytes.
///
/// Cloning is cheap; the payload is shared.
#[derive(Clone, Debug)]
pub struct ImageInput {
    bytes: Arc<[u8]>,
    format: ImageFormat,
    width: u32,
    height: u32,
    fingerprint: [u8; 32],
}

impl ImageInput {
    /// Validate raw bytes from a camera or file.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DetectError> {
        if bytes.is_empty() {
            return Err(DetectError::InvalidImageData("empty buffer".into()));
        }

        let format = image::guess_format(bytes)
            .map_err(|e| DetectError::InvalidImageData(format!("unrecognised container: {}", e)))?;
        if !SUPPORTED_FORMATS.contains(&format) {
            return Err(DetectError::UnsupportedImageFormat(format!("{:?}", format)));
        }

        let (width, height) = ImageReader::with_format(Cursor::new(bytes), format)
            .into_dimensions()
            .map_err(|e| DetectError::InvalidImageData(e.to_string()))?;
        if width == 0 || height == 0 {
            return Err(DetectError::InvalidImageData(format!(
                "degenerate dimensions {}x{}",
                width, height
            )));
        }

        Ok(Self {
            bytes: Arc::from(bytes),
            format,
            width,
            height,
            fingerprint: Sha256::digest(bytes).into(),
        })
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn format(&self) -> ImageFormat {
        self.format
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    /// SHA-256 of the encoded bytes.
    pub fn fingerprint(&self) -> [u8; 32] {
        self.fingerprint
    }

    pub fn fingerprint_hex(&self) -> String {
        hex::encode(self.fingerprint)
    }

    /// Decode the full image to 8-bit RGB.
    pub fn decode_rgb(&self) -> Result<image::RgbImage, DetectError> {
        image::load_from_memory_with_format(&self.bytes, self.format)
            .map(|img| img.to_rgb8())
            .map_err(|e| DetectError::InvalidImageData(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cable::CableType;
    use crate::synthetic;

    #[test]
    fn accepts_png_and_reads_dimensions() {
        let png = synthetic::cable_image(CableType::UsbC, 64, 48, 1).unwrap();
        let input = ImageInput::from_bytes(&png).unwrap();
        assert_eq!(input.format(), ImageFormat::Png);
        assert_eq!((input.width(), input.height()), (64, 48));
        assert_eq!(input.fingerprint_hex().len(), 64);
        assert_eq!(input.decode_rgb().unwrap().dimensions(), (64, 48));
    }

    #[test]
    fn accepts_jpeg() {
        let jpeg = synthetic::encode(&synthetic::cable_pixels(CableType::Lightning, 32, 32, 2), ImageFormat::Jpeg)
            .unwrap();
        let input = ImageInput::from_bytes(&jpeg).unwrap();
        assert_eq!(input.format(), ImageFormat::Jpeg);
    }

    #[test]
    fn rejects_empty_and_garbage() {
        assert!(matches!(
            ImageInput::from_bytes(&[]),
            Err(DetectError::InvalidImageData(_))
        ));
        assert!(matches!(
            ImageInput::from_bytes(b"definitely not an image"),
            Err(DetectError::InvalidImageData(_))
        ));
    }

    #[test]
    fn rejects_truncated_jpeg_header() {
        // SOI + APP0 marker only, as produced by a stub camera.
        let err = ImageInput::from_bytes(&[0xFF, 0xD8, 0xFF, 0xE0]).unwrap_err();
        assert!(matches!(err, DetectError::InvalidImageData(_)));
    }

    #[test]
    fn rejects_recognised_but_unsupported_format() {
        let gif = b"GIF89a\x01\x00\x01\x00\x00\x00\x00;";
        let err = ImageInput::from_bytes(gif).unwrap_err();
        assert!(matches!(err, DetectError::UnsupportedImageFormat(_)));
    }

    #[test]
    fn identical_bytes_share_fingerprint() {
        let a = synthetic::cable_image(CableType::UsbA, 16, 16, 9).unwrap();
        let b = synthetic::cable_image(CableType::UsbA, 16, 16, 9).unwrap();
        let c = synthetic::cable_image(CableType::UsbA, 16, 16, 10).unwrap();
        let fa = ImageInput::from_bytes(&a).unwrap().fingerprint();
        assert_eq!(fa, ImageInput::from_bytes(&b).unwrap().fingerprint());
        assert_ne!(fa, ImageInput::from_bytes(&c).unwrap().fingerprint());
    }
}
