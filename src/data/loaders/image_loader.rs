//! Loader for standard image formats (PNG, JPEG, BMP, TIFF, WebP).
//!
//! Converts images to single-channel luma arrays.

use ndarray::Array2;

use crate::data::loader::{ItemLoader, LoaderError};

/// Loader for standard image formats.
///
/// The image is converted to 8-bit luma and returned as `(height, width)`
/// with values in 0-255, so array rows are image rows.
pub struct ImageLoader;

impl ItemLoader for ImageLoader {
    fn id(&self) -> &'static str {
        "image"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["png", "jpg", "jpeg", "bmp", "tiff", "tif", "webp"]
    }

    fn can_load(&self, data: &[u8]) -> bool {
        if data.len() < 8 {
            return false;
        }

        // PNG: 89 50 4E 47 0D 0A 1A 0A
        if data.starts_with(&[0x89, 0x50, 0x4E, 0x47, 0x0D, 0x0A, 0x1A, 0x0A]) {
            return true;
        }

        // JPEG: FF D8 FF
        if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
            return true;
        }

        // BMP: 42 4D (BM)
        if data.starts_with(&[0x42, 0x4D]) {
            return true;
        }

        // TIFF: 49 49 2A 00 (little endian) or 4D 4D 00 2A (big endian)
        if data.starts_with(&[0x49, 0x49, 0x2A, 0x00])
            || data.starts_with(&[0x4D, 0x4D, 0x00, 0x2A])
        {
            return true;
        }

        // WebP: RIFF....WEBP
        data.len() >= 12 && data.starts_with(b"RIFF") && &data[8..12] == b"WEBP"
    }

    fn load(&self, data: &[u8]) -> Result<Array2<f64>, LoaderError> {
        let img = image::load_from_memory(data)
            .map_err(|e| LoaderError::new(format!("Failed to decode image: {}", e)))?
            .to_luma8();

        let (width, height) = img.dimensions();
        log::debug!("ImageLoader: decoded {}x{} image", width, height);

        let values: Vec<f64> = img.into_raw().into_iter().map(f64::from).collect();
        Array2::from_shape_vec((height as usize, width as usize), values)
            .map_err(|e| LoaderError::new(format!("invalid image shape: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{DynamicImage, GrayImage, ImageFormat};
    use std::io::Cursor;

    #[test]
    fn test_png_roundtrip_orientation() {
        // 3 wide, 2 tall
        let img = GrayImage::from_raw(3, 2, vec![0, 10, 20, 30, 40, 50]).unwrap();
        let mut bytes = Vec::new();
        DynamicImage::ImageLuma8(img)
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
            .unwrap();

        assert!(ImageLoader.can_load(&bytes));
        let array = ImageLoader.load(&bytes).unwrap();
        assert_eq!(array.dim(), (2, 3));
        assert_eq!(array[[1, 0]], 30.0);
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(!ImageLoader.can_load(b"12345678"));
        assert!(ImageLoader.load(b"definitely not an image").is_err());
    }
}
