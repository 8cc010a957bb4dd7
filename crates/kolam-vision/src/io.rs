//! Image decoding into the core grayscale container.

use std::path::Path;

use image::ImageReader;
use kolam_core::GrayImage;

/// Errors raised while loading an image from disk.
///
/// Load failures are pipeline-fatal: no analysis stage runs on an image
/// that could not be decoded.
#[derive(thiserror::Error, Debug)]
pub enum ImageLoadError {
    #[error("failed to open image: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to decode image: {0}")]
    Decode(#[from] image::ImageError),
}

/// Decode any raster format supported by the `image` crate to grayscale.
pub fn load_gray(path: &Path) -> Result<GrayImage, ImageLoadError> {
    let img = ImageReader::open(path)?.decode()?.to_luma8();
    Ok(GrayImage {
        width: img.width() as usize,
        height: img.height() as usize,
        data: img.into_raw(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_is_an_io_error() {
        let err = load_gray(Path::new("/nonexistent/kolam.png")).unwrap_err();
        assert!(matches!(err, ImageLoadError::Io(_)));
    }
}
