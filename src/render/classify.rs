//! Decide whether bytes or files are displayable images.
//!
//! A payload counts as an image only if it decodes and is larger than one
//! pixel; 1×1 images are tracking pixels and are never shown.

use std::path::Path;

use tracing::debug;

/// Outcome of classifying a payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    /// Decoded into an image of the given size.
    Image { width: u32, height: u32 },
    /// Did not decode, or decoded into a single pixel.
    NotImage,
}

impl ImageKind {
    fn from_dimensions(width: u32, height: u32) -> Self {
        if width == 1 && height == 1 {
            ImageKind::NotImage
        } else {
            ImageKind::Image { width, height }
        }
    }

    pub fn is_image(self) -> bool {
        matches!(self, ImageKind::Image { .. })
    }
}

/// Classify an in-memory payload.
pub fn classify_bytes(bytes: &[u8]) -> ImageKind {
    match image::load_from_memory(bytes) {
        Ok(img) => ImageKind::from_dimensions(img.width(), img.height()),
        Err(e) => {
            debug!(len = bytes.len(), error = %e, "Payload is not an image");
            ImageKind::NotImage
        }
    }
}

/// Classify a file on disk. Unreadable files are not images.
pub fn classify_path(path: &Path) -> ImageKind {
    let decoded = image::ImageReader::open(path)
        .and_then(|reader| reader.with_guessed_format())
        .map_err(image::ImageError::IoError)
        .and_then(|reader| reader.decode());

    match decoded {
        Ok(img) => ImageKind::from_dimensions(img.width(), img.height()),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "File is not an image");
            ImageKind::NotImage
        }
    }
}

/// Shorthand for `classify_bytes(bytes).is_image()`.
pub fn is_image(bytes: &[u8]) -> bool {
    classify_bytes(bytes).is_image()
}

/// Shorthand for `classify_path(path).is_image()`.
pub fn is_image_file(path: &Path) -> bool {
    classify_path(path).is_image()
}

#[cfg(test)]
pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = image::RgbImage::from_pixel(width, height, image::Rgb([200, 40, 40]));
    let mut buf = std::io::Cursor::new(Vec::new());
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut buf, image::ImageFormat::Png)
        .expect("encode png");
    buf.into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_real_image_is_accepted() {
        let kind = classify_bytes(&png_bytes(4, 3));
        assert_eq!(
            kind,
            ImageKind::Image {
                width: 4,
                height: 3
            }
        );
    }

    #[test]
    fn test_tracking_pixel_is_rejected() {
        assert_eq!(classify_bytes(&png_bytes(1, 1)), ImageKind::NotImage);
    }

    #[test]
    fn test_one_pixel_wide_strip_is_still_an_image() {
        assert!(is_image(&png_bytes(1, 5)));
    }

    #[test]
    fn test_garbage_is_not_an_image() {
        assert!(!is_image(b"definitely not a picture"));
        assert!(!is_image(&[]));
        // Truncated PNG header
        assert!(!is_image(&png_bytes(4, 4)[..20]));
    }

    #[test]
    fn test_classify_path() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("good");
        let bad = dir.path().join("bad");
        std::fs::write(&good, png_bytes(3, 3)).unwrap();
        std::fs::write(&bad, b"<html></html>").unwrap();

        assert!(is_image_file(&good));
        assert!(!is_image_file(&bad));
        assert!(!is_image_file(&dir.path().join("missing")));
    }
}
