//! Image decoding collaborator.
//!
//! The calibration core never decodes images itself; it asks an
//! [`ImageDecoder`] and treats `None` as "unreadable path or format".

use std::path::Path;

use image::RgbImage;

/// Decode an image file into an 8-bit RGB raster.
pub trait ImageDecoder {
    fn decode(&self, path: &Path) -> Option<RgbImage>;
}

/// Decoder backed by the `image` crate (format guessed from content/extension).
#[derive(Debug, Clone, Copy, Default)]
pub struct FsImageDecoder;

impl ImageDecoder for FsImageDecoder {
    fn decode(&self, path: &Path) -> Option<RgbImage> {
        match image::open(path) {
            Ok(img) => {
                log::debug!(
                    "decoded '{}' ({}x{}, {:?})",
                    path.display(),
                    img.width(),
                    img.height(),
                    img.color()
                );
                Some(img.to_rgb8())
            }
            Err(e) => {
                log::debug!("failed to decode '{}': {e}", path.display());
                None
            }
        }
    }
}
