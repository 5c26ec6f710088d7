//! Intensity extraction: the mean of one color channel over a region of interest.
//!
//! Extraction is a pure function of the decoded image and the settings. Image
//! decoding lives in [`decoder`] so callers can check for unreadable images
//! before measuring anything.

use image::RgbImage;

use crate::domain::{Channel, ExtractionSettings, Roi, RoiPolicy};
use crate::error::CalibrationError;

pub mod decoder;

pub use decoder::{FsImageDecoder, ImageDecoder};

/// Mean channel value over the region of interest.
///
/// With [`RoiPolicy::Truncate`] a region that runs past the image edge is
/// clipped and the remaining pixels are averaged (with a warning). With
/// [`RoiPolicy::Strict`] it is rejected. A region that covers no pixel at all
/// is rejected under both policies.
pub fn extract(image: &RgbImage, settings: &ExtractionSettings) -> Result<f64, CalibrationError> {
    let (width, height) = image.dimensions();
    let roi = resolve_region(&settings.roi, settings.policy, width, height)?;
    Ok(region_mean(image, &roi, settings.channel))
}

/// Apply the out-of-bounds policy and return the region actually sampled.
pub fn resolve_region(
    roi: &Roi,
    policy: RoiPolicy,
    width: u32,
    height: u32,
) -> Result<Roi, CalibrationError> {
    let out_of_bounds = || CalibrationError::RegionOutOfBounds {
        roi: *roi,
        width,
        height,
    };

    if roi.fits_within(width, height) {
        return Ok(*roi);
    }

    match policy {
        RoiPolicy::Strict => Err(out_of_bounds()),
        RoiPolicy::Truncate => {
            let clipped = roi.clip_to(width, height).ok_or_else(out_of_bounds)?;
            log::warn!(
                "region ({roi}) exceeds the {width}x{height} image; averaging the clipped region ({clipped})"
            );
            Ok(clipped)
        }
    }
}

/// Mean of `channel` over `roi`, which must lie inside the image.
fn region_mean(image: &RgbImage, roi: &Roi, channel: Channel) -> f64 {
    let idx = channel.rgb_index();
    let mut sum = 0u64;
    for y in roi.y..roi.bottom() {
        for x in roi.x..roi.right() {
            sum += u64::from(image.get_pixel(x, y).0[idx]);
        }
    }
    sum as f64 / roi.area() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn gradient_image(width: u32, height: u32) -> RgbImage {
        // Blue encodes x, green encodes y, red is constant.
        RgbImage::from_fn(width, height, |x, y| Rgb([7, (y % 256) as u8, (x % 256) as u8]))
    }

    fn settings(roi: Roi, policy: RoiPolicy) -> ExtractionSettings {
        ExtractionSettings {
            roi,
            channel: Channel::Blue,
            policy,
        }
    }

    #[test]
    fn mean_of_uniform_region_is_the_pixel_value() {
        let img = RgbImage::from_pixel(200, 200, Rgb([10, 20, 143]));
        let v = extract(&img, &ExtractionSettings::default()).unwrap();
        assert_eq!(v, 143.0);
    }

    #[test]
    fn mean_matches_exact_pixel_average() {
        let img = gradient_image(200, 200);
        // Blue = x over x in 50..150 -> mean 99.5
        let v = extract(&img, &settings(Roi::new(50, 50, 100, 100), RoiPolicy::Strict)).unwrap();
        assert!((v - 99.5).abs() < 1e-12);
        assert!((0.0..=255.0).contains(&v));
    }

    #[test]
    fn channel_selection_reads_the_requested_component() {
        let img = gradient_image(200, 200);
        let mut s = settings(Roi::new(0, 10, 4, 2), RoiPolicy::Strict);
        s.channel = Channel::Green;
        // Green = y over y in 10..12 -> 10.5
        assert!((extract(&img, &s).unwrap() - 10.5).abs() < 1e-12);
        s.channel = Channel::Red;
        assert_eq!(extract(&img, &s).unwrap(), 7.0);
    }

    #[test]
    fn truncate_policy_averages_clipped_region() {
        let img = gradient_image(120, 120);
        // Region x in 50..150 clips to 50..120 -> mean of 50..=119 = 84.5
        let v = extract(&img, &settings(Roi::new(50, 50, 100, 100), RoiPolicy::Truncate)).unwrap();
        assert!((v - 84.5).abs() < 1e-12);
    }

    #[test]
    fn strict_policy_rejects_partial_region() {
        let img = gradient_image(120, 120);
        let err = extract(&img, &settings(Roi::new(50, 50, 100, 100), RoiPolicy::Strict)).unwrap_err();
        assert_eq!(
            err,
            CalibrationError::RegionOutOfBounds {
                roi: Roi::new(50, 50, 100, 100),
                width: 120,
                height: 120,
            }
        );
    }

    #[test]
    fn region_outside_image_fails_even_when_truncating() {
        let img = gradient_image(40, 40);
        let err = extract(&img, &settings(Roi::new(50, 50, 100, 100), RoiPolicy::Truncate));
        assert!(matches!(err, Err(CalibrationError::RegionOutOfBounds { .. })));
    }
}
