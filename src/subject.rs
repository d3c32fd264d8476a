use image::imageops::{self, FilterType};
use image::{DynamicImage, GenericImageView, GrayImage, RgbImage};
use imageproc::template_matching::{find_extremes, match_template, MatchTemplateMethod};

use crate::config::CalibrationParameters;
use crate::error::{Error, Result};
use crate::types::{Point, Region, SubjectLocation};

/// Reference image of the player, pre-scaled and converted to luma.
#[derive(Clone, Debug)]
pub struct Template {
    pub image: GrayImage,
    pub width: u32,
    pub height: u32,
}

impl Template {
    /// Loads the template from disk and scales it by `scale`.
    pub fn load(path: &str, scale: f32) -> Result<Template> {
        let img = image::open(path)?;
        let template = Self::from_image(&img, scale)?;
        log::info!(
            "Loaded player template {} ({}x{} after scaling by {})",
            path,
            template.width,
            template.height,
            scale
        );
        Ok(template)
    }

    pub fn from_image(img: &DynamicImage, scale: f32) -> Result<Template> {
        let (width, height) = img.dimensions();
        let scaled_width = (width as f32 * scale).round() as u32;
        let scaled_height = (height as f32 * scale).round() as u32;
        if scaled_width == 0 || scaled_height == 0 {
            return Err(Error::InvalidFrameSize {
                width: scaled_width,
                height: scaled_height,
                required_width: 1,
                required_height: 1,
            });
        }

        let luma = img.to_luma8();
        let image = if (scaled_width, scaled_height) == (width, height) {
            luma
        } else {
            imageops::resize(&luma, scaled_width, scaled_height, FilterType::Triangle)
        };

        Ok(Template {
            image,
            width: scaled_width,
            height: scaled_height,
        })
    }
}

/// Ground-contact point and bounds for a template match at `match_location`
/// (relative to a search window starting at row `window_offset`).
pub fn reference_point(
    match_location: (u32, u32),
    template_size: (u32, u32),
    window_offset: u32,
    base_offset: u32,
) -> SubjectLocation {
    let (match_x, match_y) = match_location;
    let (template_width, template_height) = template_size;
    let top = match_y + window_offset;

    SubjectLocation {
        point: Point::new(
            match_x + template_width / 2,
            (top + template_height).saturating_sub(base_offset),
        ),
        bounds: Region::from_corners(
            Point::new(match_x, top),
            Point::new(match_x + template_width, top + template_height),
        ),
    }
}

/// Finds the player inside the search band of a normalized frame.
///
/// The best normalized cross-correlation score always wins; there is no
/// confidence floor, so an occluded player still yields a location.
pub fn locate_subject(
    frame: &RgbImage,
    template: &Template,
    calibration: &CalibrationParameters,
) -> Result<SubjectLocation> {
    let (width, height) = frame.dimensions();
    let (window_start, window_end) = calibration.search_rows(height);
    let window_height = window_end - window_start;

    if width < template.width || window_height < template.height {
        return Err(Error::InvalidFrameSize {
            width,
            height: window_height,
            required_width: template.width,
            required_height: template.height,
        });
    }

    let window = imageops::crop_imm(frame, 0, window_start, width, window_height).to_image();
    let window = DynamicImage::ImageRgb8(window).to_luma8();

    let scores = match_template(
        &window,
        &template.image,
        MatchTemplateMethod::CrossCorrelationNormalized,
    );
    let extremes = find_extremes(&scores);

    log::trace!(
        "Template match at {:?} (score {:.3})",
        extremes.max_value_location,
        extremes.max_value
    );

    Ok(reference_point(
        extremes.max_value_location,
        (template.width, template.height),
        window_start,
        calibration.base_offset,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    /// Small non-uniform pattern standing in for the player figure.
    fn figure(size: u32) -> RgbImage {
        RgbImage::from_fn(size, size, |x, y| {
            let v = ((x * 37 + y * 91) % 200 + 40) as u8;
            Rgb([v, 255 - v, (x * 8) as u8])
        })
    }

    fn small_calibration() -> CalibrationParameters {
        CalibrationParameters {
            frame_width: 90,
            frame_height: 160,
            frame_margin: 10,
            template_scale: 1.0,
            base_offset: 2,
            window_offset: 40,
            window_bottom: 20,
            ..CalibrationParameters::default()
        }
    }

    #[test]
    fn test_reference_point_offsets() {
        let location = reference_point((10, 20), (50, 50), 300, 20);
        assert_eq!(location.point, Point::new(35, 350));
        assert_eq!(location.bounds.top_left, Point::new(10, 320));
        assert_eq!(location.bounds.bottom_right, Point::new(60, 370));
    }

    #[test]
    fn test_reference_point_odd_width_truncates() {
        let location = reference_point((10, 0), (51, 10), 0, 0);
        assert_eq!(location.point, Point::new(35, 10));
    }

    #[test]
    fn test_template_scaling_rounds() {
        let img = DynamicImage::ImageLuma8(GrayImage::from_pixel(50, 30, Luma([100])));
        let template = Template::from_image(&img, 0.75).unwrap();
        assert_eq!((template.width, template.height), (38, 23));
        assert_eq!(template.image.dimensions(), (38, 23));
    }

    #[test]
    fn test_template_scaled_to_nothing_is_rejected() {
        let img = DynamicImage::ImageLuma8(GrayImage::new(2, 2));
        assert!(Template::from_image(&img, 0.1).is_err());
    }

    #[test]
    fn test_locates_pasted_figure() {
        let calibration = small_calibration();
        let sprite = figure(12);
        let template = Template::from_image(&DynamicImage::ImageRgb8(sprite.clone()), 1.0).unwrap();

        let mut frame = RgbImage::from_pixel(90, 160, Rgb([60, 60, 60]));
        imageops::replace(&mut frame, &sprite, 30, 100);

        let location = locate_subject(&frame, &template, &calibration).unwrap();
        assert_eq!(location.bounds.top_left, Point::new(30, 100));
        assert_eq!(location.bounds.bottom_right, Point::new(42, 112));
        assert_eq!(location.point, Point::new(36, 110));
    }

    #[test]
    fn test_region_is_ordered_for_any_frame() {
        let calibration = small_calibration();
        let template = Template::from_image(&DynamicImage::ImageRgb8(figure(8)), 1.0).unwrap();

        for seed in 0..4u32 {
            let frame = RgbImage::from_fn(90, 160, |x, y| {
                let v = ((x * (seed + 3) + y * (seed + 7)) % 251) as u8;
                Rgb([v, v / 2, 255 - v])
            });
            let location = locate_subject(&frame, &template, &calibration).unwrap();
            let bounds = location.bounds;
            assert!(bounds.top_left.x <= bounds.bottom_right.x);
            assert!(bounds.top_left.y <= bounds.bottom_right.y);
            assert!(bounds.top_left.y >= calibration.window_offset);
            assert!(bounds.bottom_right.y <= 160 - calibration.window_bottom);
        }
    }

    #[test]
    fn test_window_smaller_than_template() {
        let calibration = small_calibration();
        let template = Template::from_image(&DynamicImage::ImageRgb8(figure(12)), 1.0).unwrap();
        let frame = RgbImage::new(90, 60);

        assert!(matches!(
            locate_subject(&frame, &template, &calibration),
            Err(Error::InvalidFrameSize { .. })
        ));
    }
}
