use image::RgbImage;

use crate::config::CalibrationParameters;
use crate::error::Result;
use crate::subject::{locate_subject, Template};
use crate::target::locate_target;
use crate::types::{Detection, Point};

/// Press duration in milliseconds for a jump from `subject` to `target`.
///
/// `distance * slope + intercept`, with the distance in pixels.
pub fn estimate_duration(subject: Point, target: Point, slope: f64, intercept: f64) -> f64 {
    subject.distance_to(&target) * slope + intercept
}

/// Runs player detection, platform detection and the timing model on one
/// normalized frame.
pub fn detect(
    frame: &RgbImage,
    template: &Template,
    calibration: &CalibrationParameters,
) -> Result<Detection> {
    let subject = locate_subject(frame, template, calibration)?;
    let target = locate_target(frame, &subject, calibration);
    let duration_ms = estimate_duration(
        subject.point,
        target,
        calibration.slope,
        calibration.intercept,
    );

    Ok(Detection {
        subject,
        target,
        duration_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_three_four_five() {
        let duration = estimate_duration(Point::new(0, 0), Point::new(3, 4), 2.45, 85.0);
        assert!((duration - 97.25).abs() < 1e-9);
    }

    #[test]
    fn test_zero_distance_is_intercept() {
        let p = Point::new(120, 640);
        assert_eq!(estimate_duration(p, p, 2.45, 85.0), 85.0);
    }

    #[test]
    fn test_linear_in_slope_and_intercept() {
        let a = Point::new(10, 10);
        let b = Point::new(10, 110);
        assert_eq!(estimate_duration(a, b, 1.0, 0.0), 100.0);
        assert_eq!(estimate_duration(a, b, 3.0, -50.0), 250.0);
        assert_eq!(estimate_duration(b, a, 3.0, -50.0), 250.0);
    }
}
