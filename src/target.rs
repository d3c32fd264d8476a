use image::imageops;
use image::{DynamicImage, GrayImage, Luma, RgbImage};
use imageproc::drawing::draw_filled_rect_mut;
use imageproc::edges::canny;
use imageproc::filter::median_filter;
use imageproc::rect::Rect;

use crate::config::CalibrationParameters;
use crate::types::{Point, SubjectLocation};

/// Outcome of scanning a binary edge map.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EdgeScan {
    /// Column of the first edge pixel in row-major order.
    pub first_column: Option<u32>,
    /// First pixel reaching the rightmost edge column, as (column, row).
    pub rightmost: Option<(u32, u32)>,
}

impl EdgeScan {
    /// Target point in map coordinates; `(0, 0)` when the map has no edges.
    pub fn point(&self) -> Point {
        Point::new(
            self.first_column.unwrap_or(0),
            self.rightmost.map_or(0, |(_, row)| row),
        )
    }
}

/// Median blur followed by Canny. Edge pixels are 255, the rest 0.
pub fn edge_map(frame: &RgbImage, calibration: &CalibrationParameters) -> GrayImage {
    let blurred = median_filter(frame, calibration.median_radius, calibration.median_radius);
    let luma = DynamicImage::ImageRgb8(blurred).to_luma8();
    canny(&luma, calibration.canny_low, calibration.canny_high)
}

/// Clears every part of the edge map where a platform cannot be.
pub fn mask_edges(
    edges: &mut GrayImage,
    subject: &SubjectLocation,
    calibration: &CalibrationParameters,
) {
    let (width, height) = edges.dimensions();
    let margin = calibration.frame_margin;

    // Border bands.
    clear(edges, 0, 0, width, margin);
    clear(edges, 0, margin, margin, height);
    clear(edges, width.saturating_sub(margin), 0, width, height);
    clear(edges, 0, height.saturating_sub(margin), width, height);

    // Score overlay.
    clear(edges, 0, 0, width, height / 3);

    // The player's own outline.
    let bounds = subject.bounds;
    clear(
        edges,
        bounds.top_left.x,
        bounds.top_left.y,
        bounds.bottom_right.x,
        bounds.bottom_right.y,
    );

    // Anything lower than the top third of the player's body.
    clear(
        edges,
        0,
        bounds.top_left.y + bounds.height() / 3,
        width,
        height,
    );
}

/// Row-major scan of a binary map for the landing platform.
pub fn scan_edge_map(edges: &GrayImage) -> EdgeScan {
    let mut scan = EdgeScan::default();
    for (row, pixels) in edges.rows().enumerate() {
        for (column, pixel) in pixels.enumerate() {
            if pixel.0[0] == 0 {
                continue;
            }
            let (column, row) = (column as u32, row as u32);
            if scan.first_column.is_none() {
                scan.first_column = Some(column);
            }
            if scan.rightmost.map_or(true, |(best, _)| column > best) {
                scan.rightmost = Some((column, row));
            }
        }
    }
    scan
}

/// Finds the landing point of the next platform in a normalized frame.
///
/// Only rows between a sixth of the frame height and the player's
/// ground-contact row are searched. With no edge left in that band the
/// result is the band's origin, `(0, height / 6)`.
pub fn locate_target(
    frame: &RgbImage,
    subject: &SubjectLocation,
    calibration: &CalibrationParameters,
) -> Point {
    let mut edges = edge_map(frame, calibration);
    mask_edges(&mut edges, subject, calibration);
    target_in_band(&edges, subject)
}

fn target_in_band(edges: &GrayImage, subject: &SubjectLocation) -> Point {
    let (width, height) = edges.dimensions();
    let top_offset = height / 6;
    let bottom = subject.point.y.min(height).max(top_offset);

    let band = imageops::crop_imm(edges, 0, top_offset, width, bottom - top_offset).to_image();
    let scan = scan_edge_map(&band);
    let point = scan.point();

    log::trace!("Edge scan {:?} in rows {}..{}", scan, top_offset, bottom);

    Point::new(point.x, point.y + top_offset)
}

/// Zeroes the inclusive rectangle `(x0, y0)..=(x1, y1)`, clipped to the map.
fn clear(edges: &mut GrayImage, x0: u32, y0: u32, x1: u32, y1: u32) {
    let (width, height) = edges.dimensions();
    if width == 0 || height == 0 || x0 >= width || y0 >= height || x0 > x1 || y0 > y1 {
        return;
    }
    let x1 = x1.min(width - 1);
    let y1 = y1.min(height - 1);
    let rect = Rect::at(x0 as i32, y0 as i32).of_size(x1 - x0 + 1, y1 - y0 + 1);
    draw_filled_rect_mut(edges, rect, Luma([0u8]));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Region;

    fn subject_at(x0: u32, y0: u32, x1: u32, y1: u32, point: Point) -> SubjectLocation {
        SubjectLocation {
            point,
            bounds: Region::from_corners(Point::new(x0, y0), Point::new(x1, y1)),
        }
    }

    fn calibration() -> CalibrationParameters {
        CalibrationParameters {
            frame_width: 120,
            frame_height: 240,
            frame_margin: 10,
            window_offset: 60,
            window_bottom: 30,
            ..CalibrationParameters::default()
        }
    }

    #[test]
    fn test_scan_empty_map() {
        let scan = scan_edge_map(&GrayImage::new(20, 10));
        assert_eq!(scan, EdgeScan::default());
        assert_eq!(scan.point(), Point::new(0, 0));
    }

    #[test]
    fn test_scan_takes_first_column_and_rightmost_row() {
        let mut map = GrayImage::new(20, 10);
        map.put_pixel(7, 2, Luma([255]));
        map.put_pixel(12, 4, Luma([255]));
        map.put_pixel(3, 5, Luma([255]));
        // Same column as the best one, later row: must not move the row.
        map.put_pixel(12, 8, Luma([255]));

        let scan = scan_edge_map(&map);
        assert_eq!(scan.first_column, Some(7));
        assert_eq!(scan.rightmost, Some((12, 4)));
        assert_eq!(scan.point(), Point::new(7, 4));
    }

    #[test]
    fn test_scan_counts_any_nonzero_pixel() {
        let mut map = GrayImage::new(5, 5);
        map.put_pixel(0, 3, Luma([1]));
        assert_eq!(scan_edge_map(&map).point(), Point::new(0, 3));
    }

    #[test]
    fn test_diamond_scan_hits_center() {
        let mut map = GrayImage::new(40, 40);
        // Outline of a diamond centered on (20, 18).
        for i in 0..=10u32 {
            for (x, y) in [
                (20 + i, 8 + i),
                (30 - i, 18 + i),
                (20 - i, 28 - i),
                (10 + i, 18 - i),
            ] {
                map.put_pixel(x, y, Luma([255]));
            }
        }
        assert_eq!(scan_edge_map(&map).point(), Point::new(20, 18));
    }

    #[test]
    fn test_mask_clears_bands_and_subject() {
        let calibration = calibration();
        let subject = subject_at(50, 150, 70, 180, Point::new(60, 175));
        let mut edges = GrayImage::from_pixel(120, 240, Luma([255]));
        mask_edges(&mut edges, &subject, &calibration);

        // Border bands.
        assert_eq!(edges.get_pixel(5, 120).0[0], 0);
        assert_eq!(edges.get_pixel(115, 120).0[0], 0);
        assert_eq!(edges.get_pixel(60, 235).0[0], 0);
        // Top third.
        assert_eq!(edges.get_pixel(60, 79).0[0], 0);
        assert_eq!(edges.get_pixel(60, 81).0[0], 255);
        // Player box and everything below its upper third (150 + 30 / 3).
        assert_eq!(edges.get_pixel(55, 155).0[0], 0);
        assert_eq!(edges.get_pixel(20, 160).0[0], 0);
        assert_eq!(edges.get_pixel(20, 159).0[0], 255);
        // Untouched area.
        assert_eq!(edges.get_pixel(100, 120).0[0], 255);
    }

    #[test]
    fn test_blank_frame_falls_back_to_band_origin() {
        let calibration = calibration();
        let subject = subject_at(50, 150, 70, 180, Point::new(60, 175));
        let frame = RgbImage::from_pixel(120, 240, image::Rgb([90, 90, 90]));

        assert_eq!(
            locate_target(&frame, &subject, &calibration),
            Point::new(0, 240 / 6)
        );
    }

    #[test]
    fn test_subject_above_band_yields_origin() {
        let subject = subject_at(50, 10, 70, 30, Point::new(60, 25));
        let edges = GrayImage::from_pixel(120, 240, Luma([255]));
        assert_eq!(target_in_band(&edges, &subject), Point::new(0, 40));
    }

    #[test]
    fn test_band_offsets_rows() {
        let subject = subject_at(50, 150, 70, 180, Point::new(60, 175));
        let mut edges = GrayImage::new(120, 240);
        edges.put_pixel(30, 100, Luma([255]));
        edges.put_pixel(40, 110, Luma([255]));
        // Below the ground-contact row: outside the band.
        edges.put_pixel(90, 176, Luma([255]));

        assert_eq!(target_in_band(&edges, &subject), Point::new(30, 110));
    }
}
