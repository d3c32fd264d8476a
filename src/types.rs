use crate::constants::{PRESS_BYTE, RELEASE_BYTE};

/// Pixel coordinate in a normalized frame.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Point {
    pub x: u32,
    pub y: u32,
}

impl Point {
    pub fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance in pixels.
    pub fn distance_to(&self, other: &Point) -> f64 {
        let dx = self.x as f64 - other.x as f64;
        let dy = self.y as f64 - other.y as f64;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Axis-aligned rectangle given by its top-left and bottom-right corners.
///
/// `top_left` is never right of or below `bottom_right`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Region {
    pub top_left: Point,
    pub bottom_right: Point,
}

impl Region {
    /// Builds a region from two opposite corners in any order.
    pub fn from_corners(a: Point, b: Point) -> Self {
        Self {
            top_left: Point::new(a.x.min(b.x), a.y.min(b.y)),
            bottom_right: Point::new(a.x.max(b.x), a.y.max(b.y)),
        }
    }

    pub fn width(&self) -> u32 {
        self.bottom_right.x - self.top_left.x
    }

    pub fn height(&self) -> u32 {
        self.bottom_right.y - self.top_left.y
    }
}

/// Level requested from the actuator.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Command {
    Press,
    Release,
}

impl Command {
    /// Wire byte understood by the controller firmware.
    pub fn byte(self) -> u8 {
        match self {
            Command::Press => PRESS_BYTE,
            Command::Release => RELEASE_BYTE,
        }
    }
}

/// Where the player stands and the box it occupies.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SubjectLocation {
    /// Ground-contact point, the origin of every jump measurement.
    pub point: Point,
    pub bounds: Region,
}

/// Result of one detection cycle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Detection {
    pub subject: SubjectLocation,
    pub target: Point,
    /// Press time in milliseconds.
    pub duration_ms: f64,
}

impl Detection {
    /// Duration label drawn next to the jump line, e.g. `"652ms"`.
    pub fn label(&self) -> String {
        format!("{}ms", self.duration_ms as i64)
    }

    pub fn distance(&self) -> f64 {
        self.subject.point.distance_to(&self.target)
    }
}
