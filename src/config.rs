use std::time::Duration;

use crate::constants::*;
use crate::error::{Error, Result};

/// Orientation fix applied to every raw frame before resizing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rotation {
    None,
    Clockwise90,
    Half,
    Counterclockwise90,
}

/// Geometry and timing model of the camera rig.
///
/// Fixed for the lifetime of the process once validated.
#[derive(Clone, Debug, PartialEq)]
pub struct CalibrationParameters {
    /// Normalized frame size every detection works on.
    pub frame_width: u32,
    pub frame_height: u32,
    pub rotation: Rotation,
    /// Dead band along each border, excluded from target detection.
    pub frame_margin: u32,
    /// Scale applied to the template image when it is loaded.
    pub template_scale: f32,
    /// Ground-contact point offset above the template bottom.
    pub base_offset: u32,
    /// First row of the player search band.
    pub window_offset: u32,
    /// Distance of the search band's lower edge above the frame bottom.
    pub window_bottom: u32,
    pub median_radius: u32,
    pub canny_low: f32,
    pub canny_high: f32,
    /// Press milliseconds per pixel of jump distance.
    pub slope: f64,
    /// Constant press milliseconds.
    pub intercept: f64,
}

impl Default for CalibrationParameters {
    fn default() -> Self {
        Self {
            frame_width: FRAME_WIDTH,
            frame_height: FRAME_HEIGHT,
            rotation: Rotation::Clockwise90,
            frame_margin: FRAME_MARGIN,
            template_scale: TEMPLATE_SCALE,
            base_offset: PLAYER_BASE_OFFSET,
            window_offset: PLAYER_WINDOW_OFFSET,
            window_bottom: PLAYER_WINDOW_BOTTOM,
            median_radius: MEDIAN_RADIUS,
            canny_low: CANNY_LOW,
            canny_high: CANNY_HIGH,
            slope: TAP_SLOPE,
            intercept: TAP_INTERCEPT_MS,
        }
    }
}

impl CalibrationParameters {
    pub fn validate(&self) -> Result<()> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(invalid(format!(
                "frame dimensions must be positive, got {}x{}",
                self.frame_width, self.frame_height
            )));
        }
        if !self.slope.is_finite() || !self.intercept.is_finite() {
            return Err(invalid(format!(
                "slope and intercept must be finite, got {} and {}",
                self.slope, self.intercept
            )));
        }
        if self.frame_margin >= self.frame_width.div_ceil(2)
            || self.frame_margin >= self.frame_height.div_ceil(2)
        {
            return Err(invalid(format!(
                "margin {} must be smaller than half of {}x{}",
                self.frame_margin, self.frame_width, self.frame_height
            )));
        }
        if !self.template_scale.is_finite() || self.template_scale <= 0.0 {
            return Err(invalid(format!(
                "template scale must be positive, got {}",
                self.template_scale
            )));
        }
        let window_rows = self.window_offset.checked_add(self.window_bottom);
        if !window_rows.is_some_and(|rows| rows < self.frame_height) {
            return Err(invalid(format!(
                "search window [{}, {} - {}) is empty",
                self.window_offset, self.frame_height, self.window_bottom
            )));
        }
        if !self.canny_low.is_finite()
            || !self.canny_high.is_finite()
            || self.canny_low > self.canny_high
        {
            return Err(invalid(format!(
                "canny thresholds {} / {} are not an ascending pair",
                self.canny_low, self.canny_high
            )));
        }
        Ok(())
    }

    /// Rows of the player search band, `[start, end)`, within a frame
    /// `frame_height` rows tall. The band is empty when the frame is too short.
    pub fn search_rows(&self, frame_height: u32) -> (u32, u32) {
        let start = self.window_offset.min(frame_height);
        let end = frame_height.saturating_sub(self.window_bottom).max(start);
        (start, end)
    }
}

/// Complete runtime configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct BotConfig {
    pub stream_url: String,
    pub serial_port: String,
    pub baud_rate: u32,
    pub template_path: String,
    pub turn_duration: Duration,
    pub acquisition_interval: Duration,
    pub idle_interval: Duration,
    pub release_burst: usize,
    pub press_poll_interval: Duration,
    /// Log verbosity level: 0=off, 1=error, 2=warn, 3=info, 4=debug, 5=trace
    pub log_level: i32,
    pub calibration: CalibrationParameters,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            stream_url: STREAM_URL.to_string(),
            serial_port: SERIAL_PORT.to_string(),
            baud_rate: BAUD_RATE,
            template_path: TEMPLATE_PATH.to_string(),
            turn_duration: Duration::from_millis(TURN_DURATION_MS),
            acquisition_interval: Duration::from_millis(ACQUISITION_INTERVAL_MS),
            idle_interval: Duration::from_millis(IDLE_INTERVAL_MS),
            release_burst: RELEASE_BURST,
            press_poll_interval: Duration::from_millis(PRESS_POLL_INTERVAL_MS),
            log_level: LOG_LEVEL,
            calibration: CalibrationParameters::default(),
        }
    }
}

impl BotConfig {
    pub fn validate(&self) -> Result<()> {
        if self.stream_url.trim().is_empty() {
            return Err(invalid("stream url is empty".to_string()));
        }
        if self.serial_port.trim().is_empty() {
            return Err(invalid("serial port is empty".to_string()));
        }
        if self.baud_rate == 0 {
            return Err(invalid("baud rate must be positive".to_string()));
        }
        if self.turn_duration.is_zero() {
            return Err(invalid("turn duration must be positive".to_string()));
        }
        if !(0..=5).contains(&self.log_level) {
            return Err(invalid(format!(
                "log level must be within 0..=5, got {}",
                self.log_level
            )));
        }
        self.calibration.validate()
    }
}

/// Maps the numeric verbosity level onto a `log` filter.
pub fn log_level_filter(level: i32) -> log::LevelFilter {
    match level {
        i32::MIN..=0 => log::LevelFilter::Off,
        1 => log::LevelFilter::Error,
        2 => log::LevelFilter::Warn,
        3 => log::LevelFilter::Info,
        4 => log::LevelFilter::Debug,
        _ => log::LevelFilter::Trace,
    }
}

fn invalid(message: String) -> Error {
    Error::InvalidConfig(message)
}
