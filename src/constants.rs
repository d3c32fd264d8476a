//! Default values for the camera rig, the game and the actuator.
//!
//! These were measured against one phone, one camera mount and one servo
//! rig. Any of them can be overridden through `BotConfig`.

// ============================================================================
// Video Feed
// ============================================================================

/// Live feed served by the phone camera app.
pub const STREAM_URL: &str = "http://192.168.0.162:9999/video/mjpeg";

/// Frame width after rotation and resize.
pub const FRAME_WIDTH: u32 = 720;

/// Frame height after rotation and resize.
pub const FRAME_HEIGHT: u32 = 1280;

/// Width of the dead band along each frame border, in pixels.
///
/// The camera mount never puts a platform inside this band, while the
/// bezel and reflections there produce plenty of edges.
pub const FRAME_MARGIN: u32 = 90;

/// Pause between two reads of the feed.
pub const ACQUISITION_INTERVAL_MS: u64 = 10;

/// Pause of the detection loop while no new frame is available.
pub const IDLE_INTERVAL_MS: u64 = 10;

// ============================================================================
// Player Template
// ============================================================================

/// Template image of the player figure.
pub const TEMPLATE_PATH: &str = "figure.png";

/// Scale of the template image relative to the player in the feed.
pub const TEMPLATE_SCALE: f32 = 0.75;

/// Distance of the player's ground-contact point above the bottom of the
/// matched template, in pixels.
pub const PLAYER_BASE_OFFSET: u32 = 20;

/// First row of the band in which the player is searched.
pub const PLAYER_WINDOW_OFFSET: u32 = 300;

/// Distance of the search band's lower edge above the frame bottom.
pub const PLAYER_WINDOW_BOTTOM: u32 = 200;

// ============================================================================
// Platform Edge Detection
// ============================================================================

/// Radius of the median blur applied before edge detection (7x7 window).
pub const MEDIAN_RADIUS: u32 = 3;

/// Lower hysteresis threshold of the Canny detector.
pub const CANNY_LOW: f32 = 10.0;

/// Upper hysteresis threshold of the Canny detector.
pub const CANNY_HIGH: f32 = 50.0;

// ============================================================================
// Jump Timing
// ============================================================================

/// Milliseconds of press time per pixel of jump distance.
pub const TAP_SLOPE: f64 = 2.45;

/// Constant servo delay added to every press, in milliseconds.
pub const TAP_INTERCEPT_MS: f64 = 85.0;

/// Time between two jumps. The game needs this long to settle the camera
/// after a landing.
pub const TURN_DURATION_MS: u64 = 4000;

// ============================================================================
// Actuator Link
// ============================================================================

/// Serial device of the servo controller.
pub const SERIAL_PORT: &str = "/dev/ttyUSB0";

/// Serial speed in baud.
pub const BAUD_RATE: u32 = 9600;

/// Number of RELEASE requests issued after each press.
pub const RELEASE_BURST: usize = 64;

/// Pause between PRESS requests while the press deadline has not passed.
pub const PRESS_POLL_INTERVAL_MS: u64 = 1;

/// Byte the controller firmware reads as "press".
pub const PRESS_BYTE: u8 = b'D';

/// Byte the controller firmware reads as "release".
pub const RELEASE_BYTE: u8 = b'U';

// ============================================================================
// Logging
// ============================================================================

/// Log verbosity level: 0=off, 1=error, 2=warn, 3=info, 4=debug, 5=trace
pub const LOG_LEVEL: i32 = 3;
