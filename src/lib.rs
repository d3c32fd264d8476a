//! Camera-driven jump bot.
//!
//! Watches a live feed of the game, finds the player and the next platform,
//! converts their distance into a press duration and drives a servo that
//! taps the screen for that long.

pub mod actuator;
pub mod config;
pub mod constants;
pub mod error;
pub mod estimate;
pub mod orchestrator;
pub mod shared;
pub mod subject;
pub mod target;
pub mod types;
pub mod video;

pub use actuator::{
    open_serial, ActuationController, ActuatorChannel, SerialChannel, WriteChannel,
};
pub use config::{log_level_filter, BotConfig, CalibrationParameters, Rotation};
pub use error::{Error, Result};
pub use estimate::{detect, estimate_duration};
pub use orchestrator::{DetectionObserver, LogObserver, Orchestrator};
pub use shared::{FrameSlot, PendingDuration, RunningFlag};
pub use subject::{locate_subject, Template};
pub use target::{locate_target, scan_edge_map, EdgeScan};
pub use types::{Command, Detection, Point, Region, SubjectLocation};
pub use video::{normalize_frame, FfmpegFrameSource, FrameSource};
