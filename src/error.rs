use thiserror::Error;

/// Errors raised by the bot.
///
/// The transport family (`Video`, `Serial`, `Transport`, `Io`) is fatal: whoever
/// sees it flips the running flag and every activity winds down.
#[derive(Debug, Error)]
pub enum Error {
    #[error("video stream error: {0}")]
    Video(#[from] ffmpeg_next::Error),

    #[error("serial link error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// A frame (or the part of it being searched) is smaller than what the
    /// operation needs.
    #[error("frame area {width}x{height} is smaller than required {required_width}x{required_height}")]
    InvalidFrameSize {
        width: u32,
        height: u32,
        required_width: u32,
        required_height: u32,
    },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("{0} worker panicked")]
    WorkerPanicked(&'static str),
}

impl Error {
    /// True for failures of the frame source or the actuator link.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Error::Video(_) | Error::Serial(_) | Error::Transport(_) | Error::Io(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
