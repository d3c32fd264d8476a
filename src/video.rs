use ffmpeg::format::{input, Pixel};
use ffmpeg::media::Type;
use ffmpeg::software::scaling::{context::Context as ScalerContext, flag::Flags};
use ffmpeg::util::frame::video::Video as VideoFrame;
use ffmpeg::util::error::EAGAIN;
use ffmpeg::{codec, decoder, Error as FfmpegError, Packet};
use ffmpeg_next as ffmpeg;
use image::imageops::{self, FilterType};
use image::RgbImage;

use crate::config::Rotation;
use crate::error::{Error, Result};

/// Anything that yields decoded frames one at a time.
pub trait FrameSource {
    /// Next decoded frame, `Ok(None)` once the stream has ended.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// What a `receive_frame` call left the decoder in.
#[derive(Debug, PartialEq, Eq)]
enum Received {
    Frame,
    NeedInput,
    Ended,
}

fn classify_receive(result: std::result::Result<(), FfmpegError>) -> Result<Received> {
    match result {
        Ok(()) => Ok(Received::Frame),
        Err(FfmpegError::Other { errno: EAGAIN }) => Ok(Received::NeedInput),
        Err(FfmpegError::Eof) => Ok(Received::Ended),
        Err(e) => Err(e.into()),
    }
}

// ============================================================================
// FFmpeg-backed Source
// ============================================================================

/// Decodes a video stream (file path or network URL such as an MJPEG feed).
pub struct FfmpegFrameSource {
    input_ctx: ffmpeg::format::context::Input,
    decoder: decoder::Video,
    video_stream_idx: usize,
    scaler: Option<ScalerContext>,
    draining: bool,
}

impl FfmpegFrameSource {
    pub fn open(url: &str) -> Result<Self> {
        log::info!("Opening video stream: {}", url);
        ffmpeg::init()?;

        let input_ctx = input(&url)?;
        let (video_stream_idx, decoder) = {
            let video_stream = input_ctx
                .streams()
                .best(Type::Video)
                .ok_or_else(|| Error::Transport(format!("no video stream in {}", url)))?;
            let decoder_context =
                codec::context::Context::from_parameters(video_stream.parameters())?;
            (video_stream.index(), decoder_context.decoder().video()?)
        };

        log::info!(
            "Input found: {}x{} (Codec: {:?})",
            decoder.width(),
            decoder.height(),
            decoder.id()
        );

        Ok(Self {
            input_ctx,
            decoder,
            video_stream_idx,
            scaler: None,
            draining: false,
        })
    }

    fn convert_frame(&mut self, decoded: &VideoFrame) -> Result<RgbImage> {
        let (width, height) = (decoded.width(), decoded.height());

        // The feed may renegotiate its size; rebuild the scaler when it does.
        let stale = self
            .scaler
            .as_ref()
            .is_none_or(|s| s.input().width != width || s.input().height != height);
        if stale {
            self.scaler = Some(ScalerContext::get(
                decoded.format(),
                width,
                height,
                Pixel::RGB24,
                width,
                height,
                Flags::BILINEAR,
            )?);
        }
        let scaler = self
            .scaler
            .as_mut()
            .ok_or_else(|| Error::Transport("scaler unavailable".to_string()))?;

        let mut rgb_frame = VideoFrame::empty();
        scaler.run(decoded, &mut rgb_frame)?;

        // Rows are padded to the stride; copy them out one by one.
        let stride = rgb_frame.stride(0);
        let row_len = width as usize * 3;
        let data = rgb_frame.data(0);
        let mut pixels = Vec::with_capacity(row_len * height as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + row_len]);
        }

        RgbImage::from_raw(width, height, pixels)
            .ok_or_else(|| Error::Transport("decoded frame has an unexpected size".to_string()))
    }
}

impl FrameSource for FfmpegFrameSource {
    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        loop {
            let mut decoded = VideoFrame::empty();
            match classify_receive(self.decoder.receive_frame(&mut decoded))? {
                Received::Frame => return self.convert_frame(&decoded).map(Some),
                Received::NeedInput if !self.draining => {}
                Received::NeedInput | Received::Ended => {
                    log::info!("Video stream ended");
                    return Ok(None);
                }
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input_ctx) {
                Ok(()) => {
                    if packet.stream() == self.video_stream_idx {
                        self.decoder.send_packet(&packet)?;
                    }
                }
                Err(FfmpegError::Eof) => {
                    log::info!("Flushing decoder...");
                    self.decoder.send_eof()?;
                    self.draining = true;
                }
                Err(e) => return Err(e.into()),
            }
        }
    }
}

// ============================================================================
// Normalization
// ============================================================================

/// Rotates a raw frame and resizes it to the fixed detection size.
pub fn normalize_frame(frame: &RgbImage, rotation: Rotation, width: u32, height: u32) -> RgbImage {
    let rotated = match rotation {
        Rotation::None => frame.clone(),
        Rotation::Clockwise90 => imageops::rotate90(frame),
        Rotation::Half => imageops::rotate180(frame),
        Rotation::Counterclockwise90 => imageops::rotate270(frame),
    };

    if rotated.dimensions() == (width, height) {
        rotated
    } else {
        imageops::resize(&rotated, width, height, FilterType::Triangle)
    }
}
