use std::thread::{self, JoinHandle};
use std::time::Duration;

use image::RgbImage;

use crate::actuator::{ActuationController, ActuatorChannel};
use crate::config::{BotConfig, CalibrationParameters};
use crate::error::{Error, Result};
use crate::estimate::detect;
use crate::shared::{FrameSlot, PendingDuration, RunningFlag};
use crate::subject::Template;
use crate::types::Detection;
use crate::video::{normalize_frame, FrameSource};

/// Hooks for a display or event surface.
pub trait DetectionObserver {
    /// Called after every successful detection with the normalized frame.
    fn on_detection(&mut self, _frame: &RgbImage, _detection: &Detection) {}

    /// Polled once per detection cycle; returning true shuts the bot down.
    fn termination_requested(&mut self) -> bool {
        false
    }
}

/// Observer that only writes detections to the log.
#[derive(Debug, Default)]
pub struct LogObserver;

impl DetectionObserver for LogObserver {
    fn on_detection(&mut self, _frame: &RgbImage, detection: &Detection) {
        log::debug!(
            "Player {:?} -> platform {:?}: {:.1}px, {}",
            detection.subject.point,
            detection.target,
            detection.distance(),
            detection.label()
        );
    }
}

// ============================================================================
// Activities
// ============================================================================

/// Pulls frames into `slot` until the stream ends, fails, or `running` clears.
///
/// End of stream stops the bot cleanly; a transport error stops it and is
/// returned.
pub fn acquisition_loop<S: FrameSource>(
    source: &mut S,
    slot: &FrameSlot,
    running: &RunningFlag,
    interval: Duration,
) -> Result<()> {
    log::info!("Acquisition started");
    while running.is_running() {
        match source.next_frame() {
            Ok(Some(frame)) => {
                slot.publish(frame);
            }
            Ok(None) => {
                log::info!("Frame source exhausted, stopping");
                running.stop();
                break;
            }
            Err(e) => {
                log::error!("Frame source failed: {}", e);
                running.stop();
                return Err(e);
            }
        }
        running.sleep(interval);
    }
    log::info!("Acquisition stopped");
    Ok(())
}

/// Turns every new frame into a pending press duration.
///
/// Frames that cannot hold the template are skipped with a warning.
pub fn detection_loop<O: DetectionObserver>(
    slot: &FrameSlot,
    pending: &PendingDuration,
    running: &RunningFlag,
    template: &Template,
    calibration: &CalibrationParameters,
    idle_interval: Duration,
    observer: &mut O,
) -> Result<()> {
    log::info!("Detection started");
    let mut last_sequence = 0;

    while running.is_running() {
        let raw = match slot.latest() {
            Some((sequence, frame)) if sequence != last_sequence => {
                last_sequence = sequence;
                frame
            }
            _ => {
                running.sleep(idle_interval);
                continue;
            }
        };

        let frame = normalize_frame(
            &raw,
            calibration.rotation,
            calibration.frame_width,
            calibration.frame_height,
        );

        match detect(&frame, template, calibration) {
            Ok(detection) => {
                pending.store(detection.duration_ms);
                observer.on_detection(&frame, &detection);
            }
            Err(Error::InvalidFrameSize { .. }) => {
                log::warn!("Skipping frame #{}: too small for the template", last_sequence);
            }
            Err(e) => {
                running.stop();
                return Err(e);
            }
        }

        if observer.termination_requested() {
            log::info!("Termination requested");
            running.stop();
        }
    }
    log::info!("Detection stopped");
    Ok(())
}

/// Jumps once per turn with whatever duration is pending at the turn start.
pub fn actuation_loop<C: ActuatorChannel>(
    controller: &mut ActuationController<C>,
    pending: &PendingDuration,
    running: &RunningFlag,
    turn_duration: Duration,
) -> Result<()> {
    log::info!("Actuation started");
    while running.sleep(turn_duration) {
        let duration = pending.as_duration();
        log::info!("Jumping: {}ms", duration.as_millis());
        if let Err(e) = controller.jump(duration, running) {
            log::error!("Actuator link failed: {}", e);
            running.stop();
            return Err(e);
        }
    }
    log::info!("Actuation stopped");
    Ok(())
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Owns the shared cells and runs the three activities.
pub struct Orchestrator {
    config: BotConfig,
    template: Template,
    running: RunningFlag,
    frame_slot: FrameSlot,
    pending: PendingDuration,
}

impl Orchestrator {
    pub fn new(config: BotConfig, template: Template) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            template,
            running: RunningFlag::new(),
            frame_slot: FrameSlot::new(),
            pending: PendingDuration::new(),
        })
    }

    /// Handle that stops the bot from outside.
    pub fn running(&self) -> RunningFlag {
        self.running.clone()
    }

    pub fn pending(&self) -> PendingDuration {
        self.pending.clone()
    }

    /// Runs acquisition and actuation on worker threads and detection on
    /// the calling thread until the running flag clears.
    ///
    /// The frame source is opened inside its worker thread so it does not
    /// have to be `Send`. The first error from any activity is returned.
    pub fn run<S, F, C, O>(&self, open_source: F, channel: C, observer: &mut O) -> Result<()>
    where
        S: FrameSource,
        F: FnOnce() -> Result<S> + Send + 'static,
        C: ActuatorChannel + Send + 'static,
        O: DetectionObserver,
    {
        let acquisition = {
            let slot = self.frame_slot.clone();
            let running = self.running.clone();
            let interval = self.config.acquisition_interval;
            thread::Builder::new()
                .name("acquisition".to_string())
                .spawn(move || {
                    let mut source = open_source().map_err(|e| {
                        log::error!("Could not open frame source: {}", e);
                        running.stop();
                        e
                    })?;
                    acquisition_loop(&mut source, &slot, &running, interval)
                })?
        };

        let actuation = {
            let pending = self.pending.clone();
            let running = self.running.clone();
            let turn_duration = self.config.turn_duration;
            let mut controller = ActuationController::new(
                channel,
                self.config.release_burst,
                self.config.press_poll_interval,
            );
            let spawned = thread::Builder::new()
                .name("actuation".to_string())
                .spawn(move || actuation_loop(&mut controller, &pending, &running, turn_duration));
            match spawned {
                Ok(handle) => handle,
                Err(e) => {
                    self.running.stop();
                    let _ = join("acquisition", acquisition);
                    return Err(e.into());
                }
            }
        };

        let detection = detection_loop(
            &self.frame_slot,
            &self.pending,
            &self.running,
            &self.template,
            &self.config.calibration,
            self.config.idle_interval,
            observer,
        );
        self.running.stop();

        let acquisition = join("acquisition", acquisition);
        let actuation = join("actuation", actuation);
        acquisition.and(actuation).and(detection)
    }
}

fn join(name: &'static str, handle: JoinHandle<Result<()>>) -> Result<()> {
    handle.join().map_err(|_| Error::WorkerPanicked(name))?
}
