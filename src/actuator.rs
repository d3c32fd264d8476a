use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

use serialport::SerialPort;

use crate::error::Result;
use crate::shared::RunningFlag;
use crate::types::Command;

/// Byte sink driving the physical actuator.
pub trait ActuatorChannel {
    fn write_command(&mut self, byte: u8) -> Result<()>;
}

/// Channel over any byte stream.
pub struct WriteChannel<W: Write> {
    writer: W,
}

impl<W: Write> WriteChannel<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }
}

impl<W: Write> ActuatorChannel for WriteChannel<W> {
    fn write_command(&mut self, byte: u8) -> Result<()> {
        self.writer.write_all(&[byte])?;
        self.writer.flush()?;
        Ok(())
    }
}

pub type SerialChannel = WriteChannel<Box<dyn SerialPort>>;

/// Opens the servo controller's serial link.
pub fn open_serial(path: &str, baud_rate: u32) -> Result<SerialChannel> {
    let port = serialport::new(path, baud_rate)
        .timeout(Duration::from_millis(100))
        .open()?;
    log::info!("Opened serial link {} at {} baud", path, baud_rate);
    Ok(WriteChannel::new(port))
}

/// Drives press/release sequences on a channel.
///
/// The actuator reacts to edges, so a command equal to the last one sent
/// is dropped. The channel never sees the same byte twice in a row.
pub struct ActuationController<C: ActuatorChannel> {
    channel: C,
    last_sent: Option<Command>,
    release_burst: usize,
    press_poll_interval: Duration,
    transmissions: usize,
}

impl<C: ActuatorChannel> ActuationController<C> {
    pub fn new(channel: C, release_burst: usize, press_poll_interval: Duration) -> Self {
        Self {
            channel,
            last_sent: None,
            release_burst,
            press_poll_interval,
            transmissions: 0,
        }
    }

    /// Sends `command` unless it repeats the previous one. Returns whether a
    /// byte was written.
    pub fn send(&mut self, command: Command) -> Result<bool> {
        if self.last_sent == Some(command) {
            return Ok(false);
        }

        self.channel.write_command(command.byte())?;
        log::debug!("Sent {:?}", command);
        self.last_sent = Some(command);
        self.transmissions += 1;
        Ok(true)
    }

    /// Holds PRESS until `duration` has elapsed on the wall clock, then
    /// issues the RELEASE burst.
    ///
    /// A stop request cuts the press short; the release is sent regardless.
    pub fn jump(&mut self, duration: Duration, running: &RunningFlag) -> Result<()> {
        let deadline = Instant::now() + duration;
        loop {
            let now = Instant::now();
            if now >= deadline || !running.is_running() {
                break;
            }
            self.send(Command::Press)?;
            thread::sleep((deadline - now).min(self.press_poll_interval));
        }

        for _ in 0..self.release_burst {
            self.send(Command::Release)?;
        }
        Ok(())
    }

    pub fn last_sent(&self) -> Option<Command> {
        self.last_sent
    }

    /// Bytes actually written so far.
    pub fn transmissions(&self) -> usize {
        self.transmissions
    }

    pub fn channel(&self) -> &C {
        &self.channel
    }
}
