//! Jump bot entry point.
//!
//! Usage:
//!   jump-bot [OPTIONS]
//!
//! Options (can be in any order):
//!   --stream <url>        Video feed to read (default: phone MJPEG feed)
//!   --serial <path>       Serial device of the servo controller (default: /dev/ttyUSB0)
//!   --baud <rate>         Serial speed (default: 9600)
//!   --template <path>     Player template image (default: figure.png)
//!   --turn-ms <ms>        Time between jumps (default: 4000)
//!   --slope <ms/px>       Press milliseconds per pixel (default: 2.45)
//!   --intercept <ms>      Constant press milliseconds (default: 85)
//!   --margin <px>         Dead band along the frame border (default: 90)
//!   --log-level <0-5>     0=off .. 5=trace (default: 3), RUST_LOG overrides
//!   --no-rotate           Feed is already upright

use std::env;
use std::process::ExitCode;
use std::str::FromStr;
use std::time::Duration;

use jump_bot::{
    log_level_filter, open_serial, BotConfig, FfmpegFrameSource, LogObserver, Orchestrator,
    Rotation, Template,
};

fn parse_value<T: FromStr>(flag: &str, value: Option<&String>) -> Result<T, String> {
    let value = value.ok_or_else(|| format!("{} needs a value", flag))?;
    value
        .parse::<T>()
        .map_err(|_| format!("invalid value for {}: {}", flag, value))
}

fn parse_args(args: &[String]) -> Result<BotConfig, String> {
    let mut config = BotConfig::default();

    let mut i = 1;
    while i < args.len() {
        let flag = args[i].as_str();
        let value = args.get(i + 1);
        let consumed = match flag {
            "--no-rotate" => {
                config.calibration.rotation = Rotation::None;
                1
            }
            "--stream" => {
                config.stream_url = parse_value(flag, value)?;
                2
            }
            "--serial" => {
                config.serial_port = parse_value(flag, value)?;
                2
            }
            "--baud" => {
                config.baud_rate = parse_value(flag, value)?;
                2
            }
            "--template" => {
                config.template_path = parse_value(flag, value)?;
                2
            }
            "--turn-ms" => {
                config.turn_duration = Duration::from_millis(parse_value(flag, value)?);
                2
            }
            "--slope" => {
                config.calibration.slope = parse_value(flag, value)?;
                2
            }
            "--intercept" => {
                config.calibration.intercept = parse_value(flag, value)?;
                2
            }
            "--margin" => {
                config.calibration.frame_margin = parse_value(flag, value)?;
                2
            }
            "--log-level" => {
                config.log_level = parse_value(flag, value)?;
                2
            }
            other => return Err(format!("unknown option: {}", other)),
        };
        i += consumed;
    }

    Ok(config)
}

fn run(config: BotConfig) -> Result<(), Box<dyn std::error::Error>> {
    config.validate()?;

    let template = Template::load(&config.template_path, config.calibration.template_scale)?;
    let channel = open_serial(&config.serial_port, config.baud_rate)?;
    let stream_url = config.stream_url.clone();

    let orchestrator = Orchestrator::new(config, template)?;
    orchestrator.run(
        move || FfmpegFrameSource::open(&stream_url),
        channel,
        &mut LogObserver,
    )?;
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().collect();
    let config = match parse_args(&args) {
        Ok(config) => config,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    env_logger::Builder::new()
        .filter_level(log_level_filter(config.log_level))
        .parse_default_env()
        .init();

    match run(config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("jump-bot")
            .chain(list.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn test_defaults_without_flags() {
        assert_eq!(parse_args(&args(&[])).unwrap(), BotConfig::default());
    }

    #[test]
    fn test_flags_override_defaults() {
        let config = parse_args(&args(&[
            "--no-rotate",
            "--slope",
            "2.1",
            "--serial",
            "/dev/ttyACM0",
            "--turn-ms",
            "3500",
        ]))
        .unwrap();
        assert_eq!(config.calibration.rotation, Rotation::None);
        assert_eq!(config.calibration.slope, 2.1);
        assert_eq!(config.serial_port, "/dev/ttyACM0");
        assert_eq!(config.turn_duration, Duration::from_millis(3500));
    }

    #[test]
    fn test_bad_flags() {
        assert!(parse_args(&args(&["--baud"])).is_err());
        assert!(parse_args(&args(&["--baud", "fast"])).is_err());
        assert!(parse_args(&args(&["--verbose"])).is_err());
    }

    #[test]
    fn test_huge_margin_fails_validation() {
        let config = parse_args(&args(&["--margin", "2147483648", "--no-rotate"])).unwrap();
        assert_eq!(config.calibration.frame_margin, 1 << 31);
        assert_eq!(config.calibration.rotation, Rotation::None);
        assert!(config.validate().is_err());
    }
}
