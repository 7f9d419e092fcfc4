use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crate::data::{FrameSize, GainParameters};
use crate::error::ConfigError;
use crate::link::DEFAULT_BAUD;

/// Keep the largest face in view by yawing and climbing toward it.
#[derive(Parser, Debug, Clone)]
#[command(name = "face-follow", version)]
pub struct TrackerConfig {
    /// Frame width the detector works on
    #[arg(long, env = "FACE_FOLLOW_WIDTH", default_value_t = 720)]
    pub width: u32,

    /// Frame height the detector works on
    #[arg(long, env = "FACE_FOLLOW_HEIGHT", default_value_t = 480)]
    pub height: u32,

    /// Proportional gain
    #[arg(long, env = "FACE_FOLLOW_KP", default_value_t = 0.1937, allow_negative_numbers = true)]
    pub kp: f64,

    /// Integral gain, accepted for completeness but never applied
    #[arg(long, env = "FACE_FOLLOW_KI", default_value_t = 0.0, allow_negative_numbers = true)]
    pub ki: f64,

    /// Derivative gain on the per-tick error change
    #[arg(long, env = "FACE_FOLLOW_KD", default_value_t = 0.2039, allow_negative_numbers = true)]
    pub kd: f64,

    /// Serial device of the vehicle radio; commands are only logged without it
    #[arg(long, env = "FACE_FOLLOW_PORT")]
    pub port: Option<String>,

    #[arg(long, env = "FACE_FOLLOW_BAUD", default_value_t = DEFAULT_BAUD)]
    pub baud: u32,

    /// JSON-lines file of recorded detections, one candidate list per frame
    #[arg(long, env = "FACE_FOLLOW_REPLAY")]
    pub replay: PathBuf,

    /// Minimum time between ticks in milliseconds
    #[arg(long, env = "FACE_FOLLOW_TICK_MS", default_value_t = 33)]
    pub tick_ms: u64,

    /// Seconds to wait after bring-up before taking off
    #[arg(long, env = "FACE_FOLLOW_TAKEOFF_DELAY", default_value_t = 5)]
    pub takeoff_delay_secs: u64,

    /// Telemetry relay to POST tick reports to, e.g. http://127.0.0.1:8080/telemetry
    #[arg(long, env = "FACE_FOLLOW_TELEMETRY")]
    pub telemetry: Option<String>,

    /// Emit logs as JSON
    #[arg(long, env = "LOG_FORMAT_JSON")]
    pub log_json: bool,
}

impl TrackerConfig {
    pub fn frame_size(&self) -> Result<FrameSize, ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::FrameSize { width: self.width, height: self.height });
        }
        Ok(FrameSize::new(self.width, self.height))
    }

    pub fn gains(&self) -> Result<GainParameters, ConfigError> {
        for (name, value) in [("kp", self.kp), ("ki", self.ki), ("kd", self.kd)] {
            if !value.is_finite() {
                return Err(ConfigError::Gain { name, value });
            }
        }
        Ok(GainParameters { kp: self.kp, ki: self.ki, kd: self.kd })
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    pub fn takeoff_delay(&self) -> Duration {
        Duration::from_secs(self.takeoff_delay_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> TrackerConfig {
        let mut argv = vec!["face-follow", "--replay", "faces.jsonl"];
        argv.extend_from_slice(args);
        TrackerConfig::try_parse_from(argv).unwrap()
    }

    #[test]
    fn defaults_match_flight_script() {
        let config = parse(&[]);
        assert_eq!(config.frame_size().unwrap(), FrameSize::new(720, 480));
        assert_eq!(config.gains().unwrap(), GainParameters::default());
        assert_eq!(config.takeoff_delay(), Duration::from_secs(5));
        assert_eq!(config.baud, 57600);
        assert!(config.port.is_none());
    }

    #[test]
    fn negative_gains_parse() {
        let config = parse(&["--kp", "-0.5", "--kd", "0"]);
        assert_eq!(config.gains().unwrap(), GainParameters::pd(-0.5, 0.0));
    }

    #[test]
    fn rejects_zero_frame() {
        let config = parse(&["--width", "0"]);
        assert!(matches!(config.frame_size(), Err(ConfigError::FrameSize { width: 0, .. })));
    }

    #[test]
    fn rejects_non_finite_gain() {
        let config = parse(&["--kd", "NaN"]);
        assert!(matches!(config.gains(), Err(ConfigError::Gain { name: "kd", .. })));
    }
}
