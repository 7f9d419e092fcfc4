//! Error types for the tracker.
//!
//! The controller itself cannot fail. Everything here comes from the edges:
//! the serial link, the replay file and the command line.

use thiserror::Error;

/// Errors while reading or writing MIN frames.
#[derive(Debug, Error)]
pub enum MinError {
    #[error("bad read: wrong start byte at offset {0}")]
    BadStart(usize),

    #[error("bad read: length. Expected: {expected}, Actual: {actual}")]
    Length { expected: usize, actual: usize },

    #[error("bad read: missing stop byte, found {0:#04X}")]
    BadStop(u8),

    #[error("bad checksum: (Expected: {reported:X}, Calculated: {calculated:X})")]
    Checksum { reported: u32, calculated: u32 },

    #[error("payload of {0} bytes does not fit in a frame")]
    PayloadTooLong(usize),

    #[error("timed out waiting for a frame")]
    Timeout,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors from the vehicle command link.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error("vehicle link is not connected")]
    NotConnected,

    #[error("unexpected reply id {0:#04X}")]
    UnexpectedReply(u8),

    #[error("framing error: {0}")]
    Frame(#[from] MinError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("frame size must be non-zero, got {width}x{height}")]
    FrameSize { width: u32, height: u32 },

    #[error("gain {name} must be finite, got {value}")]
    Gain { name: &'static str, value: f64 },
}

/// Session-level errors. Only these stop the tracker.
#[derive(Debug, Error)]
pub enum TrackerError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("vehicle link error: {0}")]
    Link(#[from] LinkError),

    #[error("replay line {line}: {source}")]
    Replay {
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("telemetry client error: {0}")]
    Telemetry(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TrackerResult<T> = Result<T, TrackerError>;
