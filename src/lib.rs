//! Face-following flight control for a small quadrotor.
//!
//! A detector reports the largest face in each frame, [`TrackingController`]
//! turns its offset from the frame centre into yaw and vertical speed, and a
//! [`VehicleTransport`] carries the command to the vehicle. [`Session`] runs
//! that loop once per tick.

pub mod config;
pub mod controller;
pub mod data;
pub mod error;
pub mod link;
pub mod min;
pub mod provider;
pub mod relay;
pub mod session;
pub mod telemetry;

pub use config::TrackerConfig;
pub use controller::{pd_step, TrackingController};
pub use data::{
    Candidate, ControllerState, FrameSize, GainParameters, TargetObservation, TickReport,
    TrackingMode, VelocityCommand,
};
pub use error::{ConfigError, LinkError, MinError, TrackerError, TrackerResult};
pub use link::{dispatch, DispatchOutcome, DryRunLink, SerialLink, VehicleTransport};
pub use min::{decode_min, encode_min, min_listen, MinFrame};
pub use provider::{select_largest, FrameSource, LargestCandidate, ReplayFile, TargetProvider};
pub use relay::RelayState;
pub use session::{Session, SessionOptions, SessionSummary};
pub use telemetry::TelemetrySink;
