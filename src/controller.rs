//! PD controller that keeps the tracked face centred in frame.
//!
//! Yaw follows the horizontal pixel error and vertical speed follows the
//! vertical one. The vertical axis is flipped relative to pixel rows so that a
//! target above centre produces a positive (climbing) command.
//!
//! ```text
//! error  = (cx - W/2, H/2 - cy)
//! speed  = clip(kp * error + kd * (error - prev_error), -100, 100)
//! ```
//!
//! The derivative is the raw difference between consecutive ticks, so `kd`
//! is tuned for the session's tick interval. Losing the target holds position
//! and forgets the error memory.

use nalgebra::Vector2;
use tracing::{debug, warn};

use crate::data::{
    ControllerState, FrameSize, GainParameters, TargetObservation, TrackingMode, VelocityCommand,
    MAX_SPEED,
};

impl TrackingMode {
    pub fn of(observation: Option<&TargetObservation>) -> Self {
        match observation {
            Some(_) => TrackingMode::Tracking,
            None => TrackingMode::Lost,
        }
    }
}

/// Signed pixel error of `center` from the frame centre, y pointing up.
pub fn pixel_error(frame: FrameSize, center: (i32, i32)) -> Vector2<i64> {
    let (mid_x, mid_y) = frame.center();
    Vector2::new(center.0 as i64 - mid_x, mid_y - center.1 as i64)
}

// Truncates toward zero after clamping. NaN from non-finite gains becomes 0.
fn saturate(speed: f64) -> i8 {
    let limit = MAX_SPEED as f64;
    speed.clamp(-limit, limit) as i8
}

/// One controller tick as a pure function of its inputs.
///
/// Returns the command for this tick and the state to feed into the next one.
pub fn pd_step(
    gains: &GainParameters,
    frame: FrameSize,
    state: ControllerState,
    observation: Option<&TargetObservation>,
) -> (VelocityCommand, ControllerState) {
    let Some(target) = observation else {
        return (VelocityCommand::HOLD, ControllerState::default());
    };

    let error = pixel_error(frame, target.center);
    let prev = Vector2::new(state.prev_error_x, state.prev_error_y);
    let delta = error - prev;
    let speed = error.map(|e| e as f64) * gains.kp + delta.map(|d| d as f64) * gains.kd;

    let command = VelocityCommand {
        yaw: saturate(speed.x),
        vertical_speed: saturate(speed.y),
        ..VelocityCommand::HOLD
    };
    let next = ControllerState {
        prev_error_x: error.x,
        prev_error_y: error.y,
    };
    (command, next)
}

/// Owns the error memory for one flight session.
///
/// Not meant to be shared: every call to [`TrackingController::update`]
/// mutates the state it depends on.
pub struct TrackingController {
    gains: GainParameters,
    frame: FrameSize,
    state: ControllerState,
}

impl TrackingController {
    pub fn new(gains: GainParameters, frame: FrameSize) -> Self {
        if gains.ki != 0.0 {
            warn!(ki = gains.ki, "integral gain is not used by the PD controller, ignoring it");
        }
        TrackingController {
            gains,
            frame,
            state: ControllerState::default(),
        }
    }

    /// Advance one tick and return the command to dispatch.
    pub fn update(&mut self, observation: Option<&TargetObservation>) -> VelocityCommand {
        if let Some(target) = observation {
            if !self.frame.contains(target.center) {
                debug!(
                    cx = target.center.0,
                    cy = target.center.1,
                    width = self.frame.width,
                    height = self.frame.height,
                    "target center outside frame"
                );
            }
        }
        let (command, next) = pd_step(&self.gains, self.frame, self.state, observation);
        self.state = next;
        command
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    pub fn gains(&self) -> &GainParameters {
        &self.gains
    }

    pub fn frame(&self) -> FrameSize {
        self.frame
    }

    /// Forget the error memory, as if the session had just started.
    pub fn reset(&mut self) {
        self.state = ControllerState::default();
    }
}
