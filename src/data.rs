use serde::{Serialize, Deserialize};

/// Largest magnitude the vehicle accepts on any velocity axis.
pub const MAX_SPEED: i8 = 100;

/// Where the detector put the target this tick. Absence is `None` at the call
/// site, never a zeroed observation.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct TargetObservation {
    pub center: (i32, i32), // pixel centroid, may fall outside the frame
    pub area: u32, // only meaningful upstream, when picking the largest candidate
}

impl TargetObservation {
    pub fn new(cx: i32, cy: i32, area: u32) -> Self {
        TargetObservation { center: (cx, cy), area }
    }
}

/// One raw detector hit, top-left corner plus size.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct Candidate {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Candidate {
    pub fn area(&self) -> u64 {
        self.w as u64 * self.h as u64
    }

    pub fn center(&self) -> (i32, i32) {
        (
            self.x.saturating_add((self.w / 2) as i32),
            self.y.saturating_add((self.h / 2) as i32),
        )
    }

    pub fn observation(&self) -> TargetObservation {
        let (cx, cy) = self.center();
        TargetObservation::new(cx, cy, self.area().min(u32::MAX as u64) as u32)
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        FrameSize { width, height }
    }

    /// Pixel the controller steers toward, halved the integer way.
    pub fn center(&self) -> (i64, i64) {
        ((self.width / 2) as i64, (self.height / 2) as i64)
    }

    pub fn contains(&self, point: (i32, i32)) -> bool {
        point.0 >= 0 && point.1 >= 0 && (point.0 as u32) < self.width && (point.1 as u32) < self.height
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq)]
pub struct GainParameters {
    pub kp: f64, // proportional
    pub ki: f64, // reserved, never applied
    pub kd: f64, // applied to the raw per-tick error delta
}

impl GainParameters {
    pub fn pd(kp: f64, kd: f64) -> Self {
        GainParameters { kp, ki: 0.0, kd }
    }
}

impl Default for GainParameters {
    fn default() -> Self {
        GainParameters { kp: 0.1937, ki: 0.0, kd: 0.2039 }
    }
}

/// Error memory carried between ticks for the derivative term.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct ControllerState {
    pub prev_error_x: i64,
    pub prev_error_y: i64,
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct VelocityCommand {
    pub yaw: i8,
    pub vertical_speed: i8,
    pub forward_speed: i8, // no forward/back tracking axis, always 0
    pub lateral_speed: i8, // no left/right tracking axis, always 0
}

impl VelocityCommand {
    pub const HOLD: VelocityCommand = VelocityCommand {
        yaw: 0,
        vertical_speed: 0,
        forward_speed: 0,
        lateral_speed: 0,
    };

    pub fn is_hold(&self) -> bool {
        *self == Self::HOLD
    }
}

#[derive(Clone, Copy, Serialize, Deserialize, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TrackingMode {
    Tracking,
    Lost,
}

/// Everything the operator would want to see about one tick.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub mode: TrackingMode,
    pub observation: Option<TargetObservation>,
    pub error_x: i64,
    pub error_y: i64,
    pub command: VelocityCommand,
    pub gains: GainParameters,
}
