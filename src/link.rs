//! Command link to the vehicle.
//!
//! The vehicle takes four velocities per tick, each in [-100, 100]:
//! lateral, forward, vertical and yaw. A link that is not ready simply gets
//! skipped for that tick; nothing here is allowed to stop an airborne session.

use std::io::Write;
use std::time::Duration;

use serial2::{CharSize, FlowControl, Parity, SerialPort, Settings, StopBits};
use tracing::{debug, info, warn};

use crate::data::VelocityCommand;
use crate::error::LinkError;
use crate::min::{encode_min, min_listen};

pub const RC_ID: u8 = 0x10;
pub const TAKEOFF_ID: u8 = 0x11;
pub const LAND_ID: u8 = 0x12;
pub const BATTERY_ID: u8 = 0x20;

pub const DEFAULT_BAUD: u32 = 57600;
const REPLY_TIMEOUT: Duration = Duration::from_millis(500);

pub trait VehicleTransport {
    /// Whether a command sent now has a chance of arriving.
    fn is_ready(&mut self) -> bool;

    fn send_velocities(&mut self, lateral: i8, forward: i8, vertical: i8, yaw: i8) -> Result<(), LinkError>;

    fn takeoff(&mut self) -> Result<(), LinkError>;

    fn land(&mut self) -> Result<(), LinkError>;

    /// Battery level in percent, if the link can report it.
    fn battery(&mut self) -> Result<Option<u8>, LinkError> {
        Ok(None)
    }
}

impl<T: VehicleTransport + ?Sized> VehicleTransport for Box<T> {
    fn is_ready(&mut self) -> bool {
        (**self).is_ready()
    }

    fn send_velocities(&mut self, lateral: i8, forward: i8, vertical: i8, yaw: i8) -> Result<(), LinkError> {
        (**self).send_velocities(lateral, forward, vertical, yaw)
    }

    fn takeoff(&mut self) -> Result<(), LinkError> {
        (**self).takeoff()
    }

    fn land(&mut self) -> Result<(), LinkError> {
        (**self).land()
    }

    fn battery(&mut self) -> Result<Option<u8>, LinkError> {
        (**self).battery()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DispatchOutcome {
    Sent,
    Skipped,
    Failed,
}

/// Hand one tick's command to the link. Never fails.
pub fn dispatch<T: VehicleTransport + ?Sized>(link: &mut T, command: &VelocityCommand) -> DispatchOutcome {
    if !link.is_ready() {
        debug!("vehicle link not ready, skipping command");
        return DispatchOutcome::Skipped;
    }
    match link.send_velocities(
        command.lateral_speed,
        command.forward_speed,
        command.vertical_speed,
        command.yaw,
    ) {
        Ok(()) => DispatchOutcome::Sent,
        Err(e) => {
            warn!(error = %e, "failed to send velocities");
            DispatchOutcome::Failed
        }
    }
}

/// RC payload in the order the vehicle expects, two's complement bytes.
pub fn rc_payload(lateral: i8, forward: i8, vertical: i8, yaw: i8) -> [u8; 4] {
    [lateral as u8, forward as u8, vertical as u8, yaw as u8]
}

fn open_port(port_name: &str, baud: u32) -> Result<SerialPort, std::io::Error> {
    SerialPort::open(port_name, |mut settings: Settings| {
        settings.set_raw();
        settings.set_baud_rate(baud)?;
        settings.set_char_size(CharSize::Bits8);
        settings.set_stop_bits(StopBits::One);
        settings.set_parity(Parity::None);
        settings.set_flow_control(FlowControl::None);
        Ok(settings)
    })
}

/// MIN-framed commands over a serial radio.
pub struct SerialLink {
    path: String,
    baud: u32,
    port: Option<SerialPort>,
}

impl SerialLink {
    pub fn open(path: &str, baud: u32) -> Result<Self, LinkError> {
        let port = open_port(path, baud)?;
        info!(path, baud, "opened vehicle link");
        Ok(SerialLink {
            path: path.to_string(),
            baud,
            port: Some(port),
        })
    }

    fn send_frame(&mut self, id: u8, payload: &[u8]) -> Result<(), LinkError> {
        let msg = encode_min(id, payload)?;
        let port = self.port.as_mut().ok_or(LinkError::NotConnected)?;
        if let Err(e) = port.write_all(&msg) {
            // drop the port so the next tick tries to reopen it
            self.port = None;
            return Err(e.into());
        }
        Ok(())
    }
}

impl VehicleTransport for SerialLink {
    fn is_ready(&mut self) -> bool {
        if self.port.is_none() {
            match open_port(&self.path, self.baud) {
                Ok(port) => {
                    info!(path = %self.path, "reopened vehicle link");
                    self.port = Some(port);
                }
                Err(e) => debug!(path = %self.path, error = %e, "vehicle link still down"),
            }
        }
        self.port.is_some()
    }

    fn send_velocities(&mut self, lateral: i8, forward: i8, vertical: i8, yaw: i8) -> Result<(), LinkError> {
        self.send_frame(RC_ID, &rc_payload(lateral, forward, vertical, yaw))
    }

    fn takeoff(&mut self) -> Result<(), LinkError> {
        self.send_frame(TAKEOFF_ID, &[])
    }

    fn land(&mut self) -> Result<(), LinkError> {
        self.send_frame(LAND_ID, &[])
    }

    fn battery(&mut self) -> Result<Option<u8>, LinkError> {
        self.send_frame(BATTERY_ID, &[])?;
        let port = self.port.as_mut().ok_or(LinkError::NotConnected)?;
        port.set_read_timeout(REPLY_TIMEOUT)?;
        let frame = min_listen(port, REPLY_TIMEOUT)?;
        match (frame.id, frame.payload.first()) {
            (BATTERY_ID, Some(&percent)) => Ok(Some(percent)),
            (id, _) => Err(LinkError::UnexpectedReply(id)),
        }
    }
}

/// Stands in for the vehicle when no port is configured. Logs every command.
#[derive(Debug, Default)]
pub struct DryRunLink {
    pub sent: u64,
}

impl VehicleTransport for DryRunLink {
    fn is_ready(&mut self) -> bool {
        true
    }

    fn send_velocities(&mut self, lateral: i8, forward: i8, vertical: i8, yaw: i8) -> Result<(), LinkError> {
        self.sent += 1;
        info!(lateral, forward, vertical, yaw, "rc");
        Ok(())
    }

    fn takeoff(&mut self) -> Result<(), LinkError> {
        info!("takeoff");
        Ok(())
    }

    fn land(&mut self) -> Result<(), LinkError> {
        info!("land");
        Ok(())
    }
}
