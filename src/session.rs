//! The flight session: bring-up, takeoff, the tick loop and landing.
//!
//! Each tick runs strictly in order on one task:
//!
//! ```text
//! frame -> detect -> controller update -> dispatch -> telemetry
//! ```
//!
//! Ticks are paced by a fixed interval so the controller's per-tick
//! derivative sees a steady period. A slow tick is not made up for.

use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

use crate::controller::TrackingController;
use crate::data::{TickReport, TrackingMode, VelocityCommand};
use crate::error::TrackerResult;
use crate::link::{dispatch, DispatchOutcome, VehicleTransport};
use crate::provider::{FrameSource, TargetProvider};
use crate::telemetry::TelemetrySink;

#[derive(Clone, Copy, Debug)]
pub struct SessionOptions {
    pub tick_interval: Duration,
    pub takeoff_delay: Duration,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            tick_interval: Duration::from_millis(33),
            takeoff_delay: Duration::from_secs(5),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub ticks: u64,
    pub tracked: u64,
    pub sent: u64,
    pub skipped: u64,
    pub failed: u64,
}

pub struct Session<S, P, L> {
    source: S,
    provider: P,
    link: L,
    controller: TrackingController,
    options: SessionOptions,
    telemetry: Option<TelemetrySink>,
    summary: SessionSummary,
}

impl<S, P, L> Session<S, P, L>
where
    S: FrameSource,
    P: TargetProvider<S::Frame>,
    L: VehicleTransport,
{
    pub fn new(source: S, provider: P, link: L, controller: TrackingController, options: SessionOptions) -> Self {
        Session {
            source,
            provider,
            link,
            controller,
            options,
            telemetry: None,
            summary: SessionSummary::default(),
        }
    }

    pub fn with_telemetry(mut self, sink: TelemetrySink) -> Self {
        info!(url = sink.url(), "publishing tick reports");
        self.telemetry = Some(sink);
        self
    }

    pub fn controller(&self) -> &TrackingController {
        &self.controller
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Zero every axis and report the battery. Nothing here is fatal.
    pub fn bring_up(&mut self) {
        if dispatch(&mut self.link, &VelocityCommand::HOLD) != DispatchOutcome::Sent {
            warn!("could not zero velocities during bring-up");
        }
        match self.link.battery() {
            Ok(Some(percent)) => info!(percent, "battery level"),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "battery level unavailable"),
        }
    }

    /// Run one tick. Returns `None` once the frame source has ended.
    pub fn step(&mut self) -> TrackerResult<Option<TickReport>> {
        let Some(frame) = self.source.next_frame()? else {
            return Ok(None);
        };
        let observation = self.provider.detect(&frame);
        let mode = TrackingMode::of(observation.as_ref());
        let command = self.controller.update(observation.as_ref());
        let state = self.controller.state();

        match dispatch(&mut self.link, &command) {
            DispatchOutcome::Sent => self.summary.sent += 1,
            DispatchOutcome::Skipped => self.summary.skipped += 1,
            DispatchOutcome::Failed => self.summary.failed += 1,
        }
        self.summary.ticks += 1;
        if mode == TrackingMode::Tracking {
            self.summary.tracked += 1;
        }

        let report = TickReport {
            tick: self.summary.ticks,
            mode,
            observation,
            error_x: state.prev_error_x,
            error_y: state.prev_error_y,
            command,
            gains: *self.controller.gains(),
        };
        if let Some(sink) = &self.telemetry {
            sink.publish(report.clone());
        }
        Ok(Some(report))
    }

    /// Fly until the frame source ends or Ctrl-C, then hover and land.
    pub async fn run(&mut self) -> TrackerResult<SessionSummary> {
        self.bring_up();

        info!(delay = ?self.options.takeoff_delay, "waiting before takeoff");
        tokio::time::sleep(self.options.takeoff_delay).await;
        if let Err(e) = self.link.takeoff() {
            warn!(error = %e, "takeoff command failed");
        }

        let period = self.options.tick_interval.max(Duration::from_millis(1));
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let ctrl_c = tokio::signal::ctrl_c();
        tokio::pin!(ctrl_c);

        let result = loop {
            tokio::select! {
                _ = &mut ctrl_c => {
                    info!("interrupted");
                    break Ok(());
                }
                _ = interval.tick() => {}
            }
            match self.step() {
                Ok(Some(_)) => {}
                Ok(None) => {
                    info!("frame source ended");
                    break Ok(());
                }
                Err(e) => {
                    error!(error = %e, "stopping session");
                    break Err(e);
                }
            }
        };

        self.shutdown();
        let summary = self.summary;
        info!(?summary, "session finished");
        result.map(|()| summary)
    }

    fn shutdown(&mut self) {
        dispatch(&mut self.link, &VelocityCommand::HOLD);
        if let Err(e) = self.link.land() {
            warn!(error = %e, "land command failed");
        }
    }
}
