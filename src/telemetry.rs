//! Tick reports for the operator, relayed over HTTP.
//!
//! The tracker pushes every tick to the relay server (see [`crate::relay`]
//! and the `telemetry-server` binary) and a viewer pulls the latest one from
//! there. Delivery is best effort: reports queue for a single sender task,
//! and when the relay falls behind the newest reports are dropped instead of
//! piling up behind the control loop.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::debug;

use crate::data::TickReport;

pub const TELEMETRY_SERVER_ADDR: &str = "127.0.0.1:8080";
pub const TELEMETRY_PATH: &str = "/telemetry";

/// Reports waiting for the sender task before new ones are dropped.
pub const REPORT_QUEUE: usize = 8;
/// Per-request limit, a few ticks at the default tick interval.
pub const REQUEST_TIMEOUT: Duration = Duration::from_millis(100);

pub async fn send_report(client: &Client, url: &str, report: &TickReport) -> Result<(), reqwest::Error> {
    client.post(url)
        .json(report)
        .send()
        .await?
        .error_for_status()?;
    Ok(())
}

async fn forward(client: Client, url: String, mut rx: mpsc::Receiver<TickReport>) {
    while let Some(report) = rx.recv().await {
        if let Err(e) = send_report(&client, &url, &report).await {
            debug!(tick = report.tick, error = %e, "telemetry report dropped");
        }
    }
}

#[derive(Clone)]
pub struct TelemetrySink {
    url: String,
    tx: mpsc::Sender<TickReport>,
    dropped: Arc<AtomicU64>,
}

impl TelemetrySink {
    /// Must be called from inside a tokio runtime; starts the sender task.
    pub fn new(url: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_timeout(url, REQUEST_TIMEOUT)
    }

    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()?;
        let url = url.into();
        let (tx, rx) = mpsc::channel(REPORT_QUEUE);
        tokio::spawn(forward(client, url.clone(), rx));
        Ok(TelemetrySink {
            url,
            tx,
            dropped: Arc::new(AtomicU64::new(0)),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Reports dropped because the queue was full or the sender had stopped.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    /// Queue a report without waiting. Never blocks the tick.
    pub fn publish(&self, report: TickReport) {
        match self.tx.try_send(report) {
            Ok(()) => {}
            Err(TrySendError::Full(report)) | Err(TrySendError::Closed(report)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                debug!(tick = report.tick, "telemetry queue full, report dropped");
            }
        }
    }
}
