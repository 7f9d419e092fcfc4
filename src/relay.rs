//! HTTP relay holding the latest tick report.
//!
//! The tracker POSTs a [`TickReport`] every tick, viewers GET the most recent
//! one. Before the first report arrives GET answers 204.

use std::sync::Mutex;

use actix_web::{web, HttpResponse};
use tracing::{debug, error};

use crate::data::TickReport;
use crate::telemetry::TELEMETRY_PATH;

#[derive(Default)]
pub struct RelayState {
    latest: Mutex<Option<TickReport>>,
}

impl RelayState {
    pub fn latest(&self) -> Option<TickReport> {
        self.latest.lock().ok().and_then(|latest| latest.clone())
    }
}

pub async fn set_report(data: web::Json<TickReport>, app_data: web::Data<RelayState>) -> HttpResponse {
    let report = data.into_inner();
    debug!(tick = report.tick, mode = ?report.mode, "report received");
    match app_data.latest.lock() {
        Ok(mut latest) => {
            *latest = Some(report);
            HttpResponse::Ok().body("Report set")
        }
        Err(_) => {
            error!("telemetry state lock poisoned");
            HttpResponse::InternalServerError().finish()
        }
    }
}

pub async fn get_report(app_data: web::Data<RelayState>) -> HttpResponse {
    match app_data.latest.lock() {
        Ok(latest) => match latest.as_ref() {
            Some(report) => HttpResponse::Ok().json(report),
            None => HttpResponse::NoContent().finish(),
        },
        Err(_) => {
            error!("telemetry state lock poisoned");
            HttpResponse::InternalServerError().finish()
        }
    }
}

/// Register the relay routes. The app must carry `web::Data<RelayState>`.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route(TELEMETRY_PATH, web::get().to(get_report))
        .route(TELEMETRY_PATH, web::post().to(set_report));
}
