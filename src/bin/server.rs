use actix_web::{web, App, HttpServer};
use std::io;
use tracing::info;
use tracing_subscriber::EnvFilter;

use face_follow::relay::{self, RelayState};
use face_follow::telemetry::{TELEMETRY_PATH, TELEMETRY_SERVER_ADDR};
// the tracker pushes one report per tick to this server, a viewer pulls the latest

#[actix_web::main]
async fn main() -> io::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let addr = std::env::var("TELEMETRY_ADDR").unwrap_or_else(|_| TELEMETRY_SERVER_ADDR.to_string());
    let shared = web::Data::new(RelayState::default());

    info!(%addr, path = TELEMETRY_PATH, "telemetry relay listening");
    HttpServer::new(move || {
        App::new()
            .app_data(shared.clone())
            .configure(relay::configure)
    })
    .bind(addr)?
    .run()
    .await
}
