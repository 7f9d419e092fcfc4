use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use face_follow::{
    DryRunLink, LargestCandidate, ReplayFile, SerialLink, Session, SessionOptions, TelemetrySink,
    TrackerConfig, TrackerResult, TrackingController, VehicleTransport,
};

fn init_tracing(json: bool) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("face_follow=info"));
    let use_json = json
        || std::env::var("LOG_FORMAT")
            .map(|v| v.to_lowercase() == "json")
            .unwrap_or(false);

    if use_json {
        tracing_subscriber::registry()
            .with(fmt::layer().json())
            .with(env_filter)
            .init();
    } else {
        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true))
            .with(env_filter)
            .init();
    }
}

async fn fly(config: TrackerConfig) -> TrackerResult<()> {
    let frame = config.frame_size()?;
    let gains = config.gains()?;
    info!(?frame, ?gains, "starting face-follow");

    let link: Box<dyn VehicleTransport> = match &config.port {
        Some(path) => Box::new(SerialLink::open(path, config.baud)?),
        None => {
            info!("no port given, commands will only be logged");
            Box::new(DryRunLink::default())
        }
    };
    let source = ReplayFile::open(&config.replay)?;
    let options = SessionOptions {
        tick_interval: config.tick_interval(),
        takeoff_delay: config.takeoff_delay(),
    };

    let mut session = Session::new(
        source,
        LargestCandidate,
        link,
        TrackingController::new(gains, frame),
        options,
    );
    if let Some(url) = &config.telemetry {
        session = session.with_telemetry(TelemetrySink::new(url.clone())?);
    }
    session.run().await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    let config = TrackerConfig::parse();
    init_tracing(config.log_json);

    if let Err(e) = fly(config).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
