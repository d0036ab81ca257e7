use anyhow::Result;
use motoweather::{PlannerConfig, VERSION, telemetry, web};

#[tokio::main]
async fn main() -> Result<()> {
    let config = PlannerConfig::load()?;
    let _telemetry = telemetry::init(&config.logging)?;

    tracing::info!("Starting MotoWeather {}", VERSION);
    tracing::debug!("Configuration: {:?}", config);

    web::run(config).await
}
