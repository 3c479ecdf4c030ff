use std::time::Duration;

use smart_temp_hub::config::AppConfig;
use smart_temp_hub::interrupt::{Interrupt, StopSignal};
use smart_temp_hub::logging;
use smart_temp_hub::poll_loop::{Station, StopReason};
use smart_temp_hub::registry::ActuatorRegistry;
use smart_temp_hub::sensor::{self, led::GpioLedFactory};
use smart_temp_hub::telemetry::{TelemetryReporter, UreqTransport};

/// 两次读取之间的间隔
const READ_INTERVAL: Duration = Duration::from_secs(10);

/// BMP280监视程序：温度驱动LED，温度和气压上报ThingSpeak
fn main() -> anyhow::Result<()> {
    logging::init_logger();

    let config = AppConfig::from_lookup(AppConfig::default(), |key| match key {
        "SENSOR" => Some("bmp280".to_string()),
        _ => std::env::var(key).ok(),
    });
    let interrupt = Interrupt::install()?;

    // 创建BMP280传感器实例
    let sensor = sensor::open(&config.sensor)?;
    let mut registry = ActuatorRegistry::new(GpioLedFactory::new());
    registry.initialize(&config.pins);
    let reporter = TelemetryReporter::new(
        UreqTransport::new(config.http_timeout),
        config.base_url.clone(),
    );
    let mut station = Station::new(sensor, registry, reporter);

    interrupt.arm();
    let reason = station.run_with_interval(&config, READ_INTERVAL, &interrupt);
    interrupt.disarm();

    if let StopReason::Fault(err) = reason {
        anyhow::bail!(err);
    }
    Ok(())
}
