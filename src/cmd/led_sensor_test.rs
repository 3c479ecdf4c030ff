use std::time::Duration;

use smart_temp_hub::color::LedColor;
use smart_temp_hub::config::AppConfig;
use smart_temp_hub::interrupt::{Interrupt, StopSignal};
use smart_temp_hub::logging;
use smart_temp_hub::registry::{Activation, ActuatorRegistry};
use smart_temp_hub::sensor::led::GpioLedFactory;

/// 切换间隔
const SWITCH_INTERVAL: Duration = Duration::from_secs(2);

/// LED测试程序：红灯和蓝灯交替点亮，Ctrl+C结束
fn main() -> anyhow::Result<()> {
    logging::init_logger();

    let config = AppConfig::from_env();
    let interrupt = Interrupt::install()?;
    let mut registry = ActuatorRegistry::new(GpioLedFactory::new());
    registry.initialize(&config.pins);

    interrupt.arm();
    for color in [LedColor::Red, LedColor::Blue].into_iter().cycle() {
        match registry.activate_exclusive(color)? {
            Activation::On(color) => log::info!("🔔 {} on", color.to_string().to_uppercase()),
            Activation::Unavailable(color) => log::warn!("{} LED is not available", color),
        }
        if interrupt.wait(SWITCH_INTERVAL) {
            break;
        }
    }

    registry.shutdown();
    log::info!("GPIO resources released.");
    Ok(())
}
