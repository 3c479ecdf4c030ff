use std::io;

use smart_temp_hub::config::AppConfig;
use smart_temp_hub::interrupt::{INTERRUPTED_EXIT_CODE, Interrupt};
use smart_temp_hub::logging;
use smart_temp_hub::poll_loop::Station;
use smart_temp_hub::registry::ActuatorRegistry;
use smart_temp_hub::sensor::{self, led::GpioLedFactory};
use smart_temp_hub::shell::Shell;
use smart_temp_hub::shell::console::{self, Console};
use smart_temp_hub::telemetry::{TelemetryReporter, UreqTransport};

fn main() -> anyhow::Result<()> {
    logging::init_logger();

    let mut config = AppConfig::from_env();
    // 标准输入和菜单中的Ctrl+C走同一个通道，运行中按Ctrl+C回到菜单
    let (events, receiver) = tokio::sync::mpsc::unbounded_channel();
    let interrupt = Interrupt::install_with_menu(events.clone())?;
    console::forward_stdin(events)?;

    let sensor = sensor::open(&config.sensor)?;
    let registry = ActuatorRegistry::new(GpioLedFactory::new());
    let reporter = TelemetryReporter::new(
        UreqTransport::new(config.http_timeout),
        config.base_url.clone(),
    );
    let mut station = Station::new(sensor, registry, reporter);

    let mut input = Console::new(receiver);
    Shell::new(&mut input, io::stdout()).run(&mut station, &mut config, &interrupt)?;

    // 先释放GPIO再退出
    drop(station);
    if input.interrupted() {
        std::process::exit(INTERRUPTED_EXIT_CODE);
    }
    Ok(())
}
