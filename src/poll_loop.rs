use std::time::Duration;

use crate::config::AppConfig;
use crate::error::{ReportError, SensorError};
use crate::interrupt::StopSignal;
use crate::policy::{self, ThresholdConfig};
use crate::registry::{Activation, ActuatorFactory, ActuatorRegistry};
use crate::sensor::{Measurement, Sensor};
use crate::telemetry::{Ack, TelemetryConfig, TelemetryReporter, Transport};

/// 轮询循环的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Idle,
    Polling,
    Reporting,
    Faulted,
    Sleeping,
    Stopped,
}

/// 循环停止的原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    /// 操作员按下Ctrl+C
    Interrupted,
    /// 传感器或LED驱动故障
    Fault(String),
    /// 有限数据源已读完
    Exhausted,
}

/// 单个周期的结果
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// 读数成功，已驱动LED并尝试上报
    Reported {
        measurement: Measurement,
        activation: Activation,
        report: Result<Ack, ReportError>,
    },
    /// 本周期没有读数，LED全部熄灭
    Faulted(String),
}

/// 传感器、LED和上报器的组合
pub struct Station<S: Sensor, F: ActuatorFactory, T: Transport> {
    pub sensor: S,
    pub registry: ActuatorRegistry<F>,
    pub reporter: TelemetryReporter<T>,
    state: LoopState,
}

impl<S: Sensor, F: ActuatorFactory, T: Transport> Station<S, F, T> {
    pub fn new(sensor: S, registry: ActuatorRegistry<F>, reporter: TelemetryReporter<T>) -> Self {
        Self {
            sensor,
            registry,
            reporter,
            state: LoopState::Idle,
        }
    }

    pub fn state(&self) -> LoopState {
        self.state
    }

    /// 执行一个周期（不含休眠）
    ///
    /// 返回`Err`表示循环必须停止。
    pub fn poll_once(
        &mut self,
        threshold: &ThresholdConfig,
        telemetry: &TelemetryConfig,
    ) -> Result<CycleOutcome, StopReason> {
        self.state = LoopState::Polling;
        let measurement = match self.sensor.read_once() {
            Ok(measurement) => measurement,
            Err(SensorError::Unavailable(reason)) => {
                self.state = LoopState::Faulted;
                log::warn!("❌ Sensor error, no data: {}", reason);
                self.registry
                    .all_off()
                    .map_err(|err| StopReason::Fault(err.to_string()))?;
                return Ok(CycleOutcome::Faulted(reason));
            }
            Err(SensorError::Exhausted) => return Err(StopReason::Exhausted),
            Err(SensorError::Fault(err)) => return Err(StopReason::Fault(err.to_string())),
        };
        log::info!("{}", measurement);

        let color = policy::decide(measurement.temperature, threshold);
        let activation = self
            .registry
            .activate_exclusive(color)
            .map_err(|err| StopReason::Fault(err.to_string()))?;
        if let Activation::On(color) = activation {
            let band = if measurement.temperature <= threshold.limit {
                format!("<={}°C", threshold.limit)
            } else {
                format!(">{}°C", threshold.limit)
            };
            log::info!("🔔 LED: {} ({})", color.to_string().to_uppercase(), band);
        }

        // LED失败不影响上报
        self.state = LoopState::Reporting;
        let report = self.reporter.report(&measurement, telemetry);
        match &report {
            Ok(Ack::Success) => log::info!("⬆️ Data sent to ThingSpeak."),
            Ok(Ack::Skipped) => {
                log::warn!("❌ ThingSpeak API key or channel ID missing, upload skipped.")
            }
            Err(err) => log::warn!("⚠️ ThingSpeak upload failed: {}", err),
        }

        Ok(CycleOutcome::Reported {
            measurement,
            activation,
            report,
        })
    }

    /// 运行轮询循环直到停止
    ///
    /// 无论以何种方式停止，返回前都会释放全部LED。
    pub fn run(&mut self, config: &AppConfig, stop: &impl StopSignal) -> StopReason {
        self.run_with_interval(config, config.poll_interval, stop)
    }

    pub fn run_with_interval(
        &mut self,
        config: &AppConfig,
        interval: Duration,
        stop: &impl StopSignal,
    ) -> StopReason {
        log::info!("▶️ Starting the system... press CTRL+C to stop.");
        let reason = self.cycle_until_stopped(config, interval, stop);

        match &reason {
            StopReason::Interrupted => log::info!("🛑 Leaving the loop..."),
            StopReason::Fault(err) => log::error!("Error while running: {}", err),
            StopReason::Exhausted => log::info!("✅ Measurement finished."),
        }

        self.registry.shutdown();
        self.state = LoopState::Stopped;
        log::info!("GPIO resources released.");
        reason
    }

    fn cycle_until_stopped(
        &mut self,
        config: &AppConfig,
        interval: Duration,
        stop: &impl StopSignal,
    ) -> StopReason {
        loop {
            if stop.is_raised() {
                return StopReason::Interrupted;
            }

            // 每个周期取一份配置快照
            let threshold = config.threshold;
            if let Err(reason) = self.poll_once(&threshold, &config.telemetry) {
                return reason;
            }

            self.state = LoopState::Sleeping;
            if stop.wait(interval) {
                return StopReason::Interrupted;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::cell::Cell;

    use super::*;
    use crate::color::{ColorMap, LedColor};
    use crate::registry::testing::{Event, FakeFactory};
    use crate::sensor::testing::ScriptedSensor;
    use crate::telemetry::testing::FakeTransport;

    /// 固定次数的等待后请求停止
    struct StopAfter {
        waits_left: Cell<u32>,
        waited: Cell<u32>,
    }

    impl StopAfter {
        fn new(waits: u32) -> Self {
            Self {
                waits_left: Cell::new(waits),
                waited: Cell::new(0),
            }
        }
    }

    impl StopSignal for StopAfter {
        fn is_raised(&self) -> bool {
            self.waits_left.get() == 0
        }

        fn wait(&self, _timeout: Duration) -> bool {
            self.waited.set(self.waited.get() + 1);
            let left = self.waits_left.get().saturating_sub(1);
            self.waits_left.set(left);
            left == 0
        }
    }

    fn config() -> AppConfig {
        let mut config = AppConfig::default();
        config.telemetry.channel_id = "2974228".to_string();
        config.telemetry.write_key = "WRITEKEY".to_string();
        config
    }

    fn station(
        script: Vec<Result<Measurement, SensorError>>,
        factory: &FakeFactory,
    ) -> Station<ScriptedSensor, FakeFactory, FakeTransport> {
        let mut registry = ActuatorRegistry::new(factory.clone());
        registry.initialize(&ColorMap::new(Some(21), Some(16), Some(20)));
        Station::new(
            ScriptedSensor::new(script),
            registry,
            TelemetryReporter::new(FakeTransport::default(), "https://api.thingspeak.com"),
        )
    }

    #[test]
    fn test_warm_reading_lights_red_and_reports() {
        let factory = FakeFactory::default();
        let mut station = station(
            vec![Ok(Measurement::new(22.3).with_humidity(55.0))],
            &factory,
        );
        let cfg = config();

        let outcome = station.poll_once(&cfg.threshold, &cfg.telemetry).unwrap();

        assert_eq!(
            outcome,
            CycleOutcome::Reported {
                measurement: Measurement::new(22.3).with_humidity(55.0),
                activation: Activation::On(LedColor::Red),
                report: Ok(Ack::Success),
            }
        );
        assert_eq!(factory.board.borrow().lit_pins(), vec![21]);
        let requests = station.reporter.transport().requests.borrow();
        assert_eq!(requests[0].param("field1"), Some("22.3"));
        assert_eq!(requests[0].param("field2"), Some("55.0"));
    }

    #[test]
    fn test_sensor_failure_turns_off_and_skips_telemetry() {
        let factory = FakeFactory::default();
        let mut station = station(
            vec![
                Ok(Measurement::new(18.0).with_humidity(40.0)),
                Err(SensorError::Unavailable("timeout".to_string())),
            ],
            &factory,
        );
        let cfg = config();
        station.poll_once(&cfg.threshold, &cfg.telemetry).unwrap();
        assert_eq!(factory.board.borrow().lit_pins(), vec![20]);
        factory.board.borrow_mut().events.clear();

        let outcome = station.poll_once(&cfg.threshold, &cfg.telemetry).unwrap();

        assert_eq!(outcome, CycleOutcome::Faulted("timeout".to_string()));
        assert_eq!(station.state(), LoopState::Faulted);
        assert!(factory.board.borrow().lit_pins().is_empty());
        // 只有熄灭操作
        assert!(factory
            .board
            .borrow()
            .events
            .iter()
            .all(|e| matches!(e, Event::Level(_, level) if *level == 0.0)));
        assert_eq!(station.reporter.transport().requests.borrow().len(), 1);
    }

    #[test]
    fn test_telemetry_is_attempted_when_led_missing() {
        let factory = FakeFactory::default();
        let mut station = station(vec![Ok(Measurement::new(25.0))], &factory);
        station.registry.initialize(&ColorMap::new(None, Some(16), Some(20)));
        let cfg = config();

        let outcome = station.poll_once(&cfg.threshold, &cfg.telemetry).unwrap();

        assert!(matches!(
            outcome,
            CycleOutcome::Reported {
                activation: Activation::Unavailable(LedColor::Red),
                report: Ok(Ack::Success),
                ..
            }
        ));
    }

    #[test]
    fn test_rejected_upload_does_not_stop_loop() {
        let factory = FakeFactory::default();
        let mut station = station(
            vec![Ok(Measurement::new(19.0)), Ok(Measurement::new(21.0))],
            &factory,
        );
        station.reporter.transport().push_reply(500, "oops");
        let stop = StopAfter::new(2);

        let reason = station.run(&config(), &stop);

        assert_eq!(reason, StopReason::Interrupted);
        assert_eq!(station.reporter.transport().requests.borrow().len(), 2);
    }

    #[test]
    fn test_run_sleeps_between_cycles_and_releases_on_interrupt() {
        let factory = FakeFactory::default();
        let mut station = station(
            vec![
                Ok(Measurement::new(19.0)),
                Err(SensorError::Unavailable("checksum".to_string())),
                Ok(Measurement::new(21.0)),
            ],
            &factory,
        );
        let stop = StopAfter::new(3);

        let reason = station.run(&config(), &stop);

        assert_eq!(reason, StopReason::Interrupted);
        assert_eq!(stop.waited.get(), 3);
        assert_eq!(station.state(), LoopState::Stopped);
        let board = factory.board.borrow();
        assert!(board.levels.is_empty());
        let closes = board
            .events
            .iter()
            .filter(|e| matches!(e, Event::Close(_)))
            .count();
        assert_eq!(closes, 3);
    }

    #[test]
    fn test_sensor_fault_stops_and_releases() {
        let factory = FakeFactory::default();
        let mut station = station(
            vec![
                Ok(Measurement::new(19.0)),
                Err(SensorError::Fault(anyhow::anyhow!("bus gone"))),
            ],
            &factory,
        );
        let stop = StopAfter::new(10);

        let reason = station.run(&config(), &stop);

        assert_eq!(reason, StopReason::Fault("bus gone".to_string()));
        assert_eq!(stop.waited.get(), 1);
        assert!(factory.board.borrow().levels.is_empty());
    }

    #[test]
    fn test_exhausted_sensor_ends_loop() {
        let factory = FakeFactory::default();
        let mut station = station(vec![Ok(Measurement::new(19.0))], &factory);
        let stop = StopAfter::new(10);

        assert_eq!(station.run(&config(), &stop), StopReason::Exhausted);
    }

    #[test]
    fn test_raised_signal_stops_before_first_poll() {
        let factory = FakeFactory::default();
        let mut station = station(vec![Ok(Measurement::new(19.0))], &factory);
        let stop = StopAfter::new(0);

        assert_eq!(station.run(&config(), &stop), StopReason::Interrupted);
        assert!(station.reporter.transport().requests.borrow().is_empty());
    }
}
