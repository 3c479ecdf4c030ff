//! 交互式配置菜单
//!
//! 读写都通过泛型参数传入，测试时可以用内存缓冲代替终端。

pub mod console;
pub mod input;

use std::io::{self, BufRead, Write};

use crate::color::LedColor;
use crate::config::AppConfig;
use crate::error::{InputError, ReportError};
use crate::interrupt::StopSignal;
use crate::poll_loop::{Station, StopReason};
use crate::registry::ActuatorFactory;
use crate::sensor::Sensor;
use crate::telemetry::{Ack, Transport};
use input::MenuChoice;

const MENU: &str = "
--- SmartTempHub Main Menu ---
1. Change GPIO pins
2. Set LED colors by temperature
3. Change ThingSpeak settings
4. Delete ThingSpeak data (time based)
5. Start system (Sensor + LED + ThingSpeak)
6. Exit
";

/// 一次菜单操作之后是否继续
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    /// 选择退出或输入已结束
    Quit,
}

pub struct Shell<R, W> {
    input: R,
    output: W,
}

impl<R: BufRead, W: Write> Shell<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self { input, output }
    }

    /// 显示菜单并处理选择，直到选择退出或输入结束
    ///
    /// 返回前释放全部LED。
    pub fn run<S, F, T>(
        &mut self,
        station: &mut Station<S, F, T>,
        config: &mut AppConfig,
        stop: &impl StopSignal,
    ) -> io::Result<()>
    where
        S: Sensor,
        F: ActuatorFactory,
        T: Transport,
    {
        station.registry.initialize(&config.pins);

        loop {
            write!(self.output, "{}", MENU)?;
            let Some(line) = self.read_line("Choose (1-6): ")? else {
                break;
            };

            let flow = match input::parse_menu_choice(&line) {
                Ok(MenuChoice::EditPins) => self.edit_pins(station, config)?,
                Ok(MenuChoice::EditThreshold) => self.edit_threshold(config)?,
                Ok(MenuChoice::EditTelemetry) => self.edit_telemetry(config)?,
                Ok(MenuChoice::Purge) => self.purge(station, config)?,
                Ok(MenuChoice::Start) => self.start(station, config, stop)?,
                Ok(MenuChoice::Exit) => Flow::Quit,
                Err(err) => {
                    writeln!(self.output, "❌ {}", err)?;
                    Flow::Continue
                }
            };
            if flow == Flow::Quit {
                break;
            }
        }

        station.registry.shutdown();
        writeln!(self.output, "👋 Exiting...")?;
        self.output.flush()
    }

    fn edit_pins<S, F, T>(
        &mut self,
        station: &mut Station<S, F, T>,
        config: &mut AppConfig,
    ) -> io::Result<Flow>
    where
        S: Sensor,
        F: ActuatorFactory,
        T: Transport,
    {
        let mut flow = Flow::Continue;
        for color in LedColor::ALL {
            let prompt = format!(
                "{} LED GPIO pin (current: {}, Enter to keep): ",
                upper(color),
                describe_pin(*config.pins.get(color))
            );
            match self.ask(&prompt, input::parse_pin)? {
                Some(Some(pin)) => *config.pins.get_mut(color) = Some(pin),
                Some(None) => {}
                None => {
                    flow = Flow::Quit;
                    break;
                }
            }
        }

        // 新绑定立即生效
        let opened = station.registry.initialize(&config.pins);
        writeln!(
            self.output,
            "✅ GPIO pins: red {}, green {}, blue {}",
            describe_pin(config.pins.red),
            describe_pin(config.pins.green),
            describe_pin(config.pins.blue)
        )?;
        for (color, pin) in config.pins.iter() {
            if pin.is_some() && opened.get(color).is_none() {
                writeln!(self.output, "⚠️ {} LED could not be initialized.", upper(color))?;
            }
        }
        Ok(flow)
    }

    fn edit_threshold(&mut self, config: &mut AppConfig) -> io::Result<Flow> {
        let threshold = &mut config.threshold;

        let prompt = format!(
            "LED color at or below the limit (red/green/blue, current: {}): ",
            threshold.color_below
        );
        match self.ask(&prompt, input::parse_color)? {
            Some(Some(color)) => threshold.color_below = color,
            Some(None) => {}
            None => return Ok(Flow::Quit),
        }

        let prompt = format!(
            "LED color above the limit (red/green/blue, current: {}): ",
            threshold.color_above
        );
        match self.ask(&prompt, input::parse_color)? {
            Some(Some(color)) => threshold.color_above = color,
            Some(None) => {}
            None => return Ok(Flow::Quit),
        }

        let prompt = format!("Temperature limit in °C (current: {}): ", threshold.limit);
        match self.ask(&prompt, input::parse_limit)? {
            Some(Some(limit)) => threshold.limit = limit,
            Some(None) => {}
            None => return Ok(Flow::Quit),
        }

        writeln!(
            self.output,
            "✅ Set: <={limit}°C ➜ {}, >{limit}°C ➜ {}",
            upper(threshold.color_below),
            upper(threshold.color_above),
            limit = threshold.limit
        )?;
        Ok(Flow::Continue)
    }

    fn edit_telemetry(&mut self, config: &mut AppConfig) -> io::Result<Flow> {
        let telemetry = &mut config.telemetry;
        let fields = [
            ("ThingSpeak channel ID", &mut telemetry.channel_id, false),
            ("ThingSpeak Write API key", &mut telemetry.write_key, true),
            ("ThingSpeak User API key", &mut telemetry.read_key, true),
        ];

        for (label, value, secret) in fields {
            let current = match (value.is_empty(), secret) {
                (true, _) => "not set".to_string(),
                (false, true) => "set".to_string(),
                (false, false) => value.clone(),
            };
            let prompt = format!("{} (current: {}, Enter to keep): ", label, current);
            let Some(line) = self.read_line(&prompt)? else {
                return Ok(Flow::Quit);
            };
            if let Some(new_value) = input::parse_credential(&line) {
                *value = new_value;
            }
        }

        writeln!(self.output, "✅ ThingSpeak settings updated.")?;
        Ok(Flow::Continue)
    }

    fn purge<S, F, T>(
        &mut self,
        station: &mut Station<S, F, T>,
        config: &AppConfig,
    ) -> io::Result<Flow>
    where
        S: Sensor,
        F: ActuatorFactory,
        T: Transport,
    {
        let prompt = "Delete data up to how many minutes ago? (Enter to cancel): ";
        let minutes = match self.ask(prompt, input::parse_minutes)? {
            Some(Some(minutes)) => minutes,
            Some(None) => {
                writeln!(self.output, "Cancelled.")?;
                return Ok(Flow::Continue);
            }
            None => return Ok(Flow::Quit),
        };

        writeln!(
            self.output,
            "🗑️ Deleting data from channel {} up to {} minutes ago...",
            config.telemetry.channel_id, minutes
        )?;
        match station.reporter.purge_since(minutes, &config.telemetry) {
            Ok(Ack::Success) => writeln!(self.output, "✅ Data deleted from ThingSpeak!")?,
            Ok(Ack::Skipped) => writeln!(
                self.output,
                "❌ ThingSpeak User API key or channel ID missing. Delete skipped."
            )?,
            Err(err @ ReportError::Rejected { .. }) => {
                writeln!(self.output, "❌ Delete failed: {}", err)?;
                writeln!(
                    self.output,
                    "Tip: deleting needs the User API key, not the Write API key."
                )?;
            }
            Err(err) => writeln!(self.output, "⚠️ {}", err)?,
        }
        Ok(Flow::Continue)
    }

    fn start<S, F, T>(
        &mut self,
        station: &mut Station<S, F, T>,
        config: &AppConfig,
        stop: &impl StopSignal,
    ) -> io::Result<Flow>
    where
        S: Sensor,
        F: ActuatorFactory,
        T: Transport,
    {
        writeln!(self.output, "▶️ System running, press CTRL+C to return to the menu.")?;
        self.output.flush()?;

        stop.arm();
        let reason = station.run(config, stop);
        stop.disarm();

        match reason {
            StopReason::Interrupted => writeln!(self.output, "🛑 System stopped.")?,
            StopReason::Fault(err) => {
                writeln!(self.output, "❌ System stopped after an error: {}", err)?
            }
            StopReason::Exhausted => writeln!(self.output, "✅ Measurement finished.")?,
        }

        // 循环退出时已释放LED，回到菜单后重新占用
        station.registry.initialize(&config.pins);
        Ok(Flow::Continue)
    }

    /// 输出提示并读取一行，输入结束时返回`None`
    fn read_line(&mut self, prompt: &str) -> io::Result<Option<String>> {
        write!(self.output, "{}", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            writeln!(self.output)?;
            return Ok(None);
        }
        Ok(Some(line.trim().to_string()))
    }

    /// 反复询问直到输入有效
    fn ask<V>(
        &mut self,
        prompt: &str,
        parse: impl Fn(&str) -> Result<V, InputError>,
    ) -> io::Result<Option<V>> {
        loop {
            let Some(line) = self.read_line(prompt)? else {
                return Ok(None);
            };
            match parse(&line) {
                Ok(value) => return Ok(Some(value)),
                Err(err) => writeln!(self.output, "❌ {}", err)?,
            }
        }
    }
}

fn upper(color: LedColor) -> String {
    color.to_string().to_uppercase()
}

fn describe_pin(pin: Option<u8>) -> String {
    match pin {
        Some(pin) => pin.to_string(),
        None => "not set".to_string(),
    }
}
