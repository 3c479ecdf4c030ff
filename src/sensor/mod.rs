pub mod bmp280;
pub mod dht11;
pub mod led;
pub mod ramp;

use std::fmt;

use anyhow::Context;

use crate::config::SensorConfig;
use crate::error::SensorError;

/// 一次采样结果
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Measurement {
    /// 温度（℃）
    pub temperature: f32,
    /// 相对湿度（%），不带湿度的传感器为`None`
    pub humidity: Option<f32>,
    /// 气压（hPa），不带气压的传感器为`None`
    pub pressure: Option<f32>,
}

impl Measurement {
    pub fn new(temperature: f32) -> Self {
        Self {
            temperature,
            humidity: None,
            pressure: None,
        }
    }

    pub fn with_humidity(mut self, humidity: f32) -> Self {
        self.humidity = Some(humidity);
        self
    }

    pub fn with_pressure(mut self, pressure: f32) -> Self {
        self.pressure = Some(pressure);
        self
    }
}

impl fmt::Display for Measurement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "🌡️ Temperature: {:.1}°C", self.temperature)?;
        if let Some(humidity) = self.humidity {
            write!(f, ", 💧 Humidity: {:.1}%", humidity)?;
        }
        if let Some(pressure) = self.pressure {
            write!(f, ", Pressure: {:.2}hPa", pressure)?;
        }
        Ok(())
    }
}

/// 温度传感器
pub trait Sensor {
    /// 读取一次数据
    ///
    /// - `SensorError::Unavailable`: 本次没有读数
    /// - `SensorError::Fault`: 驱动故障，调用方应停止轮询
    fn read_once(&mut self) -> Result<Measurement, SensorError>;
}

impl<S: Sensor + ?Sized> Sensor for Box<S> {
    fn read_once(&mut self) -> Result<Measurement, SensorError> {
        (**self).read_once()
    }
}

/// 按配置打开传感器
pub fn open(config: &SensorConfig) -> anyhow::Result<Box<dyn Sensor>> {
    match *config {
        SensorConfig::Dht11 { pin, retries } => {
            let dht11 = dht11::DHT11::new(pin, retries)
                .with_context(|| format!("failed to open DHT11 on GPIO {}", pin))?;
            log::info!("Using DHT11 on GPIO {}", pin);
            Ok(Box::new(dht11))
        }
        SensorConfig::Bmp280 { address } => {
            let bus = rppal::i2c::I2c::new().context("failed to open I2C bus")?;
            let bmp280 = bmp280::BMP280::new(bus, address)
                .with_context(|| format!("failed to open BMP280 at {:#04x}", address))?;
            log::info!("Using BMP280 at {:#04x}", address);
            Ok(Box::new(bmp280))
        }
        SensorConfig::Ramp => {
            log::info!("Using simulated ramp sensor");
            Ok(Box::new(ramp::RampSensor::bench(true)))
        }
    }
}
