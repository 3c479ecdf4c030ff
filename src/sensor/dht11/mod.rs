use rppal::gpio::Gpio;
use std::thread;
use std::time::{Duration, Instant};

use super::{Measurement, Sensor};
use crate::error::SensorError;

/// 两次读取之间的最小间隔
const READ_INTERVAL: Duration = Duration::from_secs(2);

/// DHT11 温度、湿度二合一传感器封装对象
pub struct DHT11 {
    /// 单总线数据针脚
    pin: rppal::gpio::IoPin,
    /// 一次`read_once`最多尝试的次数
    retries: u32,
}

/// 实现传感器操作
impl DHT11 {
    /// 自实现等待，使用std::thread::sleep会导致主线程被挂起，引发时序错乱问题，导致数据无法接收成功
    fn wait(duration: Duration) {
        let start = Instant::now();
        while start.elapsed() < duration {}
    }

    /// 构建传感器实例
    pub fn new(pin: u8, retries: u32) -> anyhow::Result<Self> {
        // 构建针脚GPIO对象
        let gpio = Gpio::new()?;
        let mut pin = gpio.get(pin)?.into_io(rppal::gpio::Mode::Output);
        // 设置高电平
        pin.set_high();
        // 些许的等待可以让传感器收到高电平信号,使电平稳定
        Self::wait(Duration::from_secs(1));
        // OK
        Ok(Self {
            pin,
            retries: retries.max(1),
        })
    }

    /// 在指定时间范围内等待一个高(低)电平信号
    fn wait_for_edge(&self, target_high: bool, timeout_us: u64) -> bool {
        let start = Instant::now();
        while self.pin.is_high() != target_high {
            if start.elapsed() > Duration::from_micros(timeout_us) {
                return false;
            }
        }
        true
    }

    // 测量高电平持续时间
    fn measure_high_time(&self, timeout_us: u64) -> anyhow::Result<Duration> {
        let start = Instant::now();
        while self.pin.is_high() {
            if start.elapsed() > Duration::from_micros(timeout_us) {
                return Err(anyhow::anyhow!("high level timed out"));
            }
        }
        Ok(start.elapsed())
    }

    /// 读取一帧40位原始数据
    fn read_frame(&mut self) -> anyhow::Result<[u8; 5]> {
        // 发送开始信号
        self.pin.set_mode(rppal::gpio::Mode::Output);
        self.pin.set_low();
        Self::wait(Duration::from_millis(18));
        self.pin.set_high();
        Self::wait(Duration::from_micros(30));

        // 设置引脚为输入模式
        self.pin.set_mode(rppal::gpio::Mode::Input);

        // 响应开始、响应结束、数据开始
        if !self.wait_for_edge(false, 1000) {
            return Err(anyhow::anyhow!("no response from sensor"));
        }
        if !self.wait_for_edge(true, 1000) {
            return Err(anyhow::anyhow!("response did not finish"));
        }
        if !self.wait_for_edge(false, 1000) {
            return Err(anyhow::anyhow!("data did not start"));
        }

        // 高位先出，高电平超过40us为1
        let mut data = [0u8; 5];
        for byte in 0..5 {
            for bit in 0..8 {
                if !self.wait_for_edge(true, 1000) {
                    return Err(anyhow::anyhow!("bit {} of byte {} timed out", bit, byte));
                }

                let high_time = self.measure_high_time(1000)?;
                if high_time > Duration::from_micros(40) {
                    data[byte] |= 1 << (7 - bit);
                }
            }
        }

        // OK
        Ok(data)
    }

    /// 从传感器读取温度和湿度，失败时间隔2秒重试
    pub fn read_retry(&mut self) -> anyhow::Result<(f32, f32)> {
        let mut last_err = anyhow::anyhow!("no attempt made");
        for attempt in 1..=self.retries {
            match self.read_frame().and_then(|frame| decode_frame(&frame)) {
                Ok(reading) => return Ok(reading),
                Err(err) => {
                    log::debug!("DHT11 attempt {}/{} failed: {}", attempt, self.retries, err);
                    last_err = err;
                }
            }
            if attempt < self.retries {
                thread::sleep(READ_INTERVAL);
            }
        }
        Err(last_err)
    }
}

impl Sensor for DHT11 {
    fn read_once(&mut self) -> Result<Measurement, SensorError> {
        let (temperature, humidity) = self
            .read_retry()
            .map_err(|err| SensorError::Unavailable(err.to_string()))?;
        Ok(Measurement::new(temperature).with_humidity(humidity))
    }
}

/// 解析DHT11数据帧，返回(温度, 湿度)
///
/// 数据格式：8bit湿度整数 + 8bit湿度小数 + 8bit温度整数 + 8bit温度小数 + 8bit校验和，
/// 温度小数字节的最高位为1表示负温度。
pub fn decode_frame(data: &[u8; 5]) -> anyhow::Result<(f32, f32)> {
    // 校验位=湿度高位+湿度低位+温度高位+温度低位
    let checksum = data[0]
        .wrapping_add(data[1])
        .wrapping_add(data[2])
        .wrapping_add(data[3]);
    if checksum != data[4] {
        return Err(anyhow::anyhow!(
            "checksum mismatch: expected {:#04x}, got {:#04x}",
            checksum,
            data[4]
        ));
    }
    if data[..4].iter().all(|b| *b == 0) {
        return Err(anyhow::anyhow!("empty frame"));
    }

    let humidity = data[0] as f32 + (data[1] & 0x0F) as f32 / 10.0;
    let mut temperature = data[2] as f32 + (data[3] & 0x0F) as f32 / 10.0;
    if data[3] & 0x80 != 0 {
        temperature = -temperature;
    }

    Ok((temperature, humidity))
}
