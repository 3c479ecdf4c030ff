use std::thread;
use std::time::Duration;

use embedded_hal::i2c::I2c;

use super::{Measurement, Sensor};
use crate::error::SensorError;

/// BMP280的默认I2C地址（SDO接地时为0x76）
pub const DEFAULT_ADDRESS: u8 = 0x76;

/// 芯片ID寄存器的期望值
const CHIP_ID: u8 = 0x58;

const REG_CALIBRATION: u8 = 0x88;
const REG_CHIP_ID: u8 = 0xD0;
const REG_STATUS: u8 = 0xF3;
const REG_CTRL_MEAS: u8 = 0xF4;
const REG_CONFIG: u8 = 0xF5;
const REG_DATA: u8 = 0xF7;

/// 测量被跳过时ADC寄存器的值
const SKIPPED_SAMPLE: i32 = 0x80000;

/// BMP280传感器校准参数
///
/// 出厂时写入NVM（0x88-0x9F，24字节，小端序），
/// 温度补偿需要 T1-T3，压力补偿需要 P1-P9 以及温度补偿产生的`t_fine`。
#[derive(Debug, Default, Clone, PartialEq)]
pub struct Calibration {
    pub dig_t1: u16,
    pub dig_t2: i16,
    pub dig_t3: i16,
    pub dig_p1: u16,
    pub dig_p2: i16,
    pub dig_p3: i16,
    pub dig_p4: i16,
    pub dig_p5: i16,
    pub dig_p6: i16,
    pub dig_p7: i16,
    pub dig_p8: i16,
    pub dig_p9: i16,
}

impl Calibration {
    /// 从0x88开始的24字节中解析校准参数
    pub fn from_bytes(raw: &[u8; 24]) -> Self {
        let u = |i: usize| u16::from_le_bytes([raw[i], raw[i + 1]]);
        let s = |i: usize| i16::from_le_bytes([raw[i], raw[i + 1]]);
        Self {
            dig_t1: u(0),
            dig_t2: s(2),
            dig_t3: s(4),
            dig_p1: u(6),
            dig_p2: s(8),
            dig_p3: s(10),
            dig_p4: s(12),
            dig_p5: s(14),
            dig_p6: s(16),
            dig_p7: s(18),
            dig_p8: s(20),
            dig_p9: s(22),
        }
    }

    /// 温度补偿，返回(温度℃, t_fine)
    ///
    /// 32位有符号整型运算，结果单位为0.01℃。
    pub fn compensate_temperature(&self, adc_t: i32) -> (f32, i64) {
        let dig_t1 = self.dig_t1 as i32;
        let dig_t2 = self.dig_t2 as i32;
        let dig_t3 = self.dig_t3 as i32;

        let var1 = (((adc_t >> 3) - (dig_t1 << 1)) * dig_t2) >> 11;
        let var2 = ((((adc_t >> 4) - dig_t1) * ((adc_t >> 4) - dig_t1)) >> 12) * dig_t3;
        let var2 = var2 >> 14;

        // 压力补偿需要依赖温度中间量
        let t_fine = (var1 as i64) + (var2 as i64);
        let temperature = (t_fine * 5 + 128) >> 8;

        ((temperature as f64 / 100.0) as f32, t_fine)
    }

    /// 压力补偿，返回Pa
    ///
    /// 64位有符号整型运算，中间结果为Q24.8格式。
    pub fn compensate_pressure(&self, adc_p: i32, t_fine: i64) -> f32 {
        let dig_p1 = self.dig_p1 as i64;
        let dig_p2 = self.dig_p2 as i64;
        let dig_p3 = self.dig_p3 as i64;
        let dig_p4 = self.dig_p4 as i64;
        let dig_p5 = self.dig_p5 as i64;
        let dig_p6 = self.dig_p6 as i64;
        let dig_p7 = self.dig_p7 as i64;
        let dig_p8 = self.dig_p8 as i64;
        let dig_p9 = self.dig_p9 as i64;

        let mut var1 = t_fine - 128000;
        let mut var2 = var1 * var1 * dig_p6;
        var2 += (var1 * dig_p5) << 17;
        var2 += dig_p4 << 35;
        var1 = ((var1 * var1 * dig_p3) >> 8) + ((var1 * dig_p2) << 12);
        var1 = (((1_i64 << 47) + var1) * dig_p1) >> 33;

        // 避免除零
        if var1 == 0 {
            return 0.0;
        }

        let mut p = 1048576 - (adc_p as i64);
        p = (((p << 31) - var2) * 3125) / var1;
        var1 = (dig_p9 * ((p >> 13) * (p >> 13))) >> 25;
        var2 = (dig_p8 * p) >> 19;
        p = ((p + var1 + var2) >> 8) + (dig_p7 << 4);

        (p as f64 / 256.0) as f32
    }
}

/// 解析0xF7-0xFC的6字节原始数据，返回(压力ADC, 温度ADC)
pub fn parse_raw(data: &[u8; 6]) -> (i32, i32) {
    let press_raw = ((data[0] as i32) << 12) | ((data[1] as i32) << 4) | ((data[2] as i32) >> 4);
    let temp_raw = ((data[3] as i32) << 12) | ((data[4] as i32) << 4) | ((data[5] as i32) >> 4);
    (press_raw, temp_raw)
}

/// BMP280温度、气压传感器封装对象
pub struct BMP280<B> {
    /// I2C通信总线
    bus: B,
    /// I2C从设备地址
    i2c_addr: u8,
    calib: Calibration,
}

impl<B: I2c> BMP280<B> {
    /// 创建BMP280传感器实例
    pub fn new(bus: B, i2c_addr: u8) -> anyhow::Result<Self> {
        let mut sensor = Self {
            bus,
            i2c_addr,
            calib: Calibration::default(),
        };

        // 传感器上电后必须等待2ms以上
        thread::sleep(Duration::from_millis(3));

        // 确认接的是BMP280
        let mut id = [0u8];
        sensor.write_read(&[REG_CHIP_ID], &mut id)?;
        if id[0] != CHIP_ID {
            return Err(anyhow::anyhow!(
                "unexpected chip id {:#04x} at {:#04x}, not a BMP280",
                id[0],
                i2c_addr
            ));
        }

        sensor.check_ready()?;
        sensor.read_calibration_data()?;

        // 温度、压力各1倍过采样，正常模式
        sensor.write(&[REG_CTRL_MEAS, 0x27])?;
        // 关闭滤波器，待机时间0.5ms
        sensor.write(&[REG_CONFIG, 0x00])?;
        thread::sleep(Duration::from_millis(10));

        // OK
        Ok(sensor)
    }

    fn write(&mut self, bytes: &[u8]) -> anyhow::Result<()> {
        self.bus
            .write(self.i2c_addr, bytes)
            .map_err(|err| anyhow::anyhow!("I2C write failed: {:?}", err))
    }

    fn write_read(&mut self, bytes: &[u8], buffer: &mut [u8]) -> anyhow::Result<()> {
        self.bus
            .write_read(self.i2c_addr, bytes, buffer)
            .map_err(|err| anyhow::anyhow!("I2C read failed: {:?}", err))
    }

    fn check_ready(&mut self) -> anyhow::Result<()> {
        let mut status = [0u8];
        self.write_read(&[REG_STATUS], &mut status)?;
        if status[0] & 0x01 != 0 {
            return Err(anyhow::anyhow!("sensor is still copying calibration data"));
        }
        Ok(())
    }

    fn read_calibration_data(&mut self) -> anyhow::Result<()> {
        let mut raw = [0u8; 24];
        self.write_read(&[REG_CALIBRATION], &mut raw)?;
        self.calib = Calibration::from_bytes(&raw);
        Ok(())
    }

    /// 读取温度（℃）和压力（Pa）
    ///
    /// 总线读写失败为`SensorError::Fault`，测量被跳过为`SensorError::Unavailable`。
    pub fn read(&mut self) -> Result<(f32, f32), SensorError> {
        let mut data = [0u8; 6];
        self.write_read(&[REG_DATA], &mut data)?;

        let (adc_p, adc_t) = parse_raw(&data);
        // 测量被跳过时寄存器保持0x80000
        if adc_t == SKIPPED_SAMPLE {
            return Err(SensorError::Unavailable(
                "temperature measurement skipped".to_string(),
            ));
        }

        let (temperature, t_fine) = self.calib.compensate_temperature(adc_t);
        let pressure = self.calib.compensate_pressure(adc_p, t_fine);

        // OK
        Ok((temperature, pressure))
    }
}

impl<B: I2c> Sensor for BMP280<B> {
    fn read_once(&mut self) -> Result<Measurement, SensorError> {
        let (temperature, pressure) = self.read()?;
        Ok(Measurement::new(temperature).with_pressure(pressure / 100.0))
    }
}
