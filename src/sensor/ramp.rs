use super::{Measurement, Sensor};
use crate::error::SensorError;

/// 模拟传感器：温度从起点按步长爬升到终点，湿度同步缓慢上升
///
/// 没有接硬件时用来跑完整流程。
#[derive(Debug, Clone)]
pub struct RampSensor {
    start: f32,
    end: f32,
    step: f32,
    humidity_start: f32,
    humidity_step: f32,
    /// 到达终点后是否从头开始，否则返回`Exhausted`
    endless: bool,
    index: u32,
}

impl RampSensor {
    /// 17.0℃到22.0℃，每次0.5℃；湿度从50%起每次0.3%
    pub fn bench(endless: bool) -> Self {
        Self::new(17.0, 22.0, 0.5, endless)
    }

    pub fn new(start: f32, end: f32, step: f32, endless: bool) -> Self {
        Self {
            start,
            end,
            step,
            humidity_start: 50.0,
            humidity_step: 0.3,
            endless,
            index: 0,
        }
    }

    fn steps(&self) -> u32 {
        if self.step <= 0.0 || self.end < self.start {
            return 1;
        }
        ((self.end - self.start) / self.step).round() as u32 + 1
    }
}

impl Sensor for RampSensor {
    fn read_once(&mut self) -> Result<Measurement, SensorError> {
        if self.index >= self.steps() {
            if !self.endless {
                return Err(SensorError::Exhausted);
            }
            self.index = 0;
        }

        let i = self.index as f32;
        self.index += 1;
        Ok(Measurement::new(self.start + self.step * i)
            .with_humidity(self.humidity_start + self.humidity_step * i))
    }
}
