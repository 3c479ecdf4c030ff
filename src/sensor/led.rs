use embedded_hal::pwm::SetDutyCycle;
use rppal::gpio::Gpio;

use crate::output_pin_wapper::OutputPinWapper;
use crate::registry::{Actuator, ActuatorFactory};

/// 可调光LED灯封装对象
pub struct PwmLed<P: SetDutyCycle> {
    pin: P,
}

impl<P: SetDutyCycle> PwmLed<P> {
    /// 创建LED实例，初始为熄灭
    pub fn new(pin: P) -> Self {
        Self { pin }
    }

    /// 设置亮度，0.0熄灭，1.0全亮
    pub fn set_value(&mut self, value: f32) -> anyhow::Result<()> {
        let value = value.clamp(0.0, 1.0);
        let max = self.pin.max_duty_cycle();
        let duty = (value * max as f32).round() as u16;
        self.pin
            .set_duty_cycle(duty.min(max))
            .map_err(|err| anyhow::anyhow!("failed to set duty cycle: {:?}", err))
    }

    /// 关闭LED灯
    pub fn off(&mut self) -> anyhow::Result<()> {
        self.set_value(0.0)
    }

    /// 熄灭后交出针脚
    pub fn release(mut self) -> P {
        if let Err(err) = self.off() {
            log::warn!("failed to switch LED off before release: {}", err);
        }
        self.pin
    }
}

impl<P: SetDutyCycle> Actuator for PwmLed<P> {
    fn set_level(&mut self, level: f32) -> anyhow::Result<()> {
        self.set_value(level)
    }

    fn close(self) {
        // 针脚被drop时rppal会恢复其原始状态
        drop(self.release());
    }
}

/// 通过rppal打开GPIO上的LED
pub struct GpioLedFactory {
    gpio: Option<Gpio>,
}

impl GpioLedFactory {
    /// 当前主机没有GPIO时不报错，之后每次打开都会失败
    pub fn new() -> Self {
        let gpio = match Gpio::new() {
            Ok(gpio) => Some(gpio),
            Err(err) => {
                log::warn!("⚠️ GPIO is not available on this host: {}", err);
                None
            }
        };
        Self { gpio }
    }
}

impl Default for GpioLedFactory {
    fn default() -> Self {
        Self::new()
    }
}

impl ActuatorFactory for GpioLedFactory {
    type Output = PwmLed<OutputPinWapper>;

    fn open(&mut self, pin: u8) -> anyhow::Result<Self::Output> {
        let gpio = self
            .gpio
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("GPIO is not available"))?;
        // 已被其他颜色占用的针脚在这里返回错误
        let pin = gpio.get(pin)?.into_output_low();
        Ok(PwmLed::new(OutputPinWapper::new(pin)))
    }
}
