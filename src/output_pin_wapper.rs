use std::fmt::Debug;

use embedded_hal::pwm::{Error, ErrorKind, ErrorType, SetDutyCycle};
use rppal::gpio;

/// 软件PWM频率（Hz），LED调光足够且不会闪烁
const PWM_FREQUENCY: f64 = 100.0;

/// 占空比分辨率
const MAX_DUTY: u16 = 1000;

#[derive(Debug)]
pub enum OutputPinWapperError {
    Gpio(gpio::Error),
}

impl Error for OutputPinWapperError {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Other
    }
}

impl std::fmt::Display for OutputPinWapperError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        Debug::fmt(self, f)
    }
}

impl std::error::Error for OutputPinWapperError {}

/// 输出针脚包装，把rppal的软件PWM适配为`SetDutyCycle`
///
/// 占空比为0或满时直接拉低/拉高，避免软件PWM线程空转。
pub struct OutputPinWapper {
    pin: gpio::OutputPin,
    pwm_active: bool,
}

impl ErrorType for OutputPinWapper {
    type Error = OutputPinWapperError;
}

impl OutputPinWapper {
    pub fn new(pin: gpio::OutputPin) -> Self {
        Self {
            pin,
            pwm_active: false,
        }
    }

    fn stop_pwm(&mut self) -> Result<(), OutputPinWapperError> {
        if self.pwm_active {
            self.pin.clear_pwm().map_err(OutputPinWapperError::Gpio)?;
            self.pwm_active = false;
        }
        Ok(())
    }
}

impl SetDutyCycle for OutputPinWapper {
    fn max_duty_cycle(&self) -> u16 {
        MAX_DUTY
    }

    fn set_duty_cycle(&mut self, duty: u16) -> Result<(), Self::Error> {
        match duty {
            0 => {
                self.stop_pwm()?;
                self.pin.set_low();
            }
            d if d >= MAX_DUTY => {
                self.stop_pwm()?;
                self.pin.set_high();
            }
            d => {
                self.pin
                    .set_pwm_frequency(PWM_FREQUENCY, d as f64 / MAX_DUTY as f64)
                    .map_err(OutputPinWapperError::Gpio)?;
                self.pwm_active = true;
            }
        }
        Ok(())
    }
}
