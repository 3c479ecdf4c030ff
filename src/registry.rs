use crate::color::{ColorMap, LedColor};

/// 颜色到GPIO针脚的绑定，`None`表示未分配
pub type PinBindings = ColorMap<Option<u8>>;

/// 可开关（或按比例调光）的输出
pub trait Actuator {
    /// 设置输出电平，0.0为熄灭，1.0为全亮
    fn set_level(&mut self, level: f32) -> anyhow::Result<()>;

    /// 释放输出占用的针脚
    fn close(self);
}

/// 按针脚打开输出
pub trait ActuatorFactory {
    type Output: Actuator;

    fn open(&mut self, pin: u8) -> anyhow::Result<Self::Output>;
}

/// `activate_exclusive`的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// 目标颜色已点亮，其余全部熄灭
    On(LedColor),
    /// 目标颜色没有可用输出，全部熄灭
    Unavailable(LedColor),
}

/// LED注册表，独占每种颜色的输出句柄
pub struct ActuatorRegistry<F: ActuatorFactory> {
    factory: F,
    handles: ColorMap<Option<F::Output>>,
}

impl<F: ActuatorFactory> ActuatorRegistry<F> {
    /// 创建空注册表，此时不占用任何针脚
    pub fn new(factory: F) -> Self {
        Self {
            factory,
            handles: ColorMap::from_fn(|_| None),
        }
    }

    /// 按绑定关系（重新）打开所有输出
    ///
    /// 先关闭已持有的全部句柄，再逐个打开新的。单个颜色打开失败只记录警告，
    /// 返回值为每种颜色实际打开的针脚。
    pub fn initialize(&mut self, bindings: &PinBindings) -> ColorMap<Option<u8>> {
        self.shutdown();

        for (color, pin) in bindings.iter() {
            let Some(pin) = *pin else {
                continue;
            };
            match self.factory.open(pin) {
                Ok(handle) => *self.handles.get_mut(color) = Some(handle),
                Err(err) => {
                    log::warn!("⚠️ Failed to initialize {} LED on GPIO {}: {}", color, pin, err);
                    log::warn!("Check that the GPIO pin exists and is not in use.");
                }
            }
        }

        let opened = bindings.map(|color, pin| (*pin).filter(|_| self.is_open(color)));
        log::info!(
            "✅ LEDs initialized (red: {}, green: {}, blue: {})",
            describe(opened.red),
            describe(opened.green),
            describe(opened.blue)
        );
        opened
    }

    /// 该颜色当前是否持有输出
    pub fn is_open(&self, color: LedColor) -> bool {
        self.handles.get(color).is_some()
    }

    /// 熄灭所有已打开的LED
    pub fn all_off(&mut self) -> anyhow::Result<()> {
        for (color, handle) in self.handles.iter_mut() {
            if let Some(handle) = handle {
                handle
                    .set_level(0.0)
                    .map_err(|err| anyhow::anyhow!("failed to switch {} LED off: {}", color, err))?;
            }
        }
        Ok(())
    }

    /// 只点亮指定颜色
    ///
    /// 先全部熄灭再点亮目标，所以任何时刻最多只有一个LED亮着。
    pub fn activate_exclusive(&mut self, color: LedColor) -> anyhow::Result<Activation> {
        self.all_off()?;

        match self.handles.get_mut(color) {
            Some(handle) => {
                handle
                    .set_level(1.0)
                    .map_err(|err| anyhow::anyhow!("failed to switch {} LED on: {}", color, err))?;
                Ok(Activation::On(color))
            }
            None => {
                log::warn!("⚠️ {} LED is not initialized, all LEDs stay off", color);
                Ok(Activation::Unavailable(color))
            }
        }
    }

    /// 关闭全部句柄，可以重复调用
    pub fn shutdown(&mut self) {
        for (_, slot) in self.handles.iter_mut() {
            if let Some(handle) = slot.take() {
                handle.close();
            }
        }
    }
}

impl<F: ActuatorFactory> Drop for ActuatorRegistry<F> {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn describe(pin: Option<u8>) -> String {
    match pin {
        Some(pin) => format!("GPIO {}", pin),
        None => "-".to_string(),
    }
}


#[cfg(test)]
mod tests {
    use super::testing::{Event, FakeFactory};
    use super::*;

    fn default_pins() -> PinBindings {
        ColorMap::new(Some(21), Some(16), Some(20))
    }

    #[test]
    fn test_initialize_opens_every_bound_pin() {
        let factory = FakeFactory::default();
        let mut registry = ActuatorRegistry::new(factory.clone());

        let opened = registry.initialize(&ColorMap::new(Some(21), None, Some(20)));

        assert_eq!(opened, ColorMap::new(Some(21), None, Some(20)));
        assert!(registry.is_open(LedColor::Red));
        assert!(!registry.is_open(LedColor::Green));
        assert_eq!(
            factory.board.borrow().events,
            vec![Event::Open(21), Event::Open(20)]
        );
    }

    #[test]
    fn test_initialize_tolerates_partial_failure() {
        let factory = FakeFactory::default();
        factory.board.borrow_mut().broken_pins.push(16);
        let mut registry = ActuatorRegistry::new(factory.clone());

        let opened = registry.initialize(&default_pins());

        assert_eq!(opened, ColorMap::new(Some(21), None, Some(20)));
        assert!(!registry.is_open(LedColor::Green));
    }

    #[test]
    fn test_reinitialize_closes_before_opening() {
        let factory = FakeFactory::default();
        let mut registry = ActuatorRegistry::new(factory.clone());
        registry.initialize(&default_pins());
        factory.board.borrow_mut().events.clear();

        let mut pins = default_pins();
        pins.red = Some(5);
        registry.initialize(&pins);

        let events = factory.board.borrow().events.clone();
        let close_old = events.iter().position(|e| *e == Event::Close(21));
        let open_new = events.iter().position(|e| *e == Event::Open(5));
        assert!(close_old.is_some() && open_new.is_some());
        assert!(close_old < open_new, "events: {:?}", events);

        // 所有旧句柄都先于任何新句柄被关闭
        let last_close = events
            .iter()
            .rposition(|e| matches!(e, Event::Close(_)))
            .unwrap();
        let first_open = events
            .iter()
            .position(|e| matches!(e, Event::Open(_)))
            .unwrap();
        assert!(last_close < first_open);
    }

    #[test]
    fn test_activate_exclusive_leaves_one_on() {
        let factory = FakeFactory::default();
        let mut registry = ActuatorRegistry::new(factory.clone());
        registry.initialize(&default_pins());

        for color in LedColor::ALL {
            assert_eq!(registry.activate_exclusive(color).unwrap(), Activation::On(color));
            let expected = default_pins().get(color).unwrap();
            assert_eq!(factory.board.borrow().lit_pins(), vec![expected]);
        }
    }

    #[test]
    fn test_activate_missing_color_turns_everything_off() {
        let factory = FakeFactory::default();
        let mut registry = ActuatorRegistry::new(factory.clone());
        registry.initialize(&ColorMap::new(Some(21), None, Some(20)));
        registry.activate_exclusive(LedColor::Red).unwrap();

        let activation = registry.activate_exclusive(LedColor::Green).unwrap();

        assert_eq!(activation, Activation::Unavailable(LedColor::Green));
        assert!(factory.board.borrow().lit_pins().is_empty());
    }

    #[test]
    fn test_shutdown_is_idempotent() {
        let factory = FakeFactory::default();
        let mut registry = ActuatorRegistry::new(factory.clone());
        registry.initialize(&default_pins());

        registry.shutdown();
        registry.shutdown();
        drop(registry);

        let closes = factory
            .board
            .borrow()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Close(_)))
            .count();
        assert_eq!(closes, 3);
    }

    #[test]
    fn test_drop_releases_handles() {
        let factory = FakeFactory::default();
        {
            let mut registry = ActuatorRegistry::new(factory.clone());
            registry.initialize(&default_pins());
        }
        assert!(factory.board.borrow().levels.is_empty());
    }
}
