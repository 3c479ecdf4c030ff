use std::str::FromStr;
use std::time::Duration;

use crate::color::{ColorMap, LedColor};
use crate::policy::ThresholdConfig;
use crate::registry::PinBindings;
use crate::sensor::bmp280;
use crate::telemetry::{DEFAULT_BASE_URL, TelemetryConfig};

/// 允许配置的最大BCM针脚号
pub const MAX_GPIO_PIN: u8 = 27;

/// 使用哪种传感器
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorConfig {
    /// DHT11单总线，`retries`为每个周期的最大尝试次数
    Dht11 { pin: u8, retries: u32 },
    /// BMP280，I2C总线1
    Bmp280 { address: u8 },
    /// 模拟爬升数据
    Ramp,
}

impl Default for SensorConfig {
    fn default() -> Self {
        SensorConfig::Dht11 {
            pin: 17,
            retries: 5,
        }
    }
}

/// 运行时配置，只在内存中保存
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub pins: PinBindings,
    pub threshold: ThresholdConfig,
    pub telemetry: TelemetryConfig,
    pub sensor: SensorConfig,
    /// 两次采样之间的间隔（ThingSpeak免费版限速15秒）
    pub poll_interval: Duration,
    pub http_timeout: Duration,
    pub base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            pins: ColorMap::new(Some(21), Some(16), Some(20)),
            threshold: ThresholdConfig::default(),
            telemetry: TelemetryConfig::default(),
            sensor: SensorConfig::default(),
            poll_interval: Duration::from_secs(15),
            http_timeout: Duration::from_secs(10),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    /// 默认值 + 环境变量覆盖
    pub fn from_env() -> Self {
        Self::from_lookup(Self::default(), |key| std::env::var(key).ok())
    }

    /// 以`base`为起点，用`lookup`查到的值覆盖；无效值记录警告并保留原值
    pub fn from_lookup(base: Self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = base;
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        for (color, key) in [
            (LedColor::Red, "LED_RED_PIN"),
            (LedColor::Green, "LED_GREEN_PIN"),
            (LedColor::Blue, "LED_BLUE_PIN"),
        ] {
            if let Some(value) = get(key) {
                if value.eq_ignore_ascii_case("none") {
                    *config.pins.get_mut(color) = None;
                } else if let Some(pin) = parse_or_warn::<u8>(key, &value)
                    .filter(|pin| check_pin(key, *pin))
                {
                    *config.pins.get_mut(color) = Some(pin);
                }
            }
        }

        if let Some(value) = get("TEMP_LIMIT")
            && let Some(limit) = parse_or_warn::<f32>("TEMP_LIMIT", &value)
        {
            if limit.is_finite() {
                config.threshold.limit = limit;
            } else {
                log::warn!("⚠️ Ignoring TEMP_LIMIT={}, expected a finite number", value);
            }
        }
        if let Some(value) = get("LED_BELOW_LIMIT")
            && let Some(color) = parse_or_warn::<LedColor>("LED_BELOW_LIMIT", &value)
        {
            config.threshold.color_below = color;
        }
        if let Some(value) = get("LED_ABOVE_LIMIT")
            && let Some(color) = parse_or_warn::<LedColor>("LED_ABOVE_LIMIT", &value)
        {
            config.threshold.color_above = color;
        }

        // ThingSpeak
        if let Some(value) = get("THINGSPEAK_CHANNEL_ID") {
            config.telemetry.channel_id = value;
        }
        if let Some(value) = get("THINGSPEAK_WRITE_API_KEY") {
            config.telemetry.write_key = value;
        }
        if let Some(value) = get("THINGSPEAK_USER_API_KEY") {
            config.telemetry.read_key = value;
        }
        if let Some(value) = get("THINGSPEAK_BASE_URL") {
            config.base_url = value;
        }

        // 传感器
        if let Some(value) = get("SENSOR") {
            match value.to_ascii_lowercase().as_str() {
                "dht11" => {
                    if !matches!(config.sensor, SensorConfig::Dht11 { .. }) {
                        config.sensor = SensorConfig::default();
                    }
                }
                "bmp280" => {
                    config.sensor = SensorConfig::Bmp280 {
                        address: bmp280::DEFAULT_ADDRESS,
                    }
                }
                "ramp" => config.sensor = SensorConfig::Ramp,
                other => log::warn!("⚠️ Ignoring SENSOR={}, expected dht11, bmp280 or ramp", other),
            }
        }
        if let SensorConfig::Dht11 { pin, retries } = &mut config.sensor {
            if let Some(value) = get("DHT_PIN")
                && let Some(p) = parse_or_warn::<u8>("DHT_PIN", &value).filter(|p| check_pin("DHT_PIN", *p))
            {
                *pin = p;
            }
            if let Some(value) = get("DHT_RETRIES")
                && let Some(r) = parse_or_warn::<u32>("DHT_RETRIES", &value)
            {
                *retries = r.max(1);
            }
        }
        if let SensorConfig::Bmp280 { address } = &mut config.sensor
            && let Some(value) = get("BMP280_ADDRESS")
        {
            match parse_address(&value) {
                Some(a) => *address = a,
                None => log::warn!("⚠️ Ignoring BMP280_ADDRESS={}, expected e.g. 0x76", value),
            }
        }

        if let Some(value) = get("POLL_INTERVAL_SECS")
            && let Some(secs) = parse_or_warn::<u64>("POLL_INTERVAL_SECS", &value)
        {
            config.poll_interval = Duration::from_secs(secs);
        }
        if let Some(value) = get("HTTP_TIMEOUT_SECS")
            && let Some(secs) = parse_or_warn::<u64>("HTTP_TIMEOUT_SECS", &value)
        {
            config.http_timeout = Duration::from_secs(secs.max(1));
        }

        config
    }
}

fn parse_or_warn<T: FromStr>(key: &str, value: &str) -> Option<T> {
    match value.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            log::warn!("⚠️ Ignoring invalid {}={}", key, value);
            None
        }
    }
}

fn check_pin(key: &str, pin: u8) -> bool {
    if pin > MAX_GPIO_PIN {
        log::warn!("⚠️ Ignoring {}={}, GPIO must be 0-{}", key, pin, MAX_GPIO_PIN);
        return false;
    }
    true
}

/// 支持`0x76`和`118`两种写法
fn parse_address(value: &str) -> Option<u8> {
    match value
        .strip_prefix("0x")
        .or_else(|| value.strip_prefix("0X"))
    {
        Some(hex) => u8::from_str_radix(hex, 16).ok(),
        None => value.parse().ok(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn load(vars: &[(&str, &str)]) -> AppConfig {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(AppConfig::default(), |key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.pins, ColorMap::new(Some(21), Some(16), Some(20)));
        assert_eq!(config.threshold.limit, 20.0);
        assert_eq!(config.threshold.color_below, LedColor::Blue);
        assert_eq!(config.threshold.color_above, LedColor::Red);
        assert!(config.telemetry.write_key.is_empty());
        assert_eq!(config.sensor, SensorConfig::Dht11 { pin: 17, retries: 5 });
        assert_eq!(config.poll_interval, Duration::from_secs(15));
    }

    #[test]
    fn test_env_overrides() {
        let config = load(&[
            ("LED_RED_PIN", "5"),
            ("LED_GREEN_PIN", "none"),
            ("TEMP_LIMIT", "23.5"),
            ("LED_BELOW_LIMIT", "GREEN"),
            ("THINGSPEAK_CHANNEL_ID", "42"),
            ("THINGSPEAK_WRITE_API_KEY", " WKEY "),
            ("POLL_INTERVAL_SECS", "2"),
        ]);
        assert_eq!(config.pins, ColorMap::new(Some(5), None, Some(20)));
        assert_eq!(config.threshold.limit, 23.5);
        assert_eq!(config.threshold.color_below, LedColor::Green);
        assert_eq!(config.telemetry.channel_id, "42");
        assert_eq!(config.telemetry.write_key, "WKEY");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
    }

    #[test]
    fn test_invalid_values_keep_defaults() {
        let config = load(&[
            ("LED_RED_PIN", "28"),
            ("LED_BLUE_PIN", "abc"),
            ("TEMP_LIMIT", "warm"),
            ("LED_ABOVE_LIMIT", "purple"),
            ("SENSOR", "dht22"),
        ]);
        assert_eq!(config, AppConfig::default());
    }

    #[test]
    fn test_non_finite_limit_keeps_default() {
        for value in ["NaN", "inf", "-inf"] {
            let config = load(&[("TEMP_LIMIT", value)]);
            assert_eq!(config.threshold.limit, 20.0, "TEMP_LIMIT={value}");
        }
    }

    #[test]
    fn test_sensor_selection() {
        let config = load(&[("SENSOR", "bmp280"), ("BMP280_ADDRESS", "0x77")]);
        assert_eq!(config.sensor, SensorConfig::Bmp280 { address: 0x77 });

        let config = load(&[("SENSOR", "dht11"), ("DHT_PIN", "4"), ("DHT_RETRIES", "0")]);
        assert_eq!(config.sensor, SensorConfig::Dht11 { pin: 4, retries: 1 });

        let config = load(&[("SENSOR", "Ramp")]);
        assert_eq!(config.sensor, SensorConfig::Ramp);
    }

    #[test]
    fn test_parse_address() {
        assert_eq!(parse_address("0x76"), Some(0x76));
        assert_eq!(parse_address("119"), Some(0x77));
        assert_eq!(parse_address("0xZZ"), None);
    }
}
