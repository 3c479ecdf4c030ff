//! 菜单输入的解析与校验，不涉及读写

use crate::color::LedColor;
use crate::config::MAX_GPIO_PIN;
use crate::error::InputError;

/// 主菜单选项
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuChoice {
    EditPins,
    EditThreshold,
    EditTelemetry,
    Purge,
    Start,
    Exit,
}

pub fn parse_menu_choice(input: &str) -> Result<MenuChoice, InputError> {
    match input.trim() {
        "1" => Ok(MenuChoice::EditPins),
        "2" => Ok(MenuChoice::EditThreshold),
        "3" => Ok(MenuChoice::EditTelemetry),
        "4" => Ok(MenuChoice::Purge),
        "5" => Ok(MenuChoice::Start),
        "6" => Ok(MenuChoice::Exit),
        other => Err(InputError::UnknownChoice(other.to_string())),
    }
}

/// GPIO针脚号，空输入返回`None`（保留原值）
pub fn parse_pin(input: &str) -> Result<Option<u8>, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let pin: i64 = input
        .parse()
        .map_err(|_| InputError::NotANumber(input.to_string()))?;
    if !(0..=i64::from(MAX_GPIO_PIN)).contains(&pin) {
        return Err(InputError::PinOutOfRange(pin));
    }
    Ok(Some(pin as u8))
}

/// LED颜色，大小写不敏感，空输入返回`None`
pub fn parse_color(input: &str) -> Result<Option<LedColor>, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    input
        .parse()
        .map(Some)
        .map_err(|_| InputError::UnknownColor(input.to_string()))
}

/// 温度阈值，空输入返回`None`
pub fn parse_limit(input: &str) -> Result<Option<f32>, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    match input.parse::<f32>() {
        Ok(limit) if limit.is_finite() => Ok(Some(limit)),
        _ => Err(InputError::NotANumber(input.to_string())),
    }
}

/// 频道ID或密钥，空输入返回`None`
pub fn parse_credential(input: &str) -> Option<String> {
    let input = input.trim();
    (!input.is_empty()).then(|| input.to_string())
}

/// 删除多少分钟之前的数据，空输入返回`None`（取消）
pub fn parse_minutes(input: &str) -> Result<Option<u32>, InputError> {
    let input = input.trim();
    if input.is_empty() {
        return Ok(None);
    }
    let minutes: i64 = input
        .parse()
        .map_err(|_| InputError::NotANumber(input.to_string()))?;
    if minutes < 0 {
        return Err(InputError::NegativeMinutes(minutes));
    }
    u32::try_from(minutes)
        .map(Some)
        .map_err(|_| InputError::NotANumber(input.to_string()))
}
