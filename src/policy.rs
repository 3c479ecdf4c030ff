use crate::color::LedColor;

/// 温度阈值与两段颜色的对应关系
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdConfig {
    /// 温度上限（℃）
    pub limit: f32,
    /// 温度 <= limit 时点亮的颜色
    pub color_below: LedColor,
    /// 温度 > limit 时点亮的颜色
    pub color_above: LedColor,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            limit: 20.0,
            color_below: LedColor::Blue,
            color_above: LedColor::Red,
        }
    }
}

/// 根据温度选出唯一要点亮的颜色
///
/// 等于阈值时算作“阈值以下”。
pub fn decide(temperature: f32, config: &ThresholdConfig) -> LedColor {
    if temperature <= config.limit {
        config.color_below
    } else {
        config.color_above
    }
}
