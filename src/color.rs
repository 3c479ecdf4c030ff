use strum::{Display, EnumIter, EnumString};

/// LED颜色（颜色集合是固定的三种）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum LedColor {
    Red,
    Green,
    Blue,
}

impl LedColor {
    /// 固定的遍历顺序：红、绿、蓝
    pub const ALL: [LedColor; 3] = [LedColor::Red, LedColor::Green, LedColor::Blue];
}

/// 每种颜色一个槽位的定长记录
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ColorMap<T> {
    pub red: T,
    pub green: T,
    pub blue: T,
}

impl<T> ColorMap<T> {
    pub const fn new(red: T, green: T, blue: T) -> Self {
        Self { red, green, blue }
    }

    /// 用同一个构造函数填满三个槽位
    pub fn from_fn(mut f: impl FnMut(LedColor) -> T) -> Self {
        Self {
            red: f(LedColor::Red),
            green: f(LedColor::Green),
            blue: f(LedColor::Blue),
        }
    }

    pub fn get(&self, color: LedColor) -> &T {
        match color {
            LedColor::Red => &self.red,
            LedColor::Green => &self.green,
            LedColor::Blue => &self.blue,
        }
    }

    pub fn get_mut(&mut self, color: LedColor) -> &mut T {
        match color {
            LedColor::Red => &mut self.red,
            LedColor::Green => &mut self.green,
            LedColor::Blue => &mut self.blue,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (LedColor, &T)> {
        [
            (LedColor::Red, &self.red),
            (LedColor::Green, &self.green),
            (LedColor::Blue, &self.blue),
        ]
        .into_iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (LedColor, &mut T)> {
        [
            (LedColor::Red, &mut self.red),
            (LedColor::Green, &mut self.green),
            (LedColor::Blue, &mut self.blue),
        ]
        .into_iter()
    }

    pub fn map<U>(&self, mut f: impl FnMut(LedColor, &T) -> U) -> ColorMap<U> {
        ColorMap {
            red: f(LedColor::Red, &self.red),
            green: f(LedColor::Green, &self.green),
            blue: f(LedColor::Blue, &self.blue),
        }
    }
}
