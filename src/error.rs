use thiserror::Error as ThisError;

/// 传感器读取失败
#[derive(ThisError, Debug)]
pub enum SensorError {
    /// 本周期没有读数（超时、校验失败等），下一个周期会再试
    #[error("sensor unavailable: {0}")]
    Unavailable(String),

    /// 有限的数据源已经读完
    #[error("sensor exhausted")]
    Exhausted,

    /// 传感器驱动本身出错，轮询必须停止
    #[error("sensor fault: {0}")]
    Fault(#[from] anyhow::Error),
}

/// 遥测上报/删除失败
#[derive(ThisError, Debug, Clone, PartialEq, Eq)]
pub enum ReportError {
    #[error("HTTP {status} - {body}")]
    Rejected { status: u16, body: String },

    #[error("network error: {0}")]
    Transport(String),
}

/// 菜单输入校验失败
#[derive(ThisError, Debug, Clone, PartialEq)]
pub enum InputError {
    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("GPIO {0} is out of range, use 0 to {max}", max = crate::config::MAX_GPIO_PIN)]
    PinOutOfRange(i64),

    #[error("unknown color '{0}', choose red, green or blue")]
    UnknownColor(String),

    #[error("{0} minutes is negative, enter zero or more")]
    NegativeMinutes(i64),

    #[error("unknown choice '{0}', choose 1 to 6")]
    UnknownChoice(String),
}
