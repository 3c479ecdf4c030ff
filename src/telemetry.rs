use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::ReportError;
use crate::sensor::Measurement;

/// ThingSpeak接口地址
pub const DEFAULT_BASE_URL: &str = "https://api.thingspeak.com";

/// ThingSpeak频道与密钥
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetryConfig {
    /// 频道ID
    pub channel_id: String,
    /// Write API Key，上报数据需要
    pub write_key: String,
    /// User API Key，删除数据需要
    pub read_key: String,
}

/// 请求被接受或被跳过
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ack {
    /// 服务端返回HTTP 200
    Success,
    /// 缺少密钥或频道ID，没有发出请求
    Skipped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Delete,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Delete => "DELETE",
        }
    }
}

/// 一次待发送的HTTP请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TelemetryRequest {
    pub method: Method,
    pub url: String,
    pub query: Vec<(&'static str, String)>,
}

impl TelemetryRequest {
    pub fn param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// HTTP应答
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: String,
}

/// 同步HTTP传输
pub trait Transport {
    /// 发送请求；只有网络层失败才返回`Err`，任何状态码都算应答
    fn send(&self, request: &TelemetryRequest) -> anyhow::Result<HttpReply>;
}

/// 基于ureq的传输实现
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self { agent }
    }
}

impl Transport for UreqTransport {
    fn send(&self, request: &TelemetryRequest) -> anyhow::Result<HttpReply> {
        let mut call = self.agent.request(request.method.as_str(), &request.url);
        for (key, value) in &request.query {
            call = call.query(key, value);
        }

        match call.call() {
            Ok(response) => {
                let status = response.status();
                let body = response.into_string()?;
                Ok(HttpReply { status, body })
            }
            // 4xx/5xx 在ureq里是错误，这里当作普通应答
            Err(ureq::Error::Status(status, response)) => Ok(HttpReply {
                status,
                body: response.into_string().unwrap_or_default(),
            }),
            Err(ureq::Error::Transport(err)) => Err(anyhow::anyhow!(err.to_string())),
        }
    }
}

/// 遥测上报器
///
/// 所有失败都转换成返回值，不重试，不向外抛出。
pub struct TelemetryReporter<T: Transport> {
    transport: T,
    base_url: String,
}

impl<T: Transport> TelemetryReporter<T> {
    pub fn new(transport: T, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            transport,
            base_url,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// 构造上报请求，缺少写密钥或频道ID时返回`None`
    pub fn upload_request(
        &self,
        measurement: &Measurement,
        config: &TelemetryConfig,
    ) -> Option<TelemetryRequest> {
        if config.write_key.is_empty() || config.channel_id.is_empty() {
            return None;
        }

        let mut query = vec![
            ("api_key", config.write_key.clone()),
            ("field1", format_field(measurement.temperature)),
        ];
        // 没有湿度时气压占用field2
        let mut secondary = ["field2", "field3"].into_iter();
        for value in [measurement.humidity, measurement.pressure].into_iter().flatten() {
            if let Some(field) = secondary.next() {
                query.push((field, format_field(value)));
            }
        }

        Some(TelemetryRequest {
            method: Method::Get,
            url: format!("{}/update", self.base_url),
            query,
        })
    }

    /// 构造删除请求，删除`now - minutes_ago`及之前的数据
    pub fn purge_request(
        &self,
        minutes_ago: u32,
        now: DateTime<Utc>,
        config: &TelemetryConfig,
    ) -> Option<TelemetryRequest> {
        if config.read_key.is_empty() || config.channel_id.is_empty() {
            return None;
        }

        let cutoff = now - TimeDelta::minutes(i64::from(minutes_ago));
        Some(TelemetryRequest {
            method: Method::Delete,
            url: format!("{}/channels/{}/feeds.json", self.base_url, config.channel_id),
            query: vec![
                ("api_key", config.read_key.clone()),
                ("end", format_cutoff(cutoff)),
            ],
        })
    }

    /// 上报一次测量数据
    pub fn report(
        &self,
        measurement: &Measurement,
        config: &TelemetryConfig,
    ) -> Result<Ack, ReportError> {
        match self.upload_request(measurement, config) {
            Some(request) => self.execute(&request),
            None => Ok(Ack::Skipped),
        }
    }

    /// 删除最近`minutes_ago`分钟之前的频道数据
    pub fn purge_since(
        &self,
        minutes_ago: u32,
        config: &TelemetryConfig,
    ) -> Result<Ack, ReportError> {
        self.purge_at(minutes_ago, Utc::now(), config)
    }

    /// 以给定时刻为“现在”执行删除
    pub fn purge_at(
        &self,
        minutes_ago: u32,
        now: DateTime<Utc>,
        config: &TelemetryConfig,
    ) -> Result<Ack, ReportError> {
        match self.purge_request(minutes_ago, now, config) {
            Some(request) => self.execute(&request),
            None => Ok(Ack::Skipped),
        }
    }

    fn execute(&self, request: &TelemetryRequest) -> Result<Ack, ReportError> {
        let reply = self
            .transport
            .send(request)
            .map_err(|err| ReportError::Transport(err.to_string()))?;
        if reply.status == 200 {
            Ok(Ack::Success)
        } else {
            Err(ReportError::Rejected {
                status: reply.status,
                body: reply.body,
            })
        }
    }
}

/// 保留两位小数，整数值带一位小数（22.3 → "22.3"，55 → "55.0"）
pub fn format_field(value: f32) -> String {
    let rounded = (f64::from(value) * 100.0).round() / 100.0;
    let text = rounded.to_string();
    if text.contains('.') || !rounded.is_finite() {
        text
    } else {
        format!("{}.0", text)
    }
}

/// ISO-8601 UTC，秒精度，结尾为字面量Z
pub fn format_cutoff(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%dT%H:%M:%SZ").to_string()
}

#[cfg(test)]
pub(crate) mod testing {
    use std::cell::RefCell;
    use std::collections::VecDeque;

    use super::*;

    /// 记录请求并按顺序返回预设应答的假传输
    #[derive(Default)]
    pub struct FakeTransport {
        pub requests: RefCell<Vec<TelemetryRequest>>,
        pub replies: RefCell<VecDeque<anyhow::Result<HttpReply>>>,
    }

    impl FakeTransport {
        pub fn replying(status: u16) -> Self {
            let transport = Self::default();
            transport.push_reply(status, "");
            transport
        }

        pub fn push_reply(&self, status: u16, body: &str) {
            self.replies.borrow_mut().push_back(Ok(HttpReply {
                status,
                body: body.to_string(),
            }));
        }

        pub fn push_failure(&self, message: &str) {
            self.replies
                .borrow_mut()
                .push_back(Err(anyhow::anyhow!(message.to_string())));
        }
    }

    impl Transport for FakeTransport {
        fn send(&self, request: &TelemetryRequest) -> anyhow::Result<HttpReply> {
            self.requests.borrow_mut().push(request.clone());
            self.replies.borrow_mut().pop_front().unwrap_or(Ok(HttpReply {
                status: 200,
                body: "1".to_string(),
            }))
        }
    }
}
