use std::time::Duration;

/// 单次请求的结果
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    /// 实际请求的 URL（占位符已替换）
    pub url: String,
    /// 跟随重定向之后的最终 URL
    pub effective_url: String,
    pub status: u16,
    pub body: String,
    pub elapsed: Duration,
}

impl Outcome {
    pub fn new(
        url: impl Into<String>,
        effective_url: impl Into<String>,
        status: u16,
        body: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        Self {
            url: url.into(),
            effective_url: effective_url.into(),
            status,
            body: body.into(),
            elapsed,
        }
    }
}

/// 传输层失败（DNS、连接、超时、TLS 等）
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
    /// 失败前已经花费的时间
    pub elapsed: Duration,
}

impl TransportError {
    pub fn new(message: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            message: message.into(),
            elapsed,
        }
    }
}
