use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProbeError {
    /// 配置错误：在发出任何请求之前检测到
    #[error("Configuration error: {0}")]
    Config(String),

    /// 占位符引用了一个没有捕获结果的阶段
    #[error("{placeholder}: {reason}")]
    Reference { placeholder: String, reason: String },

    #[error("IO 错误: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON 解析错误: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("YAML 解析错误: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("TOML 解析错误: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("正则表达式错误: {0}")]
    RegexError(#[from] regex::Error),

    #[error("{0}")]
    Other(String),
}

impl ProbeError {
    pub fn config(message: impl Into<String>) -> Self {
        ProbeError::Config(message.into())
    }

    /// 是否属于配置类错误（退出码 3）
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            ProbeError::Config(_)
                | ProbeError::YamlError(_)
                | ProbeError::TomlError(_)
                | ProbeError::JsonError(_)
                | ProbeError::RegexError(_)
                | ProbeError::IoError(_)
        )
    }
}

// Add conversion from anyhow::Error
impl From<anyhow::Error> for ProbeError {
    fn from(err: anyhow::Error) -> Self {
        ProbeError::Other(err.to_string())
    }
}

/// Result type for rucheck crate
pub type Result<T> = std::result::Result<T, ProbeError>;
