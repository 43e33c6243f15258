use std::time::Duration;

use crate::http::types::{Directive, Method};

/// 占位符全部替换完成后的请求描述
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRequest {
    pub method: Method,
    pub url: String,
    /// 已解析的 POST 字段，保持原始顺序
    pub post_fields: Vec<(String, String)>,
    /// 表单编码后的请求体（仅 POST）
    pub body: Option<String>,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    pub insecure: bool,
    pub proxy: Option<String>,
    pub user_agent: String,
    pub referer: Option<String>,
    pub directives: Vec<Directive>,
    pub debug: bool,
}

impl ResolvedRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::Get,
            url: url.into(),
            post_fields: Vec::new(),
            body: None,
            connect_timeout: Duration::from_secs(5),
            timeout: Duration::from_secs(10),
            insecure: false,
            proxy: None,
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
            referer: None,
            directives: Vec::new(),
            debug: false,
        }
    }

    /// 设置 POST 字段，同时切换为 POST 并生成 urlencoded 请求体
    pub fn with_post_fields(mut self, fields: Vec<(String, String)>) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(fields.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .finish();
        self.method = Method::Post;
        self.body = Some(body);
        self.post_fields = fields;
        self
    }

    pub fn with_referer(mut self, referer: Option<String>) -> Self {
        self.referer = referer;
        self
    }
}
