use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

use crate::assertion::{SuccessTest, parse_recognized_test};
use crate::http::{Directive, DirectiveValue};
use crate::{ProbeError, Result};

pub const DEFAULT_TEST: &str = "code:200";
pub const DEFAULT_CONNECT_TIMEOUT_SECS: f64 = 5.0;
pub const DEFAULT_TIMEOUT_SECS: f64 = 10.0;

/// 传输指令声明：映射，或由单键映射组成的列表
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FlagsDecl {
    Map(BTreeMap<String, DirectiveValue>),
    List(Vec<BTreeMap<String, DirectiveValue>>),
}

impl FlagsDecl {
    /// 合并为单个映射，列表中先出现的键优先
    pub fn into_map(self) -> BTreeMap<String, DirectiveValue> {
        match self {
            FlagsDecl::Map(map) => map,
            FlagsDecl::List(list) => {
                let mut merged = BTreeMap::new();
                for map in list {
                    for (name, value) in map {
                        merged.entry(name.to_lowercase()).or_insert(value);
                    }
                }
                merged
            }
        }
    }

    /// 校验并转换为指令列表
    pub fn to_directives(&self) -> Result<Vec<Directive>> {
        self.clone()
            .into_map()
            .iter()
            .map(|(name, value)| Directive::parse(name, value))
            .collect()
    }
}

/// 阶段选项声明（runfile 或命令行），所有字段可选
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct OptionsDecl {
    pub url: Option<String>,
    pub test: Option<String>,
    #[serde(alias = "connect_timeout")]
    pub connecttimeout: Option<f64>,
    pub timeout: Option<f64>,
    pub location: Option<bool>,
    pub insecure: Option<bool>,
    pub proxy: Option<String>,
    /// `name:value` 列表
    pub postdata: Option<Vec<String>>,
    #[serde(alias = "useragent")]
    pub user_agent: Option<String>,
    pub flags: Option<FlagsDecl>,
    pub referer: Option<String>,
    pub failaterror: Option<bool>,
    pub debug: Option<bool>,
}

impl OptionsDecl {
    /// 以 `defaults` 补齐未设置的字段，返回新的声明
    pub fn merged_over(self, defaults: &OptionsDecl) -> OptionsDecl {
        OptionsDecl {
            url: self.url.or_else(|| defaults.url.clone()),
            test: self.test.or_else(|| defaults.test.clone()),
            connecttimeout: self.connecttimeout.or(defaults.connecttimeout),
            timeout: self.timeout.or(defaults.timeout),
            location: self.location.or(defaults.location),
            insecure: self.insecure.or(defaults.insecure),
            proxy: self.proxy.or_else(|| defaults.proxy.clone()),
            postdata: self.postdata.or_else(|| defaults.postdata.clone()),
            user_agent: self.user_agent.or_else(|| defaults.user_agent.clone()),
            flags: self.flags.or_else(|| defaults.flags.clone()),
            referer: self.referer.or_else(|| defaults.referer.clone()),
            failaterror: self.failaterror.or(defaults.failaterror),
            debug: self.debug.or(defaults.debug),
        }
    }
}

/// 完全确定、已校验的阶段选项
#[derive(Debug, Clone, PartialEq)]
pub struct StageOptions {
    /// 目标 URL，可以包含 `PREV_MATCH_<stage>_<group>` 占位符
    pub url: String,
    pub test: SuccessTest,
    pub connect_timeout: Duration,
    pub timeout: Duration,
    /// 仅为兼容保留，重定向总是跟随
    pub location: bool,
    pub insecure: bool,
    pub proxy: Option<String>,
    /// 存在时请求方法为 POST；值可以包含占位符
    pub post_fields: Option<Vec<(String, String)>>,
    pub user_agent: String,
    pub directives: Vec<Directive>,
    /// 显式指定时覆盖自动串联的 Referer
    pub referer: Option<String>,
    pub fail_at_error: bool,
    pub debug: bool,
}

impl StageOptions {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            test: SuccessTest::Code(200),
            connect_timeout: Duration::from_secs_f64(DEFAULT_CONNECT_TIMEOUT_SECS),
            timeout: Duration::from_secs_f64(DEFAULT_TIMEOUT_SECS),
            location: false,
            insecure: false,
            proxy: None,
            post_fields: None,
            user_agent: crate::DEFAULT_USER_AGENT.to_string(),
            directives: Vec::new(),
            referer: None,
            fail_at_error: true,
            debug: false,
        }
    }

    pub fn with_test(mut self, test: SuccessTest) -> Self {
        self.test = test;
        self
    }

    pub fn with_post_field(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.post_fields
            .get_or_insert_with(Vec::new)
            .push((name.into(), value.into()));
        self
    }

    pub fn with_fail_at_error(mut self, fail_at_error: bool) -> Self {
        self.fail_at_error = fail_at_error;
        self
    }

    pub fn with_referer(mut self, referer: impl Into<String>) -> Self {
        self.referer = Some(referer.into());
        self
    }

    pub fn with_directive(mut self, directive: Directive) -> Self {
        self.directives.push(directive);
        self
    }

    pub fn with_proxy(mut self, proxy: impl Into<String>) -> Self {
        self.proxy = Some(proxy.into());
        self
    }
}

impl TryFrom<OptionsDecl> for StageOptions {
    type Error = ProbeError;

    fn try_from(decl: OptionsDecl) -> Result<Self> {
        let url = decl
            .url
            .filter(|u| !u.trim().is_empty())
            .ok_or_else(|| ProbeError::config("stage has no url"))?;

        let test = parse_recognized_test(decl.test.as_deref().unwrap_or(DEFAULT_TEST))?;

        let post_fields = decl
            .postdata
            .map(|items| {
                items
                    .iter()
                    .map(|item| parse_post_field(item))
                    .collect::<Result<Vec<_>>>()
            })
            .transpose()?;

        let directives = match decl.flags {
            Some(flags) => flags.to_directives()?,
            None => Vec::new(),
        };

        Ok(Self {
            url,
            test,
            connect_timeout: seconds(
                "connecttimeout",
                decl.connecttimeout.unwrap_or(DEFAULT_CONNECT_TIMEOUT_SECS),
            )?,
            timeout: seconds("timeout", decl.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))?,
            location: decl.location.unwrap_or(false),
            insecure: decl.insecure.unwrap_or(false),
            proxy: decl.proxy.filter(|p| !p.is_empty()),
            post_fields,
            user_agent: decl
                .user_agent
                .unwrap_or_else(|| crate::DEFAULT_USER_AGENT.to_string()),
            directives,
            referer: decl.referer,
            fail_at_error: decl.failaterror.unwrap_or(true),
            debug: decl.debug.unwrap_or(false),
        })
    }
}

/// 解析 `name:value`，只在第一个冒号处分割
pub fn parse_post_field(item: &str) -> Result<(String, String)> {
    item.split_once(':')
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .ok_or_else(|| {
            ProbeError::config(format!("invalid postdata '{}': expected name:value", item))
        })
}

fn seconds(name: &str, value: f64) -> Result<Duration> {
    Duration::try_from_secs_f64(value)
        .map_err(|_| ProbeError::config(format!("invalid {} '{}'", name, value)))
}
