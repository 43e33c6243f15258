use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;
use std::time::Duration;

use crate::{ProbeError, Result};
use serde::Deserialize;

/// 请求方法：由是否存在 POST 字段决定
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

impl Method {
    pub fn as_str(&self) -> &str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 传输指令的原始值（来自 runfile 或 `--flags` JSON）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum DirectiveValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl DirectiveValue {
    fn as_list(&self, separator: char) -> Vec<String> {
        match self {
            DirectiveValue::List(items) => items.iter().map(|s| s.trim().to_string()).collect(),
            DirectiveValue::Text(s) => s
                .split(separator)
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            other => vec![other.to_string()],
        }
    }

    fn as_u64(&self, name: &str) -> Result<u64> {
        match self {
            DirectiveValue::Integer(n) if *n >= 0 => Ok(*n as u64),
            DirectiveValue::Text(s) => s.trim().parse().map_err(|_| {
                ProbeError::config(format!("flag '{}' expects a non-negative integer", name))
            }),
            _ => Err(ProbeError::config(format!(
                "flag '{}' expects a non-negative integer",
                name
            ))),
        }
    }

    fn as_bool(&self, name: &str) -> Result<bool> {
        match self {
            DirectiveValue::Bool(b) => Ok(*b),
            DirectiveValue::Integer(n) => Ok(*n != 0),
            DirectiveValue::Text(s) => match s.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => Ok(true),
                "0" | "false" | "no" | "off" => Ok(false),
                _ => Err(ProbeError::config(format!("flag '{}' expects a boolean", name))),
            },
            _ => Err(ProbeError::config(format!("flag '{}' expects a boolean", name))),
        }
    }
}

impl fmt::Display for DirectiveValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DirectiveValue::Bool(b) => write!(f, "{}", b),
            DirectiveValue::Integer(n) => write!(f, "{}", n),
            DirectiveValue::Float(n) => write!(f, "{}", n),
            DirectiveValue::Text(s) => write!(f, "{}", s),
            DirectiveValue::List(items) => write!(f, "{}", items.join(",")),
        }
    }
}

/// IP 版本选择
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpResolve {
    Whatever,
    V4,
    V6,
}

impl FromStr for IpResolve {
    type Err = ProbeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        match lower.strip_prefix("ipresolve_").unwrap_or(&lower) {
            "whatever" => Ok(IpResolve::Whatever),
            "v4" | "ipv4" => Ok(IpResolve::V4),
            "v6" | "ipv6" => Ok(IpResolve::V6),
            _ => Err(ProbeError::config(format!("unknown ipresolve mode '{}'", s))),
        }
    }
}

impl IpResolve {
    /// 绑定到对应协议族的未指定地址，以此限定连接使用的 IP 版本
    pub fn local_address(&self) -> Option<IpAddr> {
        match self {
            IpResolve::Whatever => None,
            IpResolve::V4 => Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED)),
            IpResolve::V6 => Some(IpAddr::V6(Ipv6Addr::UNSPECIFIED)),
        }
    }
}

/// 静态 DNS 映射，格式 `host:port:address`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolveEntry {
    pub host: String,
    pub port: u16,
    pub address: IpAddr,
}

impl FromStr for ResolveEntry {
    type Err = ProbeError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || ProbeError::config(format!("invalid resolve entry '{}'", s));

        let mut parts = s.trim().splitn(3, ':');
        let host = parts.next().filter(|h| !h.is_empty()).ok_or_else(invalid)?;
        let port = parts
            .next()
            .and_then(|p| p.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let address = parts
            .next()
            .map(|a| a.trim_start_matches('[').trim_end_matches(']'))
            .and_then(|a| a.parse::<IpAddr>().ok())
            .ok_or_else(invalid)?;

        Ok(Self {
            host: host.to_string(),
            port,
            address,
        })
    }
}

/// 支持的传输指令
///
/// 每个指令名对应一项传输层选项，在加载配置时校验。
#[derive(Debug, Clone, PartialEq)]
pub enum Directive {
    /// `resolve`：逗号分隔的 host:port:address 列表
    Resolve(Vec<ResolveEntry>),
    /// `ipresolve`：IP 版本模式
    IpResolve(IpResolve),
    /// `maxredirs`：最大重定向次数
    MaxRedirs(usize),
    /// `httpheader`：附加请求头，`Name: value`
    HttpHeader(Vec<(String, String)>),
    /// `cookie`：原样发送的 Cookie 头
    Cookie(String),
    TcpNoDelay(bool),
    TcpKeepAlive(Duration),
}

impl Directive {
    pub const NAMES: &'static [&'static str] = &[
        "resolve",
        "ipresolve",
        "maxredirs",
        "httpheader",
        "cookie",
        "tcp_nodelay",
        "tcp_keepalive",
    ];

    pub fn parse(name: &str, value: &DirectiveValue) -> Result<Self> {
        match name.to_lowercase().as_str() {
            "resolve" => value
                .as_list(',')
                .iter()
                .map(|entry| entry.parse())
                .collect::<Result<Vec<_>>>()
                .map(Directive::Resolve),
            "ipresolve" => value.to_string().parse().map(Directive::IpResolve),
            "maxredirs" => value
                .as_u64(name)
                .map(|n| Directive::MaxRedirs(n as usize)),
            "httpheader" => value
                .as_list('\n')
                .iter()
                .map(|line| {
                    line.split_once(':')
                        .map(|(k, v)| (k.trim().to_string(), v.trim().to_string()))
                        .filter(|(k, _)| !k.is_empty())
                        .ok_or_else(|| {
                            ProbeError::config(format!("invalid httpheader entry '{}'", line))
                        })
                })
                .collect::<Result<Vec<_>>>()
                .map(Directive::HttpHeader),
            "cookie" => Ok(Directive::Cookie(value.to_string())),
            "tcp_nodelay" => value.as_bool(name).map(Directive::TcpNoDelay),
            "tcp_keepalive" => value
                .as_u64(name)
                .map(|secs| Directive::TcpKeepAlive(Duration::from_secs(secs))),
            _ => Err(ProbeError::config(format!(
                "unsupported flag '{}' (supported: {})",
                name,
                Self::NAMES.join(", ")
            ))),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Directive::Resolve(_) => "resolve",
            Directive::IpResolve(_) => "ipresolve",
            Directive::MaxRedirs(_) => "maxredirs",
            Directive::HttpHeader(_) => "httpheader",
            Directive::Cookie(_) => "cookie",
            Directive::TcpNoDelay(_) => "tcp_nodelay",
            Directive::TcpKeepAlive(_) => "tcp_keepalive",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn text(s: &str) -> DirectiveValue {
        DirectiveValue::Text(s.to_string())
    }

    #[test]
    fn test_parse_resolve_list() {
        let directive = Directive::parse(
            "resolve",
            &text("example.com:443:127.0.0.1, api.example.com:80:[::1]"),
        )
        .unwrap();

        match directive {
            Directive::Resolve(entries) => {
                assert_eq!(entries.len(), 2);
                assert_eq!(entries[0].host, "example.com");
                assert_eq!(entries[0].port, 443);
                assert_eq!(entries[0].address, "127.0.0.1".parse::<IpAddr>().unwrap());
                assert_eq!(entries[1].address, "::1".parse::<IpAddr>().unwrap());
            }
            other => panic!("Expected Resolve, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_resolve_invalid() {
        assert!(Directive::parse("resolve", &text("example.com:443")).is_err());
        assert!(Directive::parse("resolve", &text("example.com:http:1.2.3.4")).is_err());
    }

    #[test]
    fn test_parse_ipresolve_modes() {
        assert_eq!(
            Directive::parse("ipresolve", &text("ipresolve_v4")).unwrap(),
            Directive::IpResolve(IpResolve::V4)
        );
        assert_eq!(
            Directive::parse("ipresolve", &text("V6")).unwrap(),
            Directive::IpResolve(IpResolve::V6)
        );
        assert_eq!(
            Directive::parse("IPRESOLVE", &text("whatever")).unwrap(),
            Directive::IpResolve(IpResolve::Whatever)
        );
        assert!(Directive::parse("ipresolve", &text("v5")).is_err());
    }

    #[test]
    fn test_parse_scalar_directives() {
        assert_eq!(
            Directive::parse("maxredirs", &DirectiveValue::Integer(3)).unwrap(),
            Directive::MaxRedirs(3)
        );
        assert_eq!(
            Directive::parse("tcp_nodelay", &text("yes")).unwrap(),
            Directive::TcpNoDelay(true)
        );
        assert!(Directive::parse("maxredirs", &DirectiveValue::Integer(-1)).is_err());
    }

    #[test]
    fn test_parse_httpheader_list() {
        let value = DirectiveValue::List(vec![
            "X-Probe: 1".to_string(),
            "Accept: text/html".to_string(),
        ]);
        assert_eq!(
            Directive::parse("httpheader", &value).unwrap(),
            Directive::HttpHeader(vec![
                ("X-Probe".to_string(), "1".to_string()),
                ("Accept".to_string(), "text/html".to_string()),
            ])
        );
    }

    #[test]
    fn test_unsupported_directive() {
        let err = Directive::parse("ssl_engine", &text("x")).unwrap_err();
        assert!(err.is_config());
        assert!(err.to_string().contains("ssl_engine"));
    }

    #[test]
    fn test_ipresolve_local_address() {
        assert_eq!(IpResolve::Whatever.local_address(), None);
        assert_eq!(
            IpResolve::V4.local_address(),
            Some(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
        );
    }
}
