use std::error::Error as StdError;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use reqwest::header::{CONTENT_TYPE, COOKIE, REFERER};
use reqwest::redirect::Policy;
use tracing::debug;

use crate::http::request::ResolvedRequest;
use crate::http::response::{Outcome, TransportError};
use crate::http::types::{Directive, Method};

/// 默认最大重定向次数
const DEFAULT_MAX_REDIRECTS: usize = 10;

/// 执行单个已解析请求的能力
///
/// 传输层的任何失败都转换为 [`TransportError`]，调用方总能得到一个结果。
pub trait Transport {
    fn perform(
        &self,
        request: &ResolvedRequest,
        cookies: &CookieJar,
    ) -> impl Future<Output = Result<Outcome, TransportError>> + Send;
}

/// 整个序列共享的 Cookie 存储
///
/// 由一次运行持有，运行结束（无论成功失败）时随之释放。
#[derive(Clone, Default)]
pub struct CookieJar {
    inner: Option<Arc<reqwest::cookie::Jar>>,
}

impl CookieJar {
    pub fn enabled() -> Self {
        Self {
            inner: Some(Arc::new(reqwest::cookie::Jar::default())),
        }
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn new(enabled: bool) -> Self {
        if enabled {
            Self::enabled()
        } else {
            Self::disabled()
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    fn provider(&self) -> Option<Arc<reqwest::cookie::Jar>> {
        self.inner.clone()
    }
}

/// 基于 reqwest 的 HTTP 执行器
///
/// 每个阶段的超时、代理、TLS 等选项各不相同，因此每次请求单独构建 client。
#[derive(Clone, Default)]
pub struct Client;

impl Client {
    pub fn new() -> Self {
        Self
    }

    fn build(
        &self,
        request: &ResolvedRequest,
        cookies: &CookieJar,
    ) -> Result<reqwest::Client, reqwest::Error> {
        let max_redirects = request
            .directives
            .iter()
            .find_map(|d| match d {
                Directive::MaxRedirs(n) => Some(*n),
                _ => None,
            })
            .unwrap_or(DEFAULT_MAX_REDIRECTS);

        let mut builder = reqwest::Client::builder()
            .connect_timeout(request.connect_timeout)
            .timeout(request.timeout)
            .user_agent(request.user_agent.as_str())
            .redirect(Policy::limited(max_redirects));

        if request.insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        if let Some(ref proxy_url) = request.proxy {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }

        if let Some(jar) = cookies.provider() {
            builder = builder.cookie_provider(jar);
        }

        for directive in &request.directives {
            if request.debug {
                debug!(flag = directive.name(), value = ?directive, "applying flag");
            }
            match directive {
                Directive::Resolve(entries) => {
                    for entry in entries {
                        builder = builder
                            .resolve(&entry.host, SocketAddr::new(entry.address, entry.port));
                    }
                }
                Directive::IpResolve(mode) => {
                    builder = builder.local_address(mode.local_address());
                }
                Directive::TcpNoDelay(enabled) => {
                    builder = builder.tcp_nodelay(*enabled);
                }
                Directive::TcpKeepAlive(interval) => {
                    builder = builder.tcp_keepalive(Some(*interval));
                }
                // 以下指令作用于请求本身
                Directive::MaxRedirs(_) | Directive::HttpHeader(_) | Directive::Cookie(_) => {}
            }
        }

        builder.build()
    }

    pub async fn execute(
        &self,
        request: &ResolvedRequest,
        cookies: &CookieJar,
    ) -> Result<Outcome, TransportError> {
        let start = Instant::now();
        let fail = |e: reqwest::Error| TransportError::new(describe(&e), start.elapsed());

        let client = self.build(request, cookies).map_err(fail)?;

        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
        };
        let mut req = client.request(method, request.url.as_str());

        if let Some(ref referer) = request.referer {
            req = req.header(REFERER, referer.as_str());
        }
        for directive in &request.directives {
            match directive {
                Directive::HttpHeader(headers) => {
                    for (name, value) in headers {
                        req = req.header(name.as_str(), value.as_str());
                    }
                }
                Directive::Cookie(cookie) => {
                    req = req.header(COOKIE, cookie.as_str());
                }
                _ => {}
            }
        }
        if let Some(ref body) = request.body {
            if request.debug {
                debug!(fields = ?request.post_fields, "POST fields");
            }
            req = req
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body.clone());
        }

        let response = req.send().await.map_err(fail)?;
        let status = response.status().as_u16();
        let effective_url = response.url().to_string();
        let body = response.text().await.map_err(fail)?;
        let elapsed = start.elapsed();

        if request.debug {
            debug!(status, effective_url = %effective_url, "response received");
            debug!("{}", body);
        }

        Ok(Outcome::new(
            request.url.clone(),
            effective_url,
            status,
            body,
            elapsed,
        ))
    }
}

impl Transport for Client {
    fn perform(
        &self,
        request: &ResolvedRequest,
        cookies: &CookieJar,
    ) -> impl Future<Output = Result<Outcome, TransportError>> + Send {
        self.execute(request, cookies)
    }
}

/// 展开错误链，得到可读的失败原因
fn describe(err: &reqwest::Error) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
