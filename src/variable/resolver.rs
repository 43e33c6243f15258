use crate::http::ResolvedRequest;
use crate::variable::capture::CaptureStore;
use crate::variable::types::StageOptions;
use crate::{ProbeError, Result};
use regex::{Captures, Regex};
use std::sync::OnceLock;
use tracing::debug;

/// 阶段解析器：把占位符替换为前序阶段的捕获
pub struct StageResolver;

impl StageResolver {
    fn placeholder_regex() -> &'static Regex {
        static PLACEHOLDER_REGEX: OnceLock<Regex> = OnceLock::new();
        PLACEHOLDER_REGEX.get_or_init(|| Regex::new(r"PREV_MATCH_(\d+)_(\d+)").unwrap())
    }

    /// 文本中是否含有 `PREV_MATCH_<stage>_<group>` 占位符
    pub fn has_placeholder(text: &str) -> bool {
        Self::placeholder_regex().is_match(text)
    }

    /// 替换文本中的所有占位符
    ///
    /// 捕获文本先做 HTML 实体解码再代入。引用的阶段没有捕获、
    /// 或捕获中没有对应子组时返回 [`ProbeError::Reference`]。
    pub fn substitute(text: &str, captures: &CaptureStore) -> Result<String> {
        if !Self::has_placeholder(text) {
            return Ok(text.to_string());
        }

        let re = Self::placeholder_regex();
        let mut output = String::with_capacity(text.len());
        let mut last = 0;

        for caps in re.captures_iter(text) {
            let whole = caps.get(0).map(|m| m.range()).unwrap_or(0..0);
            let value = Self::lookup(&caps, captures)?;
            output.push_str(&text[last..whole.start]);
            output.push_str(&value);
            last = whole.end;
        }
        output.push_str(&text[last..]);

        Ok(output)
    }

    fn lookup(caps: &Captures<'_>, captures: &CaptureStore) -> Result<String> {
        let reference = |reason: String| ProbeError::Reference {
            placeholder: caps[0].to_string(),
            reason,
        };
        let (stage, group): (usize, usize) = match (caps[1].parse(), caps[2].parse()) {
            (Ok(stage), Ok(group)) => (stage, group),
            _ => return Err(reference("index out of range".to_string())),
        };

        let capture = captures
            .get(stage)
            .ok_or_else(|| reference(format!("stage {} produced no pattern match", stage)))?;
        let raw = capture
            .group(group)
            .ok_or_else(|| reference(format!("stage {} match has no group {}", stage, group)))?;

        Ok(html_escape::decode_html_entities(raw).into_owned())
    }

    /// 根据阶段选项和已有捕获生成最终请求
    ///
    /// `previous_url` 为上一阶段跟随重定向后的 URL，作为默认 Referer；
    /// 阶段显式配置的 referer 优先。
    pub fn resolve(
        stage: &StageOptions,
        captures: &CaptureStore,
        previous_url: Option<&str>,
    ) -> Result<ResolvedRequest> {
        let url = Self::substitute(&stage.url, captures)?;

        let referer = match stage.referer {
            Some(ref referer) => Some(Self::substitute(referer, captures)?),
            None => previous_url.map(|u| u.to_string()),
        };

        let mut request = ResolvedRequest {
            url,
            connect_timeout: stage.connect_timeout,
            timeout: stage.timeout,
            insecure: stage.insecure,
            proxy: stage.proxy.clone(),
            user_agent: stage.user_agent.clone(),
            directives: stage.directives.clone(),
            debug: stage.debug,
            ..ResolvedRequest::get(String::new())
        }
        .with_referer(referer);

        if let Some(ref fields) = stage.post_fields {
            let resolved = fields
                .iter()
                .map(|(name, value)| Ok((name.clone(), Self::substitute(value, captures)?)))
                .collect::<Result<Vec<_>>>()?;
            request = request.with_post_fields(resolved);
        }

        debug!(
            method = %request.method,
            url = %request.url,
            referer = ?request.referer,
            "resolved stage request"
        );

        Ok(request)
    }

    /// 解析并替换系统环境变量 ${VAR}
    pub fn resolve_env_vars(text: &str) -> String {
        static ENV_REGEX: OnceLock<Regex> = OnceLock::new();
        let re = ENV_REGEX.get_or_init(|| Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}").unwrap());

        re.replace_all(text, |caps: &Captures| {
            let env_name = &caps[1];
            std::env::var(env_name).unwrap_or_else(|_| caps[0].to_string())
        })
        .to_string()
    }
}
