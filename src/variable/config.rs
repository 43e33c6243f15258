use crate::variable::resolver::StageResolver;
use crate::variable::types::{OptionsDecl, StageOptions};
use crate::{ProbeError, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// runfile 的 `cookiejar` 取值：布尔值，或字符串（`"no"` 表示关闭）
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CookieJarDecl {
    Bool(bool),
    Text(String),
}

impl CookieJarDecl {
    pub fn enabled(&self) -> bool {
        match self {
            CookieJarDecl::Bool(b) => *b,
            CookieJarDecl::Text(s) => !matches!(s.trim().to_lowercase().as_str(), "no" | "false"),
        }
    }
}

/// runfile 原始结构
///
/// 除 `cookiejar` 和 `urls` 外的顶层键都是全局默认值。
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RunFile {
    #[serde(default)]
    pub cookiejar: Option<CookieJarDecl>,

    #[serde(default)]
    pub urls: Vec<OptionsDecl>,

    #[serde(flatten)]
    pub defaults: OptionsDecl,
}

/// 加载并校验完成的阶段序列
#[derive(Debug, Clone)]
pub struct RunPlan {
    pub stages: Vec<StageOptions>,
    pub cookie_jar: bool,
}

/// runfile 加载器
pub struct ConfigLoader;

impl ConfigLoader {
    /// runfile 大小上限
    const MAX_RUNFILE_SIZE: u64 = 1024 * 1024;

    /// 从文件加载，按扩展名选择 YAML 或 TOML
    pub fn load_from_path<P: AsRef<Path>>(path: P) -> Result<RunFile> {
        let path = path.as_ref();
        let size = fs::metadata(path)?.len();
        if size > Self::MAX_RUNFILE_SIZE {
            return Err(ProbeError::config(format!(
                "runfile too large: {} bytes (max {} bytes)",
                size,
                Self::MAX_RUNFILE_SIZE
            )));
        }

        let content = fs::read_to_string(path)?;
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("")
            .to_lowercase();

        match extension.as_str() {
            "yaml" | "yml" => Self::parse_yaml(&content),
            "toml" => Self::parse_toml(&content),
            _ => Self::parse_yaml(&content).or_else(|_| Self::parse_toml(&content)),
        }
    }

    pub fn parse_yaml(content: &str) -> Result<RunFile> {
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn parse_toml(content: &str) -> Result<RunFile> {
        Ok(toml::from_str(content)?)
    }

    /// 把全局默认值合并进每个阶段并校验
    ///
    /// `debug` 为 true 时覆盖所有阶段的 debug 设置。
    pub fn build_plan(runfile: RunFile, debug: bool) -> Result<RunPlan> {
        if runfile.urls.is_empty() {
            return Err(ProbeError::config("runfile defines no urls"));
        }

        let stages = runfile
            .urls
            .into_iter()
            .enumerate()
            .map(|(index, decl)| {
                let mut merged = Self::expand_env(decl.merged_over(&runfile.defaults));
                if debug {
                    merged.debug = Some(true);
                }
                StageOptions::try_from(merged).map_err(|e| match e {
                    ProbeError::Config(msg) => ProbeError::Config(format!("stage {}: {}", index, msg)),
                    other => other,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(RunPlan {
            stages,
            cookie_jar: runfile
                .cookiejar
                .as_ref()
                .map(CookieJarDecl::enabled)
                .unwrap_or(false),
        })
    }

    /// 加载 runfile 并生成执行计划
    pub fn load_plan<P: AsRef<Path>>(path: P, debug: bool) -> Result<RunPlan> {
        let runfile = Self::load_from_path(path)?;
        Self::build_plan(runfile, debug)
    }

    /// 展开字符串选项中的 ${VAR}
    fn expand_env(mut decl: OptionsDecl) -> OptionsDecl {
        let expand = |s: String| StageResolver::resolve_env_vars(&s);
        decl.url = decl.url.map(expand);
        decl.proxy = decl.proxy.map(expand);
        decl.referer = decl.referer.map(expand);
        decl.postdata = decl
            .postdata
            .map(|items| items.into_iter().map(expand).collect());
        decl
    }
}
