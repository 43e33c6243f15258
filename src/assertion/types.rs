use std::fmt;
use std::time::Duration;

use regex::Regex;

use crate::variable::Capture;

/// 成功判定
#[derive(Debug, Clone)]
pub enum SuccessTest {
    /// HTTP 状态码相等
    Code(u16),
    /// 对响应体做多行正则搜索
    Pattern(Regex),
    /// 未识别的判定类型，求值时返回 [`ResultCode::Malformed`]
    Unrecognized { kind: String, payload: String },
}

impl SuccessTest {
    pub fn kind(&self) -> &str {
        match self {
            SuccessTest::Code(_) => "code",
            SuccessTest::Pattern(_) => "pattern",
            SuccessTest::Unrecognized { kind, .. } => kind,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, SuccessTest::Unrecognized { .. })
    }
}

impl PartialEq for SuccessTest {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (SuccessTest::Code(a), SuccessTest::Code(b)) => a == b,
            (SuccessTest::Pattern(a), SuccessTest::Pattern(b)) => a.as_str() == b.as_str(),
            (
                SuccessTest::Unrecognized { kind: k1, payload: p1 },
                SuccessTest::Unrecognized { kind: k2, payload: p2 },
            ) => k1 == k2 && p1 == p2,
            _ => false,
        }
    }
}

impl fmt::Display for SuccessTest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SuccessTest::Code(code) => write!(f, "code:{}", code),
            SuccessTest::Pattern(re) => write!(f, "pattern:{}", re.as_str()),
            SuccessTest::Unrecognized { kind, payload } => write!(f, "{}:{}", kind, payload),
        }
    }
}

/// 结果码，与监控系统的退出码约定一致
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultCode {
    Ok = 0,
    /// 判定声明本身有误
    Malformed = 1,
    /// 判定执行了但未通过
    Critical = 2,
    /// 未配置任何目标等配置错误
    Unknown = 3,
}

impl ResultCode {
    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn is_ok(&self) -> bool {
        *self == ResultCode::Ok
    }

    /// 状态行前缀
    pub fn label(&self) -> &'static str {
        match self {
            ResultCode::Ok => "OK",
            ResultCode::Malformed | ResultCode::Critical => "CRITICAL",
            ResultCode::Unknown => "UNKNOWN",
        }
    }
}

/// 单个阶段的执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct StageResult {
    pub code: ResultCode,
    pub status: String,
    /// 该阶段自身的请求耗时
    pub elapsed: Duration,
    /// 正则判定匹配成功时的捕获
    pub capture: Option<Capture>,
}

impl StageResult {
    pub fn new(code: ResultCode, status: impl Into<String>, elapsed: Duration) -> Self {
        Self {
            code,
            status: status.into(),
            elapsed,
            capture: None,
        }
    }

    pub fn with_capture(mut self, capture: Capture) -> Self {
        self.capture = Some(capture);
        self
    }

    /// 请求未能发出或未完成
    pub fn failure(status: impl Into<String>, elapsed: Duration) -> Self {
        Self::new(ResultCode::Critical, status, elapsed)
    }

    pub fn is_success(&self) -> bool {
        self.code.is_ok()
    }
}
