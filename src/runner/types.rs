use crate::assertion::{ResultCode, StageResult};
use crate::http::Method;
use std::time::Duration;

/// 单个阶段的执行记录
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    /// 阶段序号（从 0 开始）
    pub index: usize,

    pub method: Method,

    /// 实际请求的 URL；解析失败时为声明中的原始 URL
    pub url: String,

    /// 阶段结果，`elapsed` 为该阶段自身耗时
    pub result: StageResult,

    /// 截至该阶段（含）的累计耗时
    pub cumulative: Duration,
}

impl StageReport {
    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }
}

/// 整个序列的执行结果
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceResult {
    /// 最后执行的阶段序号
    pub stage: usize,

    /// 最后执行的阶段结果
    pub result: StageResult,

    /// 已执行阶段的累计耗时
    pub total_elapsed: Duration,

    /// 最后执行的阶段的 URL
    pub url: String,

    /// 最后执行的阶段的判定声明，如 `code:200`
    pub test: String,

    /// 序列中声明的阶段总数
    pub total_stages: usize,

    /// 已执行阶段的记录，按执行顺序
    pub stages: Vec<StageReport>,
}

impl SequenceResult {
    pub fn code(&self) -> ResultCode {
        self.result.code
    }

    pub fn is_success(&self) -> bool {
        self.result.is_success()
    }

    /// 所有声明的阶段是否都已执行
    pub fn is_completed(&self) -> bool {
        self.stages.len() == self.total_stages
    }

    pub fn passed(&self) -> usize {
        self.stages.iter().filter(|s| s.is_success()).count()
    }
}
