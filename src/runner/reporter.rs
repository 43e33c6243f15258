use crate::assertion::{ResultCode, StageResult};
use crate::runner::types::SequenceResult;
use colored::Colorize;
use std::time::Duration;

/// 监控系统读取的单行状态
pub struct StatusLine;

impl StatusLine {
    /// 单次检查：`OK: <status> | request_time=<秒>`
    pub fn single(result: &StageResult) -> String {
        format!(
            "{}: {}{}",
            result.code.label(),
            result.status,
            Self::metric(result.elapsed)
        )
    }

    /// 多阶段检查
    ///
    /// 成功：`OK: All stages passed (n/n)`；
    /// 失败：`CRITICAL: Stage k [url] - status (should be test)`。
    /// 两者都附带累计请求耗时。
    pub fn sequence(result: &SequenceResult) -> String {
        let head = if result.is_success() {
            format!(
                "OK: All stages passed ({}/{})",
                result.total_stages,
                result.total_stages
            )
        } else {
            format!(
                "{}: Stage {} [{}] - {} (should be {})",
                result.code().label(),
                result.stage,
                result.url,
                result.result.status,
                result.test
            )
        };
        format!("{}{}", head, Self::metric(result.total_elapsed))
    }

    /// 配置错误
    pub fn unknown(message: &str) -> String {
        format!("{}: {}", ResultCode::Unknown.label(), message)
    }

    fn metric(elapsed: Duration) -> String {
        format!(" | request_time={}", elapsed.as_secs_f64())
    }
}

/// debug 模式下逐阶段打印到 stderr
pub struct StageReporter;

impl StageReporter {
    pub fn new() -> Self {
        Self
    }

    pub fn print_sequence(&self, result: &SequenceResult) {
        eprintln!(
            "\nRan {} of {} stages, {} passed\n",
            result.stages.len(),
            result.total_stages,
            result.passed()
        );

        for stage in &result.stages {
            let symbol = if stage.is_success() {
                "✓".green()
            } else {
                "✗".red()
            };
            eprintln!(
                " {} [{}] {} {} ({}ms, total {}ms)",
                symbol,
                stage.index,
                stage.method.as_str().cyan(),
                stage.url,
                stage.result.elapsed.as_millis(),
                stage.cumulative.as_millis()
            );
            if stage.is_success() {
                eprintln!("   {}", stage.result.status.dimmed());
            } else {
                eprintln!("   {}: {}", "Error".red().bold(), stage.result.status);
            }
            if let Some(ref capture) = stage.result.capture {
                for index in 1..=capture.len() {
                    if let Some(value) = capture.group(index) {
                        eprintln!("   PREV_MATCH_{}_{} = {}", stage.index, index, value);
                    }
                }
            }
        }

        let skipped = result.total_stages - result.stages.len();
        if skipped > 0 {
            eprintln!(
                "\n {} {} stage(s) not run",
                "⊘".dimmed(),
                skipped.to_string().dimmed()
            );
        }
        eprintln!();
    }
}

impl Default for StageReporter {
    fn default() -> Self {
        Self::new()
    }
}
