use crate::assertion::types::{ResultCode, StageResult, SuccessTest};
use crate::http::{Outcome, TransportError};
use crate::variable::Capture;

/// 根据判定声明对一次请求结果求值
pub fn evaluate(test: &SuccessTest, outcome: &Outcome) -> StageResult {
    let returned = format!("{} returned HTTP {}", outcome.url, outcome.status);

    match test {
        // 不一致时状态文本不变，由结果码体现
        SuccessTest::Code(expected) => {
            let code = if *expected == outcome.status {
                ResultCode::Ok
            } else {
                ResultCode::Critical
            };
            StageResult::new(code, returned, outcome.elapsed)
        }

        SuccessTest::Pattern(regex) => match regex.captures(&outcome.body) {
            Some(caps) => StageResult::new(
                ResultCode::Ok,
                format!("{} found in {}", regex.as_str(), outcome.url),
                outcome.elapsed,
            )
            .with_capture(Capture::from_captures(&caps)),
            None => StageResult::new(
                ResultCode::Critical,
                format!("{} not found in {}", regex.as_str(), outcome.url),
                outcome.elapsed,
            ),
        },

        SuccessTest::Unrecognized { .. } => {
            StageResult::new(ResultCode::Malformed, returned, outcome.elapsed)
        }
    }
}

/// 传输失败直接判为失败，不再求值
pub fn transport_failure(error: &TransportError) -> StageResult {
    StageResult::failure(error.message.clone(), error.elapsed)
}
