/// 判定模块 - 对单次请求结果给出通过/失败
mod evaluator;
mod parser;
mod types;

pub use evaluator::{evaluate, transport_failure};
pub use parser::{parse_recognized_test, parse_test};
pub use types::{ResultCode, StageResult, SuccessTest};
