pub mod assertion;
pub mod error;
pub mod http;
pub mod logger;
pub mod runner;
pub mod variable;

// Re-export commonly used types
pub use assertion::{ResultCode, StageResult, SuccessTest};
pub use error::{ProbeError, Result};
pub use runner::{SequenceResult, SequenceRunner, StatusLine};
pub use variable::{Capture, CaptureStore, ConfigLoader, StageOptions};

/// 默认 User-Agent
pub const DEFAULT_USER_AGENT: &str = "rucheck";
