pub mod capture;
pub mod config;
pub mod resolver;
pub mod types;

pub use capture::{Capture, CaptureStore};
pub use config::{ConfigLoader, CookieJarDecl, RunFile, RunPlan};
pub use resolver::StageResolver;
pub use types::{FlagsDecl, OptionsDecl, StageOptions, parse_post_field};
