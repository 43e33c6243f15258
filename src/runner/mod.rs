pub mod executor;
pub mod reporter;
pub mod types;

pub use executor::SequenceRunner;
pub use reporter::{StageReporter, StatusLine};
pub use types::{SequenceResult, StageReport};
