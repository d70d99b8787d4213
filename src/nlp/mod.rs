//! Natural-language command parsing

pub mod traits;
pub mod witai;

pub use traits::{BoxedNlpProcessor, NlpProcessor};
pub use witai::WitAiProcessor;
