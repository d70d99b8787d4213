//! Shared vocabulary: errors, domain types and the broker capability trait

pub mod errors;
pub mod traits;
pub mod types;
