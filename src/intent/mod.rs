//! Command normalization
//!
//! Flags and NLP output both arrive as a [`RawIntent`]; [`CommandNormalizer`]
//! classifies it into a [`NormalizedCommand`] that is either valid or carries
//! the reasons it is not.

mod normalizer;
mod types;

pub use normalizer::CommandNormalizer;
pub use types::{IntentKind, NormalizedCommand, ParsedCommand, RawIntent};
