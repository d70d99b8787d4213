use async_trait::async_trait;

use crate::common::errors::Result;
use crate::intent::ParsedCommand;

/// Turns free text into a classified trading command
#[async_trait]
pub trait NlpProcessor: Send + Sync {
    /// Provider identifier, used in logs
    fn provider(&self) -> &'static str;

    /// Parse one line of user input
    ///
    /// An `Err` means the text could not be classified at all. A command with
    /// missing or invalid fields is still `Ok`; check `command.is_valid()`.
    async fn parse_command(&self, text: &str) -> Result<ParsedCommand>;
}

pub type BoxedNlpProcessor = Box<dyn NlpProcessor>;
