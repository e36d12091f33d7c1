//! Splits one assistant turn into the text shown to the user and an optional
//! delegated instruction wrapped in a literal tag pair.
//!
//! Tags are case-sensitive and never nested. Only the first pair in a turn is
//! honored; anything after its closing tag is ignored.

use confidant_core::config::{DEFAULT_CLOSE_TAG, DEFAULT_OPEN_TAG};
use thiserror::Error;
use tracing::warn;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("delimiters must be non-empty and distinct")]
    InvalidDelimiters,
    #[error("opening delimiter `{open}` at byte {offset} is never closed")]
    Unterminated { open: String, offset: usize },
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DelimiterPair {
    open: String,
    close: String,
}

impl DelimiterPair {
    pub fn new(open: impl Into<String>, close: impl Into<String>) -> Result<Self, ProtocolError> {
        let open = open.into();
        let close = close.into();
        if open.is_empty() || close.is_empty() || open == close {
            return Err(ProtocolError::InvalidDelimiters);
        }
        Ok(Self { open, close })
    }

    pub fn open(&self) -> &str {
        &self.open
    }

    pub fn close(&self) -> &str {
        &self.close
    }
}

impl Default for DelimiterPair {
    fn default() -> Self {
        Self { open: DEFAULT_OPEN_TAG.to_string(), close: DEFAULT_CLOSE_TAG.to_string() }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Extraction {
    /// Conversational part of the turn. `None` when only a task was sent.
    pub display_text: Option<String>,
    pub task_text: Option<String>,
}

impl Extraction {
    fn conversational(turn: &str) -> Self {
        Self { display_text: Some(turn.to_string()), task_text: None }
    }

    pub fn has_task(&self) -> bool {
        self.task_text.is_some()
    }
}

#[derive(Clone, Debug, Default)]
pub struct InstructionExtractor {
    delimiters: DelimiterPair,
}

impl InstructionExtractor {
    pub fn new(delimiters: DelimiterPair) -> Self {
        Self { delimiters }
    }

    pub fn delimiters(&self) -> &DelimiterPair {
        &self.delimiters
    }

    /// Never fails: an unclosed tag leaves the whole turn conversational.
    pub fn extract(&self, turn: &str) -> Extraction {
        match self.parse(turn) {
            Ok(extraction) => extraction,
            Err(error) => {
                warn!(
                    event_name = "agent.delegation.malformed",
                    error = %error,
                    "ignoring malformed delegation markup"
                );
                Extraction::conversational(turn)
            }
        }
    }

    pub fn parse(&self, turn: &str) -> Result<Extraction, ProtocolError> {
        let DelimiterPair { open, close } = &self.delimiters;
        let Some(start) = turn.find(open.as_str()) else {
            return Ok(Extraction::conversational(turn));
        };

        let body_start = start + open.len();
        let body_len = turn[body_start..]
            .find(close.as_str())
            .ok_or_else(|| ProtocolError::Unterminated { open: open.clone(), offset: start })?;

        let display = turn[..start].trim();
        let task = turn[body_start..body_start + body_len].trim();
        Ok(Extraction {
            display_text: (!display.is_empty()).then(|| display.to_string()),
            task_text: (!task.is_empty()).then(|| task.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::{DelimiterPair, Extraction, InstructionExtractor, ProtocolError};

    fn tag_extractor() -> InstructionExtractor {
        InstructionExtractor::new(DelimiterPair::new("<tag>", "</tag>").expect("delimiters"))
    }

    #[test]
    fn splits_display_and_task() {
        let extraction = tag_extractor().extract("Hi there <tag>do X</tag>");

        assert_eq!(extraction.display_text.as_deref(), Some("Hi there"));
        assert_eq!(extraction.task_text.as_deref(), Some("do X"));
    }

    #[test]
    fn plain_turn_has_no_task() {
        let extraction = tag_extractor().extract("just chatting");

        assert_eq!(
            extraction,
            Extraction { display_text: Some("just chatting".to_string()), task_text: None }
        );
    }

    #[test]
    fn unterminated_tag_is_conversational() {
        let extractor = tag_extractor();
        let turn = "Sure <tag>remember Jane";

        assert_eq!(
            extractor.parse(turn),
            Err(ProtocolError::Unterminated { open: "<tag>".to_string(), offset: 5 })
        );
        let extraction = extractor.extract(turn);
        assert_eq!(extraction.display_text.as_deref(), Some(turn));
        assert!(!extraction.has_task());
    }

    #[test]
    fn only_the_first_pair_is_honored() {
        let extraction = tag_extractor().extract("Ok. <tag>first</tag> and <tag>second</tag>");

        assert_eq!(extraction.task_text.as_deref(), Some("first"));
    }

    #[test]
    fn tags_are_case_sensitive() {
        let extraction = tag_extractor().extract("Hello <TAG>shout</TAG>");

        assert!(!extraction.has_task());
    }

    #[test]
    fn default_pair_uses_commit_task() {
        let extraction = InstructionExtractor::default()
            .extract("Got it.\n<commit_task>Remember a person named Alex Johnson</commit_task>");

        assert_eq!(extraction.display_text.as_deref(), Some("Got it."));
        assert_eq!(extraction.task_text.as_deref(), Some("Remember a person named Alex Johnson"));
    }

    #[test]
    fn rejects_empty_or_identical_delimiters() {
        assert_eq!(DelimiterPair::new("", "</x>"), Err(ProtocolError::InvalidDelimiters));
        assert_eq!(DelimiterPair::new("|", "|"), Err(ProtocolError::InvalidDelimiters));
    }
}
