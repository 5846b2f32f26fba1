use thiserror::Error;

use crate::event::AgentEvent;

/// Why one line of a recorded event log could not become an event.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LineRecordError {
    #[error("I/O error while reading event log")]
    Io,
    #[error("invalid UTF-8 in event log")]
    InvalidUtf8,
    #[error("line too long ({observed_bytes} bytes, limit {max_line_bytes})")]
    LineTooLong {
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    #[error("invalid JSON: {reason}")]
    Json {
        reason: String,
        /// Leading characters of the offending line.
        excerpt: String,
    },
}

impl LineRecordError {
    pub fn excerpt(&self) -> Option<&str> {
        match self {
            LineRecordError::Json { excerpt, .. } => Some(excerpt),
            _ => None,
        }
    }
}

/// One non-blank line of a recorded event log.
#[derive(Debug, Clone, PartialEq)]
pub struct LineRecord {
    /// 1-based, counting blank lines.
    pub line_number: usize,
    pub outcome: Result<AgentEvent, LineRecordError>,
}
