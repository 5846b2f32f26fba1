use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Label of a log record; doubles as its report-attachment name.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum Category {
    NodeStart,
    NodeEnd,
    ToolStart,
    ToolEnd,
    ModelStream,
    ModelEnd,
    ChainStart,
    ChainEnd,
}

impl Category {
    pub fn label(self) -> &'static str {
        match self {
            Category::NodeStart => "Node Start",
            Category::NodeEnd => "Node End",
            Category::ToolStart => "Tool Start",
            Category::ToolEnd => "Tool End",
            Category::ModelStream => "Model Stream",
            Category::ModelEnd => "Model End",
            Category::ChainStart => "Chain Start",
            Category::ChainEnd => "Chain End",
        }
    }

    /// Fixed console marker for the category.
    pub fn marker(self) -> &'static str {
        match self {
            Category::NodeStart => "▶",
            Category::NodeEnd => "■",
            Category::ToolStart => "⚙",
            Category::ToolEnd => "✔",
            Category::ModelStream => "…",
            Category::ModelEnd => "💬",
            Category::ChainStart | Category::ChainEnd => "⛓",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    /// Position within the owning dispatcher's log, starting at 1.
    pub seq: u64,
    pub category: Category,
    pub message: String,
    pub timestamp: SystemTime,
}

impl LogRecord {
    /// `<unix seconds, 3 decimals>: <message>`
    pub fn transcript_line(&self) -> String {
        let secs = self
            .timestamp
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs_f64())
            .unwrap_or_default();
        format!("{secs:.3}: {}", self.message)
    }
}

/// Append-only record sequence for one task execution.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EventLog(Vec<LogRecord>);

impl EventLog {
    pub(crate) fn push(&mut self, record: LogRecord) {
        self.0.push(record);
    }

    pub fn records(&self) -> &[LogRecord] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The whole log as newline-joined transcript lines.
    pub fn transcript(&self) -> String {
        self.0
            .iter()
            .map(LogRecord::transcript_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}
