use std::io::{BufReader, Read};

use crate::error::{LineRecord, LineRecordError};
use crate::event::AgentEvent;
use crate::reader::{BoundedLine, BoundedLineReader};

pub const DEFAULT_MAX_LINE_BYTES: usize = 64 * 1024;

const EXCERPT_CHARS: usize = 80;

/// Reads a recorded agent event log, one `{"event", "name", "data"}` object
/// per line, in bounded memory.
///
/// Blank lines are skipped. Oversized, non-UTF-8 and unparseable lines yield
/// error records and reading continues with the next line.
pub struct EventLogReader<R: Read> {
    lines: BoundedLineReader<BufReader<R>>,
}

impl<R: Read> EventLogReader<R> {
    pub fn new(reader: R) -> Self {
        Self::with_max_line_bytes(reader, DEFAULT_MAX_LINE_BYTES)
    }

    pub fn with_max_line_bytes(reader: R, max_line_bytes: usize) -> Self {
        Self {
            lines: BoundedLineReader::new(BufReader::new(reader), max_line_bytes),
        }
    }
}

impl<R: Read> Iterator for EventLogReader<R> {
    type Item = LineRecord;

    fn next(&mut self) -> Option<LineRecord> {
        loop {
            let (line_number, outcome) = match self.lines.next()? {
                BoundedLine::IoError { line_number } => (line_number, Err(LineRecordError::Io)),
                BoundedLine::LineTooLong {
                    line_number,
                    observed_bytes,
                    max_line_bytes,
                } => (
                    line_number,
                    Err(LineRecordError::LineTooLong {
                        observed_bytes,
                        max_line_bytes,
                    }),
                ),
                BoundedLine::Line { line_number, bytes } => {
                    let Ok(text) = String::from_utf8(bytes) else {
                        return Some(LineRecord {
                            line_number,
                            outcome: Err(LineRecordError::InvalidUtf8),
                        });
                    };
                    let line = text.strip_suffix('\r').unwrap_or(&text);
                    if line.trim().is_empty() {
                        continue;
                    }
                    (line_number, parse_event(line))
                }
            };
            return Some(LineRecord {
                line_number,
                outcome,
            });
        }
    }
}

fn parse_event(line: &str) -> Result<AgentEvent, LineRecordError> {
    AgentEvent::from_json(line).map_err(|err| LineRecordError::Json {
        reason: err.to_string(),
        excerpt: excerpt(line),
    })
}

fn excerpt(line: &str) -> String {
    let mut chars = line.chars();
    let head: String = chars.by_ref().take(EXCERPT_CHARS).collect();
    if chars.next().is_some() {
        format!("{head}…")
    } else {
        head
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::event::AgentEventKind;

    #[test]
    fn bad_lines_become_records_and_reading_continues() {
        let mut data = Vec::new();
        data.extend_from_slice(b"\n   \n{not-json}\n");
        data.extend_from_slice(&[0xff, 0xfe, b'\n']);
        data.extend_from_slice(&[b'x'; 64]);
        data.extend_from_slice(b"\r\n{\"event\":\"on_tool_end\"}\r\n");

        let records: Vec<_> = EventLogReader::with_max_line_bytes(Cursor::new(data), 32).collect();
        let lines: Vec<_> = records.iter().map(|r| r.line_number).collect();
        assert_eq!(lines, [3, 4, 5, 6]);

        assert!(matches!(
            &records[0].outcome,
            Err(LineRecordError::Json { excerpt, .. }) if excerpt == "{not-json}"
        ));
        assert_eq!(records[1].outcome, Err(LineRecordError::InvalidUtf8));
        assert_eq!(
            records[2].outcome,
            Err(LineRecordError::LineTooLong {
                observed_bytes: 65,
                max_line_bytes: 32
            })
        );
        assert_eq!(
            records[3].outcome.as_ref().map(AgentEvent::kind),
            Ok(AgentEventKind::ToolEnd)
        );
    }

    #[test]
    fn long_lines_are_excerpted() {
        let line = format!("{{\"event\": {}", "9".repeat(200));
        let err = EventLogReader::new(Cursor::new(line))
            .next()
            .unwrap()
            .outcome
            .unwrap_err();
        let excerpt = err.excerpt().unwrap();
        assert_eq!(excerpt.chars().count(), EXCERPT_CHARS + 1);
        assert!(excerpt.ends_with('…'));
    }
}
