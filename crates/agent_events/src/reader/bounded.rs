use std::io::{BufRead, ErrorKind};

#[derive(Debug)]
pub enum BoundedLine {
    Line {
        line_number: usize,
        bytes: Vec<u8>,
    },
    LineTooLong {
        line_number: usize,
        observed_bytes: usize,
        max_line_bytes: usize,
    },
    IoError {
        line_number: usize,
    },
}

/// Splits a reader on `\n` without ever holding more than `max_line_bytes` of
/// one line in memory. Oversized lines are drained and reported, not returned.
pub struct BoundedLineReader<R: BufRead> {
    reader: R,
    max_line_bytes: usize,
    line_number: usize,
    done: bool,
}

impl<R: BufRead> BoundedLineReader<R> {
    pub fn new(reader: R, max_line_bytes: usize) -> Self {
        Self {
            reader,
            max_line_bytes,
            line_number: 0,
            done: false,
        }
    }

    fn finish(&mut self, current: Vec<u8>, observed_bytes: usize) -> BoundedLine {
        self.line_number += 1;
        if observed_bytes > self.max_line_bytes {
            BoundedLine::LineTooLong {
                line_number: self.line_number,
                observed_bytes,
                max_line_bytes: self.max_line_bytes,
            }
        } else {
            BoundedLine::Line {
                line_number: self.line_number,
                bytes: current,
            }
        }
    }
}

impl<R: BufRead> Iterator for BoundedLineReader<R> {
    type Item = BoundedLine;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let mut current = Vec::new();
        let mut observed_bytes = 0usize;
        loop {
            let chunk = match self.reader.fill_buf() {
                Ok(chunk) => chunk,
                Err(err) if err.kind() == ErrorKind::Interrupted => continue,
                Err(_) => {
                    self.done = true;
                    self.line_number += 1;
                    return Some(BoundedLine::IoError {
                        line_number: self.line_number,
                    });
                }
            };

            if chunk.is_empty() {
                self.done = true;
                if observed_bytes == 0 {
                    return None;
                }
                return Some(self.finish(current, observed_bytes));
            }

            let newline = chunk.iter().position(|b| *b == b'\n');
            let take = newline.unwrap_or(chunk.len());
            observed_bytes = observed_bytes.saturating_add(take);
            if observed_bytes <= self.max_line_bytes {
                current.extend_from_slice(&chunk[..take]);
            } else {
                current.clear();
            }

            match newline {
                Some(idx) => {
                    self.reader.consume(idx + 1);
                    return Some(self.finish(current, observed_bytes));
                }
                None => {
                    let len = chunk.len();
                    self.reader.consume(len);
                }
            }
        }
    }
}
