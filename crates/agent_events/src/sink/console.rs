use std::io::{self, Write};

use crate::record::Category;

use super::{ConsoleSink, SinkError};

/// Writes `<marker> <message>` lines to any writer.
#[derive(Debug)]
pub struct WriterConsole<W> {
    writer: W,
}

impl<W: Write + Send> WriterConsole<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl WriterConsole<io::Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleSink for WriterConsole<W> {
    fn write_line(&mut self, category: Category, message: &str) -> Result<(), SinkError> {
        writeln!(self.writer, "{} {message}", category.marker())?;
        self.writer.flush()?;
        Ok(())
    }
}

/// Emits each record as an `INFO` tracing event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConsole;

impl ConsoleSink for TracingConsole {
    fn write_line(&mut self, category: Category, message: &str) -> Result<(), SinkError> {
        tracing::info!(category = category.label(), "{message}");
        Ok(())
    }
}
