//! Write-only side channels for dispatched records.
//!
//! Both sink traits are fallible, but the dispatcher treats every write as
//! best-effort: a failing sink never interrupts event dispatch.

mod console;
mod report;

use std::path::Path;

use thiserror::Error;

use crate::record::Category;

pub use console::{TracingConsole, WriterConsole};
pub use report::{Attachment, DirectoryReportSink, MemoryReportSink};

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("sink I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to serialize attachment index entry: {0}")]
    Index(#[from] serde_json::Error),
    #[error("sink unavailable: {0}")]
    Unavailable(String),
}

/// Attachment content types understood by report sinks.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum ContentType {
    Text,
    Json,
    Xml,
    Html,
    Png,
    Jpg,
}

impl ContentType {
    pub fn mime(self) -> &'static str {
        match self {
            ContentType::Text => "text/plain",
            ContentType::Json => "application/json",
            ContentType::Xml => "application/xml",
            ContentType::Html => "text/html",
            ContentType::Png => "image/png",
            ContentType::Jpg => "image/jpg",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            ContentType::Text => "txt",
            ContentType::Json => "json",
            ContentType::Xml => "xml",
            ContentType::Html => "html",
            ContentType::Png => "png",
            ContentType::Jpg => "jpg",
        }
    }

    /// Picks an image type for a screenshot: by file extension first, then by
    /// magic bytes, defaulting to PNG.
    pub fn sniff(path: Option<&Path>, bytes: &[u8]) -> Self {
        let extension = path
            .and_then(Path::extension)
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("jpg" | "jpeg") => return ContentType::Jpg,
            Some("png") => return ContentType::Png,
            _ => {}
        }
        if bytes.starts_with(&[0xFF, 0xD8, 0xFF]) {
            ContentType::Jpg
        } else {
            ContentType::Png
        }
    }
}

/// Named attachments for a test report.
pub trait ReportSink: Send {
    fn attach(&mut self, name: &str, body: &[u8], content_type: ContentType)
        -> Result<(), SinkError>;
}

/// Line-oriented human-readable output.
pub trait ConsoleSink: Send {
    fn write_line(&mut self, category: Category, message: &str) -> Result<(), SinkError>;
}

impl<S: ReportSink + ?Sized> ReportSink for Box<S> {
    fn attach(
        &mut self,
        name: &str,
        body: &[u8],
        content_type: ContentType,
    ) -> Result<(), SinkError> {
        (**self).attach(name, body, content_type)
    }
}

impl<S: ConsoleSink + ?Sized> ConsoleSink for Box<S> {
    fn write_line(&mut self, category: Category, message: &str) -> Result<(), SinkError> {
        (**self).write_line(category, message)
    }
}
