use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;

use super::{ContentType, ReportSink, SinkError};

const INDEX_FILENAME: &str = "attachments.jsonl";
const ENVIRONMENT_FILENAME: &str = "environment.properties";
const MAX_SLUG_CHARS: usize = 48;

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub name: String,
    pub body: Vec<u8>,
    pub content_type: ContentType,
}

impl Attachment {
    pub fn text(&self) -> Option<&str> {
        std::str::from_utf8(&self.body).ok()
    }
}

/// Keeps attachments in memory, in arrival order.
#[derive(Debug, Clone, Default)]
pub struct MemoryReportSink {
    attachments: Vec<Attachment>,
}

impl MemoryReportSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn attachments(&self) -> &[Attachment] {
        &self.attachments
    }

    pub fn named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Attachment> + 'a {
        self.attachments.iter().filter(move |a| a.name == name)
    }
}

impl ReportSink for MemoryReportSink {
    fn attach(
        &mut self,
        name: &str,
        body: &[u8],
        content_type: ContentType,
    ) -> Result<(), SinkError> {
        self.attachments.push(Attachment {
            name: name.to_string(),
            body: body.to_vec(),
            content_type,
        });
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct IndexEntry<'a> {
    seq: u64,
    name: &'a str,
    file: &'a str,
    content_type: &'static str,
}

/// Writes each attachment to its own file under a results directory and
/// appends an entry to `attachments.jsonl`.
///
/// A reused directory keeps earlier runs: numbering continues after the
/// entries already in the index, so files and `seq` values never collide.
#[derive(Debug)]
pub struct DirectoryReportSink {
    dir: PathBuf,
    next_seq: u64,
}

impl DirectoryReportSink {
    pub fn create(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        let recorded = match fs::read_to_string(dir.join(INDEX_FILENAME)) {
            Ok(index) => index.lines().filter(|line| !line.trim().is_empty()).count(),
            Err(err) if err.kind() == io::ErrorKind::NotFound => 0,
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            dir,
            next_seq: recorded as u64 + 1,
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Writes `environment.properties` as `key=value` lines.
    pub fn write_environment<K, V>(
        &self,
        properties: impl IntoIterator<Item = (K, V)>,
    ) -> Result<(), SinkError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut out = String::new();
        for (key, value) in properties {
            out.push_str(key.as_ref());
            out.push('=');
            out.push_str(value.as_ref());
            out.push('\n');
        }
        fs::write(self.dir.join(ENVIRONMENT_FILENAME), out)?;
        Ok(())
    }
}

impl ReportSink for DirectoryReportSink {
    fn attach(
        &mut self,
        name: &str,
        body: &[u8],
        content_type: ContentType,
    ) -> Result<(), SinkError> {
        let seq = self.next_seq;
        self.next_seq += 1;

        let file = format!("{seq:04}-{}.{}", slug(name), content_type.extension());
        fs::write(self.dir.join(&file), body)?;

        let entry = IndexEntry {
            seq,
            name,
            file: &file,
            content_type: content_type.mime(),
        };
        let mut line = serde_json::to_vec(&entry)?;
        line.push(b'\n');
        let mut index = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.dir.join(INDEX_FILENAME))?;
        index.write_all(&line)?;
        Ok(())
    }
}

fn slug(name: &str) -> String {
    let mut out = String::new();
    for ch in name.chars() {
        if out.chars().count() >= MAX_SLUG_CHARS {
            break;
        }
        if ch.is_ascii_alphanumeric() {
            out.push(ch.to_ascii_lowercase());
        } else if !out.is_empty() && !out.ends_with('-') {
            out.push('-');
        }
    }
    let trimmed = out.trim_end_matches('-');
    if trimmed.is_empty() {
        "attachment".to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_filesystem_safe() {
        assert_eq!(slug("Tool Start"), "tool-start");
        assert_eq!(
            slug("Screenshot - Pre-task: open Settings!"),
            "screenshot-pre-task-open-settings"
        );
        assert_eq!(slug("スクリーンショット"), "attachment");
    }

    #[test]
    fn directory_sink_writes_files_and_index() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = DirectoryReportSink::create(dir.path().join("results")).unwrap();
        sink.attach("Tool Start", b"[TOOL:START] tap", ContentType::Text)
            .unwrap();
        sink.attach("Screenshot", b"\x89PNG", ContentType::Png).unwrap();
        sink.write_environment([("target_platform", "Android")])
            .unwrap();

        let root = sink.dir();
        assert_eq!(
            fs::read_to_string(root.join("0001-tool-start.txt")).unwrap(),
            "[TOOL:START] tap"
        );
        assert_eq!(fs::read(root.join("0002-screenshot.png")).unwrap(), b"\x89PNG");
        assert_eq!(
            fs::read_to_string(root.join(ENVIRONMENT_FILENAME)).unwrap(),
            "target_platform=Android\n"
        );

        let index = fs::read_to_string(root.join(INDEX_FILENAME)).unwrap();
        let entries: Vec<serde_json::Value> = index
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1]["name"], "Screenshot");
        assert_eq!(entries[1]["content_type"], "image/png");
    }

    #[test]
    fn reused_directory_continues_numbering() {
        let dir = tempfile::tempdir().unwrap();
        let mut first = DirectoryReportSink::create(dir.path()).unwrap();
        first.attach("Tool Start", b"first run", ContentType::Text).unwrap();
        drop(first);

        let mut second = DirectoryReportSink::create(dir.path()).unwrap();
        second.attach("Tool Start", b"second run", ContentType::Text).unwrap();

        let entries: Vec<serde_json::Value> = fs::read_to_string(dir.path().join(INDEX_FILENAME))
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        let seqs: Vec<_> = entries.iter().map(|e| e["seq"].as_u64().unwrap()).collect();
        assert_eq!(seqs, [1, 2]);
        assert_eq!(
            fs::read_to_string(dir.path().join("0001-tool-start.txt")).unwrap(),
            "first run"
        );
        assert_eq!(
            fs::read_to_string(dir.path().join("0002-tool-start.txt")).unwrap(),
            "second run"
        );
    }

    #[test]
    fn memory_sink_filters_by_name() {
        let mut sink = MemoryReportSink::new();
        sink.attach("a", b"1", ContentType::Text).unwrap();
        sink.attach("b", b"2", ContentType::Text).unwrap();
        sink.attach("a", b"3", ContentType::Text).unwrap();
        let bodies: Vec<_> = sink.named("a").filter_map(Attachment::text).collect();
        assert_eq!(bodies, ["1", "3"]);
    }
}
