#![forbid(unsafe_code)]
//! Event dispatch and result normalization for agent test runs.
//!
//! An agent runtime emits lifecycle notifications (`on_tool_start`,
//! `on_chat_model_end`, ...). This crate provides:
//! - Classification of raw `{"event", "name", "data"}` records into [`AgentEvent`]s.
//! - An [`EventDispatcher`] that renders each event to a console sink, attaches it to a
//!   test report, and keeps an ordered, timestamped transcript.
//! - Normalization of raw agent output into one string, with absence kept distinct from
//!   an empty answer ([`NoAgentResult`]).
//! - Bounded-memory reading of recorded JSONL event logs ([`EventLogReader`]).
//! - Result assertions ([`OutcomeExpectation`]) and a small TTL cache.
//! - With the `tokio` feature, a [`TaskRunner`] that drives a live event stream under a
//!   deadline.

mod cache;
mod clock;
mod config;
mod dispatcher;
mod error;
mod event;
mod ingest;
mod outcome;
mod output;
mod reader;
mod record;
pub mod sink;

#[cfg(feature = "tokio")]
mod driver;

pub use cache::{TtlCache, DEVICE_CACHE_TTL};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{DispatcherConfig, DEFAULT_TRANSCRIPT_ATTACHMENT};
pub use dispatcher::EventDispatcher;
pub use error::{LineRecord, LineRecordError};
pub use event::{
    AgentEvent, AgentEventKind, ChainEvent, ModelEndEvent, ModelStreamEvent, NodeEvent,
    ToolEndEvent, ToolStartEvent,
};
pub use ingest::{EventLogReader, DEFAULT_MAX_LINE_BYTES};
pub use outcome::{
    OutcomeError, OutcomeExpectation, OutcomeWarning, Verdict, DEFAULT_FAILURE_INDICATORS,
};
pub use output::{normalize, normalize_value, Fragment, NoAgentResult, RawAgentOutput};
pub use record::{Category, EventLog, LogRecord};
pub use sink::{ConsoleSink, ContentType, ReportSink, SinkError};

#[cfg(feature = "tokio")]
pub use driver::{DriveError, RunnerConfig, TaskRun, TaskRunner, DEFAULT_TASK_DEADLINE};
