use serde_json::Value;

use crate::clock::{Clock, SystemClock};
use crate::config::DispatcherConfig;
use crate::event::{AgentEvent, ChainEvent, ToolEndEvent, ToolStartEvent};
use crate::output::{message_content, value_text};
use crate::record::{Category, EventLog, LogRecord};
use crate::sink::{ConsoleSink, ContentType, ReportSink, SinkError};

const SHOULD_CONTINUE: &str = "should_continue";
const NONE_PLACEHOLDER: &str = "<none>";

/// Turns agent lifecycle events into log records, printing and attaching each.
///
/// One dispatcher belongs to one task execution; its [`EventLog`] is never
/// shared. Dispatch is infallible: unknown events are ignored and sink
/// failures are dropped.
pub struct EventDispatcher<C, R, K = SystemClock> {
    config: DispatcherConfig,
    console: C,
    report: R,
    clock: K,
    log: EventLog,
}

impl<C: ConsoleSink, R: ReportSink> EventDispatcher<C, R, SystemClock> {
    pub fn new(config: DispatcherConfig, console: C, report: R) -> Self {
        Self::with_clock(config, console, report, SystemClock)
    }
}

impl<C: ConsoleSink, R: ReportSink, K: Clock> EventDispatcher<C, R, K> {
    pub fn with_clock(config: DispatcherConfig, console: C, report: R, clock: K) -> Self {
        Self {
            config,
            console,
            report,
            clock,
            log: EventLog::default(),
        }
    }

    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    pub fn log(&self) -> &EventLog {
        &self.log
    }

    pub fn console(&self) -> &C {
        &self.console
    }

    pub fn report(&self) -> &R {
        &self.report
    }

    pub fn into_parts(self) -> (C, R, EventLog) {
        (self.console, self.report, self.log)
    }

    /// Renders one event. Returns the emitted record, or `None` when the event
    /// is filtered out.
    pub fn dispatch(&mut self, event: &AgentEvent) -> Option<LogRecord> {
        let (category, message) = render(event, &self.config)?;
        let record = LogRecord {
            seq: self.log.len() as u64 + 1,
            category,
            message,
            timestamp: self.clock.now(),
        };

        ignore_sink_failure(self.console.write_line(category, &record.message));
        self.log.push(record.clone());
        ignore_sink_failure(self.report.attach(
            category.label(),
            record.message.as_bytes(),
            ContentType::Text,
        ));
        Some(record)
    }

    /// Classifies a raw `{"event", "name", "data"}` record, then dispatches it.
    pub fn dispatch_value(&mut self, record: &Value) -> Option<LogRecord> {
        self.dispatch(&AgentEvent::from_value(record))
    }

    /// Attaches the whole log as one transcript. Does nothing while the log is
    /// empty; repeated calls attach the log as it stands at each call.
    pub fn flush(&mut self) {
        if self.log.is_empty() {
            return;
        }
        let transcript = self.log.transcript();
        ignore_sink_failure(self.report.attach(
            &self.config.transcript_attachment,
            transcript.as_bytes(),
            ContentType::Text,
        ));
    }

    /// Forwards an extra attachment (results, screenshots) to the report sink,
    /// under the same best-effort policy as dispatched records.
    pub fn attach(&mut self, name: &str, body: &[u8], content_type: ContentType) {
        ignore_sink_failure(self.report.attach(name, body, content_type));
    }
}

/// Observability must never fail a run; every sink write goes through here.
fn ignore_sink_failure(outcome: Result<(), SinkError>) {
    let _ = outcome;
}

fn render(event: &AgentEvent, config: &DispatcherConfig) -> Option<(Category, String)> {
    match event {
        AgentEvent::NodeStart(node) => Some((
            Category::NodeStart,
            format!("[NODE:START] {}", node.node_name.as_deref().unwrap_or("<node>")),
        )),
        AgentEvent::NodeEnd(node) => Some((
            Category::NodeEnd,
            format!("[NODE:END] {}", node.node_name.as_deref().unwrap_or("<node>")),
        )),
        AgentEvent::ToolStart(start) => Some((Category::ToolStart, render_tool_start(start))),
        AgentEvent::ToolEnd(end) => Some((Category::ToolEnd, render_tool_end(end))),
        AgentEvent::ModelStream(stream) => {
            let chunk = stream.chunk.as_deref().filter(|_| config.stream_tokens)?;
            Some((Category::ModelStream, format!("[MODEL:STREAM] {chunk}")))
        }
        AgentEvent::ModelEnd(end) => {
            let text = end.output.as_ref()?.normalize();
            if text.trim().is_empty() {
                return None;
            }
            Some((Category::ModelEnd, format!("[MODEL:END] {text}")))
        }
        AgentEvent::ChainStart(chain) => config.verbose.then(|| {
            (
                Category::ChainStart,
                format!("[CHAIN:START] {}", chain_name(chain)),
            )
        }),
        AgentEvent::ChainEnd(chain) => render_chain_end(chain, config),
        AgentEvent::Unknown { .. } => None,
    }
}

fn render_tool_start(start: &ToolStartEvent) -> String {
    let args = start
        .input
        .as_ref()
        .map(Value::to_string)
        .unwrap_or_else(|| NONE_PLACEHOLDER.to_string());
    format!(
        "[TOOL:START] {} args={args}",
        start.tool_name.as_deref().unwrap_or("<tool>")
    )
}

fn render_tool_end(end: &ToolEndEvent) -> String {
    // Tool messages wrap the payload in `content`; unwrap one layer.
    let output = end
        .output
        .as_ref()
        .map(|output| value_text(message_content(output).unwrap_or(output)))
        .unwrap_or_else(|| NONE_PLACEHOLDER.to_string());
    format!(
        "[TOOL:END] {} output={output}",
        end.tool_name.as_deref().unwrap_or("<tool>")
    )
}

fn render_chain_end(chain: &ChainEvent, config: &DispatcherConfig) -> Option<(Category, String)> {
    if chain.chain_name.as_deref() == Some(SHOULD_CONTINUE) {
        if let Some(output) = chain.output.as_ref().filter(|v| is_truthy(v)) {
            let shown = match output {
                Value::Array(items) => items.first().map(value_text).unwrap_or_default(),
                other => value_text(other),
            };
            return Some((
                Category::ChainEnd,
                format!("[CHAIN:END] {SHOULD_CONTINUE}, {shown}"),
            ));
        }
    }
    config.verbose.then(|| {
        (
            Category::ChainEnd,
            format!("[CHAIN:END] {}", chain_name(chain)),
        )
    })
}

fn chain_name(chain: &ChainEvent) -> &str {
    chain.chain_name.as_deref().unwrap_or("<chain>")
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(flag) => *flag,
        Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}
