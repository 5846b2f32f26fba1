use serde_json::{Map, Value};

use crate::output::{message_content, RawAgentOutput};

/// Event-name suffixes in match order. The first suffix that matches wins.
const SUFFIXES: &[(&str, AgentEventKind)] = &[
    ("node_start", AgentEventKind::NodeStart),
    ("node_end", AgentEventKind::NodeEnd),
    ("tool_start", AgentEventKind::ToolStart),
    ("tool_end", AgentEventKind::ToolEnd),
    ("on_chat_model_end", AgentEventKind::ModelEnd),
    ("on_chain_start", AgentEventKind::ChainStart),
    ("on_chain_end", AgentEventKind::ChainEnd),
    ("on_chat_model_stream", AgentEventKind::ModelStream),
];

#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash)]
pub enum AgentEventKind {
    NodeStart,
    NodeEnd,
    ToolStart,
    ToolEnd,
    ModelStream,
    ModelEnd,
    ChainStart,
    ChainEnd,
    Unknown,
}

impl AgentEventKind {
    /// Classifies a raw event name by exact, case-sensitive suffix.
    pub fn classify(event_name: &str) -> Self {
        SUFFIXES
            .iter()
            .find(|(suffix, _)| event_name.ends_with(suffix))
            .map(|(_, kind)| *kind)
            .unwrap_or(AgentEventKind::Unknown)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct NodeEvent {
    pub node_name: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolStartEvent {
    pub tool_name: Option<String>,
    pub input: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ToolEndEvent {
    pub tool_name: Option<String>,
    pub output: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelStreamEvent {
    pub chunk: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ModelEndEvent {
    /// Content of the model's message for this step; `None` when absent or null.
    pub output: Option<RawAgentOutput>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ChainEvent {
    pub chain_name: Option<String>,
    pub output: Option<Value>,
}

/// One lifecycle notification from the agent runtime, fully typed.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentEvent {
    NodeStart(NodeEvent),
    NodeEnd(NodeEvent),
    ToolStart(ToolStartEvent),
    ToolEnd(ToolEndEvent),
    ModelStream(ModelStreamEvent),
    ModelEnd(ModelEndEvent),
    ChainStart(ChainEvent),
    ChainEnd(ChainEvent),
    Unknown { event: String },
}

/// Wire shape of an event record: `{"event": ..., "name": ..., "data": {...}}`.
#[derive(Debug, Default)]
struct RawAgentEvent {
    event: Option<String>,
    name: Option<String>,
    data: Option<Value>,
}

impl AgentEvent {
    /// Classifies a loosely typed event record. Never fails: missing or
    /// mistyped fields degrade to `None`, non-mapping records to `Unknown`.
    pub fn from_value(record: &Value) -> Self {
        let raw = match record {
            Value::Object(map) => RawAgentEvent {
                event: map.get("event").and_then(Value::as_str).map(str::to_string),
                name: map.get("name").and_then(Value::as_str).map(str::to_string),
                data: map.get("data").cloned(),
            },
            _ => RawAgentEvent::default(),
        };
        Self::from_raw(raw)
    }

    /// Parses one JSON line into an event.
    pub fn from_json(line: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(line)?;
        Ok(Self::from_value(&value))
    }

    fn from_raw(raw: RawAgentEvent) -> Self {
        let event = raw.event.unwrap_or_default();
        let empty = Map::new();
        let data = raw.data.as_ref().and_then(Value::as_object).unwrap_or(&empty);
        let field = |key: &str| data.get(key).filter(|v| !v.is_null()).cloned();

        match AgentEventKind::classify(&event) {
            AgentEventKind::NodeStart => AgentEvent::NodeStart(node_event(data)),
            AgentEventKind::NodeEnd => AgentEvent::NodeEnd(node_event(data)),
            AgentEventKind::ToolStart => AgentEvent::ToolStart(ToolStartEvent {
                tool_name: raw.name,
                input: field("input"),
            }),
            AgentEventKind::ToolEnd => AgentEvent::ToolEnd(ToolEndEvent {
                tool_name: raw.name,
                output: field("output"),
            }),
            AgentEventKind::ModelStream => AgentEvent::ModelStream(ModelStreamEvent {
                chunk: stream_chunk(data),
            }),
            AgentEventKind::ModelEnd => AgentEvent::ModelEnd(ModelEndEvent {
                output: data.get("output").and_then(RawAgentOutput::from_message),
            }),
            AgentEventKind::ChainStart => AgentEvent::ChainStart(ChainEvent {
                chain_name: raw.name,
                output: None,
            }),
            AgentEventKind::ChainEnd => AgentEvent::ChainEnd(ChainEvent {
                chain_name: raw.name,
                output: field("output"),
            }),
            AgentEventKind::Unknown => AgentEvent::Unknown { event },
        }
    }

    pub fn kind(&self) -> AgentEventKind {
        match self {
            AgentEvent::NodeStart(_) => AgentEventKind::NodeStart,
            AgentEvent::NodeEnd(_) => AgentEventKind::NodeEnd,
            AgentEvent::ToolStart(_) => AgentEventKind::ToolStart,
            AgentEvent::ToolEnd(_) => AgentEventKind::ToolEnd,
            AgentEvent::ModelStream(_) => AgentEventKind::ModelStream,
            AgentEvent::ModelEnd(_) => AgentEventKind::ModelEnd,
            AgentEvent::ChainStart(_) => AgentEventKind::ChainStart,
            AgentEvent::ChainEnd(_) => AgentEventKind::ChainEnd,
            AgentEvent::Unknown { .. } => AgentEventKind::Unknown,
        }
    }
}

impl From<Value> for AgentEvent {
    fn from(record: Value) -> Self {
        AgentEvent::from_value(&record)
    }
}

impl From<&Value> for AgentEvent {
    fn from(record: &Value) -> Self {
        AgentEvent::from_value(record)
    }
}

fn node_event(data: &Map<String, Value>) -> NodeEvent {
    NodeEvent {
        node_name: data
            .get("node_name")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

fn stream_chunk(data: &Map<String, Value>) -> Option<String> {
    if let Some(token) = data.get("token").and_then(Value::as_str) {
        return Some(token.to_string());
    }
    let chunk = data.get("chunk")?;
    // Tool-call deltas carry no user-visible text.
    if chunk.get("tool_calls").is_some_and(|calls| !calls.is_null()) {
        return None;
    }
    let content = message_content(chunk).unwrap_or(chunk);
    let text = RawAgentOutput::from_value(content)?.normalize();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn classification_is_by_exact_suffix() {
        assert_eq!(AgentEventKind::classify("on_tool_start"), AgentEventKind::ToolStart);
        assert_eq!(AgentEventKind::classify("anything_tool_start"), AgentEventKind::ToolStart);
        assert_eq!(AgentEventKind::classify("on_tool_start_x"), AgentEventKind::Unknown);
        assert_eq!(AgentEventKind::classify("ON_TOOL_START"), AgentEventKind::Unknown);
        assert_eq!(AgentEventKind::classify("on_chat_model_end"), AgentEventKind::ModelEnd);
        assert_eq!(AgentEventKind::classify("on_llm_end"), AgentEventKind::Unknown);
        assert_eq!(AgentEventKind::classify(""), AgentEventKind::Unknown);
    }

    #[test]
    fn fields_are_extracted_once() {
        let ev = AgentEvent::from_value(&json!({
            "event": "on_tool_start",
            "name": "mobile_take_screenshot",
            "data": {"input": {"device": "emulator-5554"}}
        }));
        assert_eq!(
            ev,
            AgentEvent::ToolStart(ToolStartEvent {
                tool_name: Some("mobile_take_screenshot".to_string()),
                input: Some(json!({"device": "emulator-5554"})),
            })
        );
    }

    #[test]
    fn malformed_records_degrade() {
        assert_eq!(AgentEvent::from_value(&json!([1, 2])).kind(), AgentEventKind::Unknown);
        assert_eq!(
            AgentEvent::from_value(&json!({"event": "on_tool_end", "data": "oops"})),
            AgentEvent::ToolEnd(ToolEndEvent {
                tool_name: None,
                output: None,
            })
        );
        assert_eq!(
            AgentEvent::from_value(&json!({"event": "graph_node_start"})),
            AgentEvent::NodeStart(NodeEvent { node_name: None })
        );
    }

    #[test]
    fn model_end_reads_message_content() {
        let ev = AgentEvent::from_value(&json!({
            "event": "on_chat_model_end",
            "data": {"output": {"content": [{"type": "text", "text": "opened settings"}]}}
        }));
        let AgentEvent::ModelEnd(end) = ev else {
            panic!("expected model end");
        };
        assert_eq!(end.output.map(|o| o.normalize()).as_deref(), Some("opened settings"));
    }

    #[test]
    fn stream_chunks_skip_tool_call_deltas() {
        let text = AgentEvent::from_value(&json!({
            "event": "on_chat_model_stream",
            "data": {"chunk": {"content": "Tok"}}
        }));
        assert_eq!(
            text,
            AgentEvent::ModelStream(ModelStreamEvent {
                chunk: Some("Tok".to_string())
            })
        );

        let tool = AgentEvent::from_value(&json!({
            "event": "on_chat_model_stream",
            "data": {"chunk": {"content": "", "tool_calls": [{"name": "x"}]}}
        }));
        assert_eq!(tool, AgentEvent::ModelStream(ModelStreamEvent { chunk: None }));
    }
}
