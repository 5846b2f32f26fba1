use serde_json::Value;
use thiserror::Error;

/// The agent finished without producing any output value.
///
/// Kept distinct from an empty string so that "the agent returned nothing" can
/// fail an assertion with its own cause.
#[derive(Debug, Clone, Copy, Error, Eq, PartialEq)]
#[error("agent produced no result")]
pub struct NoAgentResult;

/// One typed piece of a multi-part agent output.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// A mapping element, e.g. `{"type": "text", "text": "..."}`.
    Part {
        tag: Option<String>,
        text: Option<String>,
    },
    /// A non-mapping element, already rendered as text.
    Scalar(String),
}

impl Fragment {
    fn from_value(value: &Value) -> Self {
        match value {
            Value::Object(map) => Fragment::Part {
                tag: map.get("type").and_then(Value::as_str).map(str::to_string),
                text: map.get("text").and_then(Value::as_str).map(str::to_string),
            },
            other => Fragment::Scalar(value_text(other)),
        }
    }

    /// Text that belongs in the user-visible answer, if any.
    ///
    /// Parts tagged anything other than `text` (such as `reasoning`) are skipped.
    pub fn answer_text(&self) -> Option<&str> {
        match self {
            Fragment::Part { tag, text } => match tag.as_deref() {
                None | Some("text") => text.as_deref(),
                Some(_) => None,
            },
            Fragment::Scalar(text) => Some(text),
        }
    }
}

/// Raw agent output as produced by the agent runtime.
#[derive(Debug, Clone, PartialEq)]
pub enum RawAgentOutput {
    Text(String),
    Parts(Vec<Fragment>),
    Other(Value),
}

impl RawAgentOutput {
    /// Classifies a JSON value. `null` means the agent produced nothing.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Null => None,
            Value::String(text) => Some(RawAgentOutput::Text(text.clone())),
            Value::Array(items) => Some(RawAgentOutput::Parts(
                items.iter().map(Fragment::from_value).collect(),
            )),
            other => Some(RawAgentOutput::Other(other.clone())),
        }
    }

    /// Extracts the content of a model message.
    ///
    /// Accepts a bare content value, a message object with a `content` field, or
    /// a serialized message constructor carrying `kwargs.content`.
    pub fn from_message(message: &Value) -> Option<Self> {
        if let Some(content) = message_content(message) {
            return Self::from_value(content);
        }
        Self::from_value(message)
    }

    /// Collapses the output into one string. Never fails.
    pub fn normalize(&self) -> String {
        match self {
            RawAgentOutput::Text(text) => text.clone(),
            RawAgentOutput::Parts(parts) => parts
                .iter()
                .filter_map(Fragment::answer_text)
                .collect::<Vec<_>>()
                .join("\n"),
            RawAgentOutput::Other(value) => value_text(value),
        }
    }
}

/// Normalizes an optional agent output, surfacing absence as [`NoAgentResult`].
pub fn normalize(raw: Option<&RawAgentOutput>) -> Result<String, NoAgentResult> {
    raw.map(RawAgentOutput::normalize).ok_or(NoAgentResult)
}

/// Normalizes a JSON output value; `null` maps to [`NoAgentResult`].
pub fn normalize_value(raw: &Value) -> Result<String, NoAgentResult> {
    normalize(RawAgentOutput::from_value(raw).as_ref())
}

pub(crate) fn message_content(message: &Value) -> Option<&Value> {
    let map = message.as_object()?;
    map.get("content").or_else(|| {
        map.get("kwargs")
            .and_then(Value::as_object)
            .and_then(|kwargs| kwargs.get("content"))
    })
}

/// Default textual rendering: strings unquoted, everything else as compact JSON.
pub(crate) fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn plain_string_passes_through() {
        assert_eq!(normalize_value(&json!("hello")), Ok("hello".to_string()));
    }

    #[test]
    fn only_text_parts_are_joined_in_order() {
        let raw = json!([
            {"type": "text", "text": "a"},
            {"type": "reasoning", "text": "ignored"},
            {"type": "text", "text": "b"}
        ]);
        assert_eq!(normalize_value(&raw), Ok("a\nb".to_string()));
    }

    #[test]
    fn none_is_not_an_empty_string() {
        let none = normalize(None);
        let empty = normalize_value(&json!(""));
        assert_eq!(none, Err(NoAgentResult));
        assert_eq!(empty, Ok(String::new()));
        assert_ne!(none, empty);
        assert_eq!(normalize_value(&Value::Null), Err(NoAgentResult));
    }

    #[test]
    fn scalar_elements_are_stringified_and_kept() {
        let raw = json!(["first", 2, {"type": "text", "text": "third"}, {"type": "image_url"}]);
        assert_eq!(normalize_value(&raw), Ok("first\n2\nthird".to_string()));
    }

    #[test]
    fn untagged_parts_with_text_count_as_answer() {
        let raw = json!([{"text": "untagged"}, {"type": "text"}]);
        assert_eq!(normalize_value(&raw), Ok("untagged".to_string()));
    }

    #[test]
    fn other_shapes_fall_back_to_json_text() {
        assert_eq!(normalize_value(&json!(42)), Ok("42".to_string()));
        assert_eq!(
            normalize_value(&json!({"answer": true})),
            Ok("{\"answer\":true}".to_string())
        );
    }

    #[test]
    fn message_content_is_unwrapped() {
        let message = json!({"type": "ai", "content": [{"type": "text", "text": "done"}]});
        let raw = RawAgentOutput::from_message(&message).unwrap();
        assert_eq!(raw.normalize(), "done");

        let serialized = json!({"lc": 1, "type": "constructor", "kwargs": {"content": "hi"}});
        assert_eq!(
            RawAgentOutput::from_message(&serialized),
            Some(RawAgentOutput::Text("hi".to_string()))
        );

        assert_eq!(RawAgentOutput::from_message(&json!({"content": null})), None);
    }
}
