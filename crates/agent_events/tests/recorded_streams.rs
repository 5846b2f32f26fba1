use std::fs::File;
use std::path::PathBuf;

use agent_events::sink::{MemoryReportSink, WriterConsole};
use agent_events::{
    normalize, AgentEvent, AgentEventKind, DispatcherConfig, EventDispatcher, EventLogReader,
    LineRecordError, NoAgentResult, OutcomeError, OutcomeExpectation,
};

fn fixture(name: &str) -> File {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures/events/v1")
        .join(name);
    File::open(path).expect("open fixture")
}

fn last_model_output(events: &[AgentEvent]) -> Result<String, NoAgentResult> {
    let last = events.iter().rev().find_map(|event| match event {
        AgentEvent::ModelEnd(end) => Some(end.output.as_ref()),
        _ => None,
    });
    normalize(last.flatten())
}

#[test]
fn damaged_log_keeps_every_readable_event() {
    let records: Vec<_> = EventLogReader::new(fixture("damaged.jsonl")).collect();

    let lines: Vec<_> = records.iter().map(|r| r.line_number).collect();
    assert_eq!(lines, [1, 3, 4, 5, 6]);
    assert!(matches!(records[1].outcome, Err(LineRecordError::Json { .. })));
    assert_eq!(
        records[1].outcome.as_ref().unwrap_err().excerpt(),
        Some(r#"{"event":"on_tool_end","name":"mobile_list_apps","data":"#)
    );

    let events: Vec<_> = records.into_iter().filter_map(|r| r.outcome.ok()).collect();
    let kinds: Vec<_> = events.iter().map(AgentEvent::kind).collect();
    assert_eq!(
        kinds,
        [
            AgentEventKind::ToolStart,
            AgentEventKind::ToolEnd,
            AgentEventKind::Unknown,
            AgentEventKind::ModelEnd,
        ]
    );

    let result = last_model_output(&events);
    assert_eq!(result, Err(NoAgentResult));
    assert_eq!(
        OutcomeExpectation::default().verify(result),
        Err(OutcomeError::NoResult)
    );
}

#[test]
fn recorded_run_passes_its_expectation() {
    let events: Vec<_> = EventLogReader::new(fixture("wifi_toggle.jsonl"))
        .filter_map(|r| r.outcome.ok())
        .collect();
    assert_eq!(events.len(), 11);

    let mut dispatcher = EventDispatcher::new(
        DispatcherConfig {
            stream_tokens: true,
            ..DispatcherConfig::default()
        },
        WriterConsole::new(Vec::new()),
        MemoryReportSink::new(),
    );
    for event in &events {
        dispatcher.dispatch(event);
    }
    let streamed: Vec<_> = dispatcher
        .log()
        .records()
        .iter()
        .filter(|r| r.message.starts_with("[MODEL:STREAM]"))
        .map(|r| r.message.as_str())
        .collect();
    assert_eq!(streamed, ["[MODEL:STREAM] Wi-Fi ", "[MODEL:STREAM] enabled"]);

    let (console, _, _) = dispatcher.into_parts();
    let printed = String::from_utf8(console.into_inner()).unwrap();
    assert_eq!(
        printed.lines().collect::<Vec<_>>(),
        [
            r#"⚙ [TOOL:START] mobile_use_device args={"device":"emulator-5554"}"#,
            "✔ [TOOL:END] mobile_use_device output=Selected device emulator-5554",
            "⛓ [CHAIN:END] should_continue, tools",
            "… [MODEL:STREAM] Wi-Fi ",
            "… [MODEL:STREAM] enabled",
            "💬 [MODEL:END] Wi-Fi has been enabled in Settings.",
        ]
    );

    let verdict = OutcomeExpectation::expecting("wi-fi has been enabled")
        .verify(last_model_output(&events))
        .unwrap();
    assert_eq!(verdict.result, "Wi-Fi has been enabled in Settings.");
    assert!(verdict.warnings.is_empty());
}
