use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use agent_events::sink::{DirectoryReportSink, MemoryReportSink, WriterConsole};
use agent_events::{
    AgentEvent, ContentType, DispatcherConfig, DriveError, EventDispatcher, EventLogReader,
    OutcomeError, OutcomeExpectation, ReportSink, RunnerConfig, SinkError, TaskRun, TaskRunner,
    Verdict, DEFAULT_MAX_LINE_BYTES,
};
use clap::Parser;
use futures_util::{stream, StreamExt};
use thiserror::Error;

pub const RESULT_ATTACHMENT: &str = "Agent Result";
pub const SUMMARY_ATTACHMENT: &str = "Execution Summary";
pub const SHORT_RESPONSE_ATTACHMENT: &str = "Response Length Warning";
pub const TIMEOUT_ATTACHMENT: &str = "Timeout Error";
pub const FAILURE_ATTACHMENT: &str = "Execution Error";

#[derive(Debug, Parser)]
pub struct Args {
    /// Recorded event stream, one `{"event", "name", "data"}` JSON object per line.
    #[arg(long)]
    pub events: PathBuf,

    /// Write attachments, `attachments.jsonl` and `environment.properties` here.
    #[arg(long)]
    pub results_dir: Option<PathBuf>,

    /// Also render chain start/end events.
    #[arg(long)]
    pub verbose: bool,

    /// Render streamed model tokens.
    #[arg(long)]
    pub stream_tokens: bool,

    /// Substring the final result must contain.
    #[arg(long)]
    pub expect: Option<String>,

    /// Match `--expect` case-sensitively.
    #[arg(long)]
    pub case_sensitive: bool,

    #[arg(long, default_value_t = DEFAULT_MAX_LINE_BYTES)]
    pub max_line_bytes: usize,

    /// Report environment property, `key=value`. Repeatable.
    #[arg(long = "env", value_parser = parse_property)]
    pub env: Vec<(String, String)>,

    /// Extra file to attach (e.g. a screenshot). Repeatable.
    #[arg(long = "attach")]
    pub attachments: Vec<PathBuf>,

    /// Task label used in the execution summary; defaults to the events file name.
    #[arg(long)]
    pub task: Option<String>,

    /// Replay deadline in seconds.
    #[arg(long, default_value_t = 30)]
    pub deadline_secs: u64,

    /// Delay before each replayed event, in milliseconds, to mimic a live agent.
    #[arg(long, default_value_t = 0)]
    pub pace_ms: u64,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("report sink failed: {0}")]
    Sink(#[from] SinkError),
    #[error(transparent)]
    Drive(#[from] DriveError),
    #[error(transparent)]
    Outcome(#[from] OutcomeError),
}

#[derive(Debug)]
pub struct RunReport {
    pub run: TaskRun,
    pub verdict: Verdict,
    pub malformed_lines: usize,
}

fn parse_property(raw: &str) -> Result<(String, String), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))?;
    let key = key.trim();
    if key.is_empty() {
        return Err(format!("empty property key in `{raw}`"));
    }
    Ok((key.to_string(), value.trim().to_string()))
}

fn read_events(args: &Args) -> Result<(Vec<AgentEvent>, usize), ReplayError> {
    let file = File::open(&args.events).map_err(|source| ReplayError::Read {
        path: args.events.clone(),
        source,
    })?;
    let mut events = Vec::new();
    let mut malformed = 0;
    for record in EventLogReader::with_max_line_bytes(file, args.max_line_bytes) {
        match record.outcome {
            Ok(event) => events.push(event),
            Err(err) => {
                malformed += 1;
                tracing::warn!(
                    line = record.line_number,
                    error = %err,
                    excerpt = err.excerpt().unwrap_or_default(),
                    "skipping event line"
                );
            }
        }
    }
    Ok((events, malformed))
}

fn report_sink(args: &Args) -> Result<Box<dyn ReportSink>, ReplayError> {
    let Some(dir) = args.results_dir.as_ref() else {
        return Ok(Box::new(MemoryReportSink::new()));
    };
    let sink = DirectoryReportSink::create(dir)?;
    if !args.env.is_empty() {
        sink.write_environment(args.env.iter().map(|(k, v)| (k, v)))?;
    }
    Ok(Box::new(sink))
}

fn attachment_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

pub async fn run(args: Args) -> Result<RunReport, ReplayError> {
    let (events, malformed_lines) = read_events(&args)?;
    tracing::debug!(events = events.len(), malformed_lines, "event log ingested");

    let config = DispatcherConfig {
        verbose: args.verbose,
        stream_tokens: args.stream_tokens,
        ..DispatcherConfig::default()
    };
    let mut dispatcher =
        EventDispatcher::new(config, WriterConsole::stdout(), report_sink(&args)?);

    let runner = TaskRunner::new(RunnerConfig {
        deadline: Duration::from_secs(args.deadline_secs),
        max_attempts: 1,
    });
    let pace = Duration::from_millis(args.pace_ms);
    let started = Instant::now();
    let replay = || {
        stream::iter(events.clone())
            .then(move |event| async move {
                if !pace.is_zero() {
                    tokio::time::sleep(pace).await;
                }
                event
            })
            .boxed()
    };
    let run = match runner.run(replay, &mut dispatcher).await {
        Ok(run) => run,
        Err(err) => {
            let DriveError::Timeout { deadline, .. } = &err;
            let message = format!("Task execution timed out after {deadline:?}");
            dispatcher.attach(TIMEOUT_ATTACHMENT, message.as_bytes(), ContentType::Text);
            return Err(err.into());
        }
    };
    let elapsed = started.elapsed();

    let expectation = OutcomeExpectation {
        expected_substring: args.expect.clone(),
        ignore_case: !args.case_sensitive,
        ..OutcomeExpectation::default()
    };
    let verdict = match expectation.verify(run.normalized()) {
        Ok(verdict) => verdict,
        Err(err) => {
            let message = format!("Task execution failed: {err}");
            dispatcher.attach(FAILURE_ATTACHMENT, message.as_bytes(), ContentType::Text);
            return Err(err.into());
        }
    };
    for warning in &verdict.warnings {
        tracing::warn!("{warning}");
        let message = format!("Warning: {warning}: '{}'", verdict.result);
        dispatcher.attach(SHORT_RESPONSE_ATTACHMENT, message.as_bytes(), ContentType::Text);
    }

    dispatcher.attach(RESULT_ATTACHMENT, verdict.result.as_bytes(), ContentType::Text);
    let task = args
        .task
        .clone()
        .unwrap_or_else(|| attachment_name(&args.events));
    let summary = format!(
        "Task: {task}\nDuration: {:.2} seconds\nResult Length: {} characters\n\
         Events: {}\nMalformed Lines: {malformed_lines}",
        elapsed.as_secs_f64(),
        verdict.result.chars().count(),
        run.events_seen,
    );
    dispatcher.attach(SUMMARY_ATTACHMENT, summary.as_bytes(), ContentType::Text);

    for path in &args.attachments {
        let body = fs::read(path).map_err(|source| ReplayError::Read {
            path: path.clone(),
            source,
        })?;
        let content_type = ContentType::sniff(Some(path.as_path()), &body);
        dispatcher.attach(&attachment_name(path), &body, content_type);
    }

    Ok(RunReport {
        run,
        verdict,
        malformed_lines,
    })
}
