//! Drives one agent task: consumes its event stream under a deadline, feeds
//! every event through an [`EventDispatcher`], and remembers the last model
//! output as the task's final answer.

use std::time::Duration;

use futures_core::Stream;
use futures_util::StreamExt;
use thiserror::Error;
use tokio::time;

use crate::clock::Clock;
use crate::dispatcher::EventDispatcher;
use crate::event::AgentEvent;
use crate::output::{self, NoAgentResult, RawAgentOutput};
use crate::sink::{ConsoleSink, ReportSink};

pub const DEFAULT_TASK_DEADLINE: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerConfig {
    /// Applies to each attempt separately.
    pub deadline: Duration,
    /// Zero is treated as one.
    pub max_attempts: u32,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_TASK_DEADLINE,
            max_attempts: 1,
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DriveError {
    #[error("agent task timed out after {deadline:?} ({attempts} attempt(s))")]
    Timeout { deadline: Duration, attempts: u32 },
}

/// Summary of a completed task.
#[derive(Debug, Clone, PartialEq)]
pub struct TaskRun {
    pub attempts: u32,
    pub events_seen: usize,
    /// Output of the last `on_chat_model_end` event of the successful attempt.
    pub final_output: Option<RawAgentOutput>,
}

impl TaskRun {
    pub fn normalized(&self) -> Result<String, NoAgentResult> {
        output::normalize(self.final_output.as_ref())
    }
}

#[derive(Debug, Default)]
struct Progress {
    events_seen: usize,
    final_output: Option<RawAgentOutput>,
}

#[derive(Debug, Clone, Default)]
pub struct TaskRunner {
    config: RunnerConfig,
}

impl TaskRunner {
    pub fn new(config: RunnerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Runs the task, opening a fresh event stream for every attempt.
    ///
    /// The dispatcher's transcript is flushed after every attempt, whether or
    /// not it finished in time.
    pub async fn run<F, S, C, R, K>(
        &self,
        mut open: F,
        dispatcher: &mut EventDispatcher<C, R, K>,
    ) -> Result<TaskRun, DriveError>
    where
        F: FnMut() -> S,
        S: Stream + Unpin,
        S::Item: Into<AgentEvent>,
        C: ConsoleSink,
        R: ReportSink,
        K: Clock,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut events_seen = 0;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut stream = open();
            let mut progress = Progress::default();
            let drained = time::timeout(
                self.config.deadline,
                drain(&mut stream, dispatcher, &mut progress),
            )
            .await;
            events_seen += progress.events_seen;
            dispatcher.flush();

            match drained {
                Ok(()) => {
                    tracing::debug!(attempt, events_seen, "agent task finished");
                    return Ok(TaskRun {
                        attempts: attempt,
                        events_seen,
                        final_output: progress.final_output,
                    });
                }
                Err(_) if attempt < max_attempts => {
                    tracing::warn!(
                        attempt,
                        max_attempts,
                        deadline = ?self.config.deadline,
                        "agent task timed out; retrying"
                    );
                }
                Err(_) => {
                    tracing::warn!(
                        attempt,
                        deadline = ?self.config.deadline,
                        "agent task timed out"
                    );
                    return Err(DriveError::Timeout {
                        deadline: self.config.deadline,
                        attempts: attempt,
                    });
                }
            }
        }
    }
}

async fn drain<S, C, R, K>(
    stream: &mut S,
    dispatcher: &mut EventDispatcher<C, R, K>,
    progress: &mut Progress,
) where
    S: Stream + Unpin,
    S::Item: Into<AgentEvent>,
    C: ConsoleSink,
    R: ReportSink,
    K: Clock,
{
    while let Some(item) = stream.next().await {
        progress.events_seen += 1;
        let event: AgentEvent = item.into();
        if let AgentEvent::ModelEnd(end) = &event {
            // A null output resets the answer: only the last step counts.
            progress.final_output = end.output.clone();
        }
        dispatcher.dispatch(&event);
    }
}
