//! Assertions over a task's normalized result.

use std::fmt;

use thiserror::Error;

use crate::output::NoAgentResult;

pub const DEFAULT_FAILURE_INDICATORS: &[&str] = &[
    "failed",
    "error",
    "cannot",
    "unable",
    "not found",
    "timed out",
    "aborted",
    "unsuccessful",
    "could not",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutcomeExpectation {
    pub expected_substring: Option<String>,
    pub ignore_case: bool,
    pub failure_indicators: Vec<String>,
    /// Trimmed results shorter than this earn a [`OutcomeWarning::ShortResponse`].
    pub min_detail_chars: usize,
}

impl Default for OutcomeExpectation {
    fn default() -> Self {
        Self {
            expected_substring: None,
            ignore_case: true,
            failure_indicators: DEFAULT_FAILURE_INDICATORS
                .iter()
                .map(|s| s.to_string())
                .collect(),
            min_detail_chars: 20,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OutcomeWarning {
    ShortResponse { chars: usize },
}

impl fmt::Display for OutcomeWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutcomeWarning::ShortResponse { chars } => write!(
                f,
                "short agent response ({chars} chars); \
                 the task may not have been completed in detail"
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Verdict {
    pub result: String,
    pub warnings: Vec<OutcomeWarning>,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum OutcomeError {
    #[error("agent returned no result")]
    NoResult,
    #[error("agent returned an empty result")]
    Empty,
    #[error("task failed with indicator `{indicator}` in response: `{result}`")]
    FailureIndicator { indicator: String, result: String },
    #[error("expected `{expected}` not found in agent result: `{result}`")]
    MissingSubstring { expected: String, result: String },
}

impl From<NoAgentResult> for OutcomeError {
    fn from(_: NoAgentResult) -> Self {
        OutcomeError::NoResult
    }
}

impl OutcomeExpectation {
    pub fn expecting(substring: impl Into<String>) -> Self {
        Self {
            expected_substring: Some(substring.into()),
            ..Self::default()
        }
    }

    pub fn verify(
        &self,
        normalized: Result<String, NoAgentResult>,
    ) -> Result<Verdict, OutcomeError> {
        let result = normalized?;
        let trimmed_chars = result.trim().chars().count();
        if trimmed_chars == 0 {
            return Err(OutcomeError::Empty);
        }

        if let Some(expected) = self.expected_substring.as_deref() {
            let lower = result.to_lowercase();
            let expected_lower = expected.to_lowercase();
            // Indicators only matter when the expected text is also missing.
            if !lower.contains(&expected_lower) {
                if let Some(indicator) = self
                    .failure_indicators
                    .iter()
                    .find(|indicator| lower.contains(&indicator.to_lowercase()))
                {
                    return Err(OutcomeError::FailureIndicator {
                        indicator: indicator.clone(),
                        result,
                    });
                }
            }

            let found = if self.ignore_case {
                lower.contains(&expected_lower)
            } else {
                result.contains(expected)
            };
            if !found {
                return Err(OutcomeError::MissingSubstring {
                    expected: expected.to_string(),
                    result,
                });
            }
        }

        let mut warnings = Vec::new();
        if trimmed_chars < self.min_detail_chars {
            warnings.push(OutcomeWarning::ShortResponse {
                chars: trimmed_chars,
            });
        }
        Ok(Verdict { result, warnings })
    }
}
