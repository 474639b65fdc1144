//! Lifecycle of a queued cleanup job.
//!
//! Transitions are pure: [`JobState::on`] takes the current state, an event
//! and the elapsed time since submission, and returns the next state. The
//! client drives the I/O and feeds the results back in.

use std::time::Duration;

/// Where to ask about a submitted job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub request_id: Option<String>,
    pub status_url: String,
    /// Fetched once the job completes; derived from the status URL when the queue omits it.
    pub response_url: Option<String>,
}

/// A status string as reported by the queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueueStatus {
    InQueue,
    InProgress,
    Completed,
    Failed(Option<String>),
    Unknown(String),
}

impl QueueStatus {
    pub fn parse(status: &str, error: Option<String>) -> Self {
        match status {
            "IN_QUEUE" => Self::InQueue,
            "IN_PROGRESS" => Self::InProgress,
            "COMPLETED" => Self::Completed,
            "FAILED" | "ERROR" => Self::Failed(error),
            other => Self::Unknown(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobEvent {
    Submitted(JobHandle),
    StatusReported(QueueStatus),
    /// A transient failure while asking for the status.
    PollFailed(String),
}

#[derive(Debug, Clone, PartialEq)]
pub enum JobState {
    Submitting,
    Polling {
        handle: JobHandle,
        polls: u32,
        consecutive_failures: u32,
    },
    Completed(JobHandle),
    Failed(String),
    TimedOut(Duration),
}

/// Bounds on how long and how flakily a job may be polled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PollLimits {
    pub timeout: Duration,
    pub max_consecutive_failures: u32,
}

impl JobState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed(_) | Self::Failed(_) | Self::TimedOut(_))
    }

    pub fn on(self, event: JobEvent, elapsed: Duration, limits: &PollLimits) -> JobState {
        if self.is_terminal() {
            return self;
        }
        if elapsed > limits.timeout {
            return Self::TimedOut(elapsed);
        }

        match (self, event) {
            (Self::Submitting, JobEvent::Submitted(handle)) => Self::Polling {
                handle,
                polls: 0,
                consecutive_failures: 0,
            },
            (Self::Polling { handle, polls, .. }, JobEvent::StatusReported(status)) => {
                match status {
                    QueueStatus::InQueue | QueueStatus::InProgress => Self::Polling {
                        handle,
                        polls: polls + 1,
                        consecutive_failures: 0,
                    },
                    QueueStatus::Completed => Self::Completed(handle),
                    QueueStatus::Failed(error) => {
                        Self::Failed(error.unwrap_or_else(|| "Unknown error".to_string()))
                    }
                    QueueStatus::Unknown(status) => {
                        Self::Failed(format!("unknown job status {status:?}"))
                    }
                }
            }
            (
                Self::Polling { handle, polls, consecutive_failures },
                JobEvent::PollFailed(reason),
            ) => {
                let failures = consecutive_failures + 1;
                if failures >= limits.max_consecutive_failures {
                    Self::Failed(format!(
                        "status polling failed {failures} times in a row: {reason}"
                    ))
                } else {
                    Self::Polling { handle, polls: polls + 1, consecutive_failures: failures }
                }
            }
            // Events that don't apply to the current state leave it unchanged.
            (state, _) => state,
        }
    }
}
