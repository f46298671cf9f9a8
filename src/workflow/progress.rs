//! Workflow Progress Events
//!
//! Out-of-band notices about a run: which attempt is in flight, what each
//! stage produced, how the run ended. Nothing in the controller's contract
//! depends on these; with no subscriber attached they are dropped.

use std::fmt;
use tokio::sync::broadcast;

use super::model::ValidationVerdict;
use crate::constants::workflow::PROGRESS_CHANNEL_CAPACITY;
use crate::types::RunId;

/// Generation step in flight when a run fails
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Drafting,
    Validating,
    Generating,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Drafting => "drafting",
            Self::Validating => "validating",
            Self::Generating => "generating",
        };
        f.write_str(name)
    }
}

/// Progress event types
#[derive(Debug, Clone, PartialEq)]
pub enum WorkflowEvent {
    /// A draft/validate cycle began (`attempt` is 0-based)
    AttemptStarted {
        run_id: RunId,
        attempt: u32,
        max_retries: u32,
    },
    /// The generator returned an outline
    OutlineDrafted {
        run_id: RunId,
        attempt: u32,
        sections: usize,
        revised: bool,
    },
    /// The generator returned a verdict for the current outline
    OutlineValidated {
        run_id: RunId,
        attempt: u32,
        verdict: ValidationVerdict,
    },
    /// Final document generation started
    GeneratingDocument { run_id: RunId },
    /// Run produced a document
    Completed {
        run_id: RunId,
        attempts: u32,
        content_chars: usize,
    },
    /// Retry budget ran out without an accepted outline
    Exhausted {
        run_id: RunId,
        attempts: u32,
        verdict: ValidationVerdict,
    },
    /// A generation call failed during `stage`
    Failed {
        run_id: RunId,
        stage: Stage,
        error: String,
    },
}

impl WorkflowEvent {
    pub fn run_id(&self) -> &RunId {
        match self {
            Self::AttemptStarted { run_id, .. }
            | Self::OutlineDrafted { run_id, .. }
            | Self::OutlineValidated { run_id, .. }
            | Self::GeneratingDocument { run_id }
            | Self::Completed { run_id, .. }
            | Self::Exhausted { run_id, .. }
            | Self::Failed { run_id, .. } => run_id,
        }
    }

    /// Last event of a run
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Completed { .. } | Self::Exhausted { .. } | Self::Failed { .. }
        )
    }

    /// Human-readable one-liner for console output
    pub fn describe(&self) -> String {
        match self {
            Self::AttemptStarted {
                attempt,
                max_retries,
                ..
            } => format!(
                "Attempt {}/{}: {} outline...",
                attempt + 1,
                max_retries,
                if *attempt == 0 { "Creating" } else { "Revising" }
            ),
            Self::OutlineDrafted {
                sections, revised, ..
            } => format!(
                "{} outline created ({} top-level sections)",
                if *revised { "Revised" } else { "Initial" },
                sections
            ),
            Self::OutlineValidated { verdict, .. } if verdict.meets_requirements => {
                "Outline meets all requirements".to_string()
            }
            Self::OutlineValidated { verdict, .. } => format!(
                "Outline rejected: {} missing, {} suggestions",
                verdict.missing_elements.len(),
                verdict.suggestions.len()
            ),
            Self::GeneratingDocument { .. } => "Generating final document...".to_string(),
            Self::Completed {
                attempts,
                content_chars,
                ..
            } => format!(
                "Document generated after {} attempt(s) ({} chars)",
                attempts, content_chars
            ),
            Self::Exhausted { attempts, .. } => format!(
                "Failed to create satisfactory outline after {} attempts",
                attempts
            ),
            Self::Failed { stage, error, .. } => {
                format!("Error in workflow while {}: {}", stage, error)
            }
        }
    }
}

/// Broadcasts [`WorkflowEvent`]s to any number of subscribers
#[derive(Clone)]
pub struct ProgressReporter {
    sender: broadcast::Sender<WorkflowEvent>,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(PROGRESS_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<WorkflowEvent> {
        self.sender.subscribe()
    }

    /// Send an event; discarded when nobody is listening
    #[inline]
    pub fn emit(&self, event: WorkflowEvent) {
        let _ = self.sender.send(event);
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emit_without_subscribers_is_silent() {
        let reporter = ProgressReporter::new();
        reporter.emit(WorkflowEvent::GeneratingDocument {
            run_id: RunId::new("r"),
        });
    }

    #[tokio::test]
    async fn test_subscriber_receives_events_in_order() {
        let reporter = ProgressReporter::new();
        let mut rx = reporter.subscribe();
        let run_id = RunId::new("run-1");

        reporter.emit(WorkflowEvent::AttemptStarted {
            run_id: run_id.clone(),
            attempt: 0,
            max_retries: 3,
        });
        reporter.emit(WorkflowEvent::GeneratingDocument {
            run_id: run_id.clone(),
        });

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, WorkflowEvent::AttemptStarted { attempt: 0, .. }));
        assert_eq!(first.run_id(), &run_id);
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, WorkflowEvent::GeneratingDocument { .. }));
    }

    #[test]
    fn test_describe_attempts() {
        let run_id = RunId::new("r");
        let first = WorkflowEvent::AttemptStarted {
            run_id: run_id.clone(),
            attempt: 0,
            max_retries: 3,
        };
        assert_eq!(first.describe(), "Attempt 1/3: Creating outline...");

        let second = WorkflowEvent::AttemptStarted {
            run_id,
            attempt: 1,
            max_retries: 3,
        };
        assert_eq!(second.describe(), "Attempt 2/3: Revising outline...");
    }

    #[test]
    fn test_terminal_events() {
        let run_id = RunId::new("r");
        let failed = WorkflowEvent::Failed {
            run_id: run_id.clone(),
            stage: Stage::Validating,
            error: "boom".into(),
        };
        assert!(failed.is_terminal());
        assert!(failed.describe().contains("validating"));
        assert!(!WorkflowEvent::GeneratingDocument { run_id }.is_terminal());
    }
}
