//! Workflow Controller
//!
//! Bounded draft → validate → revise loop:
//!
//! ```text
//! Drafting → Validating → Accepted → Generating → Done
//!                       ↘ Rejected → (attempt < max_retries ? Drafting : Failed)
//! ```
//!
//! Every revision re-drafts the whole outline; the previous verdict only
//! contributes feedback text. Running out of attempts is an ordinary outcome
//! ([`WorkflowOutcome::Exhausted`]); a generation error ends the run and is
//! returned unchanged after being logged once.

use serde::Serialize;
use tracing::{Instrument, debug, error, info_span, warn};

use super::model::{DocumentContent, Outline, ValidationVerdict};
use super::port::GenerationPort;
use super::progress::{ProgressReporter, Stage, WorkflowEvent};
use super::prompts::WorkflowPrompts;
use crate::config::WorkflowConfig;
use crate::constants::workflow::{DEFAULT_MAX_RETRIES, EXHAUSTED_PREFIX};
use crate::types::{DocError, Result, RunId};

// =============================================================================
// Outcome
// =============================================================================

/// How a run ended
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum WorkflowOutcome {
    /// An outline was accepted and expanded into a document
    Completed {
        document: DocumentContent,
        outline: Outline,
        verdict: ValidationVerdict,
        attempts: u32,
    },
    /// Every draft was rejected; no document was generated
    Exhausted {
        outline: Outline,
        verdict: ValidationVerdict,
        attempts: u32,
    },
}

impl WorkflowOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed { .. })
    }

    /// Number of draft/validate cycles performed
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Completed { attempts, .. } | Self::Exhausted { attempts, .. } => *attempts,
        }
    }

    /// The last verdict of the run
    pub fn verdict(&self) -> &ValidationVerdict {
        match self {
            Self::Completed { verdict, .. } | Self::Exhausted { verdict, .. } => verdict,
        }
    }

    /// Plain-text form: the document body, or a failure notice embedding
    /// the last verdict
    pub fn into_text(self) -> String {
        match self {
            Self::Completed { document, .. } => document.content,
            Self::Exhausted { verdict, .. } => {
                format!("{} Last validation: {}", EXHAUSTED_PREFIX, verdict)
            }
        }
    }
}

// =============================================================================
// Loop State
// =============================================================================

/// Outline and the verdict it received in one attempt
#[derive(Debug, Clone)]
struct Draft {
    outline: Outline,
    verdict: ValidationVerdict,
}

/// State threaded through the loop; replaced only after a draft is judged
#[derive(Debug, Default)]
struct WorkflowState {
    /// 0-based index of the attempt in flight
    attempt: u32,
    /// Most recent rejected draft
    last: Option<Draft>,
}

enum Transition {
    Redraft(WorkflowState),
    GiveUp { draft: Draft, attempts: u32 },
}

impl WorkflowState {
    /// Critique from the previous attempt; empty on the first one
    fn feedback(&self) -> String {
        self.last
            .as_ref()
            .map(|d| d.verdict.feedback())
            .unwrap_or_default()
    }

    fn is_revision(&self) -> bool {
        self.attempt > 0
    }

    fn reject(self, draft: Draft, max_retries: u32) -> Transition {
        let attempt = self.attempt + 1;
        if attempt >= max_retries {
            Transition::GiveUp {
                draft,
                attempts: attempt,
            }
        } else {
            Transition::Redraft(WorkflowState {
                attempt,
                last: Some(draft),
            })
        }
    }
}

/// Generation failure tagged with the stage it interrupted
struct StageFailure {
    stage: Stage,
    source: DocError,
}

fn during(stage: Stage) -> impl FnOnce(DocError) -> StageFailure {
    move |source| StageFailure { stage, source }
}

// =============================================================================
// Controller
// =============================================================================

/// Drives one document from topic to validated content
pub struct DocumentWorkflow<P> {
    port: P,
    max_retries: u32,
    progress: ProgressReporter,
}

impl<P: GenerationPort> DocumentWorkflow<P> {
    /// Controller with the default retry budget
    pub fn new(port: P) -> Self {
        Self {
            port,
            max_retries: DEFAULT_MAX_RETRIES,
            progress: ProgressReporter::new(),
        }
    }

    pub fn from_config(port: P, config: &WorkflowConfig) -> Result<Self> {
        Self::new(port).with_max_retries(config.max_retries)
    }

    /// Set the maximum number of outline drafts (must be at least 1)
    pub fn with_max_retries(mut self, max_retries: u32) -> Result<Self> {
        if max_retries == 0 {
            return Err(DocError::InvalidInput(
                "max_retries must be at least 1".to_string(),
            ));
        }
        self.max_retries = max_retries;
        Ok(self)
    }

    /// Share an existing reporter instead of the controller's own
    pub fn with_progress(mut self, progress: ProgressReporter) -> Self {
        self.progress = progress;
        self
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn progress(&self) -> &ProgressReporter {
        &self.progress
    }

    pub fn port(&self) -> &P {
        &self.port
    }

    /// Run the workflow and report how it ended
    pub async fn run(
        &self,
        topic: &str,
        requirements: &str,
        criteria: &str,
    ) -> Result<WorkflowOutcome> {
        for (name, value) in [
            ("topic", topic),
            ("requirements", requirements),
            ("criteria", criteria),
        ] {
            if value.trim().is_empty() {
                return Err(DocError::InvalidInput(format!("{} must not be empty", name)));
            }
        }

        let run_id = RunId::generate();
        let span = info_span!("workflow", run_id = %run_id.short());

        match self
            .drive(&run_id, topic, requirements, criteria)
            .instrument(span)
            .await
        {
            Ok(outcome) => Ok(outcome),
            Err(StageFailure { stage, source }) => {
                error!(run_id = %run_id, %stage, error = %source, "Error in workflow");
                self.progress.emit(WorkflowEvent::Failed {
                    run_id,
                    stage,
                    error: source.to_string(),
                });
                Err(source)
            }
        }
    }

    /// Run the workflow and flatten the outcome to text
    pub async fn run_to_text(
        &self,
        topic: &str,
        requirements: &str,
        criteria: &str,
    ) -> Result<String> {
        Ok(self.run(topic, requirements, criteria).await?.into_text())
    }

    async fn drive(
        &self,
        run_id: &RunId,
        topic: &str,
        requirements: &str,
        criteria: &str,
    ) -> std::result::Result<WorkflowOutcome, StageFailure> {
        let mut state = WorkflowState::default();

        let accepted = loop {
            self.notify(WorkflowEvent::AttemptStarted {
                run_id: run_id.clone(),
                attempt: state.attempt,
                max_retries: self.max_retries,
            });

            let feedback = state.feedback();
            let outline: Outline = self
                .port
                .generate(&WorkflowPrompts::outline(topic, requirements, &feedback))
                .await
                .map_err(during(Stage::Drafting))?;

            self.notify(WorkflowEvent::OutlineDrafted {
                run_id: run_id.clone(),
                attempt: state.attempt,
                sections: outline.len(),
                revised: state.is_revision(),
            });

            let verdict: ValidationVerdict = self
                .port
                .generate(&WorkflowPrompts::validation(&outline, criteria))
                .await
                .map_err(during(Stage::Validating))?;

            self.notify(WorkflowEvent::OutlineValidated {
                run_id: run_id.clone(),
                attempt: state.attempt,
                verdict: verdict.clone(),
            });

            let draft = Draft { outline, verdict };
            if draft.verdict.meets_requirements {
                break (draft, state.attempt + 1);
            }

            warn!(
                attempt = state.attempt + 1,
                missing = draft.verdict.missing_elements.len(),
                "Outline rejected"
            );

            state = match state.reject(draft, self.max_retries) {
                Transition::Redraft(next) => next,
                Transition::GiveUp { draft, attempts } => {
                    self.notify(WorkflowEvent::Exhausted {
                        run_id: run_id.clone(),
                        attempts,
                        verdict: draft.verdict.clone(),
                    });
                    return Ok(WorkflowOutcome::Exhausted {
                        outline: draft.outline,
                        verdict: draft.verdict,
                        attempts,
                    });
                }
            };
        };

        let (Draft { outline, verdict }, attempts) = accepted;

        self.notify(WorkflowEvent::GeneratingDocument {
            run_id: run_id.clone(),
        });

        let document: DocumentContent = self
            .port
            .generate(&WorkflowPrompts::document(&outline, Some(&verdict)))
            .await
            .map_err(during(Stage::Generating))?;

        let uncovered = document.uncovered(&outline);
        if !uncovered.is_empty() {
            warn!(?uncovered, "Document does not report covering every outline section");
        }

        self.notify(WorkflowEvent::Completed {
            run_id: run_id.clone(),
            attempts,
            content_chars: document.content.chars().count(),
        });

        Ok(WorkflowOutcome::Completed {
            document,
            outline,
            verdict,
            attempts,
        })
    }

    fn notify(&self, event: WorkflowEvent) {
        debug!("{}", event.describe());
        self.progress.emit(event);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::model::OutlineSection;
    use crate::workflow::prompts::{FEEDBACK_HEADER, SUGGESTIONS_HEADER};
    use crate::workflow::schema::{Artifact, SchemaLimits, decode};
    use async_trait::async_trait;
    use proptest::prelude::*;
    use serde_json::{Value, json};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Port that replays canned responses and records every request
    #[derive(Default)]
    struct ScriptedPort {
        responses: Mutex<VecDeque<Result<Value>>>,
        calls: Mutex<Vec<(&'static str, String)>>,
    }

    impl ScriptedPort {
        fn new() -> Self {
            Self::default()
        }

        fn then(self, value: Value) -> Self {
            self.responses.lock().unwrap().push_back(Ok(value));
            self
        }

        fn then_fail(self, err: DocError) -> Self {
            self.responses.lock().unwrap().push_back(Err(err));
            self
        }

        fn calls(&self) -> Vec<(&'static str, String)> {
            self.calls.lock().unwrap().clone()
        }

        fn kinds(&self) -> Vec<&'static str> {
            self.calls().into_iter().map(|(kind, _)| kind).collect()
        }
    }

    #[async_trait]
    impl GenerationPort for ScriptedPort {
        async fn generate<A: Artifact>(&self, instructions: &str) -> Result<A> {
            self.calls
                .lock()
                .unwrap()
                .push((A::KIND, instructions.to_string()));
            let next = self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Err(DocError::LlmApi("script exhausted".into())));
            decode(next?, &SchemaLimits::default())
        }
    }

    fn outline(title: &str) -> Value {
        json!([{"title": title, "key_points": ["point"], "subsections": []}])
    }

    fn reject(missing: &[&str], suggestions: &[&str]) -> Value {
        json!({
            "meets_requirements": false,
            "missing_elements": missing,
            "suggestions": suggestions
        })
    }

    fn accept(suggestions: &[&str]) -> Value {
        json!({"meets_requirements": true, "suggestions": suggestions})
    }

    fn document(content: &str, covered: &[&str]) -> Value {
        json!({"content": content, "sections_covered": covered})
    }

    const TOPIC: &str = "AI and cybersecurity";
    const REQS: &str = "- five sections";
    const CRITERIA: &str = "- logical flow";

    #[tokio::test]
    async fn test_accept_on_first_attempt() {
        let port = ScriptedPort::new()
            .then(outline("Intro"))
            .then(accept(&[]))
            .then(document("Full text", &["Intro"]));
        let workflow = DocumentWorkflow::new(port);

        let outcome = workflow.run(TOPIC, REQS, CRITERIA).await.unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(
            workflow.port().kinds(),
            vec!["outline", "validation", "document"]
        );
        assert_eq!(outcome.into_text(), "Full text");
    }

    /// Log sink shared with a test subscriber
    #[derive(Clone, Default)]
    struct LogBuffer(std::sync::Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_progress_not_logged_at_info() {
        let logs = LogBuffer::default();
        let sink = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::INFO)
            .with_ansi(false)
            .with_writer(move || sink.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let port = ScriptedPort::new()
            .then(outline("Intro"))
            .then(accept(&[]))
            .then(document("Full text", &["Intro"]));
        let outcome = DocumentWorkflow::new(port).run(TOPIC, REQS, CRITERIA).await.unwrap();
        assert!(outcome.is_completed());

        let written = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert!(!written.contains("Creating outline"), "{}", written);
    }

    #[tokio::test]
    async fn test_revision_threads_feedback_and_replaces_outline() {
        let port = ScriptedPort::new()
            .then(outline("Draft Zero"))
            .then(reject(&["examples"], &["add case study"]))
            .then(outline("Draft One"))
            .then(accept(&["cite sources"]))
            .then(document("Final document", &["Draft One"]));
        let workflow = DocumentWorkflow::new(port).with_max_retries(2).unwrap();

        let outcome = workflow.run(TOPIC, REQS, CRITERIA).await.unwrap();
        let calls = workflow.port().calls();

        assert_eq!(
            workflow.port().kinds(),
            vec!["outline", "validation", "outline", "validation", "document"]
        );

        // attempt 0 drafts without feedback
        assert!(!calls[0].1.contains(FEEDBACK_HEADER));
        // attempt 1 drafts with the previous critique
        assert!(calls[2].1.contains(FEEDBACK_HEADER));
        assert!(calls[2].1.contains("examples"));
        assert!(calls[2].1.contains("add case study"));
        // validation sees only the fresh outline
        assert!(calls[3].1.contains("Draft One"));
        assert!(!calls[3].1.contains("Draft Zero"));
        assert!(calls[3].1.contains(CRITERIA));
        // document built from the accepted outline and its verdict
        assert!(calls[4].1.contains("Draft One"));
        assert!(!calls[4].1.contains("Draft Zero"));
        assert!(calls[4].1.contains(SUGGESTIONS_HEADER));
        assert!(calls[4].1.contains("cite sources"));

        match outcome {
            WorkflowOutcome::Completed {
                document,
                outline,
                verdict,
                attempts,
            } => {
                assert_eq!(document.content, "Final document");
                assert_eq!(outline.titles(), vec!["Draft One"]);
                assert!(verdict.meets_requirements);
                assert_eq!(attempts, 2);
            }
            other => panic!("expected completion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exhaustion_with_single_attempt() {
        let port = ScriptedPort::new()
            .then(outline("Only draft"))
            .then(reject(&["benefits section"], &["balance coverage"]));
        let workflow = DocumentWorkflow::new(port).with_max_retries(1).unwrap();

        let outcome = workflow.run(TOPIC, REQS, CRITERIA).await.unwrap();

        assert!(!outcome.is_completed());
        assert_eq!(outcome.attempts(), 1);
        assert_eq!(workflow.port().kinds(), vec!["outline", "validation"]);

        let text = outcome.into_text();
        assert!(text.starts_with(EXHAUSTED_PREFIX));
        assert!(text.contains("benefits section"));
        assert!(text.contains("balance coverage"));
    }

    #[tokio::test]
    async fn test_exhaustion_runs_exactly_max_retries_cycles() {
        let mut port = ScriptedPort::new();
        for i in 0..3 {
            port = port
                .then(outline(&format!("Draft {}", i)))
                .then(reject(&[format!("gap {}", i).as_str()], &[]));
        }
        let workflow = DocumentWorkflow::new(port);

        let outcome = workflow.run(TOPIC, REQS, CRITERIA).await.unwrap();
        let kinds = workflow.port().kinds();

        assert_eq!(kinds.len(), 6);
        assert!(!kinds.contains(&"document"));
        assert_eq!(outcome.verdict().missing_elements, vec!["gap 2"]);
        match outcome {
            WorkflowOutcome::Exhausted {
                outline, attempts, ..
            } => {
                assert_eq!(attempts, 3);
                assert_eq!(outline.titles(), vec!["Draft 2"]);
            }
            other => panic!("expected exhaustion, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_accept_on_last_permitted_attempt_still_generates() {
        let port = ScriptedPort::new()
            .then(outline("A"))
            .then(reject(&["x"], &[]))
            .then(outline("B"))
            .then(reject(&["y"], &[]))
            .then(outline("C"))
            .then(accept(&[]))
            .then(document("Done", &["C"]));
        let workflow = DocumentWorkflow::new(port).with_max_retries(3).unwrap();

        let outcome = workflow.run(TOPIC, REQS, CRITERIA).await.unwrap();

        assert!(outcome.is_completed());
        assert_eq!(outcome.attempts(), 3);
        assert_eq!(workflow.port().kinds().last(), Some(&"document"));
    }

    #[tokio::test]
    async fn test_feedback_comes_only_from_previous_attempt() {
        let port = ScriptedPort::new()
            .then(outline("A"))
            .then(reject(&["first gap"], &[]))
            .then(outline("B"))
            .then(reject(&["second gap"], &[]))
            .then(outline("C"))
            .then(accept(&[]))
            .then(document("Done", &[]));
        let workflow = DocumentWorkflow::new(port);

        workflow.run(TOPIC, REQS, CRITERIA).await.unwrap();
        let calls = workflow.port().calls();

        assert!(calls[4].1.contains("second gap"));
        assert!(!calls[4].1.contains("first gap"));
    }

    #[tokio::test]
    async fn test_generation_error_propagates_without_further_calls() {
        let port = ScriptedPort::new()
            .then(outline("A"))
            .then_fail(DocError::LlmApi("upstream rejected request".into()))
            .then(outline("never used"));
        let workflow = DocumentWorkflow::new(port);
        let mut events = workflow.progress().subscribe();

        let err = workflow.run(TOPIC, REQS, CRITERIA).await.unwrap_err();

        assert!(matches!(err, DocError::LlmApi(ref m) if m == "upstream rejected request"));
        assert_eq!(workflow.port().kinds(), vec!["outline", "validation"]);

        let mut failed_stage = None;
        while let Ok(event) = events.try_recv() {
            if let WorkflowEvent::Failed { stage, .. } = event {
                failed_stage = Some(stage);
            }
        }
        assert_eq!(failed_stage, Some(Stage::Validating));
    }

    #[tokio::test]
    async fn test_malformed_document_fails_the_run() {
        let port = ScriptedPort::new()
            .then(outline("A"))
            .then(accept(&[]))
            .then(json!({"content": 42}));
        let workflow = DocumentWorkflow::new(port);

        let err = workflow.run(TOPIC, REQS, CRITERIA).await.unwrap_err();
        assert!(matches!(err, DocError::Schema { artifact: "document", .. }));
    }

    #[tokio::test]
    async fn test_empty_inputs_rejected_before_generation() {
        let workflow = DocumentWorkflow::new(ScriptedPort::new());

        for (topic, reqs, criteria) in [("", REQS, CRITERIA), (TOPIC, " ", CRITERIA), (TOPIC, REQS, "")] {
            let err = workflow.run(topic, reqs, criteria).await.unwrap_err();
            assert!(matches!(err, DocError::InvalidInput(_)));
        }
        assert!(workflow.port().calls().is_empty());
    }

    #[test]
    fn test_zero_max_retries_rejected() {
        let err = DocumentWorkflow::new(ScriptedPort::new())
            .with_max_retries(0)
            .err();
        assert!(matches!(err, Some(DocError::InvalidInput(_))));
        assert_eq!(
            DocumentWorkflow::new(ScriptedPort::new()).max_retries(),
            DEFAULT_MAX_RETRIES
        );
    }

    #[tokio::test]
    async fn test_progress_events_sequence() {
        let port = ScriptedPort::new()
            .then(outline("A"))
            .then(reject(&["gap"], &[]))
            .then(outline("B"))
            .then(accept(&[]))
            .then(document("Done", &["B"]));
        let workflow = DocumentWorkflow::new(port);
        let mut rx = workflow.progress().subscribe();

        workflow.run(TOPIC, REQS, CRITERIA).await.unwrap();

        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        let run_id = events[0].run_id().clone();
        assert!(events.iter().all(|e| e.run_id() == &run_id));
        assert!(matches!(
            events.as_slice(),
            [
                WorkflowEvent::AttemptStarted { attempt: 0, .. },
                WorkflowEvent::OutlineDrafted { revised: false, .. },
                WorkflowEvent::OutlineValidated { attempt: 0, .. },
                WorkflowEvent::AttemptStarted { attempt: 1, .. },
                WorkflowEvent::OutlineDrafted { revised: true, .. },
                WorkflowEvent::OutlineValidated { attempt: 1, .. },
                WorkflowEvent::GeneratingDocument { .. },
                WorkflowEvent::Completed { attempts: 2, .. },
            ]
        ));
    }

    #[tokio::test]
    async fn test_run_to_text_on_exhaustion() {
        let port = ScriptedPort::new()
            .then(outline("A"))
            .then(reject(&["examples"], &["add case study"]));
        let workflow = DocumentWorkflow::new(port).with_max_retries(1).unwrap();

        let text = workflow.run_to_text(TOPIC, REQS, CRITERIA).await.unwrap();
        assert!(text.contains("Last validation"));
        assert!(text.contains("examples"));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = WorkflowOutcome::Exhausted {
            outline: Outline::new(vec![OutlineSection::new("A")]),
            verdict: ValidationVerdict::rejected(["gap"], Vec::<String>::new()),
            attempts: 1,
        };
        let value = serde_json::to_value(&outcome).unwrap();
        assert_eq!(value["status"], "exhausted");
        assert_eq!(value["verdict"]["missing_elements"][0], "gap");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(32))]

        #[test]
        fn prop_cycle_count_matches_first_acceptance(
            max_retries in 1u32..6,
            accept_at in 0u32..8,
        ) {
            let mut port = ScriptedPort::new();
            for i in 0..max_retries {
                port = port.then(outline(&format!("Draft {}", i)));
                if i == accept_at {
                    port = port.then(accept(&[]));
                    break;
                }
                port = port.then(reject(&["gap"], &["more detail"]));
            }
            let port = port.then(document("Done", &[]));
            let workflow = DocumentWorkflow::new(port).with_max_retries(max_retries).unwrap();

            let runtime = tokio::runtime::Builder::new_current_thread().build().unwrap();
            let outcome = runtime.block_on(workflow.run(TOPIC, REQS, CRITERIA)).unwrap();
            let kinds = workflow.port().kinds();

            if accept_at < max_retries {
                prop_assert!(outcome.is_completed());
                prop_assert_eq!(outcome.attempts(), accept_at + 1);
                prop_assert_eq!(kinds.len() as u32, 2 * (accept_at + 1) + 1);
                prop_assert_eq!(kinds.iter().filter(|k| **k == "document").count(), 1);
            } else {
                prop_assert!(!outcome.is_completed());
                prop_assert_eq!(outcome.attempts(), max_retries);
                prop_assert_eq!(kinds.len() as u32, 2 * max_retries);
                prop_assert!(!kinds.contains(&"document"));
            }
        }
    }
}
