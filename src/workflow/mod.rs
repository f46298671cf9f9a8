//! Document Workflow
//!
//! Draft an outline, have it judged against acceptance criteria, revise it
//! from the critique for a bounded number of attempts, then expand the
//! accepted outline into a full document.
//!
//! - [`controller`]: the bounded draft/validate/revise loop
//! - [`port`]: the generation capability the controller depends on
//! - [`generator`]: production port backed by an LLM provider
//! - [`schema`]: JSON Schemas and structural checks per artifact
//! - [`prompts`]: instruction text for each stage
//! - [`progress`]: broadcast run events

pub mod controller;
pub mod generator;
pub mod model;
pub mod port;
pub mod progress;
pub mod prompts;
pub mod schema;

pub use controller::{DocumentWorkflow, WorkflowOutcome};
pub use generator::LlmGenerator;
pub use model::{DocumentContent, Outline, OutlineSection, ValidationVerdict};
pub use port::GenerationPort;
pub use progress::{ProgressReporter, Stage, WorkflowEvent};
pub use prompts::WorkflowPrompts;
pub use schema::{Artifact, SchemaLimits};
