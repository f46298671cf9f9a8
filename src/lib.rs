//! docloop - Outline-First Document Generation
//!
//! Produces long-form documents with a bounded self-correction loop: an
//! outline is drafted, judged against acceptance criteria, and revised from
//! the critique until it is accepted or the retry budget runs out. Only an
//! accepted outline is expanded into the final document.
//!
//! ## Quick Start
//!
//! ```ignore
//! use docloop::{Config, DocumentWorkflow, LlmGenerator, create_provider};
//!
//! let config = Config::default();
//! let provider = create_provider(&config.llm)?;
//! let workflow = DocumentWorkflow::from_config(
//!     LlmGenerator::from_config(provider, &config),
//!     &config.workflow,
//! )?;
//! let text = workflow.run_to_text(topic, requirements, criteria).await?;
//! ```
//!
//! ## Modules
//!
//! - [`workflow`]: controller, generation port, artifact schemas
//! - [`ai`]: LLM providers, prompt assembly, output repair, metrics
//! - [`config`]: layered configuration
//! - [`cli`]: command implementations for the `docloop` binary

pub mod ai;
pub mod cli;
pub mod config;
pub mod constants;
pub mod types;
pub mod workflow;

// =============================================================================
// Core Re-exports
// =============================================================================

pub use config::{Config, ConfigLoader, GenerationConfig, WorkflowConfig};
pub use types::{DocError, ErrorCategory, Result, RunId};

pub use workflow::{
    Artifact, DocumentContent, DocumentWorkflow, GenerationPort, LlmGenerator, Outline,
    OutlineSection, ProgressReporter, ValidationVerdict, WorkflowEvent, WorkflowOutcome,
};

pub use ai::{LlmProvider, MetricsCollector, ProviderConfig, SharedProvider, create_provider};
