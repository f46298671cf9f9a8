//! Instruction text for each workflow stage.

use super::model::{Outline, ValidationVerdict};
use crate::ai::prompt::PromptBuilder;

/// Header introducing critique from the previous attempt
pub const FEEDBACK_HEADER: &str = "Previous feedback to address";

/// Header introducing verdict suggestions in document instructions
pub const SUGGESTIONS_HEADER: &str = "Please incorporate these suggestions";

pub struct WorkflowPrompts;

impl WorkflowPrompts {
    /// Instructions for drafting (or re-drafting) the outline.
    ///
    /// `feedback` is appended under [`FEEDBACK_HEADER`] only when non-blank.
    pub fn outline(topic: &str, requirements: &str, feedback: &str) -> String {
        let mut builder = PromptBuilder::new()
            .role("technical writer", "structuring long-form documents")
            .objectives(&[
                "Create a structured document outline for the topic",
                "Satisfy every stated requirement",
                "Give each section concrete key points, nesting subsections where useful",
            ])
            .section("Topic", topic)
            .section("Requirements", requirements);

        if !feedback.trim().is_empty() {
            builder = builder.section(FEEDBACK_HEADER, feedback);
        }

        builder.build()
    }

    /// Instructions for judging an outline against acceptance criteria
    pub fn validation(outline: &Outline, criteria: &str) -> String {
        PromptBuilder::new()
            .role("editorial reviewer", "evaluating document outlines")
            .text("Evaluate this outline against the following criteria.")
            .section("Criteria", criteria)
            .section("Outline to evaluate", &outline.render())
            .text(
                "Set meets_requirements to true only if every criterion is satisfied. \
                 List each unmet criterion in missing_elements and give actionable suggestions.",
            )
            .build()
    }

    /// Instructions for writing the final document from an approved outline
    pub fn document(outline: &Outline, verdict: Option<&ValidationVerdict>) -> String {
        let suggestions = verdict.map(|v| v.suggestions.as_slice()).unwrap_or_default();

        PromptBuilder::new()
            .role("technical writer", "long-form documents")
            .text("Write a complete document following this outline.")
            .section("Outline", &outline.render())
            .text("Ensure each section addresses all key points listed.")
            .bullets(SUGGESTIONS_HEADER, suggestions)
            .build()
    }
}
