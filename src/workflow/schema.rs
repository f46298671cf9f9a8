//! Artifact Schemas
//!
//! Each artifact the generation port can produce implements [`Artifact`]:
//! a JSON Schema handed to the model for structured output, and a
//! structural check run on the parsed value before it reaches the
//! controller.
//!
//! Schemas follow the structured-output conventions: every object lists its
//! required fields and sets `additionalProperties: false`. Providers that
//! need an object at the top level get the outline wrapped as
//! `{"sections": [...]}` (see [`Artifact::unwrap_response`]).

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};

use super::model::{DocumentContent, Outline, OutlineSection, ValidationVerdict};
use crate::types::{DocError, Result};

/// Structural limits applied by [`Artifact::check`]
#[derive(Debug, Clone, Copy)]
pub struct SchemaLimits {
    pub max_outline_depth: usize,
}

impl Default for SchemaLimits {
    fn default() -> Self {
        Self {
            max_outline_depth: crate::constants::workflow::DEFAULT_MAX_OUTLINE_DEPTH,
        }
    }
}

/// Value the generation port can be asked to produce
pub trait Artifact: DeserializeOwned + Serialize + Send + Sync + 'static {
    /// Short label for logs, metrics and errors
    const KIND: &'static str;

    /// Name passed to providers that require one for structured output
    const SCHEMA_NAME: &'static str;

    /// JSON Schema of the top-level response object
    fn json_schema() -> Value;

    /// Reduce a provider response to the value this type deserializes from
    fn unwrap_response(value: Value) -> Value {
        value
    }

    /// Field constraints the type system does not express
    fn check(&self, limits: &SchemaLimits) -> Result<()>;
}

// =============================================================================
// Outline
// =============================================================================

fn section_schema() -> Value {
    json!({
        "type": "object",
        "required": ["title", "key_points", "subsections"],
        "additionalProperties": false,
        "properties": {
            "title": {"type": "string", "description": "Section title"},
            "key_points": {
                "type": "array",
                "description": "Key points to cover in this section",
                "items": {"type": "string"}
            },
            "subsections": {
                "type": "array",
                "description": "Optional nested subsections",
                "items": {"$ref": "#/$defs/section"}
            }
        }
    })
}

fn check_section(section: &OutlineSection, path: &str, depth: usize, limits: &SchemaLimits) -> Result<()> {
    if section.title.trim().is_empty() {
        return Err(DocError::schema(
            Outline::KIND,
            format!("section {} has an empty title", path),
        ));
    }
    if depth > limits.max_outline_depth {
        return Err(DocError::schema(
            Outline::KIND,
            format!(
                "section {} nests deeper than {} levels",
                path, limits.max_outline_depth
            ),
        ));
    }
    for (idx, sub) in section.subsections.iter().enumerate() {
        check_section(sub, &format!("{}.{}", path, idx + 1), depth + 1, limits)?;
    }
    Ok(())
}

impl Artifact for Outline {
    const KIND: &'static str = "outline";
    const SCHEMA_NAME: &'static str = "document_outline";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "description": "Structured document outline as an ordered list of top-level sections",
            "required": ["sections"],
            "additionalProperties": false,
            "properties": {
                "sections": {
                    "type": "array",
                    "items": {"$ref": "#/$defs/section"}
                }
            },
            "$defs": {"section": section_schema()}
        })
    }

    fn unwrap_response(value: Value) -> Value {
        match value {
            Value::Object(mut map) if map.contains_key("sections") => {
                map.remove("sections").unwrap_or(Value::Null)
            }
            other => other,
        }
    }

    fn check(&self, limits: &SchemaLimits) -> Result<()> {
        if self.is_empty() {
            return Err(DocError::schema(Self::KIND, "outline has no sections"));
        }
        for (idx, section) in self.sections().iter().enumerate() {
            check_section(section, &(idx + 1).to_string(), 1, limits)?;
        }
        Ok(())
    }
}

// =============================================================================
// Validation Verdict
// =============================================================================

impl Artifact for ValidationVerdict {
    const KIND: &'static str = "validation";
    const SCHEMA_NAME: &'static str = "outline_validation";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "description": "Evaluation of an outline against acceptance criteria",
            "required": ["meets_requirements", "missing_elements", "suggestions"],
            "additionalProperties": false,
            "properties": {
                "meets_requirements": {
                    "type": "boolean",
                    "description": "Whether the outline meets all criteria"
                },
                "missing_elements": {
                    "type": "array",
                    "description": "List of missing required elements",
                    "items": {"type": "string"}
                },
                "suggestions": {
                    "type": "array",
                    "description": "Suggestions for improvement",
                    "items": {"type": "string"}
                }
            }
        })
    }

    fn check(&self, _limits: &SchemaLimits) -> Result<()> {
        Ok(())
    }
}

// =============================================================================
// Document
// =============================================================================

impl Artifact for DocumentContent {
    const KIND: &'static str = "document";
    const SCHEMA_NAME: &'static str = "document_content";

    fn json_schema() -> Value {
        json!({
            "type": "object",
            "description": "Complete document written from an approved outline",
            "required": ["content", "sections_covered"],
            "additionalProperties": false,
            "properties": {
                "content": {
                    "type": "string",
                    "description": "The generated document content"
                },
                "sections_covered": {
                    "type": "array",
                    "description": "List of sections covered in the document",
                    "items": {"type": "string"}
                }
            }
        })
    }

    fn check(&self, _limits: &SchemaLimits) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(DocError::schema(Self::KIND, "document content is empty"));
        }
        Ok(())
    }
}

/// Parse a provider response into an artifact and run its structural check
pub fn decode<A: Artifact>(value: Value, limits: &SchemaLimits) -> Result<A> {
    let artifact: A = serde_json::from_value(A::unwrap_response(value))
        .map_err(|e| DocError::schema(A::KIND, e.to_string()))?;
    artifact.check(limits)?;
    Ok(artifact)
}
