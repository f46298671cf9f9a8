//! Workflow Artifacts
//!
//! The three values exchanged with the generation port: the outline being
//! drafted, the verdict judging it, and the final document.

use serde::{Deserialize, Serialize};
use std::fmt;

// =============================================================================
// Outline
// =============================================================================

/// One node of an outline tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutlineSection {
    /// Section title
    pub title: String,
    /// Key points to cover in this section
    pub key_points: Vec<String>,
    /// Nested subsections
    #[serde(default)]
    pub subsections: Vec<OutlineSection>,
}

impl OutlineSection {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            key_points: Vec::new(),
            subsections: Vec::new(),
        }
    }

    pub fn with_points<I, S>(mut self, points: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.key_points.extend(points.into_iter().map(Into::into));
        self
    }

    pub fn with_subsection(mut self, section: OutlineSection) -> Self {
        self.subsections.push(section);
        self
    }

    /// Nesting depth of this node (a leaf has depth 1)
    pub fn depth(&self) -> usize {
        1 + self
            .subsections
            .iter()
            .map(OutlineSection::depth)
            .max()
            .unwrap_or(0)
    }

    /// Number of nodes in this subtree, including itself
    pub fn node_count(&self) -> usize {
        1 + self
            .subsections
            .iter()
            .map(OutlineSection::node_count)
            .sum::<usize>()
    }

    fn render_into(&self, out: &mut String, level: usize) {
        let indent = "  ".repeat(level);
        out.push_str(&format!("{}- {}\n", indent, self.title));
        for point in &self.key_points {
            out.push_str(&format!("{}    * {}\n", indent, point));
        }
        for sub in &self.subsections {
            sub.render_into(out, level + 1);
        }
    }
}

/// Ordered forest of top-level sections
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Outline(pub Vec<OutlineSection>);

impl Outline {
    pub fn new(sections: Vec<OutlineSection>) -> Self {
        Self(sections)
    }

    pub fn sections(&self) -> &[OutlineSection] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of top-level sections
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Deepest nesting across the forest (0 for an empty outline)
    pub fn depth(&self) -> usize {
        self.0.iter().map(OutlineSection::depth).max().unwrap_or(0)
    }

    /// Total sections at every level
    pub fn node_count(&self) -> usize {
        self.0.iter().map(OutlineSection::node_count).sum()
    }

    /// Top-level titles, in order
    pub fn titles(&self) -> Vec<&str> {
        self.0.iter().map(|s| s.title.as_str()).collect()
    }

    /// Indented plain-text rendering used inside prompts
    pub fn render(&self) -> String {
        let mut out = String::new();
        for section in &self.0 {
            section.render_into(&mut out, 0);
        }
        out
    }
}

impl fmt::Display for Outline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.render().trim_end())
    }
}

// =============================================================================
// Validation Verdict
// =============================================================================

/// Judgment of an outline against the caller's acceptance criteria
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationVerdict {
    /// Whether the outline meets all criteria
    pub meets_requirements: bool,
    /// Required elements the outline lacks
    #[serde(default)]
    pub missing_elements: Vec<String>,
    /// Suggestions for improvement
    #[serde(default)]
    pub suggestions: Vec<String>,
}

impl ValidationVerdict {
    pub fn accepted() -> Self {
        Self {
            meets_requirements: true,
            ..Self::default()
        }
    }

    pub fn rejected<M, S>(missing: M, suggestions: S) -> Self
    where
        M: IntoIterator,
        M::Item: Into<String>,
        S: IntoIterator,
        S::Item: Into<String>,
    {
        Self {
            meets_requirements: false,
            missing_elements: missing.into_iter().map(Into::into).collect(),
            suggestions: suggestions.into_iter().map(Into::into).collect(),
        }
    }

    /// Critique threaded into the next draft: missing elements first, then
    /// suggestions, one per line. Empty when the verdict carries neither.
    pub fn feedback(&self) -> String {
        self.missing_elements
            .iter()
            .chain(self.suggestions.iter())
            .map(|item| item.trim())
            .filter(|item| !item.is_empty())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for ValidationVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "meets_requirements={} missing_elements=[{}] suggestions=[{}]",
            self.meets_requirements,
            self.missing_elements.join("; "),
            self.suggestions.join("; ")
        )
    }
}

// =============================================================================
// Document
// =============================================================================

/// Final generated document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentContent {
    /// Full document body
    pub content: String,
    /// Sections the document addresses
    pub sections_covered: Vec<String>,
}

impl DocumentContent {
    pub fn new(content: impl Into<String>, sections_covered: Vec<String>) -> Self {
        Self {
            content: content.into(),
            sections_covered,
        }
    }

    /// Outline top-level titles the document does not report covering
    pub fn uncovered<'a>(&self, outline: &'a Outline) -> Vec<&'a str> {
        outline
            .titles()
            .into_iter()
            .filter(|title| {
                !self
                    .sections_covered
                    .iter()
                    .any(|covered| covered.trim().eq_ignore_ascii_case(title.trim()))
            })
            .collect()
    }
}
