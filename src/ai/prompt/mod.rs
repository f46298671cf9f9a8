//! Prompt Builder
//!
//! Assembles instruction text from ordered sections so every stage of the
//! workflow speaks to the model in the same layout.

/// Prompt section types
#[derive(Debug, Clone)]
pub enum PromptSection {
    /// Role definition with expertise area
    Role { expertise: String, task: String },
    /// Numbered objectives
    Objectives(Vec<String>),
    /// Free text with optional header
    Text {
        header: Option<String>,
        content: String,
    },
    /// Bulleted list under a header
    Bullets { header: String, items: Vec<String> },
}

/// Ordered prompt construction
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    sections: Vec<PromptSection>,
}

impl PromptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn role(mut self, expertise: &str, task: &str) -> Self {
        self.sections.push(PromptSection::Role {
            expertise: expertise.to_string(),
            task: task.to_string(),
        });
        self
    }

    pub fn objectives(mut self, objectives: &[&str]) -> Self {
        self.sections.push(PromptSection::Objectives(
            objectives.iter().map(|o| o.to_string()).collect(),
        ));
        self
    }

    pub fn text(mut self, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: None,
            content: content.to_string(),
        });
        self
    }

    pub fn section(mut self, header: &str, content: &str) -> Self {
        self.sections.push(PromptSection::Text {
            header: Some(header.to_string()),
            content: content.to_string(),
        });
        self
    }

    /// Bulleted list; skipped entirely when `items` is empty
    pub fn bullets<I, S>(mut self, header: &str, items: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let items: Vec<String> = items
            .into_iter()
            .map(|i| i.as_ref().trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();
        if !items.is_empty() {
            self.sections.push(PromptSection::Bullets {
                header: header.to_string(),
                items,
            });
        }
        self
    }

    pub fn build(self) -> String {
        let mut prompt = String::new();

        for section in self.sections {
            match section {
                PromptSection::Role { expertise, task } => {
                    prompt.push_str("<ROLE>\n");
                    prompt.push_str(&format!(
                        "You are an expert {} specializing in {}.\n",
                        expertise, task
                    ));
                    prompt.push_str("</ROLE>\n\n");
                }
                PromptSection::Objectives(objectives) => {
                    prompt.push_str("<OBJECTIVES>\n");
                    for (i, obj) in objectives.iter().enumerate() {
                        prompt.push_str(&format!("{}. {}\n", i + 1, obj));
                    }
                    prompt.push_str("</OBJECTIVES>\n\n");
                }
                PromptSection::Text { header, content } => {
                    if let Some(h) = header {
                        prompt.push_str(&format!("# {}\n\n", h));
                    }
                    prompt.push_str(content.trim());
                    prompt.push_str("\n\n");
                }
                PromptSection::Bullets { header, items } => {
                    prompt.push_str(&format!("# {}\n\n", header));
                    for item in items {
                        prompt.push_str(&format!("- {}\n", item));
                    }
                    prompt.push('\n');
                }
            }
        }

        prompt.trim_end().to_string()
    }
}
