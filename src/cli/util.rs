//! CLI Common Utilities

use std::fs;
use std::path::Path;

use crate::types::{DocError, Result};

/// Resolve a text argument; `@path` reads the file at `path`
pub fn read_input(name: &str, value: &str) -> Result<String> {
    let text = match value.strip_prefix('@') {
        Some(path) => fs::read_to_string(Path::new(path)).map_err(|e| {
            DocError::InvalidInput(format!("Cannot read {} from '{}': {}", name, path, e))
        })?,
        None => value.to_string(),
    };
    if text.trim().is_empty() {
        return Err(DocError::InvalidInput(format!("{} must not be empty", name)));
    }
    Ok(text)
}
