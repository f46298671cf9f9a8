//! Model Output Recovery
//!
//! Raw provider text is coerced into JSON here before any schema checks.

pub mod json_repair;

pub use json_repair::{JsonRepairer, Repaired, extract_json_from_response};
