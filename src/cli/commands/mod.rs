pub mod config;
pub mod run;

pub use run::{OutputFormat, RunOptions, RunStatus};
