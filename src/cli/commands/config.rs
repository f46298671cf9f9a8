//! Config Command
//!
//! Usage:
//!   docloop config show [-f json]
//!   docloop config path
//!   docloop config init [-g] [--force]

use crate::cli::ui::Output;
use crate::config::{Config, ConfigLoader};
use crate::types::Result;

/// Print the merged effective configuration
pub fn show(config: &Config, format: &str) -> Result<()> {
    let rendered = if format == "json" {
        serde_json::to_string_pretty(config)?
    } else {
        toml::to_string_pretty(config)?
    };
    println!("{}", rendered);
    Ok(())
}

pub fn path() -> Result<()> {
    let mark = |exists: bool| if exists { "✓" } else { "✗" };

    println!("Configuration paths:");
    match ConfigLoader::global_config_path() {
        Some(global) => println!("  Global:  {} {}", mark(global.exists()), global.display()),
        None => println!("  Global:  (not available)"),
    }
    let project = ConfigLoader::project_config_path();
    println!("  Project: {} {}", mark(project.exists()), project.display());
    Ok(())
}

pub fn init(global: bool, force: bool) -> Result<()> {
    let (path, written) = if global {
        ConfigLoader::init_global(force)?
    } else {
        ConfigLoader::init_project(force)?
    };

    let output = Output::new();
    if written {
        output.success(&format!("Created {}", path.display()));
    } else {
        output.info(&format!(
            "{} already exists (use --force to overwrite)",
            path.display()
        ));
    }
    Ok(())
}
