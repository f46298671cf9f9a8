//! Console rendering of workflow progress events.

use console::style;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

use crate::workflow::{ProgressReporter, WorkflowEvent};

/// Prints [`WorkflowEvent`]s to stderr as they arrive
pub struct ConsoleRenderer {
    verbose: bool,
}

impl ConsoleRenderer {
    pub fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Subscribe to `reporter` and render until the run ends or every
    /// sender is dropped
    pub fn spawn(self, reporter: &ProgressReporter) -> JoinHandle<()> {
        let mut rx = reporter.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => {
                        eprintln!("{}", self.render(&event));
                        if event.is_terminal() {
                            break;
                        }
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        eprintln!("{}", style(format!("({} events skipped)", skipped)).dim());
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    pub fn render(&self, event: &WorkflowEvent) -> String {
        let line = event.describe();
        match event {
            WorkflowEvent::AttemptStarted { .. } => format!("\n{}", style(line).bold()),
            WorkflowEvent::OutlineValidated { verdict, .. } if verdict.meets_requirements => {
                format!("{} {}", style("✓").green(), line)
            }
            WorkflowEvent::OutlineValidated { verdict, .. } => {
                let mut out = format!("{} {}", style("✗").yellow(), line);
                if self.verbose {
                    for missing in &verdict.missing_elements {
                        out.push_str(&format!("\n    missing: {}", missing));
                    }
                    for suggestion in &verdict.suggestions {
                        out.push_str(&format!("\n    suggest: {}", suggestion));
                    }
                }
                out
            }
            WorkflowEvent::Completed { .. } => format!("\n{} {}", style("✓").green().bold(), line),
            WorkflowEvent::Exhausted { .. } => format!("\n{} {}", style("⚠").yellow().bold(), line),
            WorkflowEvent::Failed { .. } => format!("{} {}", style("✗").red().bold(), line),
            _ => format!("  {}", line),
        }
    }
}
