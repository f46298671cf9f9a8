//! Run Command
//!
//! Drives one document through the draft/validate/revise workflow.
//!
//! Usage:
//!   docloop run --topic "..." --requirements @reqs.md --criteria @criteria.md
//!   docloop run --demo

use serde::Serialize;
use serde_json::json;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::ai::provider::{LlmProvider, create_provider};
use crate::cli::progress::ConsoleRenderer;
use crate::cli::ui::Output;
use crate::cli::util::read_input;
use crate::config::Config;
use crate::types::{DocError, Result};
use crate::workflow::{DocumentWorkflow, LlmGenerator, WorkflowOutcome};

const DEMO_TOPIC: &str = "The Impact of Artificial Intelligence on Cybersecurity";

const DEMO_REQUIREMENTS: &str = "\
- Must include at least 5-6 main sections
- Each section should have 5-6 key points
- Must cover both benefits and challenges
- Should include real-world examples
- We are writing for a CISO audience so this must be technical and detailed.";

const DEMO_CRITERIA: &str = "\
- All required sections present
- Balanced coverage of topics
- Logical flow between sections
- Sufficient detail in key points";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub topic: Option<String>,
    pub requirements: Option<String>,
    pub criteria: Option<String>,
    pub demo: bool,
    pub max_retries: Option<u32>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub format: OutputFormat,
    pub verbose: bool,
    pub quiet: bool,
}

/// How the command ended, for the process exit code
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Completed,
    Exhausted,
}

/// Workflow inputs after `--demo` and `@path` resolution
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunInputs {
    pub topic: String,
    pub requirements: String,
    pub criteria: String,
}

impl RunOptions {
    pub fn inputs(&self) -> Result<RunInputs> {
        let pick = |name: &str, given: &Option<String>, demo: &str| -> Result<String> {
            match given {
                Some(value) => read_input(name, value),
                None if self.demo => Ok(demo.to_string()),
                None => Err(DocError::InvalidInput(format!(
                    "--{} is required (or use --demo)",
                    name
                ))),
            }
        };
        Ok(RunInputs {
            topic: pick("topic", &self.topic, DEMO_TOPIC)?,
            requirements: pick("requirements", &self.requirements, DEMO_REQUIREMENTS)?,
            criteria: pick("criteria", &self.criteria, DEMO_CRITERIA)?,
        })
    }

    /// Layer CLI flags over the loaded configuration
    pub fn apply(&self, mut config: Config) -> Result<Config> {
        if let Some(provider) = &self.provider {
            config.llm.provider = provider.clone();
        }
        if let Some(model) = &self.model {
            config.llm.model = Some(model.clone());
        }
        if let Some(max_retries) = self.max_retries {
            config.workflow.max_retries = max_retries;
        }
        config.validate()?;
        Ok(config)
    }
}

/// Preflight probe of the provider; a failed probe is reported, not fatal
pub async fn check_provider<P: LlmProvider + ?Sized>(provider: &P) -> bool {
    match provider.health_check().await {
        Ok(true) => {
            info!(provider = provider.name(), "Provider is healthy");
            true
        }
        Ok(false) => {
            warn!(
                provider = provider.name(),
                model = provider.model(),
                "Provider health check failed"
            );
            false
        }
        Err(e) => {
            warn!(provider = provider.name(), error = %e, "Provider health check inconclusive");
            false
        }
    }
}

pub fn run(options: RunOptions, config: Config) -> Result<RunStatus> {
    let inputs = options.inputs()?;
    let config = options.apply(config)?;

    let provider = create_provider(&config.llm)?;
    info!(
        provider = provider.name(),
        model = provider.model(),
        max_retries = config.workflow.max_retries,
        "Starting document workflow"
    );

    let generator = LlmGenerator::from_config(provider, &config);
    let metrics = generator.metrics().clone();
    let workflow = DocumentWorkflow::from_config(generator, &config.workflow)?;

    let rt = Runtime::new()?;
    let outcome = rt.block_on(async {
        let provider = workflow.port().provider();
        if !check_provider(provider).await && !options.quiet {
            Output::new().warning(&format!(
                "Provider '{}' ({}) did not pass its health check; generation may fail",
                provider.name(),
                provider.model()
            ));
        }

        let renderer = (!options.quiet)
            .then(|| ConsoleRenderer::new(options.verbose).spawn(workflow.progress()));

        let outcome = workflow
            .run(&inputs.topic, &inputs.requirements, &inputs.criteria)
            .await;

        drop(workflow);
        if let Some(handle) = renderer {
            let _ = handle.await;
        }
        outcome
    })?;

    let status = if outcome.is_completed() {
        RunStatus::Completed
    } else {
        RunStatus::Exhausted
    };

    let summary = metrics.summary();
    match options.format {
        OutputFormat::Json => {
            let report = json!({
                "inputs": inputs,
                "outcome": outcome,
                "metrics": summary,
            });
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
        OutputFormat::Text => {
            let output = Output::new();
            if !options.quiet {
                output.metrics(&summary);
            }
            if let WorkflowOutcome::Exhausted { attempts, .. } = &outcome {
                output.warning(&format!("No outline accepted after {} attempt(s)", attempts));
            }
            println!("{}", outcome.into_text());
        }
    }

    Ok(status)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::provider::{CompletionRequest, LlmResponse};
    use async_trait::async_trait;

    /// Provider whose only working call is the health probe
    struct ProbeOnly(Result<bool>);

    #[async_trait]
    impl LlmProvider for ProbeOnly {
        async fn complete(&self, _request: &CompletionRequest) -> Result<LlmResponse> {
            Err(DocError::LlmApi("not used".into()))
        }

        fn name(&self) -> &str {
            "probe-only"
        }

        fn model(&self) -> &str {
            "none"
        }

        async fn health_check(&self) -> Result<bool> {
            match &self.0 {
                Ok(healthy) => Ok(*healthy),
                Err(e) => Err(DocError::LlmApi(e.to_string())),
            }
        }
    }

    #[tokio::test]
    async fn test_check_provider_reports_health() {
        assert!(check_provider(&ProbeOnly(Ok(true))).await);
        assert!(!check_provider(&ProbeOnly(Ok(false))).await);
        let unreachable = ProbeOnly(Err(DocError::LlmApi("connection refused".into())));
        assert!(!check_provider(&unreachable).await);
    }

    #[test]
    fn test_demo_fills_missing_inputs() {
        let options = RunOptions {
            demo: true,
            topic: Some("Custom topic".into()),
            ..Default::default()
        };
        let inputs = options.inputs().unwrap();
        assert_eq!(inputs.topic, "Custom topic");
        assert_eq!(inputs.requirements, DEMO_REQUIREMENTS);
        assert!(inputs.criteria.contains("Logical flow"));
    }

    #[test]
    fn test_inputs_required_without_demo() {
        let options = RunOptions {
            topic: Some("t".into()),
            ..Default::default()
        };
        let err = options.inputs().unwrap_err();
        assert!(matches!(err, DocError::InvalidInput(ref m) if m.contains("--requirements")));
    }

    #[test]
    fn test_flags_override_config() {
        let options = RunOptions {
            provider: Some("ollama".into()),
            model: Some("qwen2.5".into()),
            max_retries: Some(5),
            ..Default::default()
        };
        let config = options.apply(Config::default()).unwrap();
        assert_eq!(config.llm.provider, "ollama");
        assert_eq!(config.llm.model.as_deref(), Some("qwen2.5"));
        assert_eq!(config.workflow.max_retries, 5);
    }

    #[test]
    fn test_zero_retries_flag_rejected() {
        let options = RunOptions {
            max_retries: Some(0),
            ..Default::default()
        };
        assert!(matches!(options.apply(Config::default()), Err(DocError::Config(_))));
    }
}
