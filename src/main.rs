use clap::{Parser, Subcommand};
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use docloop::cli::commands::{self, OutputFormat, RunOptions, RunStatus};
use docloop::config::ConfigLoader;

/// Exit code when every outline draft was rejected
const EXIT_EXHAUSTED: u8 = 2;

#[derive(Parser)]
#[command(name = "docloop")]
#[command(
    version,
    about = "Generate documents through an outline draft, review and revise loop"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a document for a topic
    Run {
        #[arg(long, short, help = "Document topic (or @file)")]
        topic: Option<String>,
        #[arg(long, short, help = "Outline requirements (or @file)")]
        requirements: Option<String>,
        #[arg(long, short, help = "Acceptance criteria for the outline (or @file)")]
        criteria: Option<String>,
        #[arg(long, help = "Use the built-in sample inputs for any input not given")]
        demo: bool,
        #[arg(long, help = "Maximum outline drafts (default from config: 3)")]
        max_retries: Option<u32>,
        #[arg(long, help = "LLM provider (openai, ollama, claude-code)")]
        provider: Option<String>,
        #[arg(long, help = "Model to use")]
        model: Option<String>,
        #[arg(short = 'f', long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(short = 'f', long, default_value = "text", help = "Output format: text, json")]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

/// Set up panic handler for graceful error reporting
fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!("\n{}", console::style("━━━ PANIC ━━━").red().bold());
        eprintln!("{}", console::style("docloop encountered an unexpected error:").red());
        eprintln!("  {}", message);

        if let Some(location) = panic_info.location() {
            eprintln!(
                "{}",
                console::style(format!(
                    "Location: {}:{}:{}",
                    location.file(),
                    location.line(),
                    location.column()
                ))
                .dim()
            );
        }
        eprintln!();

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{} {:#}", console::style("Error:").red(), e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbose: bool, quiet: bool, configured: &str) {
    let level = if verbose {
        "debug"
    } else if quiet {
        "error"
    } else {
        configured
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn run_cli() -> anyhow::Result<ExitCode> {
    let cli = Cli::parse();
    let config = ConfigLoader::load()?;
    init_logging(cli.verbose, cli.quiet, &config.logging.level);

    match cli.command {
        Commands::Run {
            topic,
            requirements,
            criteria,
            demo,
            max_retries,
            provider,
            model,
            format,
        } => {
            let status = commands::run::run(
                RunOptions {
                    topic,
                    requirements,
                    criteria,
                    demo,
                    max_retries,
                    provider,
                    model,
                    format,
                    verbose: cli.verbose,
                    quiet: cli.quiet,
                },
                config,
            )?;
            Ok(match status {
                RunStatus::Completed => ExitCode::SUCCESS,
                RunStatus::Exhausted => ExitCode::from(EXIT_EXHAUSTED),
            })
        }
        Commands::Config { action } => {
            match action {
                ConfigAction::Show { format } => commands::config::show(&config, &format)?,
                ConfigAction::Path => commands::config::path()?,
                ConfigAction::Init { global, force } => commands::config::init(global, force)?,
            }
            Ok(ExitCode::SUCCESS)
        }
    }
}
