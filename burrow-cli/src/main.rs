//! Burrow CLI
//!
//! Bounded recursive web research from the command line.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{ensure, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use burrow_agents::{create_backend, ChatModelConfig, HeuristicProcessor, LlmProcessor, SharedProcessor};
use burrow_runtime::{persist_run, Orchestrator, Settings};

/// Depth used by `burrow test` unless overridden
const TEST_MODE_DEPTH: usize = 2;

/// Inputs that end an interactive session
const EXIT_WORDS: &[&str] = &["quit", "exit"];

#[derive(Parser)]
#[command(name = "burrow")]
#[command(author, version, about = "Burrow: bounded recursive web research", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Verbosity level (0-3)
    #[arg(short, long, default_value = "1", global = true)]
    verbose: u8,

    /// Settings file (TOML)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Maximum recursion depth
    #[arg(long, global = true)]
    max_depth: Option<usize>,

    /// Seconds to wait between page fetches
    #[arg(long, global = true, allow_negative_numbers = true)]
    delay: Option<f64>,

    /// Output directory prefix (a timestamp is appended per run)
    #[arg(short, long, global = true)]
    output_dir: Option<PathBuf>,

    /// Connect directly instead of through the proxy pool
    #[arg(long, global = true)]
    direct: bool,

    /// Error log file
    #[arg(long, default_value = "research_error.log", global = true)]
    error_log: PathBuf,

    /// Use an OpenAI model for text processing
    #[arg(long, global = true)]
    openai: bool,

    /// Use an OpenRouter model for text processing
    #[arg(long, global = true)]
    openrouter: bool,

    /// OpenAI-compatible base URL for a local model server
    #[arg(long, global = true)]
    base_url: Option<String>,

    /// Model name for LLM text processing
    #[arg(short, long, default_value = "gpt-4o-mini", global = true)]
    model: String,

    /// OpenAI API key (or set OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// OpenRouter API key (or set OPENROUTER_API_KEY env var)
    #[arg(long, env = "OPENROUTER_API_KEY", hide_env_values = true)]
    openrouter_key: Option<String>,
}

#[derive(Subcommand)]
enum Commands {
    /// Research a single query at reduced depth and save the results
    Test {
        /// The research query
        query: String,
    },

    /// Read queries from the prompt until "quit" (default)
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let _log_guard = init_logging(cli.verbose, &cli.error_log);

    let mut settings = match &cli.config {
        Some(path) => Settings::load(path)?,
        None => Settings::default(),
    };
    apply_overrides(&cli, &mut settings)?;

    let processor = build_processor(&cli, &settings)?;

    match &cli.command {
        Some(Commands::Test { query }) => {
            settings.research.max_depth = cli.max_depth.unwrap_or(TEST_MODE_DEPTH);
            run_test_query(query, settings, processor).await?;
        }
        Some(Commands::Interactive) | None => {
            run_interactive(settings, processor).await?;
        }
    }

    Ok(())
}

/// Console output at the chosen verbosity plus an append-only warning/error log
fn init_logging(verbose: u8, error_log: &Path) -> WorkerGuard {
    let filter = match verbose {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .compact()
        .with_filter(EnvFilter::new(filter));

    let log_dir = error_log
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let log_file = error_log
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("research_error.log"));

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let error_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_target(false)
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(console_layer)
        .with(error_layer)
        .init();

    guard
}

fn apply_overrides(cli: &Cli, settings: &mut Settings) -> Result<()> {
    if let Some(depth) = cli.max_depth {
        settings.research.max_depth = depth;
    }
    if let Some(delay) = cli.delay {
        ensure!(delay.is_finite(), "--delay must be a finite number of seconds, got {}", delay);
        settings.research.delay_secs = delay.max(0.0);
    }
    if let Some(dir) = &cli.output_dir {
        settings.output_dir = dir.clone();
    }
    if cli.direct {
        settings.network.proxies.clear();
    }
    Ok(())
}

fn build_processor(cli: &Cli, settings: &Settings) -> Result<SharedProcessor> {
    let rules = settings.processor.clone();

    let config = if cli.openrouter {
        let key = cli.openrouter_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("OpenRouter API key required. Set OPENROUTER_API_KEY or use --openrouter-key")
        })?;
        ChatModelConfig::openrouter(key, &cli.model)
    } else if cli.openai {
        let key = cli.api_key.as_deref().ok_or_else(|| {
            anyhow::anyhow!("OpenAI API key required. Set OPENAI_API_KEY or use --api-key")
        })?;
        ChatModelConfig::openai(key, &cli.model)
    } else if let Some(base_url) = &cli.base_url {
        ChatModelConfig::local(base_url, &cli.model)
    } else {
        return Ok(Arc::new(HeuristicProcessor::new().with_rules(rules)));
    };

    let backend = create_backend(config)?;
    Ok(Arc::new(LlmProcessor::new(backend).with_rules(rules)))
}

async fn research_and_save(orchestrator: &mut Orchestrator, query: &str, output_dir: &Path) -> Result<PathBuf> {
    orchestrator.research(query).await;

    println!("📝 Generating research summary...");
    let summary = orchestrator.summarize().await;

    Ok(persist_run(output_dir, orchestrator.results(), &summary)?)
}

async fn run_test_query(query: &str, settings: Settings, processor: SharedProcessor) -> Result<()> {
    println!("🔎 Burrow - recursive research\n");
    println!("🧪 Test query: {}", query);
    println!("🧠 Processor: {}", processor.name());
    println!(
        "🌳 Max depth: {} | 🌐 Proxies: {}\n",
        settings.research.max_depth,
        if settings.network.proxies.is_empty() { "direct".to_string() } else { settings.network.proxies.len().to_string() }
    );

    let mut orchestrator = Orchestrator::with_network(settings.research.clone(), &settings.network, processor);
    let output = research_and_save(&mut orchestrator, query, &settings.output_dir).await?;

    println!("\n✅ Test completed. Results saved in: {}", output.display());
    println!("   Nodes with content: {}", orchestrator.results().len());
    println!("   URLs visited: {}", orchestrator.visited().len());

    Ok(())
}

async fn run_interactive(settings: Settings, processor: SharedProcessor) -> Result<()> {
    println!("🔎 Burrow - recursive research (processor: {})", processor.name());

    let mut orchestrator = Orchestrator::with_network(settings.research.clone(), &settings.network, processor);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        print!("\nEnter research query (or 'quit' to exit): ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let query = line.trim();

        if query.is_empty() {
            continue;
        }
        if EXIT_WORDS.iter().any(|word| query.eq_ignore_ascii_case(word)) {
            break;
        }

        println!("\n🚀 Starting research...");
        match research_and_save(&mut orchestrator, query, &settings.output_dir).await {
            Ok(output) => println!("\n✅ Research completed! Results saved in: {}", output.display()),
            Err(e) => error!("Failed to save results for '{}': {}", query, e),
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_test_mode() {
        let cli = Cli::try_parse_from(["burrow", "test", "what is quantum computing", "--direct"]).unwrap();
        assert!(matches!(cli.command, Some(Commands::Test { ref query }) if query == "what is quantum computing"));
        assert!(cli.direct);
    }

    #[test]
    fn test_overrides_apply() {
        let cli = Cli::try_parse_from([
            "burrow",
            "--max-depth",
            "4",
            "--delay",
            "-1",
            "--output-dir",
            "out",
            "--direct",
        ])
        .unwrap();
        let mut settings = Settings::default();
        apply_overrides(&cli, &mut settings).unwrap();

        assert_eq!(settings.research.max_depth, 4);
        assert_eq!(settings.research.delay_secs, 0.0);
        assert_eq!(settings.output_dir, PathBuf::from("out"));
        assert!(settings.network.proxies.is_empty());
    }

    #[test]
    fn test_non_finite_delay_rejected() {
        for delay in ["inf", "NaN"] {
            let cli = Cli::try_parse_from(["burrow", "--delay", delay]).unwrap();
            let mut settings = Settings::default();
            assert!(apply_overrides(&cli, &mut settings).is_err());
            assert_eq!(settings.research.delay_secs, Settings::default().research.delay_secs);
        }
    }

    #[test]
    fn test_heuristic_processor_by_default() {
        let cli = Cli::try_parse_from(["burrow"]).unwrap();
        assert_eq!(build_processor(&cli, &Settings::default()).unwrap().name(), "heuristic");
    }

    #[tokio::test]
    async fn test_processor_rules_from_settings() {
        let cli = Cli::try_parse_from(["burrow"]).unwrap();
        let mut settings = Settings::default();
        settings.processor.max_queries = 1;
        let processor = build_processor(&cli, &settings).unwrap();

        let content = [burrow_core::ContentItem::new(
            "https://a.example",
            "Qubits hold quantum state for a while. Qubits decohere under thermal noise. Qubits are hard to build well.",
        )];
        let queries = processor.generate_sub_queries("qubits", &content).await.unwrap();
        assert_eq!(queries.len(), 1);
    }
}
