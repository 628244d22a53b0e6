use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gie_core::ClassificationResult;
use gie_ml::OpenAiConfig;
use gie_observability::{init_tracing, AppMetrics};
use gie_pipeline::{Engine, EngineConfig};

#[derive(Debug, Parser)]
#[command(name = "gie")]
#[command(about = "Arabic government-service intent classifier")]
struct Cli {
    /// JSON catalog replacing the built-in intents and services.
    #[arg(long, env = "GIE_CATALOG_PATH")]
    catalog: Option<PathBuf>,

    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    openai_api_key: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Classify one query and print the result as JSON.
    Classify {
        text: String,
        #[arg(long)]
        segment: Option<String>,
    },
    /// Show which validation check a query passes or fails.
    Validate { text: String },
    /// Print the loaded catalog.
    Catalog,
    /// Classify queries typed at a prompt until `exit`.
    Chat,
}

#[tokio::main]
async fn main() -> Result<()> {
    // stdout carries the command output; logs stay quiet unless RUST_LOG says otherwise
    init_tracing("gie_cli", "warn");
    let cli = Cli::parse();

    let engine = build_engine(&cli)?;

    match cli.command {
        Command::Classify { text, segment } => {
            let result = engine.classify(segment.as_deref(), &text).await;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Command::Validate { text } => {
            let verdict = engine.inspect(&text);
            println!("{}", serde_json::to_string_pretty(&verdict)?);
        }
        Command::Catalog => {
            println!("{}", serde_json::to_string_pretty(engine.catalog())?);
        }
        Command::Chat => run_chat(&engine).await?,
    }

    Ok(())
}

async fn run_chat(engine: &Engine) -> Result<()> {
    println!(
        "GIE interactive mode (primary classifier: {}). type 'exit' to quit.",
        if engine.primary_available() { "on" } else { "off" }
    );

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let result = engine.run_pipeline(message).await;
        print_summary(&result);
    }

    Ok(())
}

fn print_summary(result: &ClassificationResult) {
    println!();
    println!(
        "mode: {}  intent: {}  confidence: {:.2}",
        result.mode.as_code(),
        result.detected_intent.as_deref().unwrap_or("-"),
        result.confidence
    );

    if let Some(reason) = result.fallback_reason.as_deref() {
        println!("fallback: {reason}");
    }

    for intent in &result.top_intents {
        println!("  {:.2}  {} ({})", intent.confidence, intent.label, intent.id);
    }

    if !result.services.is_empty() {
        println!("services:");
        for service in &result.services {
            println!("- {} -> {}", service.title, service.action.target);
        }
    }
    println!();
}

fn build_engine(cli: &Cli) -> Result<Engine> {
    let mut config = EngineConfig::from_env();

    if let Some(path) = cli.catalog.clone() {
        config.catalog_path = Some(path);
    }

    if let Some(key) = cli
        .openai_api_key
        .as_deref()
        .map(str::trim)
        .filter(|key| !key.is_empty())
    {
        match config.openai.as_mut() {
            Some(openai) => openai.api_key = key.to_string(),
            None => config.openai = Some(OpenAiConfig::new(key)),
        }
    }

    Engine::from_config(&config, AppMetrics::shared()).with_context(|| {
        match &config.catalog_path {
            Some(path) => format!("failed to start engine with catalog {}", path.display()),
            None => "failed to start engine".to_string(),
        }
    })
}
