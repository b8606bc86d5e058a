use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use malaymmlu_bench::{evaluate_split, CompletionsBackend};
use malaymmlu_core::{
    Aggregation, BackendConfig, ChatTemplate, EvalConfig, ScoringMode, DEFAULT_TASK,
};
use tracing_subscriber::EnvFilter;

const DEFAULT_ENDPOINT: &str = "http://localhost:8000";

#[derive(Parser)]
#[command(name = "malaymmlu")]
#[command(about = "MalayMMLU - multiple-choice evaluation by answer likelihood", long_about = None)]
struct Cli {
    /// Score only the first token (answer letter) instead of the full answer
    #[arg(long)]
    by_letter: bool,

    /// Model identity (HF repo id or path); its last segment names the output file
    #[arg(long)]
    base_model: String,

    /// Folder where the result table is written
    #[arg(long, default_value = "output")]
    output_folder: PathBuf,

    /// Only evaluate the first 10 questions
    #[arg(long)]
    playground: bool,

    /// Benchmark task
    #[arg(long, default_value = DEFAULT_TASK)]
    task: String,

    /// Number of few-shot examples: 0, 1, 2 or 3
    #[arg(long, default_value_t = 0, value_parser = clap::value_parser!(u8).range(0..=3))]
    shot: u8,

    /// Access token for gated weights or hosted endpoints (falls back to HF_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Directory holding {task}_{shot}shot.json
    #[arg(long, default_value = "data")]
    data_dir: PathBuf,

    /// OpenAI-compatible inference server (falls back to MALAYMMLU_ENDPOINT)
    #[arg(long)]
    endpoint: Option<String>,

    /// Model name the server knows the weights by (default: base model)
    #[arg(long)]
    served_model: Option<String>,

    /// Chat template: auto, raw, llama3, mistral, chatml
    #[arg(long, default_value = "auto")]
    chat_template: ChatTemplate,

    /// Full-answer log-prob aggregation: sum or mean
    #[arg(long, default_value = "sum")]
    aggregation: Aggregation,

    /// Per-request timeout in seconds
    #[arg(long, default_value = "300")]
    timeout_secs: u64,

    /// Print the final report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn into_config(self) -> EvalConfig {
        EvalConfig {
            task: self.task,
            base_model: self.base_model,
            served_model: self.served_model,
            scoring_mode: ScoringMode::from_by_letter(self.by_letter),
            aggregation: self.aggregation,
            shot: self.shot,
            playground: self.playground,
            data_dir: self.data_dir,
            output_folder: self.output_folder,
            chat_template: self.chat_template,
            backend: BackendConfig {
                endpoint: self.endpoint.unwrap_or_else(get_endpoint),
                token: self.token.or_else(get_token),
                timeout_secs: self.timeout_secs,
            },
        }
    }
}

fn get_endpoint() -> String {
    std::env::var("MALAYMMLU_ENDPOINT").unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string())
}

fn get_token() -> Option<String> {
    std::env::var("HF_TOKEN").ok().filter(|t| !t.is_empty())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let json = cli.json;
    let config = cli.into_config();
    config.validate().context("invalid configuration")?;

    if !json {
        print_banner(&config);
    }

    let backend = CompletionsBackend::new(&config.backend, config.served_model_name())
        .context("failed to create inference backend")?;
    tracing::info!("Scoring through {}", backend.url());

    let report = evaluate_split(&config, backend)
        .await
        .with_context(|| format!("evaluation of {} aborted", config.base_model))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!("Results:");
    println!("{:-<40}", "");
    println!("  Questions:     {}", report.summary.total);
    println!("  Correct:       {}", report.summary.correct);
    println!("  Accuracy:      {:.2}%", report.summary.accuracy * 100.0);
    println!("  Saved to:      {}", report.path.display());
    println!();

    Ok(())
}

fn print_banner(config: &EvalConfig) {
    println!();
    println!("Running {}...", config.task);
    println!("  Model:       {}", config.base_model);
    println!("  Scoring:     {}", config.scoring_mode.label());
    if !config.scoring_mode.is_by_letter() {
        println!("  Aggregation: {}", config.aggregation);
    }
    println!("  Shot:        {}", config.shot);
    println!("  Template:    {}", config.template());
    println!("  Endpoint:    {}", config.backend.endpoint);
    if config.playground {
        println!("  Playground:  first 10 questions");
    }
    println!();
}
