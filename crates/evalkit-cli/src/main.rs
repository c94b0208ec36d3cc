//! `evalkit` command-line runner.

use anyhow::{bail, Context};
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

use evalkit_core::{load_path, percentile, EvaluationReport, Metrics, ScoreBands, TaskType};
use evalkit_runtime::{
    CancellationToken, EvaluationOrchestrator, ReqwestTransport, RuntimeConfig,
};

/// Placeholder URL shipped in sample `.env` files.
const PLACEHOLDER_AZURE_URL: &str = "https://your-azure-instance.cognitiveservices.azure.com";

const REPORT_PERCENTILES: [f64; 5] = [25.0, 50.0, 75.0, 90.0, 95.0];

#[derive(Parser, Debug)]
#[command(name = "evalkit", version, about = "Score a candidate model with an LLM judge", long_about = None)]
struct Cli {
    /// Runtime config file (YAML, or JSON by extension)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand, Debug)]
enum Command {
    /// Check judge credentials and ping the candidate endpoint
    Check,

    /// Evaluate a dataset and write a report
    Run {
        /// JSONL dataset, or a JSON array when the extension is .json
        #[arg(short, long)]
        dataset: PathBuf,

        /// Task type tag, e.g. grammar_correction or summarization
        #[arg(short, long, default_value = "grammar_correction")]
        task: String,

        /// Prompt template for unknown task types ({input_text} is replaced)
        #[arg(long)]
        prompt: Option<String>,

        /// Judge rubric for unknown task types
        #[arg(long)]
        rubric: Option<String>,

        /// Where to write the report
        #[arg(short, long, default_value = "outputs/results.json")]
        output: PathBuf,

        /// Samples evaluated at once (overrides config)
        #[arg(long)]
        concurrency: Option<usize>,
    },

    /// Print metrics from a saved report
    Summary {
        #[arg(short, long, default_value = "outputs/results.json")]
        results: PathBuf,

        /// Print metrics as JSON
        #[arg(long)]
        json: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Check => check(cli.config.as_deref()).await,
        Command::Run {
            dataset,
            task,
            prompt,
            rubric,
            output,
            concurrency,
        } => {
            let mut config = load_config(cli.config.as_deref())?;
            if let Some(n) = concurrency {
                config.concurrency = n.max(1);
            }
            run(
                &config,
                &dataset,
                &task,
                prompt.as_deref(),
                rubric.as_deref(),
                &output,
            )
            .await
        }
        Command::Summary { results, json } => summary(&results, json),
    }
}

fn init_tracing(verbose: u8) {
    let filter = match verbose {
        0 => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        1 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn load_config(path: Option<&Path>) -> anyhow::Result<RuntimeConfig> {
    let Some(path) = path else {
        return Ok(RuntimeConfig::default());
    };

    let is_json = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));

    let config = if is_json {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        RuntimeConfig::from_json(&text)
    } else {
        RuntimeConfig::from_yaml_file(path)
    };
    config.with_context(|| format!("loading config {}", path.display()))
}

async fn check(config_path: Option<&Path>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let mut ok = true;

    let judge = config.judge.resolve("judge API key");
    match judge.check_credentials() {
        Ok(()) if judge.url.trim_end_matches('/') == PLACEHOLDER_AZURE_URL => {
            println!("✗ judge: URL is still the placeholder {}", PLACEHOLDER_AZURE_URL);
            ok = false;
        }
        Ok(()) => println!("✓ judge: {} model '{}' configured", judge.provider, judge.model),
        Err(detail) => {
            println!("✗ judge: {}", detail);
            ok = false;
        }
    }

    let orchestrator = EvaluationOrchestrator::from_config(&config, Arc::new(ReqwestTransport::new()));
    let candidate = orchestrator.candidate().endpoint();
    if orchestrator.candidate().health_check().await {
        println!("✓ candidate: {} at {} is reachable", candidate.model, candidate.url);
    } else {
        println!("✗ candidate: {} at {} did not answer", candidate.model, candidate.url);
        ok = false;
    }

    if !ok {
        bail!("environment check failed");
    }
    println!("All checks passed");
    Ok(())
}

async fn run(
    config: &RuntimeConfig,
    dataset_path: &Path,
    task: &str,
    prompt: Option<&str>,
    rubric: Option<&str>,
    output: &Path,
) -> anyhow::Result<()> {
    let dataset = load_path(dataset_path)
        .with_context(|| format!("loading dataset {}", dataset_path.display()))?;
    if dataset.is_empty() {
        bail!("dataset {} has no evaluable samples", dataset_path.display());
    }

    let task_type = TaskType::from(task);
    let orchestrator = EvaluationOrchestrator::from_config(config, Arc::new(ReqwestTransport::new()));

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted, stopping after in-flight samples are dropped");
            on_signal.cancel();
        }
    });

    let outcome = orchestrator
        .evaluate_batch_with_cancel(&dataset.samples, task_type.clone(), prompt, rubric, &cancel)
        .await;

    if outcome.cancelled {
        println!(
            "Cancelled: {} of {} samples evaluated",
            outcome.results.len(),
            dataset.len()
        );
    }

    let report = outcome.into_report(task_type);
    print_metrics(&report.metrics, &report.score_bands());

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("creating {}", parent.display()))?;
    }
    std::fs::write(output, report.to_json_pretty()?)
        .with_context(|| format!("writing report {}", output.display()))?;
    tracing::info!(path = %output.display(), "Report written");

    Ok(())
}

fn summary(path: &Path, json: bool) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading report {}", path.display()))?;
    let report = EvaluationReport::from_json(&text)
        .with_context(|| format!("parsing report {}", path.display()))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report.metrics)?);
        return Ok(());
    }

    println!("Task: {}  (saved {})", report.task_type, report.timestamp.to_rfc3339());
    print_metrics(&report.metrics, &report.score_bands());

    println!("Percentiles:");
    for p in REPORT_PERCENTILES {
        println!("  p{:<3} {:.3}", p, percentile(&report.results, p));
    }

    let failures: Vec<_> = report.failures().collect();
    if !failures.is_empty() {
        println!("Failures:");
        for result in failures {
            println!(
                "  #{} {}",
                result.index,
                result.error.as_deref().unwrap_or("unknown error")
            );
        }
    }
    Ok(())
}

fn print_metrics(metrics: &Metrics, bands: &ScoreBands) {
    println!("Samples:        {}", metrics.total_samples);
    println!(
        "Successful:     {} ({:.1}%)",
        metrics.successful_evaluations,
        metrics.success_rate * 100.0
    );
    println!("Average score:  {:.3}", metrics.average_score);
    println!("Median score:   {:.3}", metrics.median_score);
    println!(
        "Range:          {:.3} - {:.3}",
        metrics.min_score, metrics.max_score
    );
    println!("Std deviation:  {:.3}", metrics.std_dev);
    println!(
        "Bands:          excellent {}  good {}  poor {}",
        bands.excellent, bands.good, bands.poor
    );
}
