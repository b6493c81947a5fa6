//! Evaluation CLI for prompt templates.
//!
//! Evaluates a prompt against generated test cases and optionally
//! optimizes it from the failing results.

use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use promptcheck_core::{CompletionConfig, CompletionService, HttpProvider, PLACEHOLDER};
use promptcheck_eval::{
    HttpRunSink, Pipeline, PipelineReport, PipelineRequest, ProgressEvent, ProgressReporter,
    RunSink,
};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Evaluate and optimize a prompt template against generated test cases.
#[derive(Parser, Debug)]
#[command(name = "promptcheck")]
#[command(about = "Evaluate and optimize prompt templates")]
#[command(version)]
struct Args {
    /// Prompt template containing the {{input}} placeholder
    #[arg(long, short = 'p')]
    prompt: String,

    /// What the prompt is supposed to achieve
    #[arg(long, short = 'g', default_value = "")]
    goal: String,

    /// Name for the prompt under test
    #[arg(long, short = 'n', default_value = "cli-prompt")]
    name: String,

    /// Comma-separated judging criteria (switches to binary rubric scoring)
    #[arg(long, default_value = "")]
    rubric: String,

    /// Number of test cases to generate
    #[arg(long, short = 'c', default_value = "5")]
    cases: usize,

    /// Dataset label attached to records sent to the trace sink
    #[arg(long)]
    dataset: Option<String>,

    /// Also optimize the prompt and re-evaluate the revision
    #[arg(long)]
    optimize: bool,

    /// Primary provider base URL (OpenAI-compatible)
    #[arg(long, default_value = "https://api.openai.com/v1")]
    primary_url: String,

    /// Primary provider model
    #[arg(long, default_value = "gpt-4o-mini")]
    primary_model: String,

    /// Primary provider API key (can also use OPENAI_API_KEY env var)
    #[arg(long, env = "OPENAI_API_KEY")]
    primary_api_key: String,

    /// Fallback provider base URL (fallback disabled when no key is set)
    #[arg(long, default_value = "https://api.groq.com/openai/v1")]
    fallback_url: String,

    /// Fallback provider model
    #[arg(long, default_value = "llama-3.1-8b-instant")]
    fallback_model: String,

    /// Fallback provider API key (can also use FALLBACK_API_KEY env var)
    #[arg(long, env = "FALLBACK_API_KEY")]
    fallback_api_key: Option<String>,

    /// Per-call timeout in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Maximum tokens per completion
    #[arg(long, default_value = "1024")]
    max_tokens: u32,

    /// Temperature for completions (0.0-1.0)
    #[arg(long, default_value_t = 0.7)]
    temperature: f32,

    /// Trace sink endpoint for per-example run records (disabled when unset)
    #[arg(long, env = "TRACE_SINK_URL")]
    trace_sink_url: Option<String>,

    /// Trace sink API key
    #[arg(long, env = "TRACE_SINK_API_KEY")]
    trace_sink_api_key: Option<String>,

    /// Output format: table or json
    #[arg(long, short = 'o', default_value = "table")]
    output: String,

    /// Output file path (defaults to stdout)
    #[arg(long)]
    output_file: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    /// Validate CLI arguments.
    fn validate(&self) -> Result<(), String> {
        if !["table", "json"].contains(&self.output.as_str()) {
            return Err(format!(
                "Invalid output format '{}'. Use 'table' or 'json'.",
                self.output
            ));
        }

        if self.cases == 0 {
            return Err("cases must be greater than 0".to_string());
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(format!(
                "temperature ({}) must be between 0.0 and 1.0",
                self.temperature
            ));
        }

        if self.optimize && self.goal.trim().is_empty() {
            return Err("--optimize requires --goal".to_string());
        }

        Ok(())
    }

    /// Build CompletionConfig from CLI arguments.
    fn completion_config(&self) -> CompletionConfig {
        CompletionConfig::default()
            .with_timeout(Duration::from_secs(self.timeout))
            .with_max_tokens(self.max_tokens)
            .with_temperature(self.temperature)
    }

    /// Build the completion service from CLI arguments.
    fn completion_service(&self) -> CompletionService {
        let primary = Arc::new(
            HttpProvider::new(
                "primary",
                &self.primary_url,
                &self.primary_api_key,
                &self.primary_model,
            )
            .with_temperature(self.temperature),
        );

        let mut service = CompletionService::new(primary, self.completion_config());
        match &self.fallback_api_key {
            Some(key) if !key.is_empty() => {
                let fallback = Arc::new(
                    HttpProvider::new("fallback", &self.fallback_url, key, &self.fallback_model)
                        .with_temperature(self.temperature),
                );
                service = service.with_fallback(fallback);
            }
            _ => log::info!("No fallback API key set, fallback disabled"),
        }
        service
    }

    /// Build the pipeline request from CLI arguments.
    fn pipeline_request(&self) -> PipelineRequest {
        let rubric: Vec<String> = self
            .rubric
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let mut request = PipelineRequest::new(&self.prompt)
            .with_goal(&self.goal)
            .with_prompt_name(&self.name)
            .with_rubric(rubric)
            .with_case_count(self.cases);
        if let Some(dataset) = &self.dataset {
            request = request.with_dataset(dataset);
        }
        request
    }

    /// Build the trace sink, when credentials are configured. Both the
    /// endpoint and the key must be set; otherwise recording is disabled.
    fn run_sink(&self) -> Option<Arc<dyn RunSink>> {
        match (&self.trace_sink_url, &self.trace_sink_api_key) {
            (Some(url), Some(key)) if !url.is_empty() && !key.is_empty() => {
                Some(Arc::new(HttpRunSink::new(url, key)))
            }
            (Some(_), None) | (None, Some(_)) => {
                log::warn!("Trace sink needs both --trace-sink-url and --trace-sink-api-key; recording disabled");
                None
            }
            _ => None,
        }
    }
}

/// Spinner line for one progress event.
fn spinner_message(event: &ProgressEvent) -> String {
    format!("{}: {}", event.phase, event.details.as_deref().unwrap_or(""))
}

/// Run the pipeline with a live spinner fed by progress events.
async fn run_pipeline(args: &Args) -> Result<PipelineReport, String> {
    let service = args.completion_service();
    let mut pipeline = Pipeline::new(service);
    if let Some(sink) = args.run_sink() {
        pipeline = pipeline.with_sink(sink);
    }
    let request = args.pipeline_request();

    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .map_err(|e| format!("Invalid progress template: {}", e))?,
    );
    spinner.enable_steady_tick(Duration::from_millis(100));

    let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
    let display = spinner.clone();
    let drain = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            display.set_message(spinner_message(&event));
        }
    });

    let mut reporter = ProgressReporter::with_subscriber(tx);
    let outcome = if args.optimize {
        pipeline.run(request, &mut reporter).await
    } else {
        pipeline.evaluate(request, &mut reporter).await
    };

    drop(reporter);
    let _ = drain.await;
    spinner.finish_and_clear();

    outcome.map_err(|e| format!("Pipeline failed: {}", e))
}

/// Output the report in the requested format.
fn output_report(report: &PipelineReport, args: &Args) -> Result<(), String> {
    match args.output.as_str() {
        "table" => {
            print_table(report, args.optimize);
            if let Some(path) = &args.output_file {
                let json = serde_json::to_string_pretty(report)
                    .map_err(|e| format!("Failed to serialize report: {}", e))?;
                std::fs::write(path, json)
                    .map_err(|e| format!("Failed to write output file: {}", e))?;
                println!("\nDetailed report written to: {}", path.display());
            }
        }
        "json" => {
            let json = serde_json::to_string_pretty(report)
                .map_err(|e| format!("Failed to serialize report: {}", e))?;
            if let Some(path) = &args.output_file {
                std::fs::write(path, &json)
                    .map_err(|e| format!("Failed to write output file: {}", e))?;
                eprintln!("Report written to: {}", path.display());
            } else {
                println!("{}", json);
            }
        }
        _ => unreachable!(), // Already validated
    }
    Ok(())
}

fn print_table(report: &PipelineReport, optimized: bool) {
    println!("=== Evaluation Results ===");
    println!(
        "Original:  {}/{} passed (pass rate {:.2})",
        report.original_summary.passed, report.original_summary.total, report.original_summary.pass_rate
    );

    for result in &report.original_results {
        let mark = if result.scores.overall >= promptcheck_eval::PASS_THRESHOLD {
            "PASS"
        } else {
            "FAIL"
        };
        println!(
            "  [{}] {:.2}  {}",
            mark,
            result.scores.overall,
            promptcheck_core::truncate(&result.input, 60)
        );
        if let Some(reason) = &result.failure_reason {
            println!("         reason: {}", reason);
        }
    }

    if optimized && report.optimized_prompt != report.original_prompt {
        println!(
            "\nOptimized: {}/{} passed (pass rate {:.2})",
            report.optimized_summary.passed,
            report.optimized_summary.total,
            report.optimized_summary.pass_rate
        );
        println!("\nRevised prompt:\n{}", report.optimized_prompt);
        if !report.changes.is_empty() {
            println!("\nChanges:");
            for change in &report.changes {
                println!("  - {}", change);
            }
        }
    } else if optimized {
        println!("\nNo failing cases; prompt left unchanged.");
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    let default_level = if args.verbose { "info" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        return ExitCode::FAILURE;
    }

    if !args.prompt.contains(PLACEHOLDER) {
        eprintln!(
            "Warning: prompt does not contain {}; every case will see the same text",
            PLACEHOLDER
        );
    }

    match run_pipeline(&args).await {
        Ok(report) => {
            if let Err(e) = output_report(&report, &args) {
                eprintln!("Error: {}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_args() -> Args {
        Args {
            prompt: "Answer: {{input}}".to_string(),
            goal: "short answers".to_string(),
            name: "qa-v1".to_string(),
            rubric: "concise, correct".to_string(),
            cases: 5,
            dataset: None,
            optimize: false,
            primary_url: "https://api.openai.com/v1".to_string(),
            primary_model: "gpt-4o-mini".to_string(),
            primary_api_key: "test-key".to_string(),
            fallback_url: "https://api.groq.com/openai/v1".to_string(),
            fallback_model: "llama-3.1-8b-instant".to_string(),
            fallback_api_key: None,
            trace_sink_url: None,
            trace_sink_api_key: None,
            timeout: 10,
            max_tokens: 1024,
            temperature: 0.7,
            output: "table".to_string(),
            output_file: None,
            verbose: false,
        }
    }

    #[test]
    fn test_validate_valid_args() {
        assert!(test_args().validate().is_ok());
    }

    #[test]
    fn test_validate_invalid_output() {
        let mut args = test_args();
        args.output = "invalid".to_string();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_zero_cases() {
        let mut args = test_args();
        args.cases = 0;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_invalid_temperature() {
        let mut args = test_args();
        args.temperature = 1.5;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validate_optimize_requires_goal() {
        let mut args = test_args();
        args.optimize = true;
        args.goal = String::new();
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_completion_config() {
        let config = test_args().completion_config();
        assert_eq!(config.timeout, Duration::from_secs(10));
        assert_eq!(config.max_tokens, 1024);
        assert_eq!(config.temperature, 0.7);
    }

    #[test]
    fn test_rubric_parsing() {
        let request = test_args().pipeline_request();
        assert_eq!(request.rubric, vec!["concise", "correct"]);
        assert_eq!(request.case_count, Some(5));
    }

    #[test]
    fn test_dataset_flows_into_request() {
        let mut args = test_args();
        args.dataset = Some("smoke".to_string());
        assert_eq!(args.pipeline_request().dataset.as_deref(), Some("smoke"));
        assert!(test_args().pipeline_request().dataset.is_none());
    }

    #[test]
    fn test_sink_requires_both_url_and_key() {
        let mut args = test_args();
        assert!(args.run_sink().is_none());

        args.trace_sink_url = Some("https://trace.example.com/records".to_string());
        assert!(args.run_sink().is_none());

        args.trace_sink_api_key = Some("sink-key".to_string());
        assert!(args.run_sink().is_some());
    }

    #[test]
    fn test_empty_rubric_parses_to_empty_vec() {
        let mut args = test_args();
        args.rubric = String::new();
        assert!(args.pipeline_request().rubric.is_empty());
    }

    #[tokio::test]
    async fn test_spinner_drain_formats_forwarded_events() {
        let (tx, mut rx) = mpsc::unbounded_channel::<ProgressEvent>();
        let mut reporter = ProgressReporter::with_subscriber(tx);
        reporter.running("generation", "generating 5 test cases");
        drop(reporter);

        let event = rx.recv().await.unwrap();
        assert_eq!(
            spinner_message(&event),
            "generation: generating 5 test cases"
        );
        assert!(rx.recv().await.is_none());
    }

    #[test]
    fn test_json_output_written_to_file() {
        use promptcheck_eval::{PipelineReport, Summary};

        let report = PipelineReport {
            original_prompt: "p {{input}}".to_string(),
            optimized_prompt: "p {{input}}".to_string(),
            original_results: vec![],
            optimized_results: vec![],
            original_summary: Summary::from_results(&[], promptcheck_eval::PASS_THRESHOLD),
            optimized_summary: Summary::from_results(&[], promptcheck_eval::PASS_THRESHOLD),
            reasoning: String::new(),
            changes: vec![],
            events: vec![],
        };

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mut args = test_args();
        args.output = "json".to_string();
        args.output_file = Some(path.clone());

        output_report(&report, &args).unwrap();

        let written = std::fs::read_to_string(path).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&written).unwrap();
        assert_eq!(parsed["originalPrompt"], "p {{input}}");
    }
}
