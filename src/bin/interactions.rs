//! Interactions CLI - replay recorded detection traces through the pipeline
//!
//! Commands:
//! - analyze: Analyse a detection trace and write an analysis record
//! - validate: Check a detection trace before analysing it

use clap::{Parser, Subcommand};
use serde::Serialize;
use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use therapy_interactions::trace::TraceReport;
use therapy_interactions::{
    analyze_trace, AnalysisConfig, AnalysisEncoder, AnalysisError, DetectionTrace, VERSION,
};

/// Interactions - child/caretaker/device interaction analysis
#[derive(Parser)]
#[command(name = "interactions")]
#[command(version = VERSION)]
#[command(about = "Analyse interactions in recorded detection traces", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyse a detection trace and write an analysis record
    Analyze {
        /// Detection trace file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output file path (use - for stdout)
        #[arg(short, long, default_value = "-")]
        output: PathBuf,

        /// JSON configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        /// Closeness threshold override (0-1)
        #[arg(long)]
        threshold: Option<f64>,

        /// Detector confidence cut-off override (0-1)
        #[arg(long)]
        min_confidence: Option<f64>,

        /// Pretty-print the record
        #[arg(long)]
        pretty: bool,
    },

    /// Check a detection trace for problems
    Validate {
        /// Detection trace file (use - for stdin)
        #[arg(short, long)]
        input: PathBuf,

        /// Output validation report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!(
                "{}",
                serde_json::to_string(&CliError::from(e))
                    .unwrap_or_else(|_| "Unknown error".to_string())
            );
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<(), InteractionsCliError> {
    match cli.command {
        Commands::Analyze {
            input,
            output,
            config,
            threshold,
            min_confidence,
            pretty,
        } => cmd_analyze(
            &input,
            &output,
            config.as_deref(),
            threshold,
            min_confidence,
            pretty,
        ),

        Commands::Validate { input, json } => cmd_validate(&input, json),
    }
}

fn read_input(input: &Path) -> Result<String, InteractionsCliError> {
    if input.to_string_lossy() == "-" {
        let mut buffer = String::new();
        io::stdin().read_to_string(&mut buffer)?;
        Ok(buffer)
    } else {
        Ok(fs::read_to_string(input)?)
    }
}

fn cmd_analyze(
    input: &Path,
    output: &Path,
    config_path: Option<&Path>,
    threshold: Option<f64>,
    min_confidence: Option<f64>,
    pretty: bool,
) -> Result<(), InteractionsCliError> {
    let mut config = match config_path {
        Some(path) => AnalysisConfig::from_json(&fs::read_to_string(path)?)?,
        None => AnalysisConfig::default(),
    };
    if let Some(threshold) = threshold {
        config.closeness_threshold = threshold;
    }
    if let Some(min_confidence) = min_confidence {
        config.min_confidence = min_confidence;
    }

    let trace = DetectionTrace::from_json(&read_input(input)?)?;
    let analysis = analyze_trace(&trace, &config)?;

    let encoder = AnalysisEncoder::new();
    let record = encoder.encode_to_json(&analysis, pretty)?;

    if output.to_string_lossy() == "-" {
        println!("{}", record);
    } else {
        fs::write(output, format!("{}\n", record))?;
    }

    Ok(())
}

fn cmd_validate(input: &Path, json: bool) -> Result<(), InteractionsCliError> {
    let trace = DetectionTrace::from_json(&read_input(input)?)?;
    let report = trace.validate();

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }

    if report.is_valid() {
        Ok(())
    } else {
        Err(InteractionsCliError::ValidationFailed(report.issues.len()))
    }
}

fn print_report(report: &TraceReport) {
    println!("Validation Report");
    println!("=================");
    println!("Source:     {}", report.source_id);
    println!("Frames:     {}", report.frames);
    println!("Detections: {}", report.detections);
    println!("Issues:     {}", report.issues.len());

    if !report.issues.is_empty() {
        println!("\nIssues:");
        for issue in &report.issues {
            match issue.frame {
                Some(frame) => println!("  - frame {}: {}", frame, issue.message),
                None => println!("  - {}", issue.message),
            }
        }
    }
}

#[derive(Debug)]
enum InteractionsCliError {
    Io(io::Error),
    Analysis(AnalysisError),
    Json(serde_json::Error),
    ValidationFailed(usize),
}

impl From<io::Error> for InteractionsCliError {
    fn from(e: io::Error) -> Self {
        InteractionsCliError::Io(e)
    }
}

impl From<AnalysisError> for InteractionsCliError {
    fn from(e: AnalysisError) -> Self {
        InteractionsCliError::Analysis(e)
    }
}

impl From<serde_json::Error> for InteractionsCliError {
    fn from(e: serde_json::Error) -> Self {
        InteractionsCliError::Json(e)
    }
}

#[derive(Serialize)]
struct CliError {
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl From<InteractionsCliError> for CliError {
    fn from(e: InteractionsCliError) -> Self {
        match e {
            InteractionsCliError::Io(e) => CliError {
                code: "IO_ERROR".to_string(),
                message: e.to_string(),
                hint: Some("Check file paths and permissions".to_string()),
            },
            InteractionsCliError::Analysis(e) => {
                let hint = match &e {
                    AnalysisError::InvalidThreshold(_) | AnalysisError::InvalidConfidence(_) => {
                        Some("Thresholds must lie in [0, 1]".to_string())
                    }
                    AnalysisError::EmptyVideo | AnalysisError::InvalidFrameRate(_) => {
                        Some("Run `interactions validate` on the trace".to_string())
                    }
                    _ => None,
                };
                CliError {
                    code: "ANALYSIS_ERROR".to_string(),
                    message: e.to_string(),
                    hint,
                }
            }
            InteractionsCliError::Json(e) => CliError {
                code: "JSON_ERROR".to_string(),
                message: e.to_string(),
                hint: None,
            },
            InteractionsCliError::ValidationFailed(count) => CliError {
                code: "VALIDATION_FAILED".to_string(),
                message: format!("{} issue(s) found in the trace", count),
                hint: None,
            },
        }
    }
}
