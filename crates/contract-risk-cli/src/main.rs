mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use colored::Colorize;
use contract_risk_core::{
    client_from_settings, extract_text, narrate_or_fallback,
    report::{render_narrative, render_pdf, render_report, OutputFormat},
    AnalysisError, AnalysisReport, Analyzer, CategoryRepository, CategoryTable, ClauseSegmenter,
    ContractAnalyzer, DocumentKind, FileCategoryRepository, LlmSettings, PatternKind,
    RiskLevel, SegmenterConfig, StaticCategoryRepository,
};
use tokio::io::AsyncReadExt;
use tracing::debug;
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

const EMPTY_INPUT_WARNING: &str =
    "No contract text found. Provide a non-empty contract file (.txt or .pdf).";

#[derive(Parser, Debug)]
#[command(
    name = "contract-risk",
    author,
    version,
    about = "Flag risky clauses in contracts and score overall risk"
)]
struct Cli {
    /// Configuration file (TOML, YAML or JSON)
    #[arg(long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Category table (JSON or YAML); overrides the config file and the built-in table
    #[arg(long, value_name = "FILE", global = true)]
    categories: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the rule-based analysis on a contract
    Analyze {
        /// Contract file (.txt or .pdf); reads stdin when omitted or `-`
        input: Option<PathBuf>,
        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
        /// Also write a PDF report to this path
        #[arg(long, value_name = "FILE")]
        pdf: Option<PathBuf>,
        /// Override the minimum clause length
        #[arg(long, value_name = "N")]
        min_clause_chars: Option<usize>,
    },
    /// Ask the configured language model for a narrative analysis
    Narrate {
        /// Contract file (.txt or .pdf); reads stdin when omitted or `-`
        input: Option<PathBuf>,
        /// Emit the outcome as JSON
        #[arg(long)]
        json: bool,
    },
    /// Print the clauses found in a contract
    Segment {
        /// Contract file (.txt or .pdf); reads stdin when omitted or `-`
        input: Option<PathBuf>,
        /// Emit clauses as a JSON array
        #[arg(long)]
        json: bool,
        /// Override the minimum clause length
        #[arg(long, value_name = "N")]
        min_clause_chars: Option<usize>,
    },
    /// List the active risk categories
    ListCategories {
        /// Emit categories as JSON instead of human-readable text
        #[arg(long)]
        json: bool,
    },
}

/// The category table chosen on the command line or in the config file.
enum CategorySource {
    File(FileCategoryRepository),
    Builtin(StaticCategoryRepository),
}

#[async_trait::async_trait]
impl CategoryRepository for CategorySource {
    async fn load_categories(&self) -> Result<CategoryTable> {
        match self {
            Self::File(repo) => repo.load_categories().await,
            Self::Builtin(repo) => repo.load_categories().await,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let app = AppConfig::load(cli.config.as_deref())?;
    let categories = category_source(cli.categories.clone().or_else(|| app.categories.clone()));
    debug!(command = ?cli.command, "dispatching command");

    match cli.command {
        Commands::Analyze {
            input,
            json,
            pdf,
            min_clause_chars,
        } => {
            let mut config = app.analysis.analyzer_config()?;
            if let Some(min) = min_clause_chars {
                config.segmenter.min_clause_chars = min;
            }
            let text = read_input(input.as_deref()).await?;
            let analyzer = ContractAnalyzer::with_config(Arc::new(categories), config);
            match analyzer.analyze(&text).await {
                Ok(report) => print_analysis(&report, json, pdf.as_deref())?,
                Err(err) if is_empty_input(&err) => warn_empty_input(),
                Err(err) => return Err(err),
            }
        }
        Commands::Narrate { input, json } => {
            let text = read_input(input.as_deref()).await?;
            let settings = LlmSettings::from_env_with(&app.llm)?;
            let client = client_from_settings(&settings)?;
            match narrate_or_fallback(client.as_ref(), &text).await {
                Ok(outcome) => {
                    let format = if json { OutputFormat::Json } else { OutputFormat::Human };
                    print!("{}", render_narrative(&outcome, format)?);
                    if json {
                        println!();
                    }
                }
                Err(AnalysisError::EmptyInput) => warn_empty_input(),
            }
        }
        Commands::Segment {
            input,
            json,
            min_clause_chars,
        } => {
            let text = read_input(input.as_deref()).await?;
            let segmenter = ClauseSegmenter::new(SegmenterConfig {
                min_clause_chars: min_clause_chars.unwrap_or(app.analysis.min_clause_chars),
            });
            print_segments(&segmenter, &text, json)?;
        }
        Commands::ListCategories { json } => list_categories(&categories, json).await?,
    }
    Ok(())
}

fn category_source(path: Option<PathBuf>) -> CategorySource {
    match path {
        Some(path) => CategorySource::File(FileCategoryRepository::new(path)),
        None => CategorySource::Builtin(StaticCategoryRepository::default()),
    }
}

async fn read_input(input: Option<&Path>) -> Result<String> {
    let (bytes, path) = match input {
        Some(path) if path != Path::new("-") => {
            let bytes = tokio::fs::read(path)
                .await
                .with_context(|| format!("failed to read contract file {}", path.display()))?;
            (bytes, Some(path))
        }
        _ => {
            let mut bytes = Vec::new();
            tokio::io::stdin()
                .read_to_end(&mut bytes)
                .await
                .context("failed to read contract from stdin")?;
            (bytes, None)
        }
    };
    let kind = DocumentKind::detect(path, &bytes);
    extract_text(&bytes, kind).with_context(|| match path {
        Some(path) => format!("failed to extract text from {}", path.display()),
        None => "failed to extract text from stdin".to_string(),
    })
}

fn is_empty_input(err: &anyhow::Error) -> bool {
    matches!(
        err.downcast_ref::<AnalysisError>(),
        Some(AnalysisError::EmptyInput)
    )
}

fn warn_empty_input() {
    eprintln!("{}", EMPTY_INPUT_WARNING.yellow());
}

fn print_analysis(report: &AnalysisReport, json: bool, pdf: Option<&Path>) -> Result<()> {
    let format = if json { OutputFormat::Json } else { OutputFormat::Human };
    let rendered = render_report(report, format)?;
    if json {
        println!("{rendered}");
    } else {
        let level = report.risk_level.as_str();
        let highlighted = match report.risk_level {
            RiskLevel::High => level.red().bold(),
            RiskLevel::Medium => level.yellow().bold(),
            RiskLevel::Low => level.green().bold(),
        };
        print!("{}", rendered.replacen(level, &highlighted.to_string(), 1));
    }

    if let Some(pdf_path) = pdf {
        let bytes = render_pdf(report, Utc::now())?;
        std::fs::write(pdf_path, &bytes)
            .with_context(|| format!("failed to write PDF to {}", pdf_path.display()))?;
        eprintln!(
            "{} {}",
            "PDF report written to:".green(),
            pdf_path.display()
        );
    }
    Ok(())
}

fn print_segments(segmenter: &ClauseSegmenter, text: &str, json: bool) -> Result<()> {
    if json {
        let clauses: Vec<_> = segmenter.segments(text).collect();
        println!("{}", serde_json::to_string_pretty(&clauses)?);
        return Ok(());
    }
    let mut count = 0;
    for (idx, clause) in segmenter.segments(text).enumerate() {
        count += 1;
        println!("[{}] {}", idx + 1, clause.split_whitespace().collect::<Vec<_>>().join(" "));
    }
    println!(
        "{} clause(s) longer than {} chars",
        count,
        segmenter.config().min_clause_chars
    );
    Ok(())
}

async fn list_categories(source: &CategorySource, json: bool) -> Result<()> {
    let table = source
        .load_categories()
        .await
        .context("failed to load risk categories")?;
    if json {
        println!("{}", serde_json::to_string_pretty(&table)?);
        return Ok(());
    }

    println!("{}", format!("{} risk categories loaded", table.len()).bold());
    for category in table.categories() {
        let kind = match category.kind {
            PatternKind::Keyword => "keyword",
            PatternKind::Regex => "regex",
        };
        let description = category
            .description
            .as_deref()
            .map(|d| format!(" :: {d}"))
            .unwrap_or_default();
        println!(
            "- {label:<30} [{kind:7}] {pattern}{description}",
            label = category.label,
            kind = kind,
            pattern = category.pattern,
            description = description
        );
    }
    Ok(())
}

fn init_tracing() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,tokio=warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_writer(std::io::stderr)
        .try_init();
}
