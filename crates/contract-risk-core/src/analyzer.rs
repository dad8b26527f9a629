use std::sync::Arc;

use anyhow::{Context, Result as AnyResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::classifier::{
    risk_classifier::RiskClassifier, CategoryMatch, CategoryRepository, LevelThresholds,
    RiskLevel,
};
use crate::segmenter::{ClauseSegmenter, SegmenterConfig};

pub const DEFAULT_MAX_EXCERPTS: usize = 5;
pub const DEFAULT_EXCERPT_CHARS: usize = 400;
const TRUNCATION_MARKER: &str = "...";

/// Tunable configuration for one analysis pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub segmenter: SegmenterConfig,
    pub thresholds: LevelThresholds,
    /// How many leading clauses are kept as excerpts.
    pub max_excerpts: usize,
    /// Display length of each excerpt, in characters.
    pub excerpt_chars: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            segmenter: SegmenterConfig::default(),
            thresholds: LevelThresholds::default(),
            max_excerpts: DEFAULT_MAX_EXCERPTS,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
        }
    }
}

/// Errors that stop an analysis before any output is produced.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("no contract text provided")]
    EmptyInput,
}

/// Result of the rule-based analysis path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub risk_level: RiskLevel,
    pub matches: Vec<CategoryMatch>,
    pub clause_count: usize,
    pub excerpts: Vec<String>,
    pub input_chars: usize,
}

impl AnalysisReport {
    pub fn matched_labels(&self) -> Vec<&str> {
        self.matches.iter().map(|m| m.label.as_str()).collect()
    }
}

/// Primary analysis interface that turns contract text into a structured report.
#[async_trait]
pub trait Analyzer: Send + Sync {
    /// Analyze UTF-8 contract text. Blank input fails with [`AnalysisError::EmptyInput`].
    async fn analyze(&self, input: &str) -> AnyResult<AnalysisReport>;
}

/// Analyzer backed by a category repository, running segmentation, classification and scoring.
pub struct ContractAnalyzer<R: CategoryRepository> {
    category_repo: Arc<R>,
    config: AnalyzerConfig,
}

impl<R: CategoryRepository> ContractAnalyzer<R> {
    pub fn new(category_repo: Arc<R>) -> Self {
        Self::with_config(category_repo, AnalyzerConfig::default())
    }

    pub fn with_config(category_repo: Arc<R>, config: AnalyzerConfig) -> Self {
        Self {
            category_repo,
            config,
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }
}

#[async_trait]
impl<R> Analyzer for ContractAnalyzer<R>
where
    R: CategoryRepository + 'static,
{
    #[instrument(name = "analyze_contract", skip(self, input), fields(input_len = input.len()))]
    async fn analyze(&self, input: &str) -> AnyResult<AnalysisReport> {
        if input.trim().is_empty() {
            return Err(AnalysisError::EmptyInput.into());
        }
        self.config
            .thresholds
            .validate()
            .context("invalid risk level thresholds")?;
        let table = self.category_repo.load_categories().await?;
        let classifier = RiskClassifier::new(&table)?;
        Ok(analyze_with(&classifier, &self.config, input)?)
    }
}

/// Synchronous analysis against an already compiled classifier.
pub fn analyze_with(
    classifier: &RiskClassifier,
    config: &AnalyzerConfig,
    input: &str,
) -> Result<AnalysisReport, AnalysisError> {
    if input.trim().is_empty() {
        return Err(AnalysisError::EmptyInput);
    }
    let segmenter = ClauseSegmenter::new(config.segmenter);
    let mut clause_count = 0;
    let mut excerpts = Vec::new();
    for clause in segmenter.segments(input) {
        clause_count += 1;
        if excerpts.len() < config.max_excerpts {
            excerpts.push(truncate_chars(clause, config.excerpt_chars));
        }
    }

    let matches = classifier.classify(input);
    let risk_level =
        RiskLevel::from_match_count_with_thresholds(matches.len(), &config.thresholds);
    debug!(clauses = clause_count, matched = matches.len(), %risk_level, "analysis completed");

    Ok(AnalysisReport {
        risk_level,
        matches,
        clause_count,
        excerpts,
        input_chars: input.chars().count(),
    })
}

fn truncate_chars(input: &str, max_chars: usize) -> String {
    match input.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}{TRUNCATION_MARKER}", &input[..cut]),
        None => input.to_string(),
    }
}
