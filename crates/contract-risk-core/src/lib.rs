pub mod analyzer;
pub mod classifier;
pub mod extract;
pub mod narrative;
pub mod report;
pub mod segmenter;

pub use analyzer::{AnalysisError, AnalysisReport, Analyzer, AnalyzerConfig, ContractAnalyzer};
pub use classifier::{
    file_repository::FileCategoryRepository, risk_classifier::RiskClassifier, CategoryMatch,
    CategoryRepository, CategoryTable, CategoryValidationError, LevelThresholds, PatternKind,
    RiskCategory, RiskLevel, Span, StaticCategoryRepository, ThresholdError,
};
pub use extract::{extract_text, DocumentKind, ExtractionError};
pub use narrative::{
    client_from_settings, narrate_or_fallback, LlmFileConfig, LlmSettings, NarrativeClient,
    NarrativeOutcome, NoopNarrativeClient, FALLBACK_NARRATIVE,
};
pub use segmenter::{ClauseSegmenter, Clauses, SegmenterConfig};
