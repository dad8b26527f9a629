use std::collections::HashSet;

use anyhow::Result as AnyResult;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod file_repository;
pub mod risk_classifier;

/// Byte span within the classified text `(start, end)` where `start <= end`.
pub type Span = (usize, usize);

/// Match-count boundaries that map the number of fired categories into risk levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelThresholds {
    /// Smallest count classified as `Medium`.
    pub medium: usize,
    /// Smallest count classified as `High`.
    pub high: usize,
}

impl LevelThresholds {
    /// Build thresholds, rejecting combinations that make a level unreachable
    /// or raise a contract with no matches above `Low`.
    pub fn new(medium: usize, high: usize) -> Result<Self, ThresholdError> {
        let thresholds = Self { medium, high };
        thresholds.validate()?;
        Ok(thresholds)
    }

    pub fn validate(&self) -> Result<(), ThresholdError> {
        if self.medium == 0 {
            return Err(ThresholdError::ZeroMedium);
        }
        if self.medium > self.high {
            return Err(ThresholdError::MediumAboveHigh {
                medium: self.medium,
                high: self.high,
            });
        }
        Ok(())
    }
}

/// Rejected threshold combinations.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ThresholdError {
    #[error("medium threshold must be at least 1")]
    ZeroMedium,
    #[error("medium threshold {medium} exceeds high threshold {high}")]
    MediumAboveHigh { medium: usize, high: usize },
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self { medium: 3, high: 5 }
    }
}

/// Severity buckets for an analyzed contract, ordered `Low < Medium < High`.
///
/// Every fired category counts the same. A jurisdiction clause and an
/// indemnity clause move the level by the same amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// Map a count of matched categories into a risk level.
    pub fn from_match_count(count: usize) -> Self {
        Self::from_match_count_with_thresholds(count, &LevelThresholds::default())
    }

    /// Map a count of matched categories using caller-provided thresholds.
    pub fn from_match_count_with_thresholds(count: usize, thresholds: &LevelThresholds) -> Self {
        if count >= thresholds.high {
            Self::High
        } else if count >= thresholds.medium {
            Self::Medium
        } else {
            Self::Low
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "LOW",
            Self::Medium => "MEDIUM",
            Self::High => "HIGH",
        }
    }
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a category pattern is interpreted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternKind {
    /// Literal phrase, matched ASCII-case-insensitively.
    Keyword,
    /// Regular expression, compiled case-insensitively.
    #[default]
    Regex,
}

/// A named class of contractual concern and the pattern that detects it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskCategory {
    /// Label shown in reports, unique within a table.
    pub label: String,
    #[serde(default)]
    pub kind: PatternKind,
    /// Pattern literal or regex source.
    pub pattern: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl RiskCategory {
    /// Construct a new category, validating invariants before returning.
    pub fn new(
        label: impl Into<String>,
        kind: PatternKind,
        pattern: impl Into<String>,
    ) -> Result<Self, CategoryValidationError> {
        let category = Self {
            label: label.into(),
            kind,
            pattern: pattern.into(),
            description: None,
        };
        category.validate()?;
        Ok(category)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Validate invariants for existing category definitions.
    pub fn validate(&self) -> Result<(), CategoryValidationError> {
        if self.label.trim().is_empty() {
            return Err(CategoryValidationError::EmptyLabel);
        }
        if self.pattern.trim().is_empty() {
            return Err(CategoryValidationError::EmptyPattern {
                label: self.label.clone(),
            });
        }
        Ok(())
    }
}

/// Errors emitted while validating category definitions.
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CategoryValidationError {
    #[error("category label must not be blank")]
    EmptyLabel,
    #[error("category `{label}` pattern must not be empty")]
    EmptyPattern { label: String },
    #[error("duplicate category label `{label}`")]
    DuplicateLabel { label: String },
}

/// Ordered, validated list of risk categories. Iteration order is the report order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CategoryTable {
    categories: Vec<RiskCategory>,
}

impl CategoryTable {
    pub fn new(categories: Vec<RiskCategory>) -> Result<Self, CategoryValidationError> {
        let mut seen = HashSet::new();
        for category in &categories {
            category.validate()?;
            if !seen.insert(category.label.as_str()) {
                return Err(CategoryValidationError::DuplicateLabel {
                    label: category.label.clone(),
                });
            }
        }
        Ok(Self { categories })
    }

    pub fn categories(&self) -> &[RiskCategory] {
        &self.categories
    }

    pub fn get(&self, label: &str) -> Option<&RiskCategory> {
        self.categories.iter().find(|c| c.label == label)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.categories.iter().map(|c| c.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }
}

impl Default for CategoryTable {
    /// The canonical six-category table.
    fn default() -> Self {
        let regex = |label: &str, pattern: &str, description: &str| RiskCategory {
            label: label.to_string(),
            kind: PatternKind::Regex,
            pattern: pattern.to_string(),
            description: Some(description.to_string()),
        };
        Self {
            categories: vec![
                regex(
                    "Termination",
                    r"\bterminat(?:e|es|ed|ing|ion)\b",
                    "Conditions under which a party may end the agreement",
                ),
                regex(
                    "Financial Penalty",
                    r"\bpenalt(?:y|ies)\b|\blate\s+fees?\b|\bliquidated\s+damages\b",
                    "Penalties, late fees or liquidated damages",
                ),
                regex(
                    "Indemnification",
                    r"\bindemni(?:fy|fies|fied|fication|ty|ties)\b",
                    "Obligations to compensate the other party for losses",
                ),
                regex(
                    "Jurisdiction & Governing Law",
                    r"\bjurisdiction\b|\bgoverning\s+law\b|\bgoverned\s+by\s+the\s+laws?\b",
                    "Venue and law that govern disputes",
                ),
                regex(
                    "Intellectual Property Rights",
                    r"\bintellectual\s+property\b",
                    "Ownership or licensing of created work",
                ),
                regex(
                    "Automatic Renewal",
                    r"\bauto(?:matic(?:ally)?)?[\s-]?renew(?:s|ed|al)?\b",
                    "Terms that roll over unless cancelled",
                ),
            ],
        }
    }
}

/// A category that fired, with the location of its first match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryMatch {
    pub label: String,
    pub span: Span,
    pub excerpt: String,
}

/// Abstraction over category loading so tables can come from files or memory.
#[async_trait]
pub trait CategoryRepository: Send + Sync {
    /// Retrieve the full category table currently active.
    async fn load_categories(&self) -> AnyResult<CategoryTable>;

    /// Fetch a single category by label if it exists.
    async fn get_category(&self, label: &str) -> AnyResult<Option<RiskCategory>> {
        let table = self.load_categories().await?;
        Ok(table.get(label).cloned())
    }
}

/// In-memory category table, the canonical one unless told otherwise.
#[derive(Debug, Clone, Default)]
pub struct StaticCategoryRepository {
    table: CategoryTable,
}

impl StaticCategoryRepository {
    pub fn new(table: CategoryTable) -> Self {
        Self { table }
    }
}

#[async_trait]
impl CategoryRepository for StaticCategoryRepository {
    async fn load_categories(&self) -> AnyResult<CategoryTable> {
        Ok(self.table.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn category_validation_rejects_blank_label() {
        let err = RiskCategory::new("  ", PatternKind::Regex, "terminate")
            .expect_err("blank label should be rejected");
        assert_eq!(err, CategoryValidationError::EmptyLabel);
    }

    #[test]
    fn category_validation_rejects_empty_pattern() {
        let err = RiskCategory::new("Termination", PatternKind::Keyword, "")
            .expect_err("empty pattern should be rejected");
        assert!(matches!(
            err,
            CategoryValidationError::EmptyPattern { label } if label == "Termination"
        ));
    }

    #[test]
    fn table_rejects_duplicate_labels() {
        let a = RiskCategory::new("Termination", PatternKind::Regex, "terminate").unwrap();
        let b = RiskCategory::new("Termination", PatternKind::Keyword, "cancel").unwrap();
        let err = CategoryTable::new(vec![a, b]).expect_err("duplicates should be rejected");
        assert_eq!(err.to_string(), "duplicate category label `Termination`");
    }

    #[test]
    fn default_table_has_canonical_order() {
        let table = CategoryTable::default();
        let labels: Vec<_> = table.labels().collect();
        assert_eq!(
            labels,
            vec![
                "Termination",
                "Financial Penalty",
                "Indemnification",
                "Jurisdiction & Governing Law",
                "Intellectual Property Rights",
                "Automatic Renewal",
            ]
        );
        for category in table.categories() {
            category.validate().unwrap();
        }
    }

    #[test]
    fn risk_level_thresholds_match_buckets() {
        assert_eq!(RiskLevel::from_match_count(0), RiskLevel::Low);
        assert_eq!(RiskLevel::from_match_count(2), RiskLevel::Low);
        assert_eq!(RiskLevel::from_match_count(3), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_match_count(4), RiskLevel::Medium);
        assert_eq!(RiskLevel::from_match_count(5), RiskLevel::High);
        assert_eq!(RiskLevel::from_match_count(42), RiskLevel::High);
    }

    #[test]
    fn custom_thresholds_apply() {
        let thresholds = LevelThresholds { medium: 1, high: 2 };
        assert_eq!(
            RiskLevel::from_match_count_with_thresholds(0, &thresholds),
            RiskLevel::Low
        );
        assert_eq!(
            RiskLevel::from_match_count_with_thresholds(1, &thresholds),
            RiskLevel::Medium
        );
        assert_eq!(
            RiskLevel::from_match_count_with_thresholds(2, &thresholds),
            RiskLevel::High
        );
    }

    #[test]
    fn thresholds_reject_unreachable_levels() {
        assert_eq!(LevelThresholds::new(0, 5), Err(ThresholdError::ZeroMedium));
        assert_eq!(
            LevelThresholds::new(6, 3),
            Err(ThresholdError::MediumAboveHigh { medium: 6, high: 3 })
        );
        assert_eq!(
            LevelThresholds::new(2, 2),
            Ok(LevelThresholds { medium: 2, high: 2 })
        );
        LevelThresholds::default().validate().unwrap();
    }

    #[test]
    fn risk_level_serializes_uppercase() {
        assert_eq!(
            serde_json::to_string(&RiskLevel::Medium).unwrap(),
            "\"MEDIUM\""
        );
        assert_eq!(RiskLevel::High.to_string(), "HIGH");
    }

    #[tokio::test]
    async fn static_repository_looks_up_by_label() {
        let repo = StaticCategoryRepository::default();
        let found = repo.get_category("Indemnification").await.unwrap();
        assert!(found.is_some());
        assert!(repo.get_category("Force Majeure").await.unwrap().is_none());
    }

    proptest! {
        #[test]
        fn risk_level_is_monotonic(count in 0usize..1000) {
            prop_assert!(RiskLevel::from_match_count(count) <= RiskLevel::from_match_count(count + 1));
        }
    }
}
