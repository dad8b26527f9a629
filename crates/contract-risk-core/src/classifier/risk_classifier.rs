use anyhow::{Context, Result};
use regex::{Regex, RegexBuilder};
use tracing::{debug, trace};

use super::{CategoryMatch, CategoryTable, PatternKind, RiskCategory, Span};

const EXCERPT_WINDOW: usize = 48;
const MAX_EXCERPT_CHARS: usize = 160;

/// Compiled form of a category table that reports which categories fire on a text.
pub struct RiskClassifier {
    labels: Vec<String>,
    patterns: Vec<Regex>,
}

impl RiskClassifier {
    /// Compile every category pattern once. Invalid regexes are reported with their label.
    pub fn new(table: &CategoryTable) -> Result<Self> {
        let labels = table.labels().map(str::to_string).collect();
        let patterns = table
            .categories()
            .iter()
            .map(compile_category)
            .collect::<Result<_>>()?;
        Ok(Self { labels, patterns })
    }

    pub fn category_count(&self) -> usize {
        self.labels.len()
    }

    /// Categories whose pattern matches somewhere in `text`, in table order.
    ///
    /// Only the first match of each category is recorded; a category either
    /// fires or it does not. A pattern that matches the empty string fires
    /// with an empty span. Blank text never fires anything.
    pub fn classify(&self, text: &str) -> Vec<CategoryMatch> {
        if text.trim().is_empty() {
            return Vec::new();
        }
        let matches: Vec<_> = self
            .labels
            .iter()
            .zip(&self.patterns)
            .filter_map(|(label, pattern)| {
                trace!(category = %label, "scanning category");
                let found = pattern.find(text)?;
                let span = (found.start(), found.end());
                Some(CategoryMatch {
                    label: label.clone(),
                    span,
                    excerpt: extract_excerpt(text, span, EXCERPT_WINDOW),
                })
            })
            .collect();
        debug!(matched = matches.len(), "classification completed");
        matches
    }
}

/// Keywords are matched literally; both kinds use Unicode case folding.
fn compile_category(category: &RiskCategory) -> Result<Regex> {
    let source = match category.kind {
        PatternKind::Keyword => regex::escape(&category.pattern),
        PatternKind::Regex => category.pattern.clone(),
    };
    RegexBuilder::new(&source)
        .case_insensitive(true)
        .build()
        .with_context(|| match category.kind {
            PatternKind::Keyword => format!("invalid keyword for category `{}`", category.label),
            PatternKind::Regex => {
                format!("invalid regex pattern for category `{}`", category.label)
            }
        })
}

fn extract_excerpt(input: &str, span: Span, window: usize) -> String {
    let start = saturating_char_boundary(input, span.0.saturating_sub(window));
    let end = saturating_char_boundary_forward(input, span.1 + window);
    input[start..end]
        .chars()
        .take(MAX_EXCERPT_CHARS)
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect::<String>()
        .trim()
        .to_string()
}

fn saturating_char_boundary(text: &str, idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    let mut cursor = idx;
    while cursor > 0 && !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

fn saturating_char_boundary_forward(text: &str, idx: usize) -> usize {
    if idx >= text.len() {
        return text.len();
    }
    let mut cursor = idx;
    while cursor < text.len() && !text.is_char_boundary(cursor) {
        cursor += 1;
    }
    cursor
}
