use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Minimum trimmed clause length (in characters) used when nothing else is configured.
pub const DEFAULT_MIN_CLAUSE_CHARS: usize = 50;

/// A line starting with a numbered heading (`12.`) or an all-caps heading (`TERMINATION:`).
static HEADING: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^(?:[0-9]+\.|[A-Z ]{4,}:)").expect("heading pattern is a valid regex")
});

/// Tunables for clause segmentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SegmenterConfig {
    /// Segments whose trimmed length is at or below this many characters are dropped.
    pub min_clause_chars: usize,
}

impl Default for SegmenterConfig {
    fn default() -> Self {
        Self {
            min_clause_chars: DEFAULT_MIN_CLAUSE_CHARS,
        }
    }
}

/// Splits contract text into clause candidates on heading-like line prefixes.
///
/// This is a text-shape heuristic only. Documents that use other heading
/// conventions (roman numerals, `Section 4`, indented numbering) come back as
/// one large clause or get split in unexpected places.
#[derive(Debug, Clone, Default)]
pub struct ClauseSegmenter {
    config: SegmenterConfig,
}

impl ClauseSegmenter {
    pub fn new(config: SegmenterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &SegmenterConfig {
        &self.config
    }

    /// Lazily iterate over the clauses of `text`. Each call starts a fresh pass.
    pub fn segments<'t>(&self, text: &'t str) -> Clauses<'t> {
        Clauses {
            heading: &HEADING,
            text,
            seg_start: 0,
            min_chars: self.config.min_clause_chars,
            done: false,
        }
    }

    /// Collect all clauses into owned strings.
    pub fn split(&self, text: &str) -> Vec<String> {
        self.segments(text).map(str::to_string).collect()
    }
}

/// Iterator over trimmed clauses longer than the configured threshold.
#[derive(Debug, Clone)]
pub struct Clauses<'t> {
    heading: &'static Regex,
    text: &'t str,
    seg_start: usize,
    min_chars: usize,
    done: bool,
}

impl<'t> Clauses<'t> {
    /// Byte offset of the next heading that starts strictly after the current segment start.
    fn next_boundary(&self) -> Option<usize> {
        let mut pos = self.seg_start;
        while let Some(found) = self.heading.find_at(self.text, pos) {
            if found.start() > self.seg_start {
                return Some(found.start());
            }
            pos = found.end();
        }
        None
    }
}

impl<'t> Iterator for Clauses<'t> {
    type Item = &'t str;

    fn next(&mut self) -> Option<Self::Item> {
        while !self.done {
            let end = match self.next_boundary() {
                Some(boundary) => boundary,
                None => {
                    self.done = true;
                    self.text.len()
                }
            };
            let segment = self.text[self.seg_start..end].trim();
            self.seg_start = end;
            if segment.chars().count() > self.min_chars {
                return Some(segment);
            }
        }
        None
    }
}

impl std::iter::FusedIterator for Clauses<'_> {}
