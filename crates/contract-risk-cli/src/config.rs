use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use contract_risk_core::{
    analyzer::{DEFAULT_EXCERPT_CHARS, DEFAULT_MAX_EXCERPTS},
    segmenter::DEFAULT_MIN_CLAUSE_CHARS,
    AnalyzerConfig, LevelThresholds, LlmFileConfig, SegmenterConfig,
};
use serde::Deserialize;

/// Settings read from `--config` (TOML, YAML or JSON, picked by extension).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub analysis: AnalysisSection,
    /// Category table file; relative paths resolve against the config file's directory.
    pub categories: Option<PathBuf>,
    pub llm: LlmFileConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalysisSection {
    pub min_clause_chars: usize,
    pub max_excerpts: usize,
    pub excerpt_chars: usize,
    pub medium_at: usize,
    pub high_at: usize,
}

impl Default for AnalysisSection {
    fn default() -> Self {
        let thresholds = LevelThresholds::default();
        Self {
            min_clause_chars: DEFAULT_MIN_CLAUSE_CHARS,
            max_excerpts: DEFAULT_MAX_EXCERPTS,
            excerpt_chars: DEFAULT_EXCERPT_CHARS,
            medium_at: thresholds.medium,
            high_at: thresholds.high,
        }
    }
}

impl AnalysisSection {
    pub fn analyzer_config(&self) -> Result<AnalyzerConfig> {
        let thresholds = LevelThresholds::new(self.medium_at, self.high_at)
            .context("invalid [analysis] medium_at/high_at")?;
        Ok(AnalyzerConfig {
            segmenter: SegmenterConfig {
                min_clause_chars: self.min_clause_chars,
            },
            thresholds,
            max_excerpts: self.max_excerpts,
            excerpt_chars: self.excerpt_chars,
        })
    }
}

impl AppConfig {
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let mut app: Self = config::Config::builder()
            .add_source(config::File::from(path))
            .build()
            .with_context(|| format!("failed to read config file {}", path.display()))?
            .try_deserialize()
            .with_context(|| format!("invalid config file {}", path.display()))?;
        if let (Some(categories), Some(dir)) = (app.categories.as_ref(), path.parent()) {
            if categories.is_relative() {
                app.categories = Some(dir.join(categories));
            }
        }
        Ok(app)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn missing_path_yields_defaults() {
        let app = AppConfig::load(None).unwrap();
        assert_eq!(app.analysis.analyzer_config().unwrap(), AnalyzerConfig::default());
        assert!(app.categories.is_none());
    }

    #[test]
    fn reads_toml_sections_and_resolves_categories() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("contract-risk.toml");
        fs::write(
            &path,
            "categories = \"tables/custom.json\"\n\n[analysis]\nmin_clause_chars = 80\nhigh_at = 4\n\n[llm]\nprovider = \"noop\"\ntimeout = \"20s\"\n",
        )
        .unwrap();

        let app = AppConfig::load(Some(&path)).unwrap();
        let config = app.analysis.analyzer_config().unwrap();
        assert_eq!(config.segmenter.min_clause_chars, 80);
        assert_eq!(config.thresholds.high, 4);
        assert_eq!(config.thresholds.medium, 3);
        assert_eq!(config.max_excerpts, DEFAULT_MAX_EXCERPTS);
        assert_eq!(
            app.categories,
            Some(temp.path().join("tables/custom.json"))
        );
        assert_eq!(app.llm.provider.as_deref(), Some("noop"));
        assert_eq!(app.llm.timeout.as_deref(), Some("20s"));
    }

    #[test]
    fn rejects_unreachable_thresholds() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("contract-risk.toml");
        fs::write(&path, "[analysis]\nmedium_at = 6\nhigh_at = 3\n").unwrap();
        let app = AppConfig::load(Some(&path)).unwrap();
        let err = app.analysis.analyzer_config().unwrap_err();
        assert!(format!("{err:#}").contains("medium threshold 6 exceeds high threshold 3"));

        let zero = AnalysisSection {
            medium_at: 0,
            ..AnalysisSection::default()
        };
        assert!(zero.analyzer_config().is_err());
    }

    #[test]
    fn reads_yaml() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("contract-risk.yaml");
        fs::write(&path, "analysis:\n  excerpt_chars: 300\n").unwrap();
        let app = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(app.analysis.excerpt_chars, 300);
    }
}
