use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use once_cell::sync::OnceCell;

use super::{CategoryRepository, CategoryTable, RiskCategory};

/// Loads a category table from a JSON or YAML file (chosen by extension).
///
/// The file holds an ordered list of `{label, kind, pattern, description}`
/// entries; `kind` defaults to `regex`. The table is read once and cached.
pub struct FileCategoryRepository {
    path: PathBuf,
    cache: OnceCell<CategoryTable>,
}

impl FileCategoryRepository {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: OnceCell::new(),
        }
    }

    fn is_yaml(&self) -> bool {
        matches!(
            self.path.extension().and_then(|ext| ext.to_str()),
            Some("yaml" | "yml")
        )
    }

    fn load_table(&self) -> Result<CategoryTable> {
        let raw = fs::read_to_string(&self.path).with_context(|| {
            format!("failed to read category file at {}", self.path.display())
        })?;
        let categories: Vec<RiskCategory> = if self.is_yaml() {
            serde_yaml::from_str(&raw).with_context(|| {
                format!("invalid YAML structure in category file at {}", self.path.display())
            })?
        } else {
            serde_json::from_str(&raw).with_context(|| {
                format!("invalid JSON structure in category file at {}", self.path.display())
            })?
        };
        CategoryTable::new(categories)
            .with_context(|| format!("invalid category table at {}", self.path.display()))
    }
}

#[async_trait::async_trait]
impl CategoryRepository for FileCategoryRepository {
    async fn load_categories(&self) -> Result<CategoryTable> {
        let table = self.cache.get_or_try_init(|| self.load_table())?;
        Ok(table.clone())
    }
}
