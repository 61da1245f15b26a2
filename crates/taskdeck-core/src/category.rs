use anyhow::anyhow;
use serde::{Deserialize, Serialize};

use crate::id::CategoryId;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    #[serde(default)]
    pub color: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategoryDraft {
    pub name: String,
    pub color: String,
}

impl CategoryDraft {
    pub fn new(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: color.into(),
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.name.trim().is_empty() {
            return Err(anyhow!("category name cannot be empty"));
        }
        Ok(())
    }
}

impl Category {
    pub fn from_draft(draft: CategoryDraft) -> Self {
        Self {
            id: CategoryId::generate(),
            name: draft.name,
            color: draft.color,
        }
    }

    pub fn apply_draft(&mut self, draft: CategoryDraft) {
        self.name = draft.name;
        self.color = draft.color;
    }
}

/// Seeded on first run.
pub const DEFAULT_CATEGORIES: [(&str, &str); 4] = [
    ("Work", "#4f46e5"),
    ("Personal", "#10b981"),
    ("Shopping", "#f59e0b"),
    ("Health", "#ef4444"),
];

pub fn default_categories() -> Vec<Category> {
    DEFAULT_CATEGORIES
        .iter()
        .map(|(name, color)| Category::from_draft(CategoryDraft::new(*name, *color)))
        .collect()
}
