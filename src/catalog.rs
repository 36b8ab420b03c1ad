use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Category assigned to posts whose source is not registered in the catalog.
pub const UNCATEGORIZED: &str = "Uncategorized";

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FeedSource {
    pub name: String,
    pub url: String,
}

impl FeedSource {
    pub fn new(name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            url: url.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    #[serde(default)]
    pub feeds: Vec<FeedSource>,
}

/// Fixed registry of feed sources grouped by category.
///
/// The source -> category index is built once here so that attributing a
/// post to its category never scans the category lists.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    categories: Vec<Category>,
    index: HashMap<FeedSource, usize>,
}

impl Catalog {
    pub fn new(categories: Vec<Category>) -> Self {
        let mut index = HashMap::new();
        for (position, category) in categories.iter().enumerate() {
            for source in &category.feeds {
                // First registration wins when a source is listed twice
                index.entry(source.clone()).or_insert(position);
            }
        }

        Self { categories, index }
    }

    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    pub fn category(&self, name: &str) -> Option<&Category> {
        self.categories.iter().find(|c| c.name == name)
    }

    /// All sources across all categories, in catalog order.
    pub fn all_sources(&self) -> Vec<FeedSource> {
        self.categories
            .iter()
            .flat_map(|c| c.feeds.iter().cloned())
            .collect()
    }

    /// Sources of the named categories, in catalog order. Unknown names are ignored.
    pub fn sources_in<S: AsRef<str>>(&self, names: &[S]) -> Vec<FeedSource> {
        self.categories
            .iter()
            .filter(|c| names.iter().any(|n| n.as_ref() == c.name))
            .flat_map(|c| c.feeds.iter().cloned())
            .collect()
    }

    pub fn category_of(&self, source: &FeedSource) -> &str {
        self.index
            .get(source)
            .map(|&position| self.categories[position].name.as_str())
            .unwrap_or(UNCATEGORIZED)
    }

    pub fn source_count(&self) -> usize {
        self.categories.iter().map(|c| c.feeds.len()).sum()
    }
}
