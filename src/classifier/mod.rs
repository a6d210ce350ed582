pub mod keywords;
pub mod relevance;

use tracing::debug;

use crate::category::Category;
pub use keywords::{KeywordRule, KeywordTable};
pub use relevance::{AssumeRelevant, DenyListFilter, RelevanceFilter};

/// Maps free text to a category by first-match-wins keyword lookup
pub struct Classifier {
    table: KeywordTable,
    relevance: Box<dyn RelevanceFilter>,
}

impl Classifier {
    pub fn new(table: KeywordTable) -> Self {
        Self {
            table,
            relevance: Box::new(AssumeRelevant),
        }
    }

    pub fn with_relevance_filter<F: RelevanceFilter + 'static>(mut self, filter: F) -> Self {
        self.relevance = Box::new(filter);
        self
    }

    pub fn table(&self) -> &KeywordTable {
        &self.table
    }

    /// Never fails: no match is `Category::Other`
    pub fn classify(&self, text: &str) -> Category {
        if !self.relevance.is_relevant(text) {
            return Category::Irrelevant;
        }
        let lowered = text.to_lowercase();
        let matches = self.table.all_matches(&lowered);
        if matches.len() > 1 {
            debug!(chosen = %matches[0], candidates = ?matches, "Text matches several categories");
        }
        matches.first().copied().unwrap_or(Category::Other)
    }

    /// Every category whose keywords appear in `text`, highest priority first.
    /// Ignores the relevance filter.
    pub fn matching_categories(&self, text: &str) -> Vec<Category> {
        self.table.all_matches(&text.to_lowercase())
    }
}

impl Default for Classifier {
    fn default() -> Self {
        Self::new(KeywordTable::default())
    }
}
