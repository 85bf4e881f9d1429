//! Category selection state.
//!
//! The categories screen builds a [`CategorySelection`] by toggling
//! category ids; the selection is then carried forward to the feed as a
//! one-time navigation value and used to filter articles. Nothing here is
//! persisted — reopening the categories screen starts from the previous
//! in-memory selection, not from disk.

use crate::gateway::Article;
use std::collections::HashSet;

/// Set of selected category identifiers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CategorySelection {
    ids: HashSet<String>,
}

impl CategorySelection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggle a category id: insert when absent, remove when present.
    /// Toggling the same id twice leaves the selection unchanged.
    pub fn toggle(&mut self, id: &str) {
        if !self.ids.remove(id) {
            self.ids.insert(id.to_string());
        }
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Filter articles down to the selected categories, preserving the
    /// server's return order (stable, in-place subsequence).
    pub fn filter(&self, articles: &[Article]) -> Vec<Article> {
        articles
            .iter()
            .filter(|a| self.ids.contains(&a.category_id))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(id: &str, category_id: &str) -> Article {
        Article {
            id: id.to_string(),
            category_id: category_id.to_string(),
            title: format!("Article {}", id),
            audio_url: format!("https://cdn.example.com/{}.mp3", id),
            thumbnail_url: String::new(),
        }
    }

    #[test]
    fn test_toggle_adds_then_removes() {
        let mut sel = CategorySelection::new();
        sel.toggle("tech");
        assert!(sel.contains("tech"));
        sel.toggle("tech");
        assert!(!sel.contains("tech"));
        assert!(sel.is_empty());
    }

    #[test]
    fn test_double_toggle_is_identity() {
        let mut sel = CategorySelection::new();
        sel.toggle("news");
        let before = sel.clone();
        sel.toggle("sports");
        sel.toggle("sports");
        assert_eq!(sel, before);
    }

    #[test]
    fn test_filter_preserves_server_order() {
        let mut sel = CategorySelection::new();
        sel.toggle("a");
        sel.toggle("c");

        let articles = vec![
            article("1", "a"),
            article("2", "b"),
            article("3", "c"),
            article("4", "a"),
        ];
        let filtered = sel.filter(&articles);
        let ids: Vec<&str> = filtered.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "3", "4"]);
    }

    #[test]
    fn test_empty_selection_filters_everything() {
        let sel = CategorySelection::new();
        let articles = vec![article("1", "a")];
        assert!(sel.filter(&articles).is_empty());
    }
}
