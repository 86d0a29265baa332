use std::{collections::BTreeSet, ops::Bound};

/// Sorted dictionary of every label seen, used for autocomplete.
#[derive(Debug, Clone, Default)]
pub struct LabelVocabulary {
    labels: BTreeSet<String>,
}

impl LabelVocabulary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the label was not known before.
    pub fn insert(&mut self, label: &str) -> bool {
        if self.labels.contains(label) {
            return false;
        }
        self.labels.insert(label.to_string())
    }

    /// All labels starting with `prefix`, in lexicographic order.
    pub fn prefix_matches(&self, prefix: &str) -> Vec<String> {
        self.labels
            .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
            .take_while(|label| label.starts_with(prefix))
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vocab(labels: &[&str]) -> LabelVocabulary {
        let mut v = LabelVocabulary::new();
        for label in labels {
            v.insert(label);
        }
        v
    }

    #[test]
    fn prefix_matches_are_sorted() {
        let v = vocab(&["common_z", "common_test_label", "unique", "common_a"]);
        assert_eq!(
            v.prefix_matches("common_"),
            vec!["common_a", "common_test_label", "common_z"]
        );
    }

    #[test]
    fn prefix_is_case_sensitive() {
        let v = vocab(&["Prod", "prod"]);
        assert_eq!(v.prefix_matches("pr"), vec!["prod"]);
    }

    #[test]
    fn empty_prefix_lists_everything() {
        let v = vocab(&["b", "a"]);
        assert_eq!(v.prefix_matches(""), vec!["a", "b"]);
    }

    #[test]
    fn insert_reports_novelty() {
        let mut v = LabelVocabulary::new();
        assert!(v.insert("x"));
        assert!(!v.insert("x"));
        assert_eq!(v.len(), 1);
    }

    #[test]
    fn no_match_returns_empty() {
        let v = vocab(&["alpha"]);
        assert!(v.prefix_matches("beta").is_empty());
    }
}
