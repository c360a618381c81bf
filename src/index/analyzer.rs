//! Text analysis shared by indexing and querying
//!
//! Free text is split on anything that is not alphanumeric and lower-cased.
//! Keyword fields keep their whole value as a single lower-cased term.
//! Exact fields keep their whole value untouched.

use rustc_hash::FxHashSet;

/// Turns field text into index terms
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    keyword_fields: FxHashSet<String>,
    exact_fields: FxHashSet<String>,
}

impl Analyzer {
    /// Analyzer that treats every field as free text
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer that keeps the named fields whole
    pub fn with_keyword_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Analyzer {
            keyword_fields: fields.into_iter().map(Into::into).collect(),
            exact_fields: FxHashSet::default(),
        }
    }

    /// Keep the named fields whole and case-sensitive
    pub fn with_exact_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.exact_fields.extend(fields.into_iter().map(Into::into));
        self
    }

    pub fn is_keyword(&self, field: &str) -> bool {
        self.keyword_fields.contains(field)
    }

    pub fn is_exact(&self, field: &str) -> bool {
        self.exact_fields.contains(field)
    }

    /// Split free text into lower-cased alphanumeric tokens
    pub fn tokenize(&self, text: &str) -> Vec<String> {
        text.split(|c: char| !c.is_alphanumeric())
            .filter(|token| !token.is_empty())
            .map(str::to_lowercase)
            .collect()
    }

    /// Single term a whole-value field is indexed under
    pub fn keyword_term(&self, field: &str, text: &str) -> String {
        if self.is_exact(field) {
            text.to_string()
        } else {
            text.trim().to_lowercase()
        }
    }

    /// Terms a value of `field` is indexed under
    pub fn analyze(&self, field: &str, text: &str) -> Vec<String> {
        if self.is_exact(field) || self.is_keyword(field) {
            vec![self.keyword_term(field, text)]
        } else {
            self.tokenize(text)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize() {
        let analyzer = Analyzer::new();
        assert_eq!(analyzer.tokenize("Hello, World!"), vec!["hello", "world"]);
        assert_eq!(analyzer.tokenize("  "), Vec::<String>::new());
        assert_eq!(analyzer.tokenize("e-mail 42x"), vec!["e", "mail", "42x"]);
    }

    #[test]
    fn test_keyword_fields() {
        let analyzer = Analyzer::with_keyword_fields(["type"]);
        assert!(analyzer.is_keyword("type"));
        assert_eq!(analyzer.analyze("type", "Big Company"), vec!["big company"]);
        assert_eq!(analyzer.analyze("name", "Big Company"), vec!["big", "company"]);
    }

    #[test]
    fn test_exact_fields_keep_case_and_spaces() {
        let analyzer = Analyzer::with_keyword_fields(["type"]).with_exact_fields(["id"]);
        assert!(analyzer.is_exact("id"));
        assert!(!analyzer.is_keyword("id"));
        assert_eq!(analyzer.analyze("id", " Bob"), vec![" Bob"]);
        assert_eq!(analyzer.keyword_term("id", "Bob"), "Bob");
        assert_eq!(analyzer.keyword_term("type", " Person "), "person");
    }
}
