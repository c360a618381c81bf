//! Documents stored in the index
//!
//! A document is an ordered list of named fields. The same name may appear
//! more than once; that is how multi-valued properties are kept.

use super::analyzer::Analyzer;
use serde::{Deserialize, Serialize};

/// Typed field value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldValue {
    /// Analyzed free text
    Text(String),
    /// Whole-value term
    Keyword(String),
    /// Ordered 64-bit integer
    Long(i64),
    /// Ordered double
    Double(f64),
    /// Epoch milliseconds, searchable like a long
    Date(i64),
    /// Indexed as the term `true` or `false`
    Boolean(bool),
    /// Stored only, never searchable
    Stored(String),
}

impl FieldValue {
    /// Text form of string-like values
    pub fn as_str(&self) -> Option<&str> {
        match self {
            FieldValue::Text(s) | FieldValue::Keyword(s) | FieldValue::Stored(s) => Some(s),
            _ => None,
        }
    }
}

/// A named field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    pub name: String,
    pub value: FieldValue,
}

/// Searchable entry derived from a field
#[derive(Debug, Clone, PartialEq)]
pub enum IndexEntry {
    Term { field: String, term: String },
    Long { field: String, value: i64 },
    Double { field: String, value: f64 },
}

/// Index document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    fields: Vec<Field>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a field
    pub fn add(&mut self, name: impl Into<String>, value: FieldValue) {
        self.fields.push(Field {
            name: name.into(),
            value,
        });
    }

    /// Builder-style append
    pub fn with(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.add(name, value);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// First value stored under `name`
    pub fn get(&self, name: &str) -> Option<&FieldValue> {
        self.fields.iter().find(|f| f.name == name).map(|f| &f.value)
    }

    /// Every value stored under `name`, in field order
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a FieldValue> + 'a {
        self.fields
            .iter()
            .filter(move |f| f.name == name)
            .map(|f| &f.value)
    }

    /// First string-like value stored under `name`
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(FieldValue::as_str)
    }

    /// Searchable entries for this document
    pub fn entries(&self, analyzer: &Analyzer) -> Vec<IndexEntry> {
        let mut entries = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            let name = &field.name;
            match &field.value {
                FieldValue::Text(text) => {
                    for term in analyzer.tokenize(text) {
                        entries.push(IndexEntry::Term {
                            field: name.clone(),
                            term,
                        });
                    }
                }
                FieldValue::Keyword(text) => entries.push(IndexEntry::Term {
                    field: name.clone(),
                    term: analyzer.keyword_term(name, text),
                }),
                FieldValue::Boolean(b) => entries.push(IndexEntry::Term {
                    field: name.clone(),
                    term: b.to_string(),
                }),
                FieldValue::Long(value) | FieldValue::Date(value) => {
                    entries.push(IndexEntry::Long {
                        field: name.clone(),
                        value: *value,
                    })
                }
                FieldValue::Double(value) => entries.push(IndexEntry::Double {
                    field: name.clone(),
                    value: *value,
                }),
                FieldValue::Stored(_) => {}
            }
        }
        entries
    }
}
