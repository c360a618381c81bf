//! Native index queries

use super::document::IndexEntry;
use std::fmt;
use std::ops::Bound;

/// Query understood by a [`super::DocumentIndex`]
#[derive(Debug, Clone, PartialEq)]
pub enum IndexQuery {
    /// Every live document
    All,
    /// Exact term on a field; the term must already be analyzed
    Term { field: String, term: String },
    /// Ordered range over long and date fields
    LongRange {
        field: String,
        lower: Bound<i64>,
        upper: Bound<i64>,
    },
    /// Ordered range over double fields
    DoubleRange {
        field: String,
        lower: Bound<f64>,
        upper: Bound<f64>,
    },
    /// Lexicographic range over a field's terms
    TermRange {
        field: String,
        lower: Bound<String>,
        upper: Bound<String>,
    },
    /// Conjunction of `must` clauses; when there are none, disjunction of `should`
    Boolean {
        must: Vec<IndexQuery>,
        should: Vec<IndexQuery>,
    },
}

impl IndexQuery {
    pub fn term(field: impl Into<String>, term: impl Into<String>) -> Self {
        IndexQuery::Term {
            field: field.into(),
            term: term.into(),
        }
    }

    /// Exact match on a long field
    pub fn long_exact(field: impl Into<String>, value: i64) -> Self {
        IndexQuery::LongRange {
            field: field.into(),
            lower: Bound::Included(value),
            upper: Bound::Included(value),
        }
    }

    /// Exact match on a double field
    pub fn double_exact(field: impl Into<String>, value: f64) -> Self {
        IndexQuery::DoubleRange {
            field: field.into(),
            lower: Bound::Included(value),
            upper: Bound::Included(value),
        }
    }

    pub fn must(clauses: Vec<IndexQuery>) -> Self {
        IndexQuery::Boolean {
            must: clauses,
            should: Vec::new(),
        }
    }

    pub fn should(clauses: Vec<IndexQuery>) -> Self {
        IndexQuery::Boolean {
            must: Vec::new(),
            should: clauses,
        }
    }

    /// Evaluate against the searchable entries of one document
    pub fn matches(&self, entries: &[IndexEntry]) -> bool {
        match self {
            IndexQuery::All => true,
            IndexQuery::Term { field, term } => entries.iter().any(|e| {
                matches!(e, IndexEntry::Term { field: f, term: t } if f == field && t == term)
            }),
            IndexQuery::LongRange {
                field,
                lower,
                upper,
            } => entries.iter().any(|e| match e {
                IndexEntry::Long { field: f, value } if f == field => {
                    in_bounds(value, lower.as_ref(), upper.as_ref())
                }
                _ => false,
            }),
            IndexQuery::DoubleRange {
                field,
                lower,
                upper,
            } => entries.iter().any(|e| match e {
                IndexEntry::Double { field: f, value } if f == field => {
                    in_bounds(value, lower.as_ref(), upper.as_ref())
                }
                _ => false,
            }),
            IndexQuery::TermRange {
                field,
                lower,
                upper,
            } => entries.iter().any(|e| match e {
                IndexEntry::Term { field: f, term } if f == field => in_bounds(
                    term.as_str(),
                    lower.as_ref().map(String::as_str),
                    upper.as_ref().map(String::as_str),
                ),
                _ => false,
            }),
            IndexQuery::Boolean { must, should } => {
                if !must.is_empty() {
                    must.iter().all(|q| q.matches(entries))
                } else {
                    should.iter().any(|q| q.matches(entries))
                }
            }
        }
    }
}

/// Check `value` against a pair of bounds
pub(crate) fn in_bounds<T: PartialOrd + ?Sized>(
    value: &T,
    lower: Bound<&T>,
    upper: Bound<&T>,
) -> bool {
    let above = match lower {
        Bound::Included(min) => value >= min,
        Bound::Excluded(min) => value > min,
        Bound::Unbounded => true,
    };
    let below = match upper {
        Bound::Included(max) => value <= max,
        Bound::Excluded(max) => value < max,
        Bound::Unbounded => true,
    };
    above && below
}

fn write_range<T: fmt::Display>(
    f: &mut fmt::Formatter<'_>,
    field: &str,
    lower: &Bound<T>,
    upper: &Bound<T>,
) -> fmt::Result {
    write!(f, "{}:", field)?;
    match lower {
        Bound::Included(v) => write!(f, "[{}", v)?,
        Bound::Excluded(v) => write!(f, "{{{}", v)?,
        Bound::Unbounded => write!(f, "[*")?,
    }
    write!(f, " TO ")?;
    match upper {
        Bound::Included(v) => write!(f, "{}]", v),
        Bound::Excluded(v) => write!(f, "{}}}", v),
        Bound::Unbounded => write!(f, "*]"),
    }
}

impl fmt::Display for IndexQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexQuery::All => write!(f, "*:*"),
            IndexQuery::Term { field, term } => write!(f, "{}:{}", field, term),
            IndexQuery::LongRange {
                field,
                lower,
                upper,
            } => write_range(f, field, lower, upper),
            IndexQuery::DoubleRange {
                field,
                lower,
                upper,
            } => write_range(f, field, lower, upper),
            IndexQuery::TermRange {
                field,
                lower,
                upper,
            } => write_range(f, field, lower, upper),
            IndexQuery::Boolean { must, should } => {
                let (prefix, clauses) = if must.is_empty() {
                    ("", should)
                } else {
                    ("+", must)
                };
                write!(f, "(")?;
                for (i, clause) in clauses.iter().enumerate() {
                    if i > 0 {
                        write!(f, " ")?;
                    }
                    write!(f, "{}{}", prefix, clause)?;
                }
                write!(f, ")")
            }
        }
    }
}
