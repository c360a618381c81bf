//! Criterion compilation
//!
//! [`compile`] builds a native [`IndexQuery`]; [`render`] builds the
//! equivalent query string, which is what gets logged. Text values go
//! through the same analyzer used at write time, so equality ignores case
//! and punctuation.

use crate::criterion::{Combinator, Criterion, CriterionValue, Operator};
use crate::error::{GraphError, GraphResult};
use crate::graph::PropertyValue;
use crate::index::{Analyzer, IndexQuery};
use std::fmt;
use std::ops::Bound;

/// Token a missing range bound compiles to
pub const NULL_TOKEN: &str = "null";

/// Compile a criterion into an index query
pub fn compile(criterion: &Criterion, analyzer: &Analyzer) -> GraphResult<IndexQuery> {
    match criterion {
        Criterion::Simple { key, value, op } => {
            if *op != Operator::Eq {
                return Err(GraphError::validation(format!(
                    "operator {} on {} is not supported",
                    op.symbol(),
                    key
                )));
            }
            match value {
                CriterionValue::Nested(inner) => compile(inner, analyzer),
                CriterionValue::Value(value) => compile_equals(key, value, analyzer),
            }
        }
        Criterion::Range {
            key,
            min,
            max,
            min_inclusive,
            max_inclusive,
        } => compile_range(key, min, max, *min_inclusive, *max_inclusive, analyzer),
        Criterion::Set {
            combinator,
            children,
        } => {
            if children.is_empty() {
                return Err(GraphError::validation(format!(
                    "{} criterion has no children",
                    combinator.keyword()
                )));
            }
            let mut clauses = children
                .iter()
                .map(|child| compile(child, analyzer))
                .collect::<GraphResult<Vec<_>>>()?;
            if clauses.len() == 1 {
                return Ok(clauses.remove(0));
            }
            Ok(match combinator {
                Combinator::And => IndexQuery::must(clauses),
                Combinator::Or => IndexQuery::should(clauses),
            })
        }
    }
}

fn compile_equals(key: &str, value: &PropertyValue, analyzer: &Analyzer) -> GraphResult<IndexQuery> {
    match value {
        PropertyValue::String(text) => {
            let mut terms = analyzer.analyze(key, text);
            Ok(match terms.len() {
                0 => IndexQuery::term(key, text.as_str()),
                1 => IndexQuery::term(key, terms.remove(0)),
                _ => IndexQuery::must(
                    terms
                        .into_iter()
                        .map(|term| IndexQuery::term(key, term))
                        .collect(),
                ),
            })
        }
        PropertyValue::Integer(i) | PropertyValue::DateTime(i) => {
            Ok(IndexQuery::long_exact(key, *i))
        }
        PropertyValue::Float(f) => Ok(IndexQuery::double_exact(key, *f)),
        PropertyValue::Boolean(b) => Ok(IndexQuery::term(key, b.to_string())),
        PropertyValue::Null => Ok(IndexQuery::term(key, NULL_TOKEN)),
        PropertyValue::Array(values) => {
            if values.is_empty() {
                return Err(GraphError::validation(format!(
                    "empty list compared with {}",
                    key
                )));
            }
            // Any element may match, mirroring how lists are indexed
            let clauses = values
                .iter()
                .map(|v| compile_equals(key, v, analyzer))
                .collect::<GraphResult<Vec<_>>>()?;
            Ok(IndexQuery::should(clauses))
        }
    }
}

fn bound<T>(value: Option<T>, inclusive: bool) -> Bound<T> {
    match value {
        Some(v) if inclusive => Bound::Included(v),
        Some(v) => Bound::Excluded(v),
        None => Bound::Unbounded,
    }
}

fn compile_range(
    key: &str,
    min: &PropertyValue,
    max: &PropertyValue,
    min_inclusive: bool,
    max_inclusive: bool,
    analyzer: &Analyzer,
) -> GraphResult<IndexQuery> {
    use PropertyValue as V;

    let as_long = |v: &PropertyValue| match v {
        V::Integer(i) | V::DateTime(i) => Some(*i),
        _ => None,
    };
    let as_double = |v: &PropertyValue| match v {
        V::Integer(i) | V::DateTime(i) => Some(*i as f64),
        V::Float(f) => Some(*f),
        _ => None,
    };

    if matches!(min, V::Array(_)) || matches!(max, V::Array(_)) {
        return Err(GraphError::validation(format!(
            "range on {} cannot use a list bound",
            key
        )));
    }

    let numeric = min.is_numeric() || max.is_numeric();
    if numeric {
        let other_ok = |v: &PropertyValue| v.is_numeric() || v.is_null();
        if !other_ok(min) || !other_ok(max) {
            return Err(GraphError::validation(format!(
                "range on {} mixes numeric and non-numeric bounds",
                key
            )));
        }
        // A missing side of a numeric range is open
        let has_float = matches!(min, V::Float(_)) || matches!(max, V::Float(_));
        return Ok(if has_float {
            IndexQuery::DoubleRange {
                field: key.to_string(),
                lower: bound(as_double(min), min_inclusive),
                upper: bound(as_double(max), max_inclusive),
            }
        } else {
            IndexQuery::LongRange {
                field: key.to_string(),
                lower: bound(as_long(min), min_inclusive),
                upper: bound(as_long(max), max_inclusive),
            }
        });
    }

    let text_bound = |v: &PropertyValue| -> String {
        let text = v.to_plain_string().unwrap_or_else(|| NULL_TOKEN.to_string());
        analyzer
            .analyze(key, &text)
            .into_iter()
            .next()
            .unwrap_or(text)
    };

    Ok(IndexQuery::TermRange {
        field: key.to_string(),
        lower: bound(Some(text_bound(min)), min_inclusive),
        upper: bound(Some(text_bound(max)), max_inclusive),
    })
}

fn render_value(value: &PropertyValue) -> String {
    value
        .to_plain_string()
        .unwrap_or_else(|| NULL_TOKEN.to_string())
}

/// Query-string form of a criterion
pub fn render(criterion: &Criterion) -> String {
    match criterion {
        Criterion::Simple { key, value, op } => {
            let value = match value {
                CriterionValue::Nested(inner) => format!("({})", render(inner)),
                CriterionValue::Value(v) => render_value(v),
            };
            match op {
                Operator::Eq => format!("{}:{}", key, value),
                other => format!("{}{}{}", key, other.symbol(), value),
            }
        }
        Criterion::Range {
            key,
            min,
            max,
            min_inclusive,
            max_inclusive,
        } => format!(
            "{}:{}{} TO {}{}",
            key,
            if *min_inclusive { "[" } else { "{" },
            render_value(min),
            render_value(max),
            if *max_inclusive { "]" } else { "}" },
        ),
        Criterion::Set {
            combinator,
            children,
        } => match children.as_slice() {
            [] => String::new(),
            [only] => render(only),
            _ => children
                .iter()
                .map(|child| format!("({})", render(child)))
                .collect::<Vec<_>>()
                .join(&format!(" {} ", combinator.keyword())),
        },
    }
}

impl fmt::Display for Criterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}
