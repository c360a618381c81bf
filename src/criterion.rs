//! Criterion trees for querying nodes and relationships
//!
//! A criterion is one of three shapes: a key compared with a value, a key
//! within a range, or a boolean grouping of child criteria. See
//! [`crate::compiler`] for how they turn into index queries.

use crate::graph::PropertyValue;

/// Comparison operator of a simple criterion
///
/// Only `Eq` is executable; the others are reserved and fail compilation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Eq = 1,
    NotEq = 2,
    Gt = 3,
    Lt = 4,
    Ge = 5,
    Le = 6,
    Like = 7,
}

impl Operator {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(Operator::Eq),
            2 => Some(Operator::NotEq),
            3 => Some(Operator::Gt),
            4 => Some(Operator::Lt),
            5 => Some(Operator::Ge),
            6 => Some(Operator::Le),
            7 => Some(Operator::Like),
            _ => None,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::NotEq => "!=",
            Operator::Gt => ">",
            Operator::Lt => "<",
            Operator::Ge => ">=",
            Operator::Le => "<=",
            Operator::Like => "~",
        }
    }
}

/// How the children of a set criterion combine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Combinator {
    And = 1,
    Or = 2,
}

impl Combinator {
    pub fn keyword(self) -> &'static str {
        match self {
            Combinator::And => "AND",
            Combinator::Or => "OR",
        }
    }
}

/// Right-hand side of a simple criterion
#[derive(Debug, Clone, PartialEq)]
pub enum CriterionValue {
    Value(PropertyValue),
    /// A grouped condition standing in for a value
    Nested(Box<Criterion>),
}

/// Query predicate
#[derive(Debug, Clone, PartialEq)]
pub enum Criterion {
    Simple {
        key: String,
        value: CriterionValue,
        op: Operator,
    },
    Range {
        key: String,
        min: PropertyValue,
        max: PropertyValue,
        min_inclusive: bool,
        max_inclusive: bool,
    },
    Set {
        combinator: Combinator,
        children: Vec<Criterion>,
    },
}

impl Criterion {
    /// `key = value`
    pub fn equals(key: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Criterion::Simple {
            key: key.into(),
            value: CriterionValue::Value(value.into()),
            op: Operator::Eq,
        }
    }

    /// `key` compared with a nested criterion
    pub fn nested(key: impl Into<String>, criterion: Criterion) -> Self {
        Criterion::Simple {
            key: key.into(),
            value: CriterionValue::Nested(Box::new(criterion)),
            op: Operator::Eq,
        }
    }

    /// Range with both ends excluded
    pub fn range(
        key: impl Into<String>,
        min: impl Into<PropertyValue>,
        max: impl Into<PropertyValue>,
    ) -> Self {
        Criterion::Range {
            key: key.into(),
            min: min.into(),
            max: max.into(),
            min_inclusive: false,
            max_inclusive: false,
        }
    }

    /// Range with both ends included
    pub fn range_inclusive(
        key: impl Into<String>,
        min: impl Into<PropertyValue>,
        max: impl Into<PropertyValue>,
    ) -> Self {
        Criterion::Range {
            key: key.into(),
            min: min.into(),
            max: max.into(),
            min_inclusive: true,
            max_inclusive: true,
        }
    }

    pub fn and(children: Vec<Criterion>) -> Self {
        Criterion::Set {
            combinator: Combinator::And,
            children,
        }
    }

    pub fn or(children: Vec<Criterion>) -> Self {
        Criterion::Set {
            combinator: Combinator::Or,
            children,
        }
    }

    /// Add a child to a set criterion; other shapes are wrapped in an AND first
    pub fn push(self, child: Criterion) -> Self {
        match self {
            Criterion::Set {
                combinator,
                mut children,
            } => {
                children.push(child);
                Criterion::Set {
                    combinator,
                    children,
                }
            }
            other => Criterion::and(vec![other, child]),
        }
    }
}

/// A criterion plus execution options
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQuery {
    pub criterion: Criterion,
    /// Result cap; zero or negative means the index default
    pub max_results: i32,
    /// Hydrate relationship endpoints in results
    pub fetch_nodes: bool,
}

impl GraphQuery {
    pub fn new(criterion: Criterion) -> Self {
        GraphQuery {
            criterion,
            max_results: 0,
            fetch_nodes: false,
        }
    }

    pub fn with_max_results(mut self, max_results: i32) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_fetch_nodes(mut self, fetch_nodes: bool) -> Self {
        self.fetch_nodes = fetch_nodes;
        self
    }

    /// Hit cap to search with, given the index's default
    pub fn effective_max_hits(&self, default_max_hits: usize) -> usize {
        effective_max_hits(self.max_results, default_max_hits)
    }
}

/// Resolve a caller-supplied cap against the index default
pub fn effective_max_hits(max_results: i32, default_max_hits: usize) -> usize {
    if max_results <= 0 {
        default_max_hits
    } else {
        max_results as usize
    }
}
