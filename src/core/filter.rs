// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Boolean metadata filters and their compiled form
//!
//! A filter is a recursive tree of typed leaf conditions joined by AND/OR
//! combinators. Compilation produces a [`Predicate`] that can be evaluated
//! in-process against a document's metadata, or handed to a backend as a
//! query fragment plus an ordered list of bound values. Values are never
//! interpolated into the fragment as literals.

use crate::core::types::{MetaValue, Metadata, Scalar};
use serde_json::Value as JsonValue;
use thiserror::Error;

/// Errors that can occur while parsing or compiling a filter tree
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FilterError {
    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Unsupported operator: {0}")]
    UnsupportedOperator(String),
}

/// Comparison operator of a leaf condition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
    In,
}

impl Operator {
    /// Parse a wire token such as `"EQ"` or `"LTE"`.
    pub fn parse(token: &str) -> Result<Self, FilterError> {
        match token {
            "EQ" => Ok(Operator::Eq),
            "NEQ" => Ok(Operator::Neq),
            "LT" => Ok(Operator::Lt),
            "LTE" => Ok(Operator::Lte),
            "GT" => Ok(Operator::Gt),
            "GTE" => Ok(Operator::Gte),
            "IN" => Ok(Operator::In),
            other => Err(FilterError::UnsupportedOperator(other.to_string())),
        }
    }

    fn is_ordering(&self) -> bool {
        matches!(
            self,
            Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte
        )
    }

    fn json_path_op(&self) -> &'static str {
        match self {
            Operator::Eq => "==",
            Operator::Neq => "!=",
            Operator::Lt => "<",
            Operator::Lte => "<=",
            Operator::Gt => ">",
            Operator::Gte => ">=",
            Operator::In => "in",
        }
    }
}

/// Recursive filter tree: a leaf condition or an AND/OR group
///
/// Built bottom-up by the caller, so plain recursive ownership suffices.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterNode {
    Leaf {
        key: String,
        oper: Operator,
        value: MetaValue,
    },
    And(Vec<FilterNode>),
    Or(Vec<FilterNode>),
}

impl FilterNode {
    /// Convenience constructor for a leaf condition.
    pub fn leaf(key: impl Into<String>, oper: Operator, value: impl Into<MetaValue>) -> Self {
        FilterNode::Leaf {
            key: key.into(),
            oper,
            value: value.into(),
        }
    }

    /// Parse a filter from its JSON wire form
    ///
    /// Accepted shapes:
    /// - leaf: `{"key": "price", "oper": "LTE", "value": 20}`
    /// - groups: `{"_and": [..]}`, `{"_or": [..]}`
    /// - field shorthand: `{"author": {"IN": ["Alice", "Bob"]}}` and
    ///   `{"category": "books"}` (implicit EQ)
    ///
    /// # Examples
    ///
    /// ```
    /// use serde_json::json;
    /// use doc_vector_store::core::filter::FilterNode;
    ///
    /// let filter = FilterNode::from_json(&json!({
    ///     "_and": [
    ///         { "key": "category", "oper": "EQ", "value": "books" },
    ///         { "key": "price", "oper": "LTE", "value": 20 }
    ///     ]
    /// })).unwrap();
    /// let predicate = filter.compile().unwrap();
    /// ```
    pub fn from_json(value: &JsonValue) -> Result<Self, FilterError> {
        let map = match value {
            JsonValue::Object(map) => map,
            _ => {
                return Err(FilterError::InvalidFilter(
                    "filter must be a JSON object".to_string(),
                ))
            }
        };

        if let Some(children) = map.get("_and") {
            return Self::parse_group(children, true);
        }

        if let Some(children) = map.get("_or") {
            return Self::parse_group(children, false);
        }

        // Explicit leaf form: { key, oper, value }
        if map.contains_key("key") || map.contains_key("oper") {
            let key = map
                .get("key")
                .and_then(|v| v.as_str())
                .ok_or_else(|| FilterError::InvalidFilter("leaf is missing 'key'".to_string()))?;
            let token = map
                .get("oper")
                .and_then(|v| v.as_str())
                .ok_or_else(|| FilterError::InvalidFilter("leaf is missing 'oper'".to_string()))?;
            let raw = map
                .get("value")
                .ok_or_else(|| FilterError::InvalidFilter("leaf is missing 'value'".to_string()))?;
            return Ok(FilterNode::Leaf {
                key: key.to_string(),
                oper: Operator::parse(token)?,
                value: parse_value(raw)?,
            });
        }

        // Field shorthand: a single { field: value } or { field: { OPER: value } }
        if map.len() == 1 {
            let (field, field_value) = map.iter().next().unwrap();
            if field.starts_with('_') {
                return Err(FilterError::UnsupportedOperator(field.clone()));
            }
            return Self::parse_field_shorthand(field, field_value);
        }

        Err(FilterError::InvalidFilter(
            "expected a leaf, '_and' group, or '_or' group".to_string(),
        ))
    }

    fn parse_group(value: &JsonValue, conjunction: bool) -> Result<Self, FilterError> {
        let items = match value {
            JsonValue::Array(items) => items,
            _ => {
                let name = if conjunction { "_and" } else { "_or" };
                return Err(FilterError::InvalidFilter(format!(
                    "{} must be an array",
                    name
                )));
            }
        };

        if items.is_empty() {
            let name = if conjunction { "_and" } else { "_or" };
            return Err(FilterError::InvalidFilter(format!(
                "{} group must not be empty",
                name
            )));
        }

        let mut children = Vec::with_capacity(items.len());
        for item in items {
            children.push(Self::from_json(item)?);
        }

        Ok(if conjunction {
            FilterNode::And(children)
        } else {
            FilterNode::Or(children)
        })
    }

    fn parse_field_shorthand(field: &str, value: &JsonValue) -> Result<Self, FilterError> {
        if let JsonValue::Object(ops) = value {
            if ops.len() == 1 {
                let (token, raw) = ops.iter().next().unwrap();
                return Ok(FilterNode::Leaf {
                    key: field.to_string(),
                    oper: Operator::parse(token)?,
                    value: parse_value(raw)?,
                });
            }
            return Err(FilterError::InvalidFilter(format!(
                "field '{}' must map to a single operator",
                field
            )));
        }

        // Bare value is an implicit EQ.
        Ok(FilterNode::Leaf {
            key: field.to_string(),
            oper: Operator::Eq,
            value: parse_value(value)?,
        })
    }

    /// Compile this tree into an evaluable [`Predicate`].
    ///
    /// Structural recursion mirroring the tree shape: groups parenthesize
    /// their children so mixed AND/OR nesting stays unambiguous, and bound
    /// values are enumerated left-to-right depth-first, matching the
    /// placeholder order in the fragment.
    pub fn compile(&self) -> Result<Predicate, FilterError> {
        let mut fragment = String::new();
        let mut binds = Vec::new();
        emit(self, &mut fragment, &mut binds)?;
        Ok(Predicate {
            node: Some(self.clone()),
            fragment,
            binds,
        })
    }

    /// Compile an optional filter; `None` yields the always-true predicate.
    pub fn compile_opt(filter: Option<&FilterNode>) -> Result<Predicate, FilterError> {
        match filter {
            Some(node) => node.compile(),
            None => Ok(Predicate::always_true()),
        }
    }
}

fn parse_value(raw: &JsonValue) -> Result<MetaValue, FilterError> {
    serde_json::from_value(raw.clone())
        .map_err(|_| FilterError::InvalidFilter(format!("unsupported filter value: {}", raw)))
}

/// Validate a leaf's operand types. Ordering operators need a numeric
/// scalar; IN needs a list; the rest need a scalar.
fn check_leaf(key: &str, oper: Operator, value: &MetaValue) -> Result<(), FilterError> {
    match (oper, value) {
        (Operator::In, MetaValue::List(_)) => Ok(()),
        (Operator::In, MetaValue::Scalar(_)) => Err(FilterError::InvalidFilter(format!(
            "IN on '{}' requires a list value",
            key
        ))),
        (op, MetaValue::Scalar(s)) if op.is_ordering() => {
            if s.as_num().is_some() {
                Ok(())
            } else {
                Err(FilterError::InvalidFilter(format!(
                    "{:?} on '{}' requires a numeric value, got '{}'",
                    op, key, s
                )))
            }
        }
        (op, MetaValue::List(_)) => Err(FilterError::InvalidFilter(format!(
            "{:?} on '{}' does not accept a list value",
            op, key
        ))),
        _ => Ok(()),
    }
}

fn emit(node: &FilterNode, out: &mut String, binds: &mut Vec<Scalar>) -> Result<(), FilterError> {
    match node {
        FilterNode::Leaf { key, oper, value } => {
            check_leaf(key, *oper, value)?;
            match value {
                MetaValue::Scalar(s) => {
                    out.push_str(&format!(
                        "JSON_EXISTS(metadata, '$.{}?(@ {} :bind{})')",
                        key,
                        oper.json_path_op(),
                        binds.len()
                    ));
                    binds.push(s.clone());
                }
                MetaValue::List(items) => {
                    let placeholders: Vec<String> = (binds.len()..binds.len() + items.len())
                        .map(|i| format!(":bind{}", i))
                        .collect();
                    out.push_str(&format!(
                        "JSON_EXISTS(metadata, '$.{}?(@ in ({}))')",
                        key,
                        placeholders.join(", ")
                    ));
                    binds.extend(items.iter().cloned());
                }
            }
            Ok(())
        }
        FilterNode::And(children) | FilterNode::Or(children) => {
            if children.is_empty() {
                return Err(FilterError::InvalidFilter(
                    "group must have at least one child".to_string(),
                ));
            }
            let joiner = match node {
                FilterNode::And(_) => " AND ",
                _ => " OR ",
            };
            out.push('(');
            for (i, child) in children.iter().enumerate() {
                if i > 0 {
                    out.push_str(joiner);
                }
                emit(child, out, binds)?;
            }
            out.push(')');
            Ok(())
        }
    }
}

/// Compiled filter: in-process matcher plus backend query fragment
///
/// The fragment uses positional `:bindN` placeholders; [`Predicate::binds`]
/// returns the parallel value list in placeholder order. Both evaluation
/// forms agree on every metadata map.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    node: Option<FilterNode>,
    fragment: String,
    binds: Vec<Scalar>,
}

impl Predicate {
    /// Predicate that matches every document (absent filter).
    pub fn always_true() -> Self {
        Predicate {
            node: None,
            fragment: "1 = 1".to_string(),
            binds: Vec::new(),
        }
    }

    pub fn fragment(&self) -> &str {
        &self.fragment
    }

    pub fn binds(&self) -> &[Scalar] {
        &self.binds
    }

    /// Evaluate in-process against a single document's metadata.
    pub fn matches(&self, metadata: &Metadata) -> bool {
        match &self.node {
            Some(node) => eval(node, metadata),
            None => true,
        }
    }
}

fn eval(node: &FilterNode, metadata: &Metadata) -> bool {
    match node {
        FilterNode::Leaf { key, oper, value } => eval_leaf(key, *oper, value, metadata),
        FilterNode::And(children) => children.iter().all(|c| eval(c, metadata)),
        FilterNode::Or(children) => children.iter().any(|c| eval(c, metadata)),
    }
}

/// Leaf evaluation. A missing key never matches, including under NEQ:
/// the backend form tests a path into the metadata document, and a path
/// that does not exist fails the condition outright.
fn eval_leaf(key: &str, oper: Operator, value: &MetaValue, metadata: &Metadata) -> bool {
    let field = match metadata.get(key) {
        Some(field) => field,
        None => return false,
    };

    match oper {
        Operator::Eq => eval_eq(field, value),
        Operator::Neq => !eval_eq(field, value),
        Operator::Lt | Operator::Lte | Operator::Gt | Operator::Gte => {
            let (lhs, rhs) = match (field, value) {
                (MetaValue::Scalar(f), MetaValue::Scalar(v)) => match (f.as_num(), v.as_num()) {
                    (Some(lhs), Some(rhs)) => (lhs, rhs),
                    _ => return false,
                },
                _ => return false,
            };
            match oper {
                Operator::Lt => lhs < rhs,
                Operator::Lte => lhs <= rhs,
                Operator::Gt => lhs > rhs,
                _ => lhs >= rhs,
            }
        }
        Operator::In => match (field, value) {
            (MetaValue::Scalar(f), MetaValue::List(values)) => values.contains(f),
            (MetaValue::List(items), MetaValue::List(values)) => {
                items.iter().any(|item| values.contains(item))
            }
            _ => false,
        },
    }
}

/// EQ semantics: exact scalar equality, or containment when the metadata
/// field is list-valued (a multi-valued field matches any of its elements).
fn eval_eq(field: &MetaValue, value: &MetaValue) -> bool {
    match (field, value) {
        (MetaValue::Scalar(f), MetaValue::Scalar(v)) => f == v,
        (MetaValue::List(items), MetaValue::Scalar(v)) => items.contains(v),
        _ => false,
    }
}
