//! Positional parameter registration for dynamically built statements
//!
//! Identical values share one placeholder. Identity is the value's
//! [`FieldValue::semantic_key`], so `Integer(1)` and `String("1")` collapse.

use crate::core::error::QueryError;
use crate::core::field::FieldValue;
use std::collections::HashMap;

/// Ordered value → placeholder bindings for a single statement build
#[derive(Debug, Clone, Default)]
pub struct ParameterDeduplicator {
    positions: HashMap<String, usize>,
    values: Vec<FieldValue>,
}

impl ParameterDeduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a value, returning its 1-based placeholder index
    ///
    /// Re-registering a semantically equal value returns the existing index.
    pub fn add_parameter(&mut self, value: impl Into<FieldValue>) -> usize {
        let value = value.into();
        let key = value.semantic_key();
        if let Some(position) = self.positions.get(&key) {
            return *position;
        }

        self.values.push(value);
        let position = self.values.len();
        self.positions.insert(key, position);
        position
    }

    /// Register several values in order
    pub fn add_parameters<I, V>(&mut self, values: I) -> Vec<usize>
    where
        I: IntoIterator<Item = V>,
        V: Into<FieldValue>,
    {
        values
            .into_iter()
            .map(|value| self.add_parameter(value))
            .collect()
    }

    /// Placeholder index of a previously registered value
    pub fn placeholder(&self, value: &FieldValue) -> Result<usize, QueryError> {
        let key = value.semantic_key();
        self.positions
            .get(&key)
            .copied()
            .ok_or(QueryError::ParameterNotFound { value: key })
    }

    /// PostgreSQL placeholder text (`$n`) for a registered value
    pub fn placeholder_sql(&self, value: &FieldValue) -> Result<String, QueryError> {
        self.placeholder(value).map(|n| format!("${}", n))
    }

    /// Registered values in registration order
    pub fn parameters(&self) -> Vec<FieldValue> {
        self.values.clone()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
