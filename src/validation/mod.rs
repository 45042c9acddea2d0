//! Schema-driven validation of untrusted JSON input.
//!
//! A [`Rule`] maps a raw value (or its absence) to a normalized value or a
//! human-readable [`FieldError`]. A [`Schema`] maps field names to rules and is
//! applied to objects by [`ObjectRule`]; [`RequestSchema`] combines body, query and
//! path parameter validation for the request middleware.

pub mod rules;
pub mod schemas;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{AppError, AppResult};

pub use rules::{ArrayRule, NumberRule, ObjectRule, StringRule};

/// A single, human-readable validation failure.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct FieldError(pub String);

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

pub type RuleResult = Result<Value, FieldError>;

/// A validation rule for one field. `None` means the field was absent.
pub trait Rule: Send + Sync {
    fn validate(&self, value: Option<&Value>, field: &str) -> RuleResult;
}

impl<F> Rule for F
where
    F: Fn(Option<&Value>, &str) -> RuleResult + Send + Sync,
{
    fn validate(&self, value: Option<&Value>, field: &str) -> RuleResult {
        self(value, field)
    }
}

/// Ordered mapping from field name to rule.
#[derive(Clone, Default)]
pub struct Schema {
    fields: Vec<(String, Arc<dyn Rule>)>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a field. Declaring the same field twice replaces the earlier rule.
    pub fn field(mut self, name: impl Into<String>, rule: impl Rule + 'static) -> Self {
        let name = name.into();
        let rule: Arc<dyn Rule> = Arc::new(rule);
        match self.fields.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = rule,
            None => self.fields.push((name, rule)),
        }
        self
    }

    pub fn contains(&self, name: &str) -> bool {
        self.fields.iter().any(|(n, _)| n == name)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &dyn Rule)> {
        self.fields.iter().map(|(n, r)| (n.as_str(), r.as_ref()))
    }
}

impl std::fmt::Debug for Schema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.fields.iter().map(|(n, _)| n)).finish()
    }
}

/// Validation for the three parts of a request. Missing parts are not checked.
#[derive(Clone, Debug)]
pub struct RequestSchema {
    pub body: Option<ObjectRule>,
    pub query: Option<ObjectRule>,
    pub params: Option<ObjectRule>,
    /// Largest body the validator buffers, in bytes.
    pub max_body_bytes: usize,
}

impl Default for RequestSchema {
    fn default() -> Self {
        Self { body: None, query: None, params: None, max_body_bytes: 10 * 1024 * 1024 }
    }
}

impl RequestSchema {
    pub fn new() -> Self {
        Self::default()
    }

    /// Body schema; unknown keys are rejected.
    pub fn body(mut self, schema: Schema) -> Self {
        self.body = Some(ObjectRule::new(schema));
        self
    }

    /// Query schema; unknown keys are allowed.
    pub fn query(mut self, schema: Schema) -> Self {
        self.query = Some(ObjectRule::new(schema).allow_unknown(true));
        self
    }

    /// Path parameter schema; unknown keys are allowed.
    pub fn params(mut self, schema: Schema) -> Self {
        self.params = Some(ObjectRule::new(schema).allow_unknown(true));
        self
    }

    pub fn max_body_bytes(mut self, limit: usize) -> Self {
        self.max_body_bytes = limit;
        self
    }

    /// Validates every configured part and collects all failures.
    pub fn validate(&self, body: Option<&Value>, query: &Value, params: &Value) -> Result<Validated, Vec<String>> {
        let mut errors = Vec::new();
        let mut validated = Validated::default();

        if let Some(rule) = &self.body {
            match rule.validate(body, "body") {
                Ok(v) => validated.body = Some(v),
                Err(e) => errors.push(e.0),
            }
        }
        if let Some(rule) = &self.query {
            match rule.validate(Some(query), "query") {
                Ok(v) => validated.query = Some(v),
                Err(e) => errors.push(e.0),
            }
        }
        if let Some(rule) = &self.params {
            match rule.validate(Some(params), "params") {
                Ok(v) => validated.params = Some(v),
                Err(e) => errors.push(e.0),
            }
        }

        if errors.is_empty() {
            Ok(validated)
        } else {
            Err(errors)
        }
    }
}

/// Normalized request data, attached to the request by the validation middleware.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Validated {
    pub body: Option<Value>,
    pub query: Option<Value>,
    pub params: Option<Value>,
}

impl Validated {
    pub fn body_as<T: DeserializeOwned>(&self) -> AppResult<T> {
        Self::decode(self.body.as_ref(), "body")
    }

    pub fn query_as<T: DeserializeOwned>(&self) -> AppResult<T> {
        Self::decode(self.query.as_ref(), "query")
    }

    pub fn params_as<T: DeserializeOwned>(&self) -> AppResult<T> {
        Self::decode(self.params.as_ref(), "params")
    }

    fn decode<T: DeserializeOwned>(value: Option<&Value>, part: &str) -> AppResult<T> {
        let value = value.ok_or_else(|| AppError::internal(format!("request {} was not validated", part)))?;
        serde_json::from_value(value.clone()).map_err(|e| {
            tracing::debug!("Validated {} does not fit the handler type: {}", part, e);
            AppError::validation(format!("request {} is out of range", part))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use serde::Deserialize;
    use serde_json::json;

    #[derive(Debug, Deserialize)]
    struct IdParams {
        #[allow(dead_code)]
        id: i64,
    }

    #[test]
    fn decode_failure_is_a_validation_error() {
        let validated = Validated { params: Some(json!({ "id": 1e20 })), ..Validated::default() };
        let err = validated.params_as::<IdParams>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::ValidationError);
        assert_eq!(err.message, "request params is out of range");
    }

    #[test]
    fn decode_of_unvalidated_part_is_internal() {
        let err = Validated::default().body_as::<Value>().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InternalError);
    }
}
