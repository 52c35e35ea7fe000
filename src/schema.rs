//! Structural validation of JSON request bodies.
//!
//! A [`Schema`] is a fixed list of required fields and their primitive types.
//! Validation never stops at the first problem: every violation is reported.

use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    String,
    Integer,
}

impl FieldKind {
    const fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
        }
    }

    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => as_integer(value).is_some(),
        }
    }
}

/// Reads a JSON number as an integer when it has no fractional part, so `100.0` counts as `100`.
fn as_integer(value: &Value) -> Option<i64> {
    if let Some(n) = value.as_i64() {
        return Some(n);
    }
    let n = value.as_f64()?;
    // i64::MAX as f64 rounds up to 2^63, hence the strict upper bound.
    if n.fract() == 0.0 && n >= i64::MIN as f64 && n < i64::MAX as f64 {
        Some(n as i64)
    } else {
        None
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Field {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl Field {
    pub const fn new(name: &'static str, kind: FieldKind) -> Self {
        Self { name, kind }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Schema {
    fields: &'static [Field],
}

/// Payload accepted by `POST /books`.
pub const NEW_BOOK: Schema = Schema::new(&[
    Field::new("isbn", FieldKind::String),
    Field::new("amazon_url", FieldKind::String),
    Field::new("author", FieldKind::String),
    Field::new("language", FieldKind::String),
    Field::new("pages", FieldKind::Integer),
    Field::new("publisher", FieldKind::String),
    Field::new("title", FieldKind::String),
    Field::new("year", FieldKind::Integer),
]);

/// Payload accepted by `PUT /books/{isbn}`. The key itself is refused before validation.
pub const UPDATE_BOOK: Schema = Schema::new(&[
    Field::new("amazon_url", FieldKind::String),
    Field::new("author", FieldKind::String),
    Field::new("language", FieldKind::String),
    Field::new("pages", FieldKind::Integer),
    Field::new("publisher", FieldKind::String),
    Field::new("title", FieldKind::String),
    Field::new("year", FieldKind::Integer),
]);

impl Schema {
    pub const fn new(fields: &'static [Field]) -> Self {
        Self { fields }
    }

    pub const fn fields(&self) -> &'static [Field] {
        self.fields
    }

    pub fn validate(&self, payload: &Value) -> Result<(), SchemaError> {
        let Some(object) = payload.as_object() else {
            return Err(SchemaError(vec![
                "instance is not of a type(s) object".to_string(),
            ]));
        };

        let mut violations = Vec::new();
        for field in self.fields {
            match object.get(field.name) {
                None => violations.push(format!(r#"instance requires property "{}""#, field.name)),
                Some(value) if !field.kind.matches(value) => violations.push(format!(
                    "instance.{} is not of a type(s) {}",
                    field.name,
                    field.kind.name()
                )),
                Some(_) => {}
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SchemaError(violations))
        }
    }

    /// Rewrites whole-valued floats in integer fields as exact integers. Run after `validate`.
    pub fn normalize(&self, payload: &mut Value) {
        let Some(object) = payload.as_object_mut() else {
            return;
        };

        for field in self.fields {
            if field.kind != FieldKind::Integer {
                continue;
            }
            if let Some(value) = object.get_mut(field.name) {
                if let Some(n) = as_integer(value) {
                    *value = Value::from(n);
                }
            }
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{}", .0.join("; "))]
pub struct SchemaError(Vec<String>);

impl SchemaError {
    pub fn messages(&self) -> &[String] {
        &self.0
    }

    pub fn into_messages(self) -> Vec<String> {
        self.0
    }
}
