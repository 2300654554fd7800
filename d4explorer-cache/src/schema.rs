//! Structural validation of metadata records.
//!
//! The schema of [Metadata] is generated with `schemars`; records are checked
//! with a compiled `jsonschema` validator. Custom schemas are compiled the same
//! way, so every keyword of the schema's draft is enforced.

use std::fmt::{self, Debug, Display};
use std::sync::Arc;

use jsonschema::Validator;
use serde_json::Value;

use crate::errors::{CacheError, Result};
use crate::metadata::Metadata;

#[derive(Clone)]
pub struct Schema {
    value: Value,
    validator: Arc<Validator>,
}

impl Schema {
    ///
    /// Schema every metadata record is checked against.
    ///
    pub fn metadata() -> Result<Schema> {
        let root = schemars::schema_for!(Metadata);
        Schema::from_value(serde_json::to_value(root)?)
    }

    pub fn from_value(value: Value) -> Result<Schema> {
        if !(value.is_object() || value.is_boolean()) {
            return Err(CacheError::InvalidSchema(format!(
                "a schema must be an object or a boolean, got {}",
                value
            )));
        }
        let validator = jsonschema::validator_for(&value)
            .map_err(|e| CacheError::InvalidSchema(e.to_string()))?;
        Ok(Schema {
            value,
            validator: Arc::new(validator),
        })
    }

    pub fn from_json(json: &str) -> Result<Schema> {
        Schema::from_value(serde_json::from_str(json)?)
    }

    pub fn as_value(&self) -> &Value {
        &self.value
    }

    ///
    /// Check a JSON instance. The error lists every violation with the
    /// location it was found at.
    ///
    pub fn validate(&self, instance: &Value) -> Result<()> {
        let messages: Vec<String> = self
            .validator
            .iter_errors(instance)
            .map(|e| {
                let at = e.instance_path.to_string();
                let at = if at.is_empty() { "/".to_string() } else { at };
                format!("{}: {}", at, e)
            })
            .collect();
        if messages.is_empty() {
            Ok(())
        } else {
            Err(CacheError::SchemaValidation(messages.join("; ")))
        }
    }

    pub fn validate_metadata(&self, metadata: &Metadata) -> Result<()> {
        self.validate(&serde_json::to_value(metadata)?)
    }
}

impl PartialEq for Schema {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Schema").field("value", &self.value).finish()
    }
}

impl Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match serde_json::to_string_pretty(&self.value) {
            Ok(s) => f.write_str(&s),
            Err(_) => Err(fmt::Error),
        }
    }
}
