//! Document loading
//!
//! Turns raw resource bytes into a structured document with its identity
//! fields extracted. Documents missing identity are rejected here, before
//! any schema validation is attempted.

use std::path::Path;

use serde_json::Value;

use crate::error::{CorpusError, Result};
use crate::schema::{check_uuid, SchemaType};

/// A parsed but not yet validated document.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Resource path the document came from
    pub path: String,
    /// Namespaced uuid, `<kind>:<discriminator>`
    pub uuid: String,
    /// Display name, non-empty
    pub name: String,
    /// Schema type derived from the resource path
    pub schema_type: SchemaType,
    /// Full parsed payload
    pub body: Value,
}

impl RawDocument {
    /// Parse one resource. Fails fast on malformed bytes, a path outside
    /// the naming convention, or missing/invalid identity fields.
    pub fn parse(path: &Path, bytes: &[u8]) -> Result<Self> {
        let display = path.display().to_string();

        let body: Value = serde_json::from_slice(bytes).map_err(|e| CorpusError::Parse {
            path: display.clone(),
            source: e,
        })?;

        let schema_type = SchemaType::from_instance_path(path)?;
        let kind = schema_type
            .kind()
            .ok_or_else(|| CorpusError::BadNamingConvention {
                path: display.clone(),
            })?;

        let name = identity_field(&body, "name", &display)?;
        let uuid = identity_field(&body, "uuid", &display)?;
        check_uuid(&uuid, kind).map_err(|reason| CorpusError::InvalidUuid {
            path: display.clone(),
            uuid: uuid.clone(),
            reason,
        })?;

        Ok(Self {
            path: display,
            uuid,
            name,
            schema_type,
            body,
        })
    }
}

fn identity_field(body: &Value, field: &'static str, path: &str) -> Result<String> {
    match body.get(field).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s.to_string()),
        _ => Err(CorpusError::MissingIdentityField {
            path: path.to_string(),
            field,
        }),
    }
}
