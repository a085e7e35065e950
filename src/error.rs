//! Error types for corpus loading and engine resolution

use std::fmt;

use thiserror::Error;

use crate::schema::SchemaType;

/// Result type for load-time operations
pub type Result<T> = std::result::Result<T, CorpusError>;

/// Fatal load-time errors. Any of these aborts the whole load; no snapshot
/// is published from a corpus that produced one.
#[derive(Error, Debug)]
pub enum CorpusError {
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("document {path} is missing identity field `{field}`")]
    MissingIdentityField { path: String, field: &'static str },

    #[error("document path {path} does not follow the <schema-type>-<discriminator>.json convention")]
    BadNamingConvention { path: String },

    #[error("invalid uuid `{uuid}` in {path}: {reason}")]
    InvalidUuid {
        path: String,
        uuid: String,
        reason: String,
    },

    #[error("no schema registered for type `{schema_type}` (document {path})")]
    SchemaNotFound { schema_type: SchemaType, path: String },

    #[error("invalid schema definition {path}: {message}")]
    InvalidSchema { path: String, message: String },

    #[error("duplicate schema definition for type `{schema_type}` ({path})")]
    DuplicateSchema { schema_type: SchemaType, path: String },

    #[error("validation failed for {path}:\n{report}")]
    Validation {
        path: String,
        report: ValidationReport,
    },

    #[error("invalid timestamp `{value}` for `{field}` in {uuid}: {reason}")]
    InvalidTimestamp {
        uuid: String,
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("duplicate uuid `{uuid}`: first loaded from {first}, duplicated by {second}")]
    DuplicateUuid {
        uuid: String,
        first: String,
        second: String,
    },

    #[error("car `{car_uuid}` references unknown engine `{engine_uuid}`")]
    DanglingEngineReference {
        car_uuid: String,
        engine_uuid: String,
    },

    #[error("engine `{engine_uuid}` back-references unknown car `{car_uuid}`")]
    DanglingCarReference {
        engine_uuid: String,
        car_uuid: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// A single schema violation within one document.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct ValidationFailure {
    /// JSON pointer to the offending value
    pub path: String,
    pub message: String,
}

/// Every violation found in one document. Callers get the complete set,
/// not just the first hit.
#[derive(Debug, Clone, Default, serde::Serialize)]
pub struct ValidationReport {
    pub failures: Vec<ValidationFailure>,
}

impl ValidationReport {
    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for failure in &self.failures {
            writeln!(f, "  - {}: {}", failure.path, failure.message)?;
        }
        Ok(())
    }
}

/// Non-fatal structural findings retained on the snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// The forward (car-side) and inverse (engine-side) relationship
    /// derivations disagree on this edge.
    DirectionalMismatch {
        car_uuid: String,
        engine_uuid: String,
        missing_in: Direction,
    },
}

/// Which derivation direction an edge was missing from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Edge present on the engine side only
    CarSide,
    /// Edge present on the car side only
    EngineSide,
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::DirectionalMismatch {
                car_uuid,
                engine_uuid,
                missing_in,
            } => {
                let side = match missing_in {
                    Direction::CarSide => "car's engineRelationships",
                    Direction::EngineSide => "engine's carUuids",
                };
                write!(
                    f,
                    "relationship {car_uuid} -> {engine_uuid} missing from {side}"
                )
            }
        }
    }
}

/// Errors scoped to a single resolver call. These never invalidate the
/// shared snapshot.
#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("unsupported engine variant `{requested}` (expected gas, electric, or hybrid)")]
    UnsupportedVariant { requested: String },

    #[error("invariant violation materializing `{uuid}`: {detail}")]
    InvariantViolation { uuid: String, detail: String },
}
