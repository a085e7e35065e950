//! Structural validation of documents against their compiled schemas
//!
//! Purely functional: no mutation of the schema or the document, and every
//! violation in a document is collected into one report.

use crate::document::RawDocument;
use crate::error::{CorpusError, Result, ValidationFailure, ValidationReport};
use crate::registry::CompiledSchema;

/// Validate a document against a schema, collecting all violations.
pub fn validate(document: &RawDocument, schema: &CompiledSchema) -> Result<()> {
    let report = check(document, schema);
    if report.is_empty() {
        Ok(())
    } else {
        Err(CorpusError::Validation {
            path: document.path.clone(),
            report,
        })
    }
}

/// Like [`validate`] but hands back the raw report, empty when clean.
pub fn check(document: &RawDocument, schema: &CompiledSchema) -> ValidationReport {
    let mut report = ValidationReport::default();
    if let Err(errors) = schema.validator().validate(&document.body) {
        for error in errors {
            report.failures.push(ValidationFailure {
                path: error.instance_path.to_string(),
                message: error.to_string(),
            });
        }
    }
    report
}
