//! Schema Registry
//!
//! Loads the schema definitions once, compiles them (JSON Schema Draft 7),
//! and serves them by schema-type tag for the process lifetime.
//!
//! Layout convention: `schemas/<kind>/<schema-type>.json`, e.g.
//! `schemas/engines/engine-gas.json`. A canonical schema set is compiled
//! into the binary so the registry also works with no filesystem setup.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use include_dir::{include_dir, Dir};
use jsonschema::{Draft, JSONSchema};
use walkdir::WalkDir;

use crate::error::{CorpusError, Result};
use crate::schema::{EntityKind, SchemaType};

/// Canonical schema set shipped with the crate.
static CANONICAL_SCHEMAS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

/// A schema definition compiled and ready to validate instances.
pub struct CompiledSchema {
    /// Tag instances use to select this schema
    pub schema_type: SchemaType,
    /// The schema document as loaded
    pub source: serde_json::Value,
    compiled: JSONSchema,
}

impl CompiledSchema {
    /// Compile a schema document. The original corpus was validated with
    /// Draft 7, so that draft is pinned rather than inferred.
    pub fn compile(schema_type: SchemaType, source: serde_json::Value, path: &str) -> Result<Self> {
        let compiled = JSONSchema::options()
            .with_draft(Draft::Draft7)
            .compile(&source)
            .map_err(|e| CorpusError::InvalidSchema {
                path: path.to_string(),
                message: e.to_string(),
            })?;
        Ok(Self {
            schema_type,
            source,
            compiled,
        })
    }

    pub(crate) fn validator(&self) -> &JSONSchema {
        &self.compiled
    }
}

/// The registry of compiled schemas, keyed by schema type.
pub struct SchemaRegistry {
    schemas: HashMap<SchemaType, CompiledSchema>,
}

impl SchemaRegistry {
    /// Load and compile every `.json` schema under `root`.
    pub fn from_dir(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut registry = Self {
            schemas: HashMap::new(),
        };

        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path);
            let bytes = fs::read(path)?;
            registry.insert_source(relative, &bytes)?;
        }

        Ok(registry)
    }

    /// Build the registry from the compiled-in canonical schema set.
    pub fn embedded() -> Result<Self> {
        let mut registry = Self {
            schemas: HashMap::new(),
        };
        let mut files = Vec::new();
        collect_embedded(&CANONICAL_SCHEMAS, &mut files);
        for (path, bytes) in files {
            registry.insert_source(path, bytes)?;
        }
        Ok(registry)
    }

    /// Look up the compiled schema for a schema type. A miss is mapped to
    /// `SchemaNotFound` by the corpus loader, which knows the document path.
    pub fn get(&self, schema_type: &SchemaType) -> Option<&CompiledSchema> {
        self.schemas.get(schema_type)
    }

    /// All registered schema types, in deterministic order.
    pub fn types(&self) -> Vec<&SchemaType> {
        let mut types: Vec<_> = self.schemas.keys().collect();
        types.sort();
        types
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    /// Parse, tag, kind-check, and compile one schema resource.
    fn insert_source(&mut self, relative: &Path, bytes: &[u8]) -> Result<()> {
        let display = relative.display().to_string();

        // Schema files are named exactly after their schema type.
        let stem = relative
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| CorpusError::BadNamingConvention {
                path: display.clone(),
            })?;
        let schema_type = SchemaType::new(stem);
        // Two files with the same stem would silently shadow one another.
        if self.schemas.contains_key(&schema_type) {
            return Err(CorpusError::DuplicateSchema { schema_type, path: display });
        }
        let kind = schema_type
            .kind()
            .ok_or_else(|| CorpusError::BadNamingConvention {
                path: display.clone(),
            })?;
        if let Some(dir) = relative
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
        {
            if EntityKind::all().iter().any(|k| k.dir_name() == dir)
                && dir != kind.dir_name()
            {
                return Err(CorpusError::BadNamingConvention { path: display });
            }
        }

        let source: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| CorpusError::Parse {
                path: display.clone(),
                source: e,
            })?;
        let compiled = CompiledSchema::compile(schema_type.clone(), source, &display)?;
        self.schemas.insert(schema_type, compiled);
        Ok(())
    }
}

/// Recursively collect JSON files from the embedded directory
fn collect_embedded<'a>(dir: &'a Dir<'static>, files: &mut Vec<(&'a Path, &'a [u8])>) {
    for file in dir.files() {
        if file.path().extension().map(|e| e == "json").unwrap_or(false) {
            files.push((file.path(), file.contents()));
        }
    }
    for sub in dir.dirs() {
        collect_embedded(sub, files);
    }
}
