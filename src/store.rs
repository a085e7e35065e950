//! Instance store
//!
//! The authoritative in-memory state: validated documents keyed by uuid and
//! by schema type. Uuid uniqueness is enforced at insertion; the store is
//! never patched in place, only rebuilt wholesale by a fresh load.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde_json::Value;

use crate::document::RawDocument;
use crate::error::{CorpusError, Result};
use crate::schema::{EntityKind, SchemaType};

/// A validated document held by the store. Immutable once inserted.
#[derive(Debug, Clone)]
pub struct Instance {
    pub uuid: String,
    pub name: String,
    pub schema_type: SchemaType,
    /// Resource path the instance was loaded from
    pub path: String,
    /// The validated payload
    pub payload: Value,
}

impl Instance {
    pub fn from_document(document: RawDocument) -> Self {
        Self {
            uuid: document.uuid,
            name: document.name,
            schema_type: document.schema_type,
            path: document.path,
            payload: document.body,
        }
    }

    pub fn kind(&self) -> Option<EntityKind> {
        self.schema_type.kind()
    }

    /// Attribute lookup on the validated payload.
    pub fn attribute(&self, field: &str) -> Option<&Value> {
        self.payload.get(field)
    }
}

/// Uuid-unique store of validated instances with a by-type index.
#[derive(Debug, Default)]
pub struct InstanceStore {
    by_uuid: HashMap<String, Instance>,
    // BTree keys give deterministic enumeration order for free
    by_type: BTreeMap<SchemaType, BTreeSet<String>>,
}

impl InstanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert-if-absent. A duplicate uuid is a fatal integrity error and
    /// leaves the store unchanged; silent overwrite would corrupt
    /// relationship resolution downstream.
    pub fn insert(&mut self, instance: Instance) -> Result<()> {
        if let Some(existing) = self.by_uuid.get(&instance.uuid) {
            return Err(CorpusError::DuplicateUuid {
                uuid: instance.uuid.clone(),
                first: existing.path.clone(),
                second: instance.path,
            });
        }
        self.by_type
            .entry(instance.schema_type.clone())
            .or_default()
            .insert(instance.uuid.clone());
        self.by_uuid.insert(instance.uuid.clone(), instance);
        Ok(())
    }

    pub fn get(&self, uuid: &str) -> Option<&Instance> {
        self.by_uuid.get(uuid)
    }

    pub fn contains(&self, uuid: &str) -> bool {
        self.by_uuid.contains_key(uuid)
    }

    /// All instances of one schema type, in uuid order.
    pub fn all_of_type(&self, schema_type: &SchemaType) -> impl Iterator<Item = &Instance> {
        self.by_type
            .get(schema_type)
            .into_iter()
            .flatten()
            .filter_map(move |uuid| self.by_uuid.get(uuid))
    }

    /// All instances of one entity kind, in (schema type, uuid) order.
    pub fn all_of_kind(&self, kind: EntityKind) -> impl Iterator<Item = &Instance> {
        self.by_type
            .iter()
            .filter(move |(tag, _)| tag.kind() == Some(kind))
            .flat_map(|(_, uuids)| uuids)
            .filter_map(move |uuid| self.by_uuid.get(uuid))
    }

    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }
}
