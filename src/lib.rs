//! Fleet Registry
//!
//! Ingests a schema-described corpus of engine and car documents, validates
//! every document against its declared JSON Schema, derives the
//! bidirectional car <-> engine relationship graph with temporal validity,
//! and serves typed engine lookups from an immutable snapshot.
//!
//! ## Features
//!
//! - **Schema Validation**: Draft 7 validation with complete per-document
//!   error reports
//! - **Referential Integrity**: corpus-wide uuid uniqueness and dangling
//!   reference detection, checked in both relationship directions
//! - **All-or-Nothing Loads**: no partially valid snapshot is ever published
//! - **Typed Dispatch**: closed `EngineVariant` set resolved by a match,
//!   never by reflection or attribute sniffing
//!
//! ## Architecture
//!
//! ```text
//! schemas/                         instances/
//! ├── engines/                     ├── engines/
//! │   ├── engine-gas.json          │   ├── engine-gas-1.json
//! │   ├── engine-electric.json     │   └── engine-electric-1.json
//! │   └── engine-hybrid.json       └── cars/
//! └── cars/                            └── car-sedan-1.json
//!     ├── car-sedan.json
//!     └── car-suv.json
//!
//! SchemaRegistry ──▶ RawDocument ──▶ validate ──▶ InstanceStore
//!                                                     │
//!                                   RelationshipGraph ◀┘ (cars forward,
//!                                       │                 engines inverse,
//!                                       ▼                 cross-checked)
//!                          Snapshot::resolve_engine(car, variant)
//! ```

pub mod config;
pub mod corpus;
pub mod document;
pub mod error;
pub mod fingerprint;
pub mod graph;
pub mod registry;
pub mod resolver;
pub mod schema;
pub mod store;
pub mod validator;

pub use config::FleetConfig;
pub use corpus::{validate_all, Corpus, LoadFailure, Snapshot};
pub use document::RawDocument;
pub use error::{
    CorpusError, Direction, ResolveError, Result, ValidationFailure, ValidationReport, Warning,
};
pub use fingerprint::Fingerprint;
pub use graph::{Relationship, RelationshipGraph, ValidityWindow};
pub use registry::{CompiledSchema, SchemaRegistry};
pub use resolver::{ElectricEngine, EngineRecord, GasEngine, HybridEngine};
pub use schema::{EngineVariant, EntityKind, SchemaType};
pub use store::{Instance, InstanceStore};
