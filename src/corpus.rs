//! Corpus loading and the published snapshot
//!
//! The load-then-serve lifecycle: loader -> validator -> store ->
//! relationship builder, run once over the whole resource bag. A load is
//! all-or-nothing; on any fatal error no snapshot is published. The
//! published snapshot is immutable and freely shareable across threads.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;
use walkdir::WalkDir;

use crate::document::RawDocument;
use crate::error::{CorpusError, ResolveError, Result, Warning};
use crate::fingerprint::Fingerprint;
use crate::graph::{Relationship, RelationshipGraph};
use crate::registry::SchemaRegistry;
use crate::resolver::{self, EngineRecord};
use crate::schema::EngineVariant;
use crate::store::{Instance, InstanceStore};

/// One document's fatal load failure, with enough context to pinpoint the
/// offender without re-running anything.
#[derive(Debug)]
pub struct LoadFailure {
    pub path: String,
    pub error: CorpusError,
}

/// The immutable result of one successful load: authoritative instances,
/// the derived relationship graph, structural warnings, and the corpus
/// fingerprint. Concurrent resolver reads need no locking.
#[derive(Debug)]
pub struct Snapshot {
    store: InstanceStore,
    graph: RelationshipGraph,
    warnings: Vec<Warning>,
    fingerprint: Fingerprint,
}

impl Snapshot {
    pub fn store(&self) -> &InstanceStore {
        &self.store
    }

    pub fn graph(&self) -> &RelationshipGraph {
        &self.graph
    }

    /// Non-fatal structural findings from the load (cross-check results).
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    /// The sole external lookup entry point: which engine of the requested
    /// variant is installed in this car.
    pub fn resolve_engine(
        &self,
        car_uuid: &str,
        variant: EngineVariant,
    ) -> std::result::Result<Option<EngineRecord>, ResolveError> {
        resolver::resolve_engine(&self.store, &self.graph, car_uuid, variant)
    }

    /// All of a car's engine references with their validity windows.
    pub fn engines_for(&self, car_uuid: &str) -> Vec<Relationship> {
        self.graph.engines_for(car_uuid)
    }

    /// Exportable relationship snapshot for external reporting.
    pub fn export_relationships(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.graph.export()
    }
}

/// Corpus loading front end.
pub struct Corpus;

impl Corpus {
    /// Load a bag of (path, bytes) instance resources against a registry.
    ///
    /// Per-document failures are collected across the whole corpus before
    /// aborting, so one run reports every broken document. Corpus-wide
    /// integrity violations abort immediately: anything derived past a
    /// duplicate uuid or dangling reference would rest on a corrupt
    /// premise.
    pub fn load(
        registry: &SchemaRegistry,
        resources: &[(PathBuf, Vec<u8>)],
    ) -> std::result::Result<Snapshot, Vec<LoadFailure>> {
        let mut store = InstanceStore::new();
        let mut failures = Vec::new();

        for (path, bytes) in resources {
            match Self::load_one(registry, path, bytes) {
                Ok(document) => {
                    if let Err(error) = store.insert(Instance::from_document(document)) {
                        // duplicate uuid: corpus-wide, stop here
                        failures.push(LoadFailure {
                            path: path.display().to_string(),
                            error,
                        });
                        return Err(failures);
                    }
                }
                Err(error) => failures.push(LoadFailure {
                    path: path.display().to_string(),
                    error,
                }),
            }
        }
        if !failures.is_empty() {
            return Err(failures);
        }
        debug!(documents = store.len(), "corpus validated");

        let build = || -> Result<(RelationshipGraph, Vec<Warning>)> {
            let forward = RelationshipGraph::from_cars(&store)?;
            let inverse = RelationshipGraph::from_engines(&store)?;
            let warnings = RelationshipGraph::cross_check(&forward, &inverse, &store);
            Ok((forward, warnings))
        };
        let (graph, warnings) = build().map_err(|error| {
            vec![LoadFailure {
                path: String::new(),
                error,
            }]
        })?;
        debug!(
            edges = graph.edge_count(),
            warnings = warnings.len(),
            "relationship graph built"
        );

        // Lossy keeps non-UTF-8 paths distinguishable in the fingerprint
        // instead of collapsing them all to the same empty key.
        let keyed: Vec<(String, &[u8])> = resources
            .iter()
            .map(|(path, bytes)| (path.to_string_lossy().into_owned(), bytes.as_slice()))
            .collect();
        let fingerprint = Fingerprint::of_resources(keyed.iter().map(|(p, b)| (p.as_str(), *b)));

        Ok(Snapshot {
            store,
            graph,
            warnings,
            fingerprint,
        })
    }

    /// Walk an `instances/` tree and load every `.json` under it.
    pub fn load_dir(
        registry: &SchemaRegistry,
        instances_dir: impl AsRef<Path>,
    ) -> std::result::Result<Snapshot, Vec<LoadFailure>> {
        let root = instances_dir.as_ref();
        let mut resources = Vec::new();
        for entry in WalkDir::new(root).into_iter().filter_map(|e| e.ok()) {
            let path = entry.path();
            if !path.is_file() || path.extension().map(|e| e != "json").unwrap_or(true) {
                continue;
            }
            let relative = path.strip_prefix(root).unwrap_or(path).to_path_buf();
            match fs::read(path) {
                Ok(bytes) => resources.push((relative, bytes)),
                Err(e) => {
                    return Err(vec![LoadFailure {
                        path: path.display().to_string(),
                        error: e.into(),
                    }])
                }
            }
        }
        // Path order determines nothing downstream, but a stable input
        // makes failure reports reproducible.
        resources.sort_by(|a, b| a.0.cmp(&b.0));
        Self::load(registry, &resources)
    }

    fn load_one(registry: &SchemaRegistry, path: &Path, bytes: &[u8]) -> Result<RawDocument> {
        let document = RawDocument::parse(path, bytes)?;
        let schema = registry.get(&document.schema_type).ok_or_else(|| {
            CorpusError::SchemaNotFound {
                schema_type: document.schema_type.clone(),
                path: document.path.clone(),
            }
        })?;
        crate::validator::validate(&document, schema)?;
        Ok(document)
    }
}

/// Validation-report API: validate the whole corpus and hand back either
/// the published snapshot or the complete failure list.
pub fn validate_all(
    registry: &SchemaRegistry,
    resources: &[(PathBuf, Vec<u8>)],
) -> std::result::Result<Snapshot, Vec<LoadFailure>> {
    Corpus::load(registry, resources)
}
