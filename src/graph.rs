//! Relationship graph
//!
//! Derives the car -> engine relationship index from validated instances.
//! The forward derivation reads each car's `engineRelationships` list and is
//! authoritative (it alone carries validity windows); the inverse derivation
//! reads each engine's `carUuids` back-references and serves as a structural
//! cross-check. Referential integrity is enforced in both directions;
//! disagreement between them is a warning, since one side can lag the other
//! during incremental edits.
//!
//! Read-only after construction, lifecycle tied to the store snapshot it was
//! derived from.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction as EdgeDirection;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{CorpusError, Direction, Result, Warning};
use crate::schema::EntityKind;
use crate::store::InstanceStore;

/// Temporal validity of one engine installation. `valid_to` absent means
/// the relationship is still in effect.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ValidityWindow {
    pub valid_from: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_to: Option<DateTime<Utc>>,
}

impl ValidityWindow {
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.valid_from && self.valid_to.map(|end| at < end).unwrap_or(true)
    }

    pub fn is_open(&self) -> bool {
        self.valid_to.is_none()
    }
}

/// One directed car -> engine edge with its validity window, as enumerated
/// out of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Relationship {
    pub car_uuid: String,
    pub engine_uuid: String,
    /// Present on forward-derived edges; the engine-side derivation carries
    /// no temporal data.
    pub window: Option<ValidityWindow>,
}

/// Uuid-keyed adjacency index over car -> engine edges.
#[derive(Debug)]
pub struct RelationshipGraph {
    graph: DiGraph<String, Option<ValidityWindow>>,
    nodes: HashMap<String, NodeIndex>,
}

impl RelationshipGraph {
    fn new() -> Self {
        Self {
            graph: DiGraph::new(),
            nodes: HashMap::new(),
        }
    }

    /// Forward derivation from car documents' `engineRelationships`.
    pub fn from_cars(store: &InstanceStore) -> Result<Self> {
        let mut index = Self::new();

        for car in store.all_of_kind(EntityKind::Car) {
            let entries = match car.attribute("engineRelationships") {
                Some(Value::Array(entries)) => entries.as_slice(),
                // A car without the attribute legitimately has no engines yet
                _ => continue,
            };
            for entry in entries {
                let engine_uuid = entry
                    .get("engineUuid")
                    .and_then(Value::as_str)
                    .ok_or_else(|| CorpusError::MissingIdentityField {
                        path: car.path.clone(),
                        field: "engineRelationships.engineUuid",
                    })?;
                check_reference(store, &car.uuid, engine_uuid)?;

                let window = ValidityWindow {
                    valid_from: parse_timestamp(entry, "validFrom", &car.uuid)?
                        .ok_or_else(|| CorpusError::InvalidTimestamp {
                            uuid: car.uuid.clone(),
                            field: "validFrom",
                            value: String::new(),
                            reason: "required timestamp is missing".to_string(),
                        })?,
                    valid_to: parse_timestamp(entry, "validTo", &car.uuid)?,
                };
                index.add_edge(&car.uuid, engine_uuid, Some(window));
            }
        }

        Ok(index)
    }

    /// Inverse derivation from engine documents' `carUuids` back-references.
    /// Edges still point car -> engine so both derivations are comparable.
    pub fn from_engines(store: &InstanceStore) -> Result<Self> {
        let mut index = Self::new();

        for engine in store.all_of_kind(EntityKind::Engine) {
            let uuids = match engine.attribute("carUuids") {
                Some(Value::Array(uuids)) => uuids.as_slice(),
                _ => continue,
            };
            for value in uuids {
                let car_uuid = value.as_str().ok_or_else(|| {
                    CorpusError::MissingIdentityField {
                        path: engine.path.clone(),
                        field: "carUuids",
                    }
                })?;
                let known_car = store
                    .get(car_uuid)
                    .map(|i| i.kind() == Some(EntityKind::Car))
                    .unwrap_or(false);
                if !known_car {
                    return Err(CorpusError::DanglingCarReference {
                        engine_uuid: engine.uuid.clone(),
                        car_uuid: car_uuid.to_string(),
                    });
                }
                index.add_edge(car_uuid, &engine.uuid, None);
            }
        }

        Ok(index)
    }

    /// Compare the two derivations edge-wise. Both must agree where both
    /// are present; a one-sided edge is a structural warning, not an error.
    ///
    /// A document that omits the back-reference attribute entirely has no
    /// derivation on that side, so its edges are exempt; an attribute that
    /// is present but does not list the counterpart is a real disagreement.
    pub fn cross_check(forward: &Self, inverse: &Self, store: &InstanceStore) -> Vec<Warning> {
        let forward_pairs = forward.pair_set();
        let inverse_pairs = inverse.pair_set();
        let mut warnings = Vec::new();

        for (car_uuid, engine_uuid) in forward_pairs.difference(&inverse_pairs) {
            if !has_attribute(store, engine_uuid, "carUuids") {
                continue;
            }
            let warning = Warning::DirectionalMismatch {
                car_uuid: car_uuid.clone(),
                engine_uuid: engine_uuid.clone(),
                missing_in: Direction::EngineSide,
            };
            warn!("{warning}");
            warnings.push(warning);
        }
        for (car_uuid, engine_uuid) in inverse_pairs.difference(&forward_pairs) {
            if !has_attribute(store, car_uuid, "engineRelationships") {
                continue;
            }
            let warning = Warning::DirectionalMismatch {
                car_uuid: car_uuid.clone(),
                engine_uuid: engine_uuid.clone(),
                missing_in: Direction::CarSide,
            };
            warn!("{warning}");
            warnings.push(warning);
        }

        warnings
    }

    /// Outgoing edges of one car, in engine-uuid order (deterministic
    /// tie-break for any enumeration). Unknown cars get an empty list.
    pub fn engines_for(&self, car_uuid: &str) -> Vec<Relationship> {
        let Some(&node) = self.nodes.get(car_uuid) else {
            return Vec::new();
        };
        let mut edges: Vec<Relationship> = self
            .graph
            .edges_directed(node, EdgeDirection::Outgoing)
            .map(|edge| Relationship {
                car_uuid: car_uuid.to_string(),
                engine_uuid: self.graph[edge.target()].clone(),
                window: edge.weight().clone(),
            })
            .collect();
        edges.sort_by(|a, b| (&a.engine_uuid, &a.window).cmp(&(&b.engine_uuid, &b.window)));
        edges
    }

    /// Cars referencing one engine, in uuid order.
    pub fn cars_for(&self, engine_uuid: &str) -> Vec<String> {
        let Some(&node) = self.nodes.get(engine_uuid) else {
            return Vec::new();
        };
        let cars: BTreeSet<String> = self
            .graph
            .edges_directed(node, EdgeDirection::Incoming)
            .map(|edge| self.graph[edge.source()].clone())
            .collect();
        cars.into_iter().collect()
    }

    /// The exportable snapshot: car uuid -> set of engine uuids. Consumed
    /// by external reporting collaborators; produced, never read back.
    pub fn export(&self) -> BTreeMap<String, BTreeSet<String>> {
        let mut mapping: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for edge in self.graph.edge_indices() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                mapping
                    .entry(self.graph[source].clone())
                    .or_default()
                    .insert(self.graph[target].clone());
            }
        }
        mapping
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn pair_set(&self) -> BTreeSet<(String, String)> {
        let mut pairs = BTreeSet::new();
        for edge in self.graph.edge_indices() {
            if let Some((source, target)) = self.graph.edge_endpoints(edge) {
                pairs.insert((self.graph[source].clone(), self.graph[target].clone()));
            }
        }
        pairs
    }

    fn node(&mut self, uuid: &str) -> NodeIndex {
        if let Some(&node) = self.nodes.get(uuid) {
            return node;
        }
        let node = self.graph.add_node(uuid.to_string());
        self.nodes.insert(uuid.to_string(), node);
        node
    }

    /// Set-wise accumulation: an identical (car, engine, window) edge is
    /// added once. Distinct windows between the same pair are distinct
    /// relationships (re-installation history).
    fn add_edge(&mut self, car_uuid: &str, engine_uuid: &str, window: Option<ValidityWindow>) {
        let car = self.node(car_uuid);
        let engine = self.node(engine_uuid);
        let duplicate = self
            .graph
            .edges_connecting(car, engine)
            .any(|edge| edge.weight() == &window);
        if !duplicate {
            self.graph.add_edge(car, engine, window);
        }
    }
}

fn has_attribute(store: &InstanceStore, uuid: &str, field: &str) -> bool {
    store
        .get(uuid)
        .map(|instance| instance.attribute(field).is_some())
        .unwrap_or(false)
}

fn check_reference(store: &InstanceStore, car_uuid: &str, engine_uuid: &str) -> Result<()> {
    let known_engine = store
        .get(engine_uuid)
        .map(|i| i.kind() == Some(EntityKind::Engine))
        .unwrap_or(false);
    if known_engine {
        Ok(())
    } else {
        Err(CorpusError::DanglingEngineReference {
            car_uuid: car_uuid.to_string(),
            engine_uuid: engine_uuid.to_string(),
        })
    }
}

fn parse_timestamp(
    entry: &Value,
    field: &'static str,
    car_uuid: &str,
) -> Result<Option<DateTime<Utc>>> {
    let Some(raw) = entry.get(field) else {
        return Ok(None);
    };
    let text = raw.as_str().ok_or_else(|| CorpusError::InvalidTimestamp {
        uuid: car_uuid.to_string(),
        field,
        value: raw.to_string(),
        reason: "expected an RFC 3339 string".to_string(),
    })?;
    let parsed = DateTime::parse_from_rfc3339(text).map_err(|e| CorpusError::InvalidTimestamp {
        uuid: car_uuid.to_string(),
        field,
        value: text.to_string(),
        reason: e.to_string(),
    })?;
    Ok(Some(parsed.with_timezone(&Utc)))
}
