//! Typed engine resolution
//!
//! A pure lookup pipeline: car uuid -> relationship edges -> instances of
//! the requested variant's schema type -> one typed record. Replaces the
//! original's reflection-driven class dispatch with a closed variant enum
//! and a match.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::ResolveError;
use crate::graph::RelationshipGraph;
use crate::schema::EngineVariant;
use crate::store::{Instance, InstanceStore};

/// Draft 7's `"integer"` admits floats with a zero fraction (`280.0`),
/// so the typed records must too.
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let number = serde_json::Number::deserialize(deserializer)?;
    if let Some(i) = number.as_i64() {
        return Ok(i);
    }
    if let Some(f) = number.as_f64() {
        if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
            return Ok(f as i64);
        }
    }
    Err(serde::de::Error::custom(format!(
        "expected a whole number, got {number}"
    )))
}

fn opt_whole_number<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    #[derive(Deserialize)]
    struct Wrapped(#[serde(deserialize_with = "whole_number")] i64);

    Option::<Wrapped>::deserialize(deserializer).map(|opt| opt.map(|Wrapped(i)| i))
}

/// Gas engine record. Required: `horsepower`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GasEngine {
    pub name: String,
    pub uuid: String,
    #[serde(deserialize_with = "whole_number")]
    pub horsepower: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_efficiency: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub fuel_types: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub car_uuids: BTreeSet<String>,
}

/// Electric engine record. Required: `batteryCapacity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ElectricEngine {
    pub name: String,
    pub uuid: String,
    pub battery_capacity: f64,
    #[serde(
        default,
        deserialize_with = "opt_whole_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub range_miles: Option<i64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub charging_types: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub car_uuids: BTreeSet<String>,
}

/// Hybrid engine record. Required: `horsepower` and `batteryCapacity`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HybridEngine {
    pub name: String,
    pub uuid: String,
    #[serde(deserialize_with = "whole_number")]
    pub horsepower: i64,
    pub battery_capacity: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fuel_efficiency: Option<f64>,
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub car_uuids: BTreeSet<String>,
}

/// A materialized, variant-typed engine.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "variant", rename_all = "lowercase")]
pub enum EngineRecord {
    Gas(GasEngine),
    Electric(ElectricEngine),
    Hybrid(HybridEngine),
}

impl EngineRecord {
    pub fn variant(&self) -> EngineVariant {
        match self {
            EngineRecord::Gas(_) => EngineVariant::Gas,
            EngineRecord::Electric(_) => EngineVariant::Electric,
            EngineRecord::Hybrid(_) => EngineVariant::Hybrid,
        }
    }

    pub fn uuid(&self) -> &str {
        match self {
            EngineRecord::Gas(e) => &e.uuid,
            EngineRecord::Electric(e) => &e.uuid,
            EngineRecord::Hybrid(e) => &e.uuid,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            EngineRecord::Gas(e) => &e.name,
            EngineRecord::Electric(e) => &e.name,
            EngineRecord::Hybrid(e) => &e.name,
        }
    }
}

/// Resolve the engine of the requested variant currently linked to a car.
///
/// A car with no relationship entry (or no entry at all in the store) is a
/// clean no-match; whether the car exists is a question for the caller.
/// Multiple concurrent engines of the same variant are a data-quality
/// issue: the lexically smallest uuid wins and the ambiguity is logged.
pub fn resolve_engine(
    store: &InstanceStore,
    graph: &RelationshipGraph,
    car_uuid: &str,
    variant: EngineVariant,
) -> Result<Option<EngineRecord>, ResolveError> {
    let wanted = variant.schema_type();

    // engines_for is already uuid-ordered, so the first match is the
    // deterministic pick
    let mut matches: Vec<&Instance> = graph
        .engines_for(car_uuid)
        .iter()
        .filter_map(|edge| store.get(&edge.engine_uuid))
        .filter(|instance| instance.schema_type == wanted)
        .collect();
    matches.dedup_by(|a, b| a.uuid == b.uuid);

    let Some(chosen) = matches.first() else {
        return Ok(None);
    };
    if matches.len() > 1 {
        warn!(
            car_uuid,
            variant = %variant,
            candidates = matches.len(),
            chosen = %chosen.uuid,
            "multiple engines of the same variant linked to one car; selecting smallest uuid"
        );
    }

    materialize(chosen, variant).map(Some)
}

/// Project a validated instance onto the variant's typed record. Failure
/// here means a required field survived schema validation while missing or
/// mistyped, which is an internal-consistency breach.
fn materialize(instance: &Instance, variant: EngineVariant) -> Result<EngineRecord, ResolveError> {
    let invariant = |e: serde_json::Error| ResolveError::InvariantViolation {
        uuid: instance.uuid.clone(),
        detail: format!(
            "{e} (variant {variant} requires {})",
            variant.required_fields().join(", ")
        ),
    };
    let payload = instance.payload.clone();
    match variant {
        EngineVariant::Gas => serde_json::from_value(payload)
            .map(EngineRecord::Gas)
            .map_err(invariant),
        EngineVariant::Electric => serde_json::from_value(payload)
            .map(EngineRecord::Electric)
            .map_err(invariant),
        EngineVariant::Hybrid => serde_json::from_value(payload)
            .map(EngineRecord::Hybrid)
            .map_err(invariant),
    }
}
