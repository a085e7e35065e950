//! Entity kinds, schema-type tags, and the closed engine variant set

use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{CorpusError, ResolveError, Result};

/// The two entity kinds the corpus contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Engine,
    Car,
}

impl EntityKind {
    /// Directory name for this kind under `schemas/` and `instances/`
    pub fn dir_name(&self) -> &'static str {
        match self {
            EntityKind::Engine => "engines",
            EntityKind::Car => "cars",
        }
    }

    /// Namespace prefix used in uuids (`engine:...`, `car:...`) and
    /// schema-type tags (`engine-gas`, `car-sedan`)
    pub fn prefix(&self) -> &'static str {
        match self {
            EntityKind::Engine => "engine",
            EntityKind::Car => "car",
        }
    }

    pub fn all() -> [EntityKind; 2] {
        [EntityKind::Engine, EntityKind::Car]
    }

    fn from_dir_name(dir: &str) -> Option<Self> {
        match dir {
            "engines" => Some(EntityKind::Engine),
            "cars" => Some(EntityKind::Car),
            _ => None,
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.prefix())
    }
}

/// Identifying tag naming which schema a document must satisfy
/// (e.g. `engine-gas`, `car-sedan`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaType(String);

impl SchemaType {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Which entity kind this tag belongs to, judged by its prefix.
    pub fn kind(&self) -> Option<EntityKind> {
        if self.0.starts_with("engine-") {
            Some(EntityKind::Engine)
        } else if self.0.starts_with("car-") {
            Some(EntityKind::Car)
        } else {
            None
        }
    }

    /// Derive the schema type from an instance resource path.
    ///
    /// Convention: the parent directory names the kind (`engines`/`cars`),
    /// the filename stem up to the last `-` names the schema type, and the
    /// remainder is the per-document discriminator.
    /// `instances/engines/engine-gas-1.json` -> `engine-gas`.
    ///
    /// The canonical separator is `-`; a `:` anywhere in the stem fails the
    /// load instead of being guessed around.
    pub fn from_instance_path(path: &Path) -> Result<Self> {
        let display = path.display().to_string();
        let bad = || CorpusError::BadNamingConvention {
            path: display.clone(),
        };

        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(bad)?;
        if stem.contains(':') {
            return Err(bad());
        }

        let (tag, discriminator) = stem.rsplit_once('-').ok_or_else(bad)?;
        if tag.is_empty() || discriminator.is_empty() {
            return Err(bad());
        }
        let schema_type = SchemaType::new(tag);
        let kind = schema_type.kind().ok_or_else(bad)?;

        // The enclosing directory must agree with the tag's kind.
        let dir_kind = path
            .parent()
            .and_then(|p| p.file_name())
            .and_then(|s| s.to_str())
            .and_then(EntityKind::from_dir_name);
        match dir_kind {
            Some(d) if d == kind => Ok(schema_type),
            Some(_) => Err(bad()),
            // Bare paths (no kind directory) are accepted; the tag prefix
            // alone identifies the kind.
            None => Ok(schema_type),
        }
    }
}

impl fmt::Display for SchemaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SchemaType {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Check a document uuid against the `<kind>:<discriminator>` convention,
/// including agreement with the document's schema-type kind.
pub fn check_uuid(uuid: &str, kind: EntityKind) -> std::result::Result<(), String> {
    static UUID_RE: OnceLock<Regex> = OnceLock::new();
    let re = UUID_RE.get_or_init(|| {
        Regex::new(r"^(engine|car):[A-Za-z0-9][A-Za-z0-9._-]*$").expect("uuid pattern")
    });

    let captures = re
        .captures(uuid)
        .ok_or_else(|| "expected `<kind>:<discriminator>`".to_string())?;
    let declared = &captures[1];
    if declared != kind.prefix() {
        return Err(format!(
            "namespace `{declared}` does not match document kind `{kind}`"
        ));
    }
    Ok(())
}

/// Closed set of engine kinds. A document's variant is determined by its
/// SchemaType, never by sniffing attributes at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineVariant {
    Gas,
    Electric,
    Hybrid,
}

impl EngineVariant {
    pub const ALL: [EngineVariant; 3] =
        [EngineVariant::Gas, EngineVariant::Electric, EngineVariant::Hybrid];

    /// The schema-type tag this variant dispatches on.
    pub fn schema_type(&self) -> SchemaType {
        SchemaType::new(match self {
            EngineVariant::Gas => "engine-gas",
            EngineVariant::Electric => "engine-electric",
            EngineVariant::Hybrid => "engine-hybrid",
        })
    }

    /// Attributes the variant's typed record cannot do without.
    pub fn required_fields(&self) -> &'static [&'static str] {
        match self {
            EngineVariant::Gas => &["horsepower"],
            EngineVariant::Electric => &["batteryCapacity"],
            EngineVariant::Hybrid => &["horsepower", "batteryCapacity"],
        }
    }

    /// Attributes the variant carries when present.
    pub fn optional_fields(&self) -> &'static [&'static str] {
        match self {
            EngineVariant::Gas => &["fuelEfficiency", "fuelTypes"],
            EngineVariant::Electric => &["rangeMiles", "chargingTypes"],
            EngineVariant::Hybrid => &["fuelEfficiency"],
        }
    }

    /// The variant whose schema type matches `tag`, if any.
    pub fn from_schema_type(tag: &SchemaType) -> Option<Self> {
        Self::ALL.iter().copied().find(|v| &v.schema_type() == tag)
    }
}

impl fmt::Display for EngineVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineVariant::Gas => f.write_str("gas"),
            EngineVariant::Electric => f.write_str("electric"),
            EngineVariant::Hybrid => f.write_str("hybrid"),
        }
    }
}

impl FromStr for EngineVariant {
    type Err = ResolveError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "gas" | "engine-gas" => Ok(EngineVariant::Gas),
            "electric" | "engine-electric" => Ok(EngineVariant::Electric),
            "hybrid" | "engine-hybrid" => Ok(EngineVariant::Hybrid),
            other => Err(ResolveError::UnsupportedVariant {
                requested: other.to_string(),
            }),
        }
    }
}
