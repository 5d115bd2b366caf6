//! Configuration for MapMerge
//!
//! Provides configuration file handling and validation.
//! Supports JSON and TOML file formats; the default file lives in the
//! platform configuration directory.
//!
//! Configuration is organized into logical sections:
//! - Conflation thresholds and tag keys
//! - Query strings used by the conflation scripts
//! - Undo history limits

use crate::error::{SettingsError, SettingsResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Tag keys that make up a postal address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AddressKeys {
    pub housenumber: String,
    pub street: String,
    pub unit: String,
}

impl Default for AddressKeys {
    fn default() -> Self {
        Self {
            housenumber: "addr:housenumber".to_string(),
            street: "addr:street".to_string(),
            unit: "addr:unit".to_string(),
        }
    }
}

/// Thresholds and tag keys used while associating and merging features
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConflationSettings {
    /// A point further than this from every building stays unassociated
    pub merge_distance: f64,
    /// Area epsilon for polygon intersection classification
    pub intersection_tolerance: f64,
    /// Keys whose `;`-separated values are unioned on merge
    pub mergeable_keys: Vec<String>,
    /// Tag dropped when a building is converted into a point
    pub kind_key: String,
    /// Address tag keys
    pub address: AddressKeys,
    /// Origin prefix identifying the upstream data layer
    pub upstream_origin_prefix: String,
}

impl Default for ConflationSettings {
    fn default() -> Self {
        Self {
            merge_distance: 12.0,
            intersection_tolerance: 1e-4,
            mergeable_keys: vec!["source".to_string()],
            kind_key: "building".to_string(),
            address: AddressKeys::default(),
            upstream_origin_prefix: "openstreetmap-cgimap".to_string(),
        }
    }
}

/// Query strings handed to the query compiler
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub buildings: String,
    pub unaddressed_buildings: String,
    pub address_points: String,
    pub addressed_entities: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            buildings: "type:way closed building=*".to_string(),
            unaddressed_buildings: "type:way closed building=* -\"addr:housenumber\"=*"
                .to_string(),
            address_points: "type:node \"addr:housenumber\"=*".to_string(),
            addressed_entities: "\"addr:housenumber\"=*".to_string(),
        }
    }
}

/// Undo history settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistorySettings {
    /// Maximum number of undo entries kept; unbounded when absent
    pub max_depth: Option<usize>,
}

/// Complete application configuration
///
/// Aggregates all settings sections and provides file I/O operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Conflation thresholds and keys
    pub conflation: ConflationSettings,
    /// Query strings
    pub queries: QuerySettings,
    /// Undo history
    pub history: HistorySettings,
}

impl Config {
    /// Create new config with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Default config file location: `<config dir>/mapmerge/config.toml`
    pub fn default_path() -> SettingsResult<PathBuf> {
        let mut path = dirs::config_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| {
                SettingsError::ConfigDirectory("no configuration directory available".to_string())
            })?;
        path.push("mapmerge");
        path.push("config.toml");
        Ok(path)
    }

    /// Load config from file (JSON or TOML)
    pub fn load_from_file(path: &Path) -> SettingsResult<Self> {
        let content = std::fs::read_to_string(path)?;

        let config: Self = match Format::of(path)? {
            Format::Json => serde_json::from_str(&content)?,
            Format::Toml => toml::from_str(&content)?,
        };

        config.validate()?;
        debug!(path = %path.display(), "config loaded");
        Ok(config)
    }

    /// Load `path` if given, else the default file if it exists, else the
    /// built-in defaults.
    pub fn load_or_default(path: Option<&Path>) -> SettingsResult<Self> {
        if let Some(path) = path {
            return Self::load_from_file(path);
        }
        match Self::default_path() {
            Ok(default) if default.is_file() => Self::load_from_file(&default),
            _ => {
                info!("no config file found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Save config to file (JSON or TOML)
    pub fn save_to_file(&self, path: &Path) -> SettingsResult<()> {
        self.validate()?;

        let content = match Format::of(path)? {
            Format::Json => serde_json::to_string_pretty(self)?,
            Format::Toml => toml::to_string_pretty(self)?,
        };

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        debug!(path = %path.display(), "config saved");
        Ok(())
    }

    /// Validate the settings
    pub fn validate(&self) -> SettingsResult<()> {
        let c = &self.conflation;
        if !c.merge_distance.is_finite() || c.merge_distance <= 0.0 {
            return Err(SettingsError::invalid(
                "conflation.merge_distance",
                "must be a finite number > 0",
            ));
        }
        if !c.intersection_tolerance.is_finite() || c.intersection_tolerance < 0.0 {
            return Err(SettingsError::invalid(
                "conflation.intersection_tolerance",
                "must be a finite number >= 0",
            ));
        }
        if c.mergeable_keys.iter().any(|k| k.trim().is_empty()) {
            return Err(SettingsError::invalid(
                "conflation.mergeable_keys",
                "keys must not be empty",
            ));
        }

        let keys = [
            ("conflation.kind_key", &c.kind_key),
            ("conflation.address.housenumber", &c.address.housenumber),
            ("conflation.address.street", &c.address.street),
            ("conflation.address.unit", &c.address.unit),
        ];
        if let Some((key, _)) = keys.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(SettingsError::invalid(key, "must not be empty"));
        }

        let q = &self.queries;
        let queries = [
            ("queries.buildings", &q.buildings),
            ("queries.unaddressed_buildings", &q.unaddressed_buildings),
            ("queries.address_points", &q.address_points),
            ("queries.addressed_entities", &q.addressed_entities),
        ];
        if let Some((key, _)) = queries.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(SettingsError::invalid(key, "query must not be empty"));
        }

        if self.history.max_depth == Some(0) {
            return Err(SettingsError::invalid("history.max_depth", "must be > 0"));
        }

        Ok(())
    }
}

enum Format {
    Json,
    Toml,
}

impl Format {
    fn of(path: &Path) -> SettingsResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(Self::Json),
            Some("toml") => Ok(Self::Toml),
            other => Err(SettingsError::UnsupportedFormat(
                other.unwrap_or("<none>").to_string(),
            )),
        }
    }
}
