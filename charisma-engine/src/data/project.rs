//! Project Data
//!
//! The unit and faction lists the authoring tools read and write, plus the
//! editing operations they perform on them. `into_context` hands the records
//! to the runtime.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use serde::{Serialize, Deserialize};
use tracing::{info, warn};

use crate::game::context::{GameContext, IntegrityError, IntegrityPolicy, IntegrityViolation};
use crate::game::model::{Faction, Unit};

/// Project data errors.
#[derive(Debug, thiserror::Error)]
pub enum DataError {
    /// File could not be read or written.
    #[error("I/O error on {path}: {source}")]
    Io {
        /// File that failed
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// JSON did not match the project schema.
    #[error("invalid project JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Two units share an id.
    #[error("duplicate unit id {0}")]
    DuplicateUnit(String),

    /// Two factions share an id.
    #[error("duplicate faction id {0}")]
    DuplicateFaction(String),

    /// No unit with this id.
    #[error("unit {0} not found")]
    UnitNotFound(String),

    /// A reference was rejected by the integrity policy.
    #[error(transparent)]
    Integrity(#[from] IntegrityError),
}

/// Units and factions as authored.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectData {
    /// Units in authoring order
    #[serde(default)]
    pub units: Vec<Unit>,

    /// Factions in authoring order
    #[serde(default)]
    pub factions: Vec<Faction>,
}

impl ProjectData {
    /// Empty project.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse project JSON.
    pub fn from_json(json: &str) -> Result<Self, DataError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize as pretty-printed JSON.
    pub fn to_json(&self) -> Result<String, DataError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Load a project file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, DataError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let project = Self::from_json(&json)?;
        info!(
            path = %path.display(),
            units = project.units.len(),
            factions = project.factions.len(),
            "project loaded"
        );
        Ok(project)
    }

    /// Write the project file, replacing any previous contents.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), DataError> {
        let path = path.as_ref();
        let json = self.to_json()?;
        fs::write(path, json).map_err(|source| DataError::Io {
            path: path.display().to_string(),
            source,
        })?;
        info!(path = %path.display(), units = self.units.len(), "project saved");
        Ok(())
    }

    // =========================================================================
    // Editing
    // =========================================================================

    /// Find a unit by id.
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.iter().find(|u| u.id == id)
    }

    /// Append a new unit. Ids must be unique.
    pub fn add_unit(&mut self, unit: Unit) -> Result<(), DataError> {
        if self.unit(&unit.id).is_some() {
            return Err(DataError::DuplicateUnit(unit.id));
        }
        self.units.push(unit);
        Ok(())
    }

    /// Replace the unit with the same id, keeping its position in the list.
    pub fn update_unit(&mut self, unit: Unit) -> Result<Unit, DataError> {
        let slot = self
            .units
            .iter_mut()
            .find(|u| u.id == unit.id)
            .ok_or_else(|| DataError::UnitNotFound(unit.id.clone()))?;
        Ok(std::mem::replace(slot, unit))
    }

    /// Remove a unit and strip it from every faction's member list.
    pub fn remove_unit(&mut self, id: &str) -> Result<Unit, DataError> {
        let index = self
            .units
            .iter()
            .position(|u| u.id == id)
            .ok_or_else(|| DataError::UnitNotFound(id.to_string()))?;

        for faction in &mut self.factions {
            faction.unit_ids.retain(|member| member != id);
        }
        Ok(self.units.remove(index))
    }

    // =========================================================================
    // Runtime hand-off
    // =========================================================================

    /// Build a game context from this project.
    ///
    /// Duplicate ids are always rejected. Dangling references are rejected
    /// under `Enforce` and logged under `Advisory`.
    pub fn into_context(self, policy: IntegrityPolicy) -> Result<GameContext, DataError> {
        let mut seen = BTreeSet::new();
        for faction in &self.factions {
            if !seen.insert(faction.id.as_str()) {
                return Err(DataError::DuplicateFaction(faction.id.clone()));
            }
        }
        let mut seen = BTreeSet::new();
        for unit in &self.units {
            if !seen.insert(unit.id.as_str()) {
                return Err(DataError::DuplicateUnit(unit.id.clone()));
            }
        }

        let mut ctx = GameContext::with_policy(policy);
        // Factions first so unit references resolve under Enforce
        for faction in self.factions {
            ctx.insert_faction(faction);
        }
        for unit in self.units {
            ctx.insert_unit(unit)?;
        }

        for violation in ctx.validate() {
            if let IntegrityViolation::FactionMember { faction_id, unit_id } = violation {
                warn!(faction = %faction_id, unit = %unit_id, "faction lists unknown unit");
            }
        }

        Ok(ctx)
    }
}
