//! Game Data Records
//!
//! Plain records authored by the editor and consumed by the runtime.
//! Field names match the project JSON written by the authoring tools.

use serde::{Serialize, Deserialize};

use crate::core::hash::ContextHasher;

/// Default hit points for a newly authored unit.
pub const DEFAULT_UNIT_HP: u32 = 100;

/// Default movement points for a newly authored unit.
pub const DEFAULT_UNIT_MOVEMENT: u32 = 5;

fn default_hp() -> u32 {
    DEFAULT_UNIT_HP
}

fn default_movement() -> u32 {
    DEFAULT_UNIT_MOVEMENT
}

// =============================================================================
// UNIT
// =============================================================================

/// A single unit type.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unit {
    /// Unique unit identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Hit points
    #[serde(default = "default_hp")]
    pub hp: u32,

    /// Movement points per turn
    #[serde(default = "default_movement")]
    pub movement: u32,

    /// Owning faction (not validated unless the context enforces integrity)
    #[serde(default)]
    pub faction_id: String,

    /// Ability identifiers
    #[serde(default)]
    pub abilities: Vec<String>,
}

impl Unit {
    /// Create a unit with default stats.
    pub fn new(id: impl Into<String>, name: impl Into<String>, faction_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            hp: DEFAULT_UNIT_HP,
            movement: DEFAULT_UNIT_MOVEMENT,
            faction_id: faction_id.into(),
            abilities: Vec::new(),
        }
    }

    /// Builder-style ability list.
    pub fn with_abilities<I, S>(mut self, abilities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.abilities = abilities.into_iter().map(Into::into).collect();
        self
    }

    /// Does this unit belong to a faction at all?
    pub fn has_faction(&self) -> bool {
        !self.faction_id.is_empty()
    }

    /// Hash this unit for context fingerprinting.
    pub fn hash_into(&self, hasher: &mut ContextHasher) {
        hasher.update_str(&self.id);
        hasher.update_str(&self.name);
        hasher.update_u32(self.hp);
        hasher.update_u32(self.movement);
        hasher.update_str(&self.faction_id);
        hasher.update_u32(self.abilities.len() as u32);
        for ability in &self.abilities {
            hasher.update_str(ability);
        }
    }
}

// =============================================================================
// FACTION
// =============================================================================

/// A faction grouping units.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Faction {
    /// Unique faction identifier
    pub id: String,

    /// Display name
    #[serde(default)]
    pub name: String,

    /// Member unit identifiers
    #[serde(default)]
    pub unit_ids: Vec<String>,
}

impl Faction {
    /// Create an empty faction.
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            unit_ids: Vec::new(),
        }
    }

    /// Builder-style member list.
    pub fn with_units<I, S>(mut self, unit_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unit_ids = unit_ids.into_iter().map(Into::into).collect();
        self
    }

    /// Hash this faction for context fingerprinting.
    pub fn hash_into(&self, hasher: &mut ContextHasher) {
        hasher.update_str(&self.id);
        hasher.update_str(&self.name);
        hasher.update_u32(self.unit_ids.len() as u32);
        for unit_id in &self.unit_ids {
            hasher.update_str(unit_id);
        }
    }
}

// =============================================================================
// MAP TILE
// =============================================================================

/// Terrain tag of a map tile.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum Terrain {
    /// Open ground
    #[default]
    Plains = 0,
    /// Wooded ground
    Forest = 1,
    /// Raised ground
    Hills = 2,
    /// Impassable peaks
    Mountain = 3,
    /// Impassable water
    Water = 4,
}

impl Terrain {
    /// Can ground units stand on this terrain?
    pub fn walkable(self) -> bool {
        !matches!(self, Terrain::Mountain | Terrain::Water)
    }
}

/// A single map cell.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MapTile {
    /// Column
    pub x: i32,

    /// Row
    pub y: i32,

    /// Terrain type
    #[serde(default)]
    pub terrain: Terrain,

    /// Occupying unit, if any
    #[serde(default)]
    pub unit_id: Option<String>,
}

impl MapTile {
    /// Create an unoccupied tile.
    pub fn new(x: i32, y: i32, terrain: Terrain) -> Self {
        Self { x, y, terrain, unit_id: None }
    }

    /// Is a unit standing here?
    pub fn is_occupied(&self) -> bool {
        self.unit_id.is_some()
    }

    /// Hash this tile for context fingerprinting.
    pub fn hash_into(&self, hasher: &mut ContextHasher) {
        hasher.update_i32(self.x);
        hasher.update_i32(self.y);
        hasher.update_u8(self.terrain as u8);
        hasher.update_opt_str(self.unit_id.as_deref());
    }
}

// =============================================================================
// PLAYER
// =============================================================================

/// A participant controlling one faction.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Faction controlled by this player
    pub faction_id: String,

    /// Controlled by the computer?
    #[serde(default)]
    pub is_ai: bool,
}

impl Player {
    /// Create a human player.
    pub fn human(id: impl Into<String>, name: impl Into<String>, faction_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            faction_id: faction_id.into(),
            is_ai: false,
        }
    }

    /// Create a computer-controlled player.
    pub fn ai(id: impl Into<String>, name: impl Into<String>, faction_id: impl Into<String>) -> Self {
        Self {
            is_ai: true,
            ..Self::human(id, name, faction_id)
        }
    }

    /// Hash this player for context fingerprinting.
    pub fn hash_into(&self, hasher: &mut ContextHasher) {
        hasher.update_str(&self.id);
        hasher.update_str(&self.name);
        hasher.update_str(&self.faction_id);
        hasher.update_bool(self.is_ai);
    }
}
