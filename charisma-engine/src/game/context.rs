//! Game Context
//!
//! The mutable aggregate every state works on: units, factions, map tiles,
//! players and the turn counter. Uses BTreeMap so iteration (and therefore
//! hashing and logging) is in sorted id order.

use std::collections::BTreeMap;
use serde::{Serialize, Deserialize};
use tracing::{debug, warn};

use crate::core::hash::{compute_context_hash, ContextHash};
use crate::game::model::{Faction, MapTile, Player, Unit};

// =============================================================================
// INTEGRITY
// =============================================================================

/// How cross-record references (unit → faction, tile → unit, ...) are treated.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityPolicy {
    /// Accept dangling references; report them via `GameContext::validate`.
    #[default]
    Advisory,
    /// Reject inserts that would create a dangling reference.
    Enforce,
}

/// A single dangling reference found in the context.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IntegrityViolation {
    /// Unit names a faction that does not exist.
    UnitFaction {
        /// Unit holding the reference
        unit_id: String,
        /// Missing faction
        faction_id: String,
    },
    /// Faction lists a member unit that does not exist.
    FactionMember {
        /// Faction listing the member
        faction_id: String,
        /// Missing unit
        unit_id: String,
    },
    /// Tile is occupied by a unit that does not exist.
    TileUnit {
        /// Tile column
        x: i32,
        /// Tile row
        y: i32,
        /// Missing unit
        unit_id: String,
    },
    /// Player controls a faction that does not exist.
    PlayerFaction {
        /// Player holding the reference
        player_id: String,
        /// Missing faction
        faction_id: String,
    },
}

/// Context mutation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IntegrityError {
    /// Referenced faction is missing.
    #[error("unit {unit_id} references unknown faction {faction_id}")]
    UnknownFaction {
        /// Rejected unit
        unit_id: String,
        /// Missing faction
        faction_id: String,
    },

    /// Player controls a faction that does not exist.
    #[error("player {player_id} references unknown faction {faction_id}")]
    UnknownPlayerFaction {
        /// Rejected player
        player_id: String,
        /// Missing faction
        faction_id: String,
    },

    /// Referenced unit is missing.
    #[error("unknown unit {0}")]
    UnknownUnit(String),

    /// No tile at the given position.
    #[error("no tile at ({x}, {y})")]
    NoTile {
        /// Requested column
        x: i32,
        /// Requested row
        y: i32,
    },

    /// Tile already holds another unit.
    #[error("tile ({x}, {y}) already occupied by {occupant}")]
    TileOccupied {
        /// Tile column
        x: i32,
        /// Tile row
        y: i32,
        /// Unit already on the tile
        occupant: String,
    },
}

// =============================================================================
// GAME CONTEXT
// =============================================================================

/// Complete turn-scoped game data.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct GameContext {
    /// All units by id
    pub units: BTreeMap<String, Unit>,

    /// All factions by id
    pub factions: BTreeMap<String, Faction>,

    /// Map cells in authoring order
    pub map_tiles: Vec<MapTile>,

    /// Participants in seat order
    pub players: Vec<Player>,

    /// Current turn (never decreases)
    current_turn: u32,

    /// Reference handling for inserts
    #[serde(skip)]
    policy: IntegrityPolicy,
}

impl GameContext {
    /// Create an empty context with advisory integrity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty context with the given integrity policy.
    pub fn with_policy(policy: IntegrityPolicy) -> Self {
        Self {
            policy,
            ..Self::default()
        }
    }

    /// Active integrity policy.
    pub fn policy(&self) -> IntegrityPolicy {
        self.policy
    }

    /// Current turn number.
    pub fn current_turn(&self) -> u32 {
        self.current_turn
    }

    /// Advance to the next turn and return it.
    pub fn advance_turn(&mut self) -> u32 {
        self.current_turn = self.current_turn.saturating_add(1);
        debug!(turn = self.current_turn, "turn advanced");
        self.current_turn
    }

    // =========================================================================
    // Units & factions
    // =========================================================================

    /// Insert or replace a unit.
    ///
    /// Under `Enforce`, a unit naming a missing faction is rejected and the
    /// context is left untouched. Units without a faction are always allowed.
    pub fn insert_unit(&mut self, unit: Unit) -> Result<Option<Unit>, IntegrityError> {
        if unit.has_faction() && !self.factions.contains_key(&unit.faction_id) {
            match self.policy {
                IntegrityPolicy::Enforce => {
                    return Err(IntegrityError::UnknownFaction {
                        unit_id: unit.id,
                        faction_id: unit.faction_id,
                    });
                }
                IntegrityPolicy::Advisory => {
                    warn!(unit = %unit.id, faction = %unit.faction_id, "unit references unknown faction");
                }
            }
        }
        Ok(self.units.insert(unit.id.clone(), unit))
    }

    /// Insert or replace a faction.
    ///
    /// Member lists are advisory in both policies: factions are usually
    /// loaded before their units.
    pub fn insert_faction(&mut self, faction: Faction) -> Option<Faction> {
        self.factions.insert(faction.id.clone(), faction)
    }

    /// Get a unit by id.
    pub fn unit(&self, id: &str) -> Option<&Unit> {
        self.units.get(id)
    }

    /// Get a unit mutably by id.
    pub fn unit_mut(&mut self, id: &str) -> Option<&mut Unit> {
        self.units.get_mut(id)
    }

    /// Get a faction by id.
    pub fn faction(&self, id: &str) -> Option<&Faction> {
        self.factions.get(id)
    }

    /// Units whose `faction_id` names the given faction, in id order.
    pub fn units_of_faction<'a>(&'a self, faction_id: &'a str) -> impl Iterator<Item = &'a Unit> + 'a {
        self.units.values().filter(move |u| u.faction_id == faction_id)
    }

    // =========================================================================
    // Players & map
    // =========================================================================

    /// Seat a player.
    pub fn add_player(&mut self, player: Player) -> Result<(), IntegrityError> {
        if self.policy == IntegrityPolicy::Enforce && !self.factions.contains_key(&player.faction_id) {
            return Err(IntegrityError::UnknownPlayerFaction {
                player_id: player.id,
                faction_id: player.faction_id,
            });
        }
        self.players.push(player);
        Ok(())
    }

    /// Replace the map.
    pub fn set_tiles(&mut self, tiles: Vec<MapTile>) {
        self.map_tiles = tiles;
    }

    /// Tile at a position.
    pub fn tile_at(&self, x: i32, y: i32) -> Option<&MapTile> {
        self.map_tiles.iter().find(|t| t.x == x && t.y == y)
    }

    /// Put a unit on a tile.
    ///
    /// The unit must exist and the tile must be free (or already hold the
    /// same unit). Any previous tile held by the unit is vacated.
    pub fn place_unit(&mut self, x: i32, y: i32, unit_id: &str) -> Result<(), IntegrityError> {
        if !self.units.contains_key(unit_id) {
            return Err(IntegrityError::UnknownUnit(unit_id.to_string()));
        }

        let index = self
            .map_tiles
            .iter()
            .position(|t| t.x == x && t.y == y)
            .ok_or(IntegrityError::NoTile { x, y })?;

        if let Some(occupant) = &self.map_tiles[index].unit_id {
            if occupant != unit_id {
                return Err(IntegrityError::TileOccupied { x, y, occupant: occupant.clone() });
            }
        }

        for tile in &mut self.map_tiles {
            if tile.unit_id.as_deref() == Some(unit_id) {
                tile.unit_id = None;
            }
        }
        self.map_tiles[index].unit_id = Some(unit_id.to_string());
        Ok(())
    }

    // =========================================================================
    // Validation & hashing
    // =========================================================================

    /// List every dangling reference in the context.
    ///
    /// Order: unit factions, faction members, tile occupants, player factions.
    pub fn validate(&self) -> Vec<IntegrityViolation> {
        let mut violations = Vec::new();

        for unit in self.units.values() {
            if unit.has_faction() && !self.factions.contains_key(&unit.faction_id) {
                violations.push(IntegrityViolation::UnitFaction {
                    unit_id: unit.id.clone(),
                    faction_id: unit.faction_id.clone(),
                });
            }
        }

        for faction in self.factions.values() {
            for unit_id in &faction.unit_ids {
                if !self.units.contains_key(unit_id) {
                    violations.push(IntegrityViolation::FactionMember {
                        faction_id: faction.id.clone(),
                        unit_id: unit_id.clone(),
                    });
                }
            }
        }

        for tile in &self.map_tiles {
            if let Some(unit_id) = &tile.unit_id {
                if !self.units.contains_key(unit_id) {
                    violations.push(IntegrityViolation::TileUnit {
                        x: tile.x,
                        y: tile.y,
                        unit_id: unit_id.clone(),
                    });
                }
            }
        }

        for player in &self.players {
            if !self.factions.contains_key(&player.faction_id) {
                violations.push(IntegrityViolation::PlayerFaction {
                    player_id: player.id.clone(),
                    faction_id: player.faction_id.clone(),
                });
            }
        }

        violations
    }

    /// Compute a fingerprint of the whole context.
    pub fn compute_hash(&self) -> ContextHash {
        compute_context_hash(self.current_turn, |hasher| {
            hasher.update_u32(self.units.len() as u32);
            for unit in self.units.values() {
                unit.hash_into(hasher);
            }

            hasher.update_u32(self.factions.len() as u32);
            for faction in self.factions.values() {
                faction.hash_into(hasher);
            }

            hasher.update_u32(self.map_tiles.len() as u32);
            for tile in &self.map_tiles {
                tile.hash_into(hasher);
            }

            hasher.update_u32(self.players.len() as u32);
            for player in &self.players {
                player.hash_into(hasher);
            }
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================
