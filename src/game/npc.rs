//! NPC definitions and instances
//!
//! NPC content and AI are out of scope; this module keeps just enough of
//! the data model to let the world pool NPCs and run their movement
//! through the same collision grid as players.

use crate::game::coord::Position;

/// Immutable, id-referenced NPC definition.
#[derive(Debug, Clone)]
pub struct NpcDefinition {
    pub id: u16,
    pub name: String,
    pub combat_level: u16,
    pub size: u8,
}

/// A pooled, live NPC. Spawn position is immutable for the instance's
/// active lifetime; only `position` moves.
#[derive(Debug, Clone)]
pub struct NpcInstance {
    pub definition_id: u16,
    pub spawn_position: Position,
    pub position: Position,
    pub slot: u16,
}

impl NpcInstance {
    pub fn new(slot: u16, definition_id: u16, spawn_position: Position) -> Self {
        Self {
            definition_id,
            spawn_position,
            position: spawn_position,
            slot,
        }
    }
}
