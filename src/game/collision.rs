//! Collision grid
//!
//! One 2D bitflag grid per height level, covering an entire mapsquare
//! window. Walls, objects, and occupancy are packed into a single `u32`
//! per tile so movement validation and line-of-sight checks are pure bit
//! algebra.

use bitflags::bitflags;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TileFlags: u32 {
        const WALL_NORTH       = 1 << 0;
        const WALL_NORTH_EAST  = 1 << 1;
        const WALL_EAST        = 1 << 2;
        const WALL_SOUTH_EAST  = 1 << 3;
        const WALL_SOUTH       = 1 << 4;
        const WALL_SOUTH_WEST  = 1 << 5;
        const WALL_WEST        = 1 << 6;
        const WALL_NORTH_WEST  = 1 << 7;
        const OBJECT           = 1 << 8;
        const WALL_NORTH_PROJ      = 1 << 9;
        const WALL_NORTH_EAST_PROJ = 1 << 10;
        const WALL_EAST_PROJ       = 1 << 11;
        const WALL_SOUTH_EAST_PROJ = 1 << 12;
        const WALL_SOUTH_PROJ      = 1 << 13;
        const WALL_SOUTH_WEST_PROJ = 1 << 14;
        const WALL_WEST_PROJ       = 1 << 15;
        const WALL_NORTH_WEST_PROJ = 1 << 16;
        const OBJECT_PROJ      = 1 << 17;
        const FLOOR_DECORATION = 1 << 18;
        const NPC_OCCUPIED     = 1 << 19;
        const PLAYER_OCCUPIED  = 1 << 20;
        const FLOOR_BLOCKED    = 1 << 21;
        const ROOF             = 1 << 22;

        const ALL_WALLS = Self::WALL_NORTH.bits() | Self::WALL_NORTH_EAST.bits()
            | Self::WALL_EAST.bits() | Self::WALL_SOUTH_EAST.bits()
            | Self::WALL_SOUTH.bits() | Self::WALL_SOUTH_WEST.bits()
            | Self::WALL_WEST.bits() | Self::WALL_NORTH_WEST.bits();

        const WALK_BLOCKED = Self::FLOOR_BLOCKED.bits() | Self::FLOOR_DECORATION.bits()
            | Self::OBJECT.bits() | Self::ALL_WALLS.bits();

        const ALL_WALLS_PROJ = Self::WALL_NORTH_PROJ.bits() | Self::WALL_NORTH_EAST_PROJ.bits()
            | Self::WALL_EAST_PROJ.bits() | Self::WALL_SOUTH_EAST_PROJ.bits()
            | Self::WALL_SOUTH_PROJ.bits() | Self::WALL_SOUTH_WEST_PROJ.bits()
            | Self::WALL_WEST_PROJ.bits() | Self::WALL_NORTH_WEST_PROJ.bits();

        const BLOCKS_PROJECTILE = Self::ALL_WALLS_PROJ.bits() | Self::OBJECT_PROJ.bits();
    }
}

/// Per-level collision grid for one mapsquare window, `width * height`
/// tiles flattened as `z * width + x`.
#[derive(Debug, Clone)]
pub struct CollisionLevel {
    width: usize,
    height: usize,
    tiles: Vec<TileFlags>,
}

impl CollisionLevel {
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            tiles: vec![TileFlags::empty(); width * height],
        }
    }

    fn index(&self, x: usize, z: usize) -> usize {
        z * self.width + x
    }

    pub fn flags(&self, x: usize, z: usize) -> TileFlags {
        self.tiles[self.index(x, z)]
    }

    pub fn add_wall(&mut self, x: usize, z: usize, wall: TileFlags, proj: TileFlags) {
        let idx = self.index(x, z);
        self.tiles[idx].insert(wall | proj);
    }

    pub fn remove_wall(&mut self, x: usize, z: usize, wall: TileFlags, proj: TileFlags) {
        let idx = self.index(x, z);
        self.tiles[idx].remove(wall | proj);
    }

    pub fn add_object(&mut self, x: usize, z: usize) {
        let idx = self.index(x, z);
        self.tiles[idx].insert(TileFlags::OBJECT | TileFlags::OBJECT_PROJ);
    }

    pub fn remove_object(&mut self, x: usize, z: usize) {
        let idx = self.index(x, z);
        self.tiles[idx].remove(TileFlags::OBJECT | TileFlags::OBJECT_PROJ);
    }

    pub fn set_occupied(&mut self, x: usize, z: usize, npc: bool) {
        let idx = self.index(x, z);
        self.tiles[idx].insert(if npc {
            TileFlags::NPC_OCCUPIED
        } else {
            TileFlags::PLAYER_OCCUPIED
        });
    }

    pub fn clear_occupied(&mut self, x: usize, z: usize, npc: bool) {
        let idx = self.index(x, z);
        self.tiles[idx].remove(if npc {
            TileFlags::NPC_OCCUPIED
        } else {
            TileFlags::PLAYER_OCCUPIED
        });
    }

    /// True if a tile is free to walk onto, given whether the mover is
    /// currently indoors (requires a roof) or outdoors (requires none).
    pub fn is_walkable(&self, x: usize, z: usize, indoors: bool) -> bool {
        let flags = self.flags(x, z);
        if flags.intersects(TileFlags::WALK_BLOCKED) {
            return false;
        }
        indoors == flags.contains(TileFlags::ROOF)
    }

    /// Simple 2D DDA line-of-sight check: steps tile-by-tile from `(x0,z0)`
    /// to `(x1,z1)`, rejecting if any intermediate tile's projectile-blocker
    /// bits intersect the direction the ray is crossing.
    pub fn has_line_of_sight(&self, x0: i32, z0: i32, x1: i32, z1: i32) -> bool {
        let dx = x1 - x0;
        let dz = z1 - z0;
        let steps = dx.abs().max(dz.abs());
        if steps == 0 {
            return true;
        }
        let step_x = dx as f64 / steps as f64;
        let step_z = dz as f64 / steps as f64;

        for i in 1..steps {
            let x = (x0 as f64 + step_x * i as f64).round() as i32;
            let z = (z0 as f64 + step_z * i as f64).round() as i32;
            if x < 0 || z < 0 || x as usize >= self.width || z as usize >= self.height {
                return false;
            }
            if self
                .flags(x as usize, z as usize)
                .intersects(TileFlags::BLOCKS_PROJECTILE)
            {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wall_add_then_remove_round_trips() {
        let mut grid = CollisionLevel::new(8, 8);
        grid.add_wall(3, 3, TileFlags::WALL_NORTH, TileFlags::WALL_NORTH_PROJ);
        assert!(grid.flags(3, 3).contains(TileFlags::WALL_NORTH));
        grid.remove_wall(3, 3, TileFlags::WALL_NORTH, TileFlags::WALL_NORTH_PROJ);
        assert!(!grid.flags(3, 3).contains(TileFlags::WALL_NORTH));
    }

    #[test]
    fn object_blocks_walking() {
        let mut grid = CollisionLevel::new(8, 8);
        assert!(grid.is_walkable(2, 2, false));
        grid.add_object(2, 2);
        assert!(!grid.is_walkable(2, 2, false));
    }

    #[test]
    fn line_of_sight_blocked_by_projectile_wall() {
        let mut grid = CollisionLevel::new(8, 8);
        grid.add_wall(4, 0, TileFlags::WALL_WEST, TileFlags::WALL_WEST_PROJ);
        assert!(!grid.has_line_of_sight(0, 0, 7, 0));
    }
}
