//! Movement queue
//!
//! A bounded FIFO of packed waypoints plus the recursive per-tick dequeue
//! algorithm that turns it into up to two direction codes a tick, and the
//! run-energy accounting that gates the second (running) step.

use std::collections::VecDeque;

use tracing::warn;

use crate::game::coord::encode_direction;

/// Maximum number of queued waypoints before `enqueue` starts rejecting.
pub const MAX_WAYPOINTS: usize = 25;

/// Coordinates beyond this are rejected as waypoints; they cannot be
/// reached by the naive tile-stepping path builder in a reasonable time.
const MAX_WAYPOINT_COORD: u16 = 12800;

/// Full run-energy scale: centi-percent, i.e. 10000 == 100.00%.
pub const MAX_RUN_ENERGY: u32 = 10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Waypoint {
    x: u16,
    z: u16,
}

/// Per-player queue of pending waypoints and running preference/energy.
#[derive(Debug, Clone)]
pub struct MovementQueue {
    waypoints: VecDeque<Waypoint>,
    pub run_path: bool,
    pub run_energy: u32,
}

impl Default for MovementQueue {
    fn default() -> Self {
        Self {
            waypoints: VecDeque::new(),
            run_path: false,
            run_energy: MAX_RUN_ENERGY,
        }
    }
}

impl MovementQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    pub fn clear(&mut self) {
        self.waypoints.clear();
    }

    /// Queue running is gated on both preference and remaining energy.
    pub fn effective_running(&self) -> bool {
        self.run_path && self.run_energy > 0
    }

    /// Append a waypoint. Silently (but loudly, via a warning) drops it if
    /// the queue is full or the coordinate is out of the naive pathing
    /// builder's reach - this is a rejection, not a protocol error.
    pub fn enqueue(&mut self, x: u16, z: u16) {
        if self.waypoints.len() >= MAX_WAYPOINTS {
            warn!(x, z, "movement queue full, dropping waypoint");
            return;
        }
        if x > MAX_WAYPOINT_COORD || z > MAX_WAYPOINT_COORD {
            warn!(x, z, "waypoint out of naive-path range, dropping");
            return;
        }
        self.waypoints.push_back(Waypoint { x, z });
    }

    /// Advance one step toward the head waypoint, consuming it once
    /// reached, and return the direction code taken (-1 if no movement
    /// occurred). Decrements run energy by one tick's worth when the move
    /// is an effective run step.
    pub fn next_direction(&mut self, current_x: u16, current_z: u16) -> i32 {
        let running = self.effective_running();
        let direction = loop {
            let Some(&head) = self.waypoints.front() else {
                return -1;
            };
            let step_dx = (head.x as i32 - current_x as i32).signum();
            let step_dz = (head.z as i32 - current_z as i32).signum();
            let d = encode_direction(step_dx, step_dz);
            if d == -1 {
                self.waypoints.pop_front();
                if self.waypoints.is_empty() {
                    return -1;
                }
                continue;
            }
            break d;
        };

        let head = *self.waypoints.front().expect("checked above");
        let next_x = (current_x as i32 + (head.x as i32 - current_x as i32).signum()) as u16;
        let next_z = (current_z as i32 + (head.z as i32 - current_z as i32).signum()) as u16;
        if next_x == head.x && next_z == head.z {
            self.waypoints.pop_front();
        }

        if running && self.run_energy > 0 {
            self.run_energy -= 1;
        }

        direction
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walking_tile_by_tile_pops_on_arrival() {
        let mut q = MovementQueue::new();
        q.enqueue(103, 100);
        let mut x = 100u16;
        let z = 100u16;

        for _ in 0..3 {
            let d = q.next_direction(x, z);
            assert_ne!(d, -1);
            x += 1;
        }
        assert!(q.is_empty());
        assert_eq!(q.next_direction(x, z), -1);
    }

    #[test]
    fn run_energy_drains_to_zero_over_10000_ticks() {
        let mut q = MovementQueue::new();
        q.run_path = true;
        q.run_energy = MAX_RUN_ENERGY;
        // long queue: keep the same waypoint far away so each tick is a run step
        q.enqueue(12800, 100);
        for _ in 0..MAX_RUN_ENERGY {
            q.next_direction(0, 100);
        }
        assert_eq!(q.run_energy, 0);
    }

    #[test]
    fn energy_zero_disables_effective_running_regardless_of_preference() {
        let mut q = MovementQueue::new();
        q.run_path = true;
        q.run_energy = 0;
        assert!(!q.effective_running());
    }

    #[test]
    fn walking_does_not_touch_energy() {
        let mut q = MovementQueue::new();
        q.run_path = false;
        q.run_energy = MAX_RUN_ENERGY;
        q.enqueue(105, 100);
        q.next_direction(100, 100);
        assert_eq!(q.run_energy, MAX_RUN_ENERGY);
    }

    #[test]
    fn enqueue_rejects_beyond_capacity() {
        let mut q = MovementQueue::new();
        for i in 0..MAX_WAYPOINTS {
            q.enqueue(100 + i as u16, 100);
        }
        q.enqueue(200, 200);
        assert_eq!(q.len(), MAX_WAYPOINTS);
    }
}
