//! Player-info encoder
//!
//! The hardest single piece of the protocol: one bit-packed `PLAYER_INFO`
//! frame per seated player per tick, built from a local self-update block,
//! the existing tracking list (keep/remove/update), and newly-entered
//! peers, terminated by an 11-bit sentinel and followed by a trailer of
//! per-entity update-flag payloads.

use crate::game::coord::Position;
use crate::game::tracking::PlayerTracking;
use crate::net::buffer::{HeaderKind, PacketBuffer};
use crate::protocol::update_flags::{UpdateFlags, BLOCK_ORDER};

const PLAYER_INFO_OPCODE: u8 = 81;
const TERMINATOR: u32 = 2047;

/// Everything the encoder needs to know about one player this tick, taken
/// from the world's snapshot.
#[derive(Debug, Clone)]
pub struct PlayerSnapshot {
    pub slot: u16,
    pub position: Position,
    pub primary_direction: i32,
    pub secondary_direction: i32,
    pub region_changed: bool,
    pub needs_placement: bool,
    pub placement_ticks: u8,
    pub update_flags: UpdateFlags,
    pub appearance_hash: u64,
}

impl PlayerSnapshot {
    fn has_movement(&self) -> bool {
        self.primary_direction != -1
    }
}

/// Extra per-entity context the caller supplies when it needs an
/// update-flag trailer payload written (appearance bytes, chat message,
/// etc). Kept abstract: the encoder only needs to know how many bytes to
/// reserve and defers the actual content to the caller-provided writer.
pub trait UpdateFlagPayloadWriter {
    fn write_payload(&self, slot: u16, flag: UpdateFlags, buffer: &mut PacketBuffer);
}

/// A no-op writer for callers (and tests) with nothing to attach; each
/// flagged block still gets its mask byte, just no payload bytes.
pub struct NoopPayloadWriter;

impl UpdateFlagPayloadWriter for NoopPayloadWriter {
    fn write_payload(&self, _slot: u16, _flag: UpdateFlags, _buffer: &mut PacketBuffer) {}
}

/// Encode one observer's `PLAYER_INFO` frame, mutating its tracking list in
/// place (removals applied before additions, per-tick).
pub fn encode_player_info(
    observer: &PlayerSnapshot,
    tracking: &mut PlayerTracking,
    all_players: &[PlayerSnapshot],
    payloads: &dyn UpdateFlagPayloadWriter,
) -> PacketBuffer {
    let mut buffer = PacketBuffer::with_capacity(512);
    let header = buffer.open_packet(PLAYER_INFO_OPCODE, HeaderKind::VarShort, None);
    // `start_bit_access` decides write-vs-resume-read by comparing read_pos
    // against the buffer length; mark the header bytes as already consumed
    // so it continues writing bits after them instead of rewinding to 0.
    buffer.set_read_position(buffer.len());
    buffer.start_bit_access();

    let mut flagged: Vec<(u16, UpdateFlags)> = Vec::new();

    encode_local_block(&mut buffer, observer, &mut flagged);
    encode_existing_peers(&mut buffer, observer, tracking, all_players, &mut flagged);
    encode_new_peers(&mut buffer, observer, tracking, all_players, &mut flagged);

    buffer.write_bits(11, TERMINATOR);
    buffer.end_bit_access();

    for (slot, flag) in flagged {
        buffer.write_ubyte(flag.bits() as u8);
        for block in BLOCK_ORDER {
            if flag.contains(*block) {
                payloads.write_payload(slot, *block, &mut buffer);
            }
        }
    }

    buffer.finish_packet(header);
    buffer
}

fn encode_local_block(
    buffer: &mut PacketBuffer,
    observer: &PlayerSnapshot,
    flagged: &mut Vec<(u16, UpdateFlags)>,
) {
    let has_flag_update = !observer.update_flags.is_empty();
    let has_self_update = observer.needs_placement || observer.has_movement() || has_flag_update;

    if !has_self_update {
        buffer.write_bits(1, 0);
        return;
    }
    buffer.write_bits(1, 1);

    if observer.needs_placement {
        let (local_x, local_z) = observer.position.local();
        buffer.write_bits(2, 0b11);
        buffer.write_bits(2, observer.position.height as u32);
        buffer.write_bits(7, (local_z as u32) & 0x7F);
        buffer.write_bits(7, (local_x as u32) & 0x7F);
        buffer.write_bits(1, observer.region_changed as u32);
        buffer.write_bits(1, has_flag_update as u32);
    } else if observer.secondary_direction != -1 {
        buffer.write_bits(2, 0b10);
        buffer.write_bits(3, observer.primary_direction as u32);
        buffer.write_bits(3, observer.secondary_direction as u32);
        buffer.write_bits(1, has_flag_update as u32);
    } else if observer.primary_direction != -1 {
        buffer.write_bits(2, 0b01);
        buffer.write_bits(3, observer.primary_direction as u32);
        buffer.write_bits(1, has_flag_update as u32);
    } else {
        buffer.write_bits(2, 0b00);
        buffer.write_bits(1, has_flag_update as u32);
    }

    if has_flag_update {
        flagged.push((observer.slot, observer.update_flags));
    }
}

fn find(all_players: &[PlayerSnapshot], slot: u16) -> Option<&PlayerSnapshot> {
    all_players.iter().find(|p| p.slot == slot)
}

fn encode_existing_peers(
    buffer: &mut PacketBuffer,
    observer: &PlayerSnapshot,
    tracking: &mut PlayerTracking,
    all_players: &[PlayerSnapshot],
    flagged: &mut Vec<(u16, UpdateFlags)>,
) {
    let tracked: Vec<u16> = tracking.iter().collect();
    buffer.write_bits(8, tracked.len() as u32);

    let mut to_remove = Vec::new();
    for slot in tracked {
        match find(all_players, slot) {
            Some(peer) if observer.position.within_viewport(&peer.position) => {
                buffer.write_bits(1, 0); // keep

                let mut flags = peer.update_flags;
                if flags.contains(UpdateFlags::APPEARANCE) {
                    let changed = tracking.cached_appearance(slot) != Some(peer.appearance_hash);
                    if !changed {
                        flags.remove(UpdateFlags::APPEARANCE);
                    }
                    tracking.set_cached_appearance(slot, peer.appearance_hash);
                }
                let has_flag_update = !flags.is_empty();

                if peer.secondary_direction != -1 {
                    buffer.write_bits(2, 0b10); // run
                    buffer.write_bits(3, peer.primary_direction as u32);
                    buffer.write_bits(3, peer.secondary_direction as u32);
                    buffer.write_bits(1, has_flag_update as u32);
                } else if peer.primary_direction != -1 {
                    buffer.write_bits(2, 0b01); // walk
                    buffer.write_bits(3, peer.primary_direction as u32);
                    buffer.write_bits(1, has_flag_update as u32);
                } else {
                    buffer.write_bits(2, 0b11); // flag-only (no teleport)
                    buffer.write_bits(1, has_flag_update as u32);
                }

                if has_flag_update {
                    flagged.push((slot, flags));
                }
            }
            _ => {
                buffer.write_bits(1, 1); // remove
                to_remove.push(slot);
            }
        }
    }
    for slot in to_remove {
        tracking.remove(slot);
    }
}

fn encode_new_peers(
    buffer: &mut PacketBuffer,
    observer: &PlayerSnapshot,
    tracking: &mut PlayerTracking,
    all_players: &[PlayerSnapshot],
    flagged: &mut Vec<(u16, UpdateFlags)>,
) {
    for candidate in all_players {
        if candidate.slot == observer.slot {
            continue;
        }
        if tracking.is_full() {
            break;
        }
        if tracking.contains(candidate.slot) {
            continue;
        }
        if !observer.position.within_viewport(&candidate.position) {
            continue;
        }

        let (dx, dz) = observer.position.delta(&candidate.position);
        buffer.write_bits(11, candidate.slot as u32);
        buffer.write_bits(5, (dx & 0x1F) as u32);
        buffer.write_bits(5, (dz & 0x1F) as u32);
        buffer.write_bits(1, 1); // teleport: always true for a new sighting
        buffer.write_bits(1, 1); // has_flag_update: always set for new peers

        flagged.push((candidate.slot, candidate.update_flags | UpdateFlags::APPEARANCE));
        tracking.add(candidate.slot);
        tracking.set_cached_appearance(candidate.slot, candidate.appearance_hash);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(slot: u16, x: u16, z: u16) -> PlayerSnapshot {
        PlayerSnapshot {
            slot,
            position: Position::new(x, z, 0),
            primary_direction: -1,
            secondary_direction: -1,
            region_changed: false,
            needs_placement: false,
            placement_ticks: 0,
            update_flags: UpdateFlags::empty(),
            appearance_hash: 0,
        }
    }

    #[test]
    fn mutual_first_sighting_lists_each_other_as_new() {
        let a = snapshot(1, 3200, 3200);
        let b = snapshot(2, 3205, 3200);
        let all = vec![a.clone(), b.clone()];

        let mut a_tracking = PlayerTracking::new();
        encode_player_info(&a, &mut a_tracking, &all, &NoopPayloadWriter);
        assert!(a_tracking.contains(2));

        let mut b_tracking = PlayerTracking::new();
        encode_player_info(&b, &mut b_tracking, &all, &NoopPayloadWriter);
        assert!(b_tracking.contains(1));
    }

    #[test]
    fn placement_subtype_sets_region_changed_until_cleared() {
        let mut observer = snapshot(1, 3200, 3200);
        observer.needs_placement = true;
        observer.region_changed = true;
        observer.update_flags = UpdateFlags::APPEARANCE;

        let mut tracking = PlayerTracking::new();
        let buf = encode_player_info(&observer, &mut tracking, std::slice::from_ref(&observer), &NoopPayloadWriter);
        assert!(!buf.is_empty());
    }

    #[test]
    fn terminator_emitted_even_with_no_peers() {
        let observer = snapshot(1, 3200, 3200);
        let mut tracking = PlayerTracking::new();
        let buf = encode_player_info(&observer, &mut tracking, std::slice::from_ref(&observer), &NoopPayloadWriter);
        assert!(buf.len() >= 3);
    }

    /// Strip the 3-byte opcode+VarShort-length header and hand back a
    /// buffer positioned at the start of the bit-packed payload.
    fn bit_body(buf: &PacketBuffer) -> PacketBuffer {
        let mut body = PacketBuffer::from_bytes(&buf.as_bytes()[3..]);
        body.start_bit_access();
        body
    }

    #[test]
    fn existing_peer_walking_writes_subtype_then_direction() {
        let observer = snapshot(1, 3200, 3200);
        let mut peer = snapshot(2, 3200, 3200);
        peer.primary_direction = 1;
        let all = vec![observer.clone(), peer.clone()];

        let mut tracking = PlayerTracking::new();
        tracking.add(2);
        let buf = encode_player_info(&observer, &mut tracking, &all, &NoopPayloadWriter);

        let mut body = bit_body(&buf);
        assert_eq!(body.read_bits(1), 0); // no local self update
        assert_eq!(body.read_bits(8), 1); // one tracked peer
        assert_eq!(body.read_bits(1), 0); // keep
        assert_eq!(body.read_bits(2), 0b01); // walk subtype
        assert_eq!(body.read_bits(3), 1); // direction
        assert_eq!(body.read_bits(1), 0); // no flag update
        assert_eq!(body.read_bits(11), 2047); // terminator, no new peers
    }

    #[test]
    fn existing_peer_running_writes_subtype_then_both_directions() {
        let observer = snapshot(1, 3200, 3200);
        let mut peer = snapshot(2, 3200, 3200);
        peer.primary_direction = 1;
        peer.secondary_direction = 2;
        let all = vec![observer.clone(), peer.clone()];

        let mut tracking = PlayerTracking::new();
        tracking.add(2);
        let buf = encode_player_info(&observer, &mut tracking, &all, &NoopPayloadWriter);

        let mut body = bit_body(&buf);
        assert_eq!(body.read_bits(1), 0);
        assert_eq!(body.read_bits(8), 1);
        assert_eq!(body.read_bits(1), 0); // keep
        assert_eq!(body.read_bits(2), 0b10); // run subtype
        assert_eq!(body.read_bits(3), 1); // primary direction
        assert_eq!(body.read_bits(3), 2); // secondary direction
        assert_eq!(body.read_bits(1), 0); // no flag update
    }

    #[test]
    fn existing_peer_flag_only_uses_subtype_eleven() {
        let observer = snapshot(1, 3200, 3200);
        let mut peer = snapshot(2, 3200, 3200);
        peer.update_flags = UpdateFlags::CHAT;
        let all = vec![observer.clone(), peer.clone()];

        let mut tracking = PlayerTracking::new();
        tracking.add(2);
        let buf = encode_player_info(&observer, &mut tracking, &all, &NoopPayloadWriter);

        let mut body = bit_body(&buf);
        assert_eq!(body.read_bits(1), 0);
        assert_eq!(body.read_bits(8), 1);
        assert_eq!(body.read_bits(1), 0); // keep
        assert_eq!(body.read_bits(2), 0b11); // flag-only subtype
        assert_eq!(body.read_bits(1), 1); // has_flag_update
    }

    #[test]
    fn unchanged_appearance_hash_is_suppressed_on_the_next_tick() {
        let observer = snapshot(1, 3200, 3200);
        let mut peer = snapshot(2, 3205, 3200);
        peer.update_flags = UpdateFlags::APPEARANCE;
        peer.appearance_hash = 42;
        let all = vec![observer.clone(), peer.clone()];

        // First sighting: new peer, appearance always forced.
        let mut tracking = PlayerTracking::new();
        encode_player_info(&observer, &mut tracking, &all, &NoopPayloadWriter);
        assert_eq!(tracking.cached_appearance(2), Some(42));

        // Second tick, same hash, still flagged APPEARANCE upstream: the
        // existing-peer path must suppress it since nothing changed.
        let buf = encode_player_info(&observer, &mut tracking, &all, &NoopPayloadWriter);
        let mut body = bit_body(&buf);
        assert_eq!(body.read_bits(1), 0);
        assert_eq!(body.read_bits(8), 1);
        assert_eq!(body.read_bits(1), 0); // keep
        assert_eq!(body.read_bits(2), 0b11); // flag-only subtype, no movement
        assert_eq!(body.read_bits(1), 0); // appearance suppressed: no flag update at all

        // A changed hash on a later tick forces it back on.
        let mut changed_all = all.clone();
        changed_all[1].appearance_hash = 43;
        let buf = encode_player_info(&observer, &mut tracking, &changed_all, &NoopPayloadWriter);
        let mut body = bit_body(&buf);
        body.read_bits(1);
        body.read_bits(8);
        body.read_bits(1);
        assert_eq!(body.read_bits(2), 0b11);
        assert_eq!(body.read_bits(1), 1); // forced back on
        assert_eq!(tracking.cached_appearance(2), Some(43));
    }
}
