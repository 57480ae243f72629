//! Map streaming
//!
//! Emits `LOAD_AREA` when a player seats or crosses a mapsquare boundary,
//! listing the unique 64x64-tile mapsquare files in the surrounding 3x3
//! window, then streams requested files back in 1000-byte chunks.

use std::path::{Path, PathBuf};

use tracing::warn;

use crate::game::coord::Position;
use crate::net::buffer::{HeaderKind, PacketBuffer};
use crate::net::crc32;

const LOAD_AREA_OPCODE: u8 = 73;
const DATA_LAND_OPCODE: u8 = 74;
const DATA_LOC_OPCODE: u8 = 75;
const DATA_LAND_DONE_OPCODE: u8 = 76;
const DATA_LOC_DONE_OPCODE: u8 = 79;

const CHUNK_SIZE: usize = 1000;

/// Compute the (at most 9) unique mapsquares in the 3x3 window around a
/// position, via the +/-52-tile offset convention before shifting to
/// mapsquare units, with a dedup scan rather than a set (the window is
/// always small).
pub fn surrounding_mapsquares(pos: &Position) -> Vec<(u16, u16)> {
    let mut squares = Vec::with_capacity(9);
    for dx in [-52i32, 0, 52] {
        for dz in [-52i32, 0, 52] {
            let fx = ((pos.x as i32 + dx).max(0) as u32 >> 6) as u16;
            let fz = ((pos.z as i32 + dz).max(0) as u32 >> 6) as u16;
            if !squares.contains(&(fx, fz)) {
                squares.push((fx, fz));
            }
        }
    }
    squares
}

fn land_file(root: &Path, fx: u16, fz: u16) -> PathBuf {
    root.join(format!("m{fx}_{fz}"))
}

fn loc_file(root: &Path, fx: u16, fz: u16) -> PathBuf {
    root.join(format!("l{fx}_{fz}"))
}

fn crc_of(path: &Path) -> u32 {
    match std::fs::read(path) {
        Ok(bytes) => crc32::checksum(&bytes),
        Err(_) => 0,
    }
}

/// Build the `LOAD_AREA` frame for a position: zone coordinates followed by
/// each unique mapsquare's (fx, fz, land_crc, loc_crc).
pub fn build_load_area(maps_root: &Path, pos: &Position) -> PacketBuffer {
    let mut buffer = PacketBuffer::with_capacity(128);
    let header = buffer.open_packet(LOAD_AREA_OPCODE, HeaderKind::VarShort, None);

    let (zx, zz) = pos.zone_center();
    buffer.write_ushort(zx);
    buffer.write_ushort(zz);

    for (fx, fz) in surrounding_mapsquares(pos) {
        buffer.write_ubyte(fx as u8);
        buffer.write_ubyte(fz as u8);
        buffer.write_uint(crc_of(&land_file(maps_root, fx, fz)));
        buffer.write_uint(crc_of(&loc_file(maps_root, fx, fz)));
    }

    buffer.finish_packet(header);
    buffer
}

/// Stream one file (land or loc) back to the client in `CHUNK_SIZE`-byte
/// `DATA_LAND`/`DATA_LOC` frames, followed by a fixed `*_DONE` frame.
/// A missing file streams no data and only emits the DONE marker.
pub fn stream_file(maps_root: &Path, fx: u16, fz: u16, is_loc: bool) -> Vec<PacketBuffer> {
    let path = if is_loc {
        loc_file(maps_root, fx, fz)
    } else {
        land_file(maps_root, fx, fz)
    };

    let data = match std::fs::read(&path) {
        Ok(bytes) => bytes,
        Err(_) => {
            warn!(?path, "map chunk file not found, emitting done marker only");
            Vec::new()
        }
    };

    let data_opcode = if is_loc { DATA_LOC_OPCODE } else { DATA_LAND_OPCODE };
    let done_opcode = if is_loc {
        DATA_LOC_DONE_OPCODE
    } else {
        DATA_LAND_DONE_OPCODE
    };

    let total = data.len() as u16;
    let mut frames = Vec::new();

    for (offset, chunk) in data.chunks(CHUNK_SIZE).enumerate() {
        let mut buffer = PacketBuffer::with_capacity(CHUNK_SIZE + 16);
        let header = buffer.open_packet(data_opcode, HeaderKind::VarShort, None);
        buffer.write_ubyte(fx as u8);
        buffer.write_ubyte(fz as u8);
        buffer.write_ushort((offset * CHUNK_SIZE) as u16);
        buffer.write_ushort(total);
        buffer.write_bytes(chunk);
        buffer.finish_packet(header);
        frames.push(buffer);
    }

    let mut done = PacketBuffer::with_capacity(4);
    let done_header = done.open_packet(done_opcode, HeaderKind::Fixed, None);
    done.write_ubyte(fx as u8);
    done.write_ubyte(fz as u8);
    done.finish_packet(done_header);
    frames.push(done);

    frames
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surrounding_window_dedups_and_includes_center() {
        let pos = Position::new(3232, 3232, 0);
        let squares = surrounding_mapsquares(&pos);
        let mut unique = squares.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(squares.len(), unique.len(), "window should already be deduped");
        assert!(unique.len() <= 9);
        assert!(unique.contains(&pos.mapsquare()));
    }

    #[test]
    fn missing_file_streams_only_done_marker() {
        let frames = stream_file(Path::new("/nonexistent/maps/root"), 1, 1, false);
        assert_eq!(frames.len(), 1);
    }
}
