use log::trace;

use crate::error::PipelineError;

/// Total size of the simulated VRAM arena, 256 MiB.
pub const VRAM_SIZE: u64 = 256 * 1024 * 1024;

/// A bump allocator over a fixed byte arena. Models committed hardware
/// memory: there is no free, only a monotonically increasing cursor.
pub struct Vram {
    bytes: Vec<u8>,
    cursor: u64,
}

impl Vram {
    pub fn new() -> Self {
        Self {
            bytes: vec![0u8; VRAM_SIZE as usize],
            cursor: 0,
        }
    }

    /// Reserve `size` bytes at the end of the arena and return their offset.
    /// Panics if the arena would overflow; the bump cursor never wraps.
    pub fn allocate(&mut self, size: u64) -> u64 {
        let remaining = VRAM_SIZE - self.cursor;
        if size > remaining {
            panic!(
                "{}",
                PipelineError::ArenaExhausted {
                    requested: size,
                    remaining,
                }
            );
        }
        let offset = self.cursor;
        self.cursor += size;
        trace!("allocated {size} bytes at 0x{offset:08x}, cursor now 0x{:08x}", self.cursor);
        offset
    }

    /// Copy `data` into the arena and return its offset.
    pub fn upload(&mut self, data: &[u8]) -> u64 {
        let offset = self.allocate(data.len() as u64);
        self.write(offset, data);
        offset
    }

    pub fn write(&mut self, offset: u64, data: &[u8]) {
        let start = offset as usize;
        self.bytes[start..start + data.len()].copy_from_slice(data);
    }

    pub fn read(&self, offset: u64, len: usize) -> &[u8] {
        let start = offset as usize;
        &self.bytes[start..start + len]
    }

    pub fn slice_mut(&mut self, offset: u64, len: usize) -> &mut [u8] {
        let start = offset as usize;
        &mut self.bytes[start..start + len]
    }

    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bump_cursor_is_monotonic_and_matches_requested_sizes() {
        let mut vram = Vram::new();
        let a = vram.allocate(100);
        let b = vram.allocate(250);
        let c = vram.allocate(7);
        assert_eq!(a, 0);
        assert_eq!(b, 100);
        assert_eq!(c, 350);
        assert_eq!(vram.cursor(), 357);
    }

    #[test]
    #[should_panic(expected = "VRAM arena exhausted")]
    fn allocating_past_the_arena_end_is_fatal() {
        let mut vram = Vram::new();
        vram.allocate(VRAM_SIZE + 1);
    }

    #[test]
    fn upload_round_trips_bytes() {
        let mut vram = Vram::new();
        let offset = vram.upload(&[1, 2, 3, 4]);
        assert_eq!(vram.read(offset, 4), &[1, 2, 3, 4]);
    }
}
