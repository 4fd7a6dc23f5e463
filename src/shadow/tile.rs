//! Compressed 16x16 depth tiles.
//!
//! Depths are signed 32-bit fixed point. A tile is classified by how many of the
//! upper three bytes vary across its samples; the least significant byte is never
//! stored except for the inline uniform value.

/// Side of a shadow tile in pixels.
pub const TILE_SIZE: usize = 16;
/// Samples per tile.
pub const TILE_PIXELS: usize = TILE_SIZE * TILE_SIZE;

/// One compressed tile, from least to most varying.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ShadowTile {
    /// Kind 0: every sample shares its upper 24 bits. Holds the first sample.
    Uniform(i32),
    /// Kind 1: upper 16 bits constant; per-sample bits 8..16.
    ByteDelta {
        prefix: u32,
        deltas: Box<[u8; TILE_PIXELS]>,
    },
    /// Kind 2: upper 8 bits constant; per-sample bits 8..24.
    ShortDelta {
        prefix: u32,
        deltas: Box<[u16; TILE_PIXELS]>,
    },
    /// Kind 3: per-sample bits 8..32, most significant byte first.
    Triple(Box<[[u8; 3]; TILE_PIXELS]>),
}

/// Compression kind (0..=3) a tile of samples would be stored as.
pub fn classify(samples: &[i32; TILE_PIXELS]) -> u8 {
    let first = samples[0] as u32;
    let constant_above = |shift: u32| samples.iter().all(|&v| (v as u32) >> shift == first >> shift);
    if constant_above(8) {
        0
    } else if constant_above(16) {
        1
    } else if constant_above(24) {
        2
    } else {
        3
    }
}

impl ShadowTile {
    /// Compress 256 row-major samples.
    pub fn encode(samples: &[i32; TILE_PIXELS]) -> Self {
        let first = samples[0] as u32;
        match classify(samples) {
            0 => Self::Uniform(samples[0]),
            1 => {
                let mut deltas = Box::new([0u8; TILE_PIXELS]);
                for (d, &v) in deltas.iter_mut().zip(samples) {
                    *d = ((v as u32) >> 8) as u8;
                }
                Self::ByteDelta {
                    prefix: first & 0xFFFF_0000,
                    deltas,
                }
            }
            2 => {
                let mut deltas = Box::new([0u16; TILE_PIXELS]);
                for (d, &v) in deltas.iter_mut().zip(samples) {
                    *d = ((v as u32) >> 8) as u16;
                }
                Self::ShortDelta {
                    prefix: first & 0xFF00_0000,
                    deltas,
                }
            }
            _ => {
                let mut bytes = Box::new([[0u8; 3]; TILE_PIXELS]);
                for (b, &v) in bytes.iter_mut().zip(samples) {
                    let v = v as u32;
                    *b = [(v >> 24) as u8, (v >> 16) as u8, (v >> 8) as u8];
                }
                Self::Triple(bytes)
            }
        }
    }

    pub fn kind(&self) -> u8 {
        match self {
            Self::Uniform(_) => 0,
            Self::ByteDelta { .. } => 1,
            Self::ShortDelta { .. } => 2,
            Self::Triple(_) => 3,
        }
    }

    /// Stored depth of sample `i` (row-major within the tile).
    #[inline]
    pub fn depth_at(&self, i: usize) -> i32 {
        match self {
            Self::Uniform(v) => *v,
            Self::ByteDelta { prefix, deltas } => (prefix | (u32::from(deltas[i]) << 8)) as i32,
            Self::ShortDelta { prefix, deltas } => (prefix | (u32::from(deltas[i]) << 8)) as i32,
            Self::Triple(bytes) => {
                let [b0, b1, b2] = bytes[i];
                ((u32::from(b0) << 24) | (u32::from(b1) << 16) | (u32::from(b2) << 8)) as i32
            }
        }
    }

    /// Heap bytes owned by the payload.
    pub fn payload_bytes(&self) -> usize {
        match self {
            Self::Uniform(_) => 0,
            Self::ByteDelta { .. } => 4 + TILE_PIXELS,
            Self::ShortDelta { .. } => 4 + 2 * TILE_PIXELS,
            Self::Triple(_) => 3 * TILE_PIXELS,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shadow/tile.rs"]
mod tests;
