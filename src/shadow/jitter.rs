use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use glam::Vec2;

/// Deterministic SplitMix64 stream.
#[derive(Clone, Copy, Debug)]
struct Rng64 {
    state: u64,
}

impl Rng64 {
    fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    fn next_f32_01(&mut self) -> f32 {
        // 24 bits of precision.
        let v = self.next_u64() >> 40;
        (v as f32) * (1.0 / (1u32 << 24) as f32)
    }
}

/// Stratified jitter offsets in `[0, 1)^2`: one point per cell of a
/// `samples x samples` grid, in row-major cell order.
pub fn jitter_table(samples: u32) -> Vec<Vec2> {
    let n = samples.max(1);
    let mut rng = Rng64::new(u64::from(n).wrapping_mul(0xD6E8_FEB8_6659_FD93));
    let inv = 1.0 / n as f32;
    let mut out = Vec::with_capacity((n * n) as usize);
    for y in 0..n {
        for x in 0..n {
            let jx = rng.next_f32_01();
            let jy = rng.next_f32_01();
            out.push(Vec2::new((x as f32 + jx) * inv, (y as f32 + jy) * inv));
        }
    }
    out
}

/// Jitter tables shared between shadow buffers with the same sample count.
#[derive(Debug, Default)]
pub struct JitterCache {
    tables: Mutex<HashMap<u32, Arc<[Vec2]>>>,
}

impl JitterCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn table(&self, samples: u32) -> Arc<[Vec2]> {
        let mut tables = self
            .tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        tables
            .entry(samples)
            .or_insert_with(|| jitter_table(samples).into())
            .clone()
    }

    /// Number of distinct sample counts cached.
    pub fn len(&self) -> usize {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
#[path = "../../tests/unit/shadow/jitter.rs"]
mod tests;
