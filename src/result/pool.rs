use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::foundation::core::PixelRect;
use crate::foundation::error::TileRenderResult;
use crate::result::model::{RenderResult, ResultLayout};

/// Pool configuration for recycled tile results.
#[derive(Debug, Clone, Copy)]
pub struct TilePoolOpts {
    /// Maximum bytes retained across all buckets.
    pub max_pool_bytes: usize,
    /// Maximum number of retained results per (w,h) bucket.
    pub max_results_per_bucket: usize,
}

impl Default for TilePoolOpts {
    fn default() -> Self {
        Self {
            max_pool_bytes: 64 * 1024 * 1024,
            max_results_per_bucket: 4,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct TileKey {
    w: u32,
    h: u32,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TilePoolStats {
    pub retained_results: usize,
    pub retained_bytes: usize,
    pub alloc_results: u64,
    pub alloc_bytes: u64,
    pub reused_results: u64,
    pub dropped_on_release: u64,
    /// Results handed out and not yet released.
    pub live_results: usize,
}

/// Bounded recycling allocator for tile render results of one layout.
///
/// Keyed by `(width, height)`. Borrow/release happen at tile granularity.
pub struct TileResultPool {
    opts: TilePoolOpts,
    layout: Arc<ResultLayout>,
    stats: TilePoolStats,
    buckets: HashMap<TileKey, Vec<RenderResult>>,
}

impl TileResultPool {
    pub fn new(opts: TilePoolOpts, layout: Arc<ResultLayout>) -> Self {
        Self {
            opts,
            layout,
            stats: TilePoolStats::default(),
            buckets: HashMap::new(),
        }
    }

    pub fn stats(&self) -> TilePoolStats {
        self.stats.clone()
    }

    pub fn borrow(&mut self, rect: PixelRect, crop: u32) -> TileRenderResult<RenderResult> {
        let key = TileKey {
            w: rect.width().max(0) as u32,
            h: rect.height().max(0) as u32,
        };
        if let Some(mut rr) = self.buckets.get_mut(&key).and_then(Vec::pop) {
            self.stats.retained_results = self.stats.retained_results.saturating_sub(1);
            self.stats.retained_bytes = self.stats.retained_bytes.saturating_sub(rr.byte_len());
            self.stats.reused_results = self.stats.reused_results.saturating_add(1);
            self.stats.live_results += 1;
            rr.reset(rect, crop);
            return Ok(rr);
        }

        let rr = RenderResult::new(&self.layout, rect, crop)?;
        self.stats.alloc_results = self.stats.alloc_results.saturating_add(1);
        self.stats.alloc_bytes = self.stats.alloc_bytes.saturating_add(rr.byte_len() as u64);
        self.stats.live_results += 1;
        Ok(rr)
    }

    pub fn release(&mut self, rr: RenderResult) {
        self.stats.live_results = self.stats.live_results.saturating_sub(1);

        if self.opts.max_pool_bytes == 0 || self.opts.max_results_per_bucket == 0 {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let bytes = rr.byte_len();
        if self.stats.retained_bytes.saturating_add(bytes) > self.opts.max_pool_bytes {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        let key = TileKey {
            w: rr.width,
            h: rr.height,
        };
        let bucket = self.buckets.entry(key).or_default();
        if bucket.len() >= self.opts.max_results_per_bucket {
            self.stats.dropped_on_release = self.stats.dropped_on_release.saturating_add(1);
            return;
        }

        bucket.push(rr);
        self.stats.retained_results = self.stats.retained_results.saturating_add(1);
        self.stats.retained_bytes = self.stats.retained_bytes.saturating_add(bytes);
    }
}

/// The allocation lock: serializes every tile result allocation and free while workers run.
pub struct TileAllocator {
    inner: Mutex<TileResultPool>,
}

impl TileAllocator {
    pub fn new(opts: TilePoolOpts, layout: Arc<ResultLayout>) -> Self {
        Self {
            inner: Mutex::new(TileResultPool::new(opts, layout)),
        }
    }

    // Every mutation is a single push/pop plus counters; a poisoned pool is still consistent.
    fn lock(&self) -> MutexGuard<'_, TileResultPool> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn allocate(&self, rect: PixelRect, crop: u32) -> TileRenderResult<RenderResult> {
        self.lock().borrow(rect, crop)
    }

    pub fn free(&self, rr: RenderResult) {
        self.lock().release(rr);
    }

    pub fn stats(&self) -> TilePoolStats {
        self.lock().stats()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/result/pool.rs"]
mod tests;
