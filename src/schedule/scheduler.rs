use std::time::Duration;

use crate::foundation::core::PixelRect;
use crate::foundation::error::{TileRenderError, TileRenderResult};
use crate::parts::partition::PartSpec;
use crate::render::callbacks::{DisplayUpdate, RenderCallbacks};
use crate::result::merge::merge_result;
use crate::result::model::RenderResult;
use crate::result::pool::TileAllocator;
use crate::schedule::cancel::CancelToken;
use crate::shade::{ShadeContext, ShadeOutcome, TileJob, TileShader};

/// Lifecycle of one part.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PartState {
    /// Flagged by the partitioner; never rendered.
    Invalid,
    Unscheduled,
    Dispatched,
    CompletedPendingMerge,
    Merged,
    /// Finished without a mergeable result (cancelled, aborted or failed) or never dispatched.
    Dropped,
}

/// A part plus its scheduling state.
#[derive(Clone, Debug, PartialEq)]
pub struct Part {
    pub spec: PartSpec,
    pub state: PartState,
    pub display_order: Option<u64>,
    pub worker: Option<usize>,
}

impl Part {
    pub fn new(spec: PartSpec) -> Self {
        Self {
            spec,
            state: if spec.valid {
                PartState::Unscheduled
            } else {
                PartState::Invalid
            },
            display_order: None,
            worker: None,
        }
    }

    fn center(&self) -> (f64, f64) {
        let (x, y) = self.spec.cell.center();
        (x as f64, y as f64)
    }
}

/// Counters of one scheduled sub-frame render.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RenderStats {
    pub parts_total: u64,
    pub parts_merged: u64,
    pub parts_dropped: u64,
    pub parts_invalid: u64,
    /// Coordinator waits on the completion channel.
    pub polls: u64,
    pub cancelled: bool,
}

impl RenderStats {
    /// Fold the counters of another sub-frame in.
    pub fn accumulate(&mut self, other: &RenderStats) {
        self.parts_total += other.parts_total;
        self.parts_merged += other.parts_merged;
        self.parts_dropped += other.parts_dropped;
        self.parts_invalid += other.parts_invalid;
        self.polls += other.polls;
        self.cancelled |= other.cancelled;
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SchedulerOpts {
    /// Worker slots; at least one.
    pub threads: usize,
    /// Longest wait between completion polls.
    pub poll_interval: Duration,
}

impl Default for SchedulerOpts {
    fn default() -> Self {
        Self {
            threads: 2,
            poll_interval: Duration::from_millis(2),
        }
    }
}

/// What [`run_parts`] hands back.
#[derive(Clone, Debug)]
pub struct ScheduleReport {
    pub stats: RenderStats,
    pub parts: Vec<Part>,
}

struct Completion {
    part: usize,
    worker: usize,
    outcome: TileRenderResult<Option<RenderResult>>,
}

pub(crate) fn build_thread_pool(threads: usize) -> TileRenderResult<rayon::ThreadPool> {
    if threads == 0 {
        return Err(TileRenderError::config("render threads must be >= 1"));
    }
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .thread_name(|i| format!("tilerender-worker-{i}"))
        .build()
        .map_err(|e| TileRenderError::evaluation(format!("failed to build rayon thread pool: {e}")))
}

/// Unscheduled part nearest to the centroid of every part already dispatched.
/// Before the first dispatch the centroid is `seed`, the display center.
/// Ties go to the lower index.
fn pick_next(parts: &[Part], seed: (f64, f64), slice: Option<u32>) -> Option<usize> {
    let (mut sx, mut sy, mut n) = (0.0, 0.0, 0.0);
    for p in parts.iter().filter(|p| {
        !matches!(p.state, PartState::Unscheduled | PartState::Invalid)
    }) {
        let (x, y) = p.center();
        sx += x;
        sy += y;
        n += 1.0;
    }
    let (cx, cy) = if n > 0.0 { (sx / n, sy / n) } else { seed };

    parts
        .iter()
        .enumerate()
        .filter(|(_, p)| p.state == PartState::Unscheduled)
        .filter(|(_, p)| slice.is_none() || p.spec.slice.map(|s| s.index) == slice)
        .map(|(i, p)| {
            let (x, y) = p.center();
            (i, (x - cx).powi(2) + (y - cy).powi(2))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1).then(a.0.cmp(&b.0)))
        .map(|(i, _)| i)
}

/// Leftmost panorama slice that still has unscheduled parts.
fn next_slice(parts: &[Part]) -> Option<u32> {
    parts
        .iter()
        .filter(|p| p.state == PartState::Unscheduled)
        .filter_map(|p| p.spec.slice)
        .map(|s| s.index)
        .min()
}

fn render_job(
    shader: &dyn TileShader,
    ctx: &ShadeContext,
    allocator: &TileAllocator,
    cancel: &CancelToken,
    job: &TileJob,
) -> TileRenderResult<Option<RenderResult>> {
    if cancel.poll() {
        return Ok(None);
    }
    let mut rr = allocator.allocate(job.rect, job.crop)?;
    match shader.shade_tile(ctx, job, &mut rr, cancel) {
        Ok(ShadeOutcome::Complete) => Ok(Some(rr)),
        Ok(ShadeOutcome::Aborted) => {
            allocator.free(rr);
            Ok(None)
        }
        Err(e) => {
            allocator.free(rr);
            Err(e)
        }
    }
}

/// Render every valid part into `full` on a bounded worker pool.
///
/// The calling thread coordinates: it dispatches parts while worker slots are free,
/// then waits on the completion channel for at most one poll interval, merging
/// finished tiles in completion order. Cancellation stops new dispatch; in-flight
/// parts drain, and tiles that come back without a finished result are freed
/// unmerged. A shading error stops dispatch the same way and is returned once
/// everything in flight has drained.
#[allow(clippy::too_many_arguments)]
pub fn run_parts(
    specs: Vec<PartSpec>,
    full: &mut RenderResult,
    shader: &dyn TileShader,
    ctx: &ShadeContext,
    allocator: &TileAllocator,
    cancel: &CancelToken,
    callbacks: &dyn RenderCallbacks,
    opts: &SchedulerOpts,
) -> TileRenderResult<ScheduleReport> {
    let mut parts: Vec<Part> = specs.into_iter().map(Part::new).collect();
    let mut stats = RenderStats {
        parts_total: parts.len() as u64,
        ..RenderStats::default()
    };
    for p in parts.iter().filter(|p| p.state == PartState::Invalid) {
        tracing::warn!(part = p.spec.index, crop = p.spec.crop, "skipping invalid part");
        stats.parts_invalid += 1;
    }
    let valid = stats.parts_total - stats.parts_invalid;
    if valid == 0 {
        return Err(TileRenderError::config(
            "no valid parts: the crop margin swallows every part",
        ));
    }

    let threads = opts.threads.max(1);
    let pool = build_thread_pool(threads)?;
    let (tx, rx) = flume::unbounded::<Completion>();

    let seed = {
        let (x, y) = PixelRect::from_size(full.width, full.height).center();
        (x as f64, y as f64)
    };
    let mut slots = vec![false; threads];
    let mut in_flight = 0usize;
    let mut next_order = 0u64;
    let mut active_slice: Option<u32> = None;
    let mut stopping = false;
    let mut first_error: Option<TileRenderError> = None;

    pool.in_place_scope(|scope| {
        loop {
            if !stopping && cancel.poll() {
                tracing::warn!(in_flight, "render cancelled, draining workers");
                stats.cancelled = true;
                stopping = true;
            }

            while !stopping && in_flight < threads {
                let is_panorama = parts.iter().any(|p| p.spec.slice.is_some());
                if is_panorama {
                    let slice_open = active_slice.is_some_and(|s| {
                        parts.iter().any(|p| {
                            p.state == PartState::Unscheduled
                                && p.spec.slice.map(|ps| ps.index) == Some(s)
                        })
                    });
                    if !slice_open {
                        // A slice drains completely before the next one starts.
                        if in_flight > 0 {
                            break;
                        }
                        active_slice = next_slice(&parts);
                        if let Some(s) = active_slice {
                            tracing::debug!(slice = s, "starting panorama slice");
                        }
                    }
                }
                let Some(idx) = pick_next(&parts, seed, active_slice) else {
                    break;
                };
                let Some(worker) = slots.iter().position(|busy| !busy) else {
                    break;
                };
                slots[worker] = true;
                in_flight += 1;

                let part = &mut parts[idx];
                part.state = PartState::Dispatched;
                part.display_order = Some(next_order);
                part.worker = Some(worker);
                let job = TileJob {
                    part: idx,
                    rect: part.spec.rect,
                    crop: part.spec.crop,
                    display_order: next_order,
                    worker,
                    slice: part.spec.slice,
                };
                next_order += 1;
                tracing::debug!(part = idx, worker, order = job.display_order, "dispatching part");

                let tx = tx.clone();
                let cancel = cancel.clone();
                scope.spawn(move |_| {
                    let outcome = render_job(shader, ctx, allocator, &cancel, &job);
                    // The coordinator owns the receiver until every task has reported.
                    let _ = tx.send(Completion {
                        part: job.part,
                        worker: job.worker,
                        outcome,
                    });
                });
            }

            if in_flight == 0 {
                break;
            }

            stats.polls += 1;
            let first = match rx.recv_timeout(opts.poll_interval) {
                Ok(c) => c,
                Err(flume::RecvTimeoutError::Timeout) => continue,
                Err(flume::RecvTimeoutError::Disconnected) => break,
            };
            let mut batch = vec![first];
            batch.extend(rx.try_iter());

            for c in batch {
                in_flight -= 1;
                slots[c.worker] = false;
                let part = &mut parts[c.part];
                match c.outcome {
                    Ok(Some(tile)) => {
                        part.state = PartState::CompletedPendingMerge;
                        let merged = merge_result(full, &tile);
                        allocator.free(tile);
                        match merged {
                            Ok(region) => {
                                part.state = PartState::Merged;
                                stats.parts_merged += 1;
                                tracing::debug!(part = c.part, "merged part");
                                if let Some(rect) = region {
                                    callbacks.display_update(&DisplayUpdate {
                                        rect,
                                        result: &*full,
                                        part: c.part,
                                        display_order: part.display_order.unwrap_or_default(),
                                    });
                                }
                                callbacks.progress(stats.parts_merged as f32 / valid as f32);
                            }
                            Err(e) => {
                                part.state = PartState::Dropped;
                                stats.parts_dropped += 1;
                                stopping = true;
                                if first_error.is_none() {
                                    first_error = Some(e);
                                }
                            }
                        }
                    }
                    Ok(None) => {
                        part.state = PartState::Dropped;
                        stats.parts_dropped += 1;
                    }
                    Err(e) => {
                        tracing::error!(part = c.part, error = %e, "part failed");
                        part.state = PartState::Dropped;
                        stats.parts_dropped += 1;
                        stopping = true;
                        if first_error.is_none() {
                            first_error = Some(e);
                        }
                    }
                }
            }
        }
    });

    for p in parts.iter_mut().filter(|p| p.state == PartState::Unscheduled) {
        p.state = PartState::Dropped;
        stats.parts_dropped += 1;
    }

    if let Some(e) = first_error {
        return Err(e);
    }
    Ok(ScheduleReport { stats, parts })
}

#[cfg(test)]
#[path = "../../tests/unit/schedule/scheduler.rs"]
mod tests;
