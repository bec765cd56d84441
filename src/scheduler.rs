//! The deferred-batch scheduler embedded in `FontAtlas` (spec §4.4/§9):
//! a FIFO of pending generation requests plus a one-shot "drain task"
//! marker that coalesces multiple enqueues into a single drain.
//!
//! There is no microtask queue in this synchronous core (spec §9's
//! "platforms without a microtask queue" branch), so the "next scheduler
//! tick" is simply the next call to `FontAtlas::tick()`, an explicit entry
//! point the host calls once per frame/iteration of its own event loop —
//! the same shape as `ori_term`'s winit redraw-requested loop calling into
//! `GpuRenderer::render` once per frame.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::glyph::CodePoint;
use crate::oracle::VariationAxis;

/// One queued generation request.
#[derive(Clone)]
pub struct PendingGlyph {
    pub cp: CodePoint,
    pub gen_size: u32,
    pub font_bytes: Arc<Vec<u8>>,
    pub axes: Vec<VariationAxis>,
    pub variant_id: String,
}

/// FIFO of pending glyphs plus the single-flight "a drain is already
/// scheduled" marker.
#[derive(Default)]
pub struct DeferredBatchScheduler {
    fifo: VecDeque<PendingGlyph>,
    scheduled: bool,
}

impl DeferredBatchScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push a request. Returns `true` the first time since the last drain —
    /// i.e. when the caller should actually arrange for a tick (in a host
    /// with a real microtask/event queue, this is where you'd post one);
    /// subsequent calls before the next drain return `false` and coalesce.
    pub fn enqueue(&mut self, item: PendingGlyph) -> bool {
        self.fifo.push_back(item);
        if self.scheduled {
            false
        } else {
            self.scheduled = true;
            true
        }
    }

    pub fn has_pending_work(&self) -> bool {
        self.scheduled || !self.fifo.is_empty()
    }

    /// Atomically take the current FIFO snapshot, reset the FIFO, and clear
    /// the outstanding-task marker. Requests enqueued by the caller while
    /// processing this snapshot land in the *next* drain, never this one.
    pub fn take_snapshot(&mut self) -> Vec<PendingGlyph> {
        self.scheduled = false;
        self.fifo.drain(..).collect()
    }
}
