//! Error kinds for the atlas core.
//!
//! See spec §7 for the trigger/policy table this enum encodes.

use thiserror::Error;

use crate::glyph::CodePoint;

#[derive(Debug, Error)]
pub enum AtlasError {
    /// The Latin page could not fit a glyph. Programmer error: the Latin set
    /// is 62 characters and must fit in one page at any supported gen size.
    #[error("latin page overflow for code point {cp:#x} at gen size {gen_size}")]
    LatinPageOverflow { cp: CodePoint, gen_size: u32 },

    /// A brand-new mixed page could not fit a single glyph — the glyph is
    /// larger than a page.
    #[error("glyph {cp:#x} ({w}x{h}) does not fit a fresh {page_size}x{page_size} page")]
    FreshPageOverflow {
        cp: CodePoint,
        w: u32,
        h: u32,
        page_size: u32,
    },

    /// The worker pool's `ready` gate was rejected by a worker `error` event
    /// during initialization.
    #[error("worker {worker_id} failed to initialize: {reason}")]
    WorkerInitFailure { worker_id: usize, reason: String },

    /// A dispatched task's worker errored or died before returning a result.
    #[error("worker {worker_id} failed task for code point {cp:#x}: {reason}")]
    WorkerTaskFailed {
        worker_id: usize,
        cp: CodePoint,
        reason: String,
    },

    /// The worker pool has already been disposed.
    #[error("worker pool has been disposed")]
    PoolDisposed,

    /// Config (de)serialization failure.
    #[error("config error: {0}")]
    Config(#[from] toml::de::Error),

    /// Config values that parsed fine but violate a structural invariant
    /// (e.g. `size_thresholds.len() != gen_sizes.len() - 1`).
    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
