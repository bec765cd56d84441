//! Runtime-adaptive SDF/MTSDF font-atlas cache.
//!
//! Maps `(code point, variant, render size)` to a rectangle on one of a set
//! of fixed-size GPU-style texture pages. Glyph generation is deferred and
//! batched: a call to [`FontAtlas::get_glyph`] reserves a slot and returns
//! immediately; actual pixels land on the next [`FontAtlas::tick`].
//!
//! The core is generic over two client-supplied collaborators —
//! [`SdfOracle`] (produces glyph pixels) and [`TextureBackend`] (owns GPU
//! texture objects) — so this crate never depends on a concrete rasterizer
//! or graphics API. [`worker_pool::WorkerPool`] offers an optional
//! multi-threaded path for bulk/offline generation, independent of the
//! on-demand atlas.

pub mod atlas;
pub mod bmfont;
pub mod config;
pub mod error;
pub mod glyph;
pub mod oracle;
pub mod page;
pub mod scheduler;
pub mod status;
pub mod variant;
pub mod worker_pool;

#[cfg(test)]
pub(crate) mod test_support;

pub use atlas::{FontAtlas, GlyphRequest};
pub use config::{FontAtlasConfig, WorkerPoolConfig};
pub use error::AtlasError;
pub use glyph::{CodePoint, GlyphInfo, GlyphLocation, GlyphMetrics, GlyphState, PageRef};
pub use oracle::{OracleGlyph, OracleMetrics, PixelFormat, SdfOracle, TextureBackend, VariationAxis};
pub use status::Status;
pub use worker_pool::{GenerateKind, WorkerPool};
