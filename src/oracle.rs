//! External collaborator interfaces (spec §6): the SDF oracle and the
//! texture backend. Both are client-supplied; the core only consumes them
//! through these traits.

use crate::glyph::CodePoint;

/// Metrics as reported directly by the oracle, before being copied into a
/// `GlyphMetrics` (spec: "Metrics record: width, height, advance (all
/// integer-valued in oracle output), and plane-bounds l/b/r/t").
#[derive(Debug, Clone, Copy)]
pub struct OracleMetrics {
    pub width: u32,
    pub height: u32,
    pub advance: i32,
    pub plane_left: f32,
    pub plane_bottom: f32,
    pub plane_right: f32,
    pub plane_top: f32,
}

/// One channel count the oracle can emit pixels in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// MSDF: 3 floats per pixel, RGB.
    Rgb,
    /// MTSDF: 4 floats per pixel, RGBA.
    Rgba,
}

/// Raw oracle output: metrics plus a row-major, top-left-origin float buffer
/// in `[0, 1]`, `width * height * channels` floats long.
#[derive(Debug, Clone)]
pub struct OracleGlyph {
    pub metrics: OracleMetrics,
    pub format: PixelFormat,
    pub pixels: Vec<f32>,
}

/// A font variation axis setting (e.g. weight, width) passed to
/// `generate_mtsdf_var`.
#[derive(Debug, Clone, Copy)]
pub struct VariationAxis {
    pub tag: [u8; 4],
    pub value: f32,
}

/// Client-supplied glyph generator. Typically backed by a WASM module
/// wrapping an SDF rasterizer; here it's an opaque trait so the core never
/// depends on a specific rasterizer crate.
///
/// Implementations must be independently instantiable per worker thread —
/// see `WorkerPool`, which constructs one oracle per worker via a factory
/// closure rather than sharing a single instance.
pub trait SdfOracle: Send + 'static {
    /// Load font bytes into the oracle. Idempotent for a given bytes identity.
    fn load_font(&mut self, bytes: &[u8]);

    /// Whether the currently loaded font contains a glyph for `cp`.
    fn has_glyph(&self, cp: CodePoint) -> bool;

    /// Generate 3-channel MSDF pixels, or `None` if the glyph exists but has
    /// no visible pixels (e.g. space).
    fn generate(&mut self, cp: CodePoint, font_size: u32, pixel_range: f32) -> Option<OracleGlyph>;

    /// Generate 4-channel MTSDF pixels, or `None` per the same convention.
    fn generate_mtsdf(
        &mut self,
        cp: CodePoint,
        font_size: u32,
        pixel_range: f32,
    ) -> Option<OracleGlyph>;

    /// Generate 4-channel MTSDF pixels with variation axes applied.
    fn generate_mtsdf_var(
        &mut self,
        cp: CodePoint,
        font_size: u32,
        pixel_range: f32,
        axes: &[VariationAxis],
    ) -> Option<OracleGlyph>;
}

/// Client-supplied texture factory/updater. The core never allocates GPU
/// resources itself.
pub trait TextureBackend {
    /// Opaque handle returned by `create`, stored on every `Page` and
    /// `GlyphLocation`/`GlyphInfo` that references it.
    type Handle: Clone + std::fmt::Debug;

    /// Create a texture of `width x height` RGBA pixels from `initial`
    /// (`width * height * 4` bytes).
    fn create(&mut self, width: u32, height: u32, initial: &[u8]) -> Self::Handle;

    /// Upload new contents for an existing texture. `buffer` may be read
    /// synchronously during the call; the caller retains ownership.
    fn update(&mut self, handle: &Self::Handle, buffer: &[u8]);

    /// Destroy a texture. Called on variant-atlas teardown/eviction.
    fn destroy(&mut self, handle: Self::Handle);
}
