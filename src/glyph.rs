//! Shared glyph data records (spec §3) and the per-glyph state machine (§4.5).

/// Unicode scalar value. Plain `u32`, not `char`, because the SDF oracle and
/// the on-disk/wire representations this crate interoperates with both treat
/// code points as integers (e.g. private-use-area icon code points that are
/// not valid `char`s are out of scope here, but keeping the type a bare
/// integer costs nothing and avoids a conversion at every call site).
pub type CodePoint = u32;

/// The Latin subset: `{0x30..=0x39, 0x41..=0x5A, 0x61..=0x7A}` — exactly 62
/// code points. Granted a dedicated atlas page so a handful of tall CJK
/// outliers never waste vertical space on the same shelf.
pub fn is_latin(cp: CodePoint) -> bool {
    matches!(cp, 0x30..=0x39 | 0x41..=0x5A | 0x61..=0x7A)
}

/// Iterator over the 62 Latin code points, in ascending order.
pub fn latin_code_points() -> impl Iterator<Item = CodePoint> {
    (0x30..=0x39).chain(0x41..=0x5A).chain(0x61..=0x7A)
}

/// Glyph metrics in pixels at the generation size, plus glyph-local plane
/// bounds as reported by the SDF oracle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub width: u32,
    pub height: u32,
    pub advance: f32,
    pub x_offset: f32,
    pub y_offset: f32,
    pub plane_left: f32,
    pub plane_bottom: f32,
    pub plane_right: f32,
    pub plane_top: f32,
}

impl GlyphMetrics {
    /// Placeholder metrics for a reserved-but-unfilled glyph: all zero.
    pub const PLACEHOLDER: Self = Self {
        width: 0,
        height: 0,
        advance: 0.0,
        x_offset: 0.0,
        y_offset: 0.0,
        plane_left: 0.0,
        plane_bottom: 0.0,
        plane_right: 0.0,
        plane_top: 0.0,
    };
}

impl Default for GlyphMetrics {
    fn default() -> Self {
        Self::PLACEHOLDER
    }
}

/// Back-reference to the page a glyph's pixels live (or will live) on.
///
/// Cheap to copy: clients may hold this across the batch boundary and read
/// `texture`/`width`/`height` immediately, per the stable-handle-before-pixels
/// pattern (spec §9). `H` is the host's opaque texture handle type, defined
/// by its `TextureBackend` implementation.
#[derive(Debug, Clone)]
pub struct PageRef<H> {
    pub texture: H,
    pub width: u32,
    pub height: u32,
}

/// A glyph's location within its page, plus its metrics and fill state.
///
/// Mutated in place when filled — the pointer/reference identity held by the
/// `VariantAtlas` index must remain stable so clients holding a prior
/// `GlyphInfo` derived from it see the pixels appear after the next flush.
#[derive(Debug, Clone)]
pub struct GlyphLocation<H> {
    pub page: PageRef<H>,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub metrics: GlyphMetrics,
    /// True when the glyph has no visible pixels (e.g. space). Implies
    /// `width == 0 && height == 0`.
    pub empty: bool,
    /// True when the font does not contain this code point.
    pub missing: bool,
}

impl<H: Clone> GlyphLocation<H> {
    /// A freshly reserved location: zero rectangle, placeholder metrics, not
    /// yet empty or missing (those flags are only set by fill/markEmpty).
    pub fn reserved(page: PageRef<H>) -> Self {
        Self {
            page,
            x: 0,
            y: 0,
            width: 0,
            height: 0,
            metrics: GlyphMetrics::PLACEHOLDER,
            empty: false,
            missing: false,
        }
    }
}

/// The client-facing view of a `GlyphLocation`: adds normalized UVs, the
/// generation size, and whether pixels are already resident.
#[derive(Debug, Clone)]
pub struct GlyphInfo<H> {
    pub texture: H,
    pub page_width: u32,
    pub page_height: u32,
    pub u0: f32,
    pub v0: f32,
    pub u1: f32,
    pub v1: f32,
    pub metrics: GlyphMetrics,
    pub gen_size: u32,
    pub cached: bool,
    pub empty: bool,
    pub missing: bool,
}

impl<H: Clone> GlyphInfo<H> {
    pub fn from_location(loc: &GlyphLocation<H>, gen_size: u32, cached: bool) -> Self {
        let w = loc.page.width.max(1) as f32;
        let h = loc.page.height.max(1) as f32;
        Self {
            texture: loc.page.texture.clone(),
            page_width: loc.page.width,
            page_height: loc.page.height,
            u0: loc.x as f32 / w,
            v0: loc.y as f32 / h,
            u1: (loc.x + loc.width) as f32 / w,
            v1: (loc.y + loc.height) as f32 / h,
            metrics: loc.metrics,
            gen_size,
            cached,
            empty: loc.empty,
            missing: loc.missing,
        }
    }
}

/// Per-glyph lifecycle, spec §4.5. Not stored directly — `VariantAtlas`
/// derives it from the index/pending-set on demand — but kept as a type so
/// debug assertions can check transitions are legal without duplicating the
/// state table in prose.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlyphState {
    Absent,
    Pending,
    Ready,
    ReadyEmpty,
    ReadyMissing,
}

impl GlyphState {
    /// `ready*` states are terminal: re-requesting them has no side effect
    /// other than a last-accessed bump.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Ready | Self::ReadyEmpty | Self::ReadyMissing)
    }
}
