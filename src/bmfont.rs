//! A thin, explicitly out-of-core BMFont-style batch stitcher.
//!
//! This is not the runtime-adaptive cache in `atlas.rs` — it has no pending
//! set, no deferred scheduler, and nothing is mutated in place once written.
//! It exists for hosts that want to pre-bake a static glyph sheet (e.g. for
//! shipping alongside an asset pipeline) using the same `SdfOracle` +
//! `Page` primitives the live cache uses, without paying for reservation
//! bookkeeping they'll never need. The core never calls into this module.

use crate::glyph::GlyphMetrics;
use crate::oracle::{OracleGlyph, OracleMetrics, PixelFormat, SdfOracle, TextureBackend, VariationAxis};
use crate::page::Page;
use crate::CodePoint;

/// One glyph's placement in a baked sheet, in the same rectangle shape as
/// `GlyphLocation` but without any page back-reference — the sheet is a
/// single page, addressed by index into `BakedSheet::pages`.
#[derive(Debug, Clone)]
pub struct BakedGlyph {
    pub cp: CodePoint,
    pub page_index: usize,
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    pub metrics: GlyphMetrics,
}

/// The output of a bake: one or more fixed-size pages plus every glyph's
/// placement across them.
pub struct BakedSheet<H> {
    pub pages: Vec<Page<H>>,
    pub glyphs: Vec<BakedGlyph>,
}

/// Render every code point in `chars` at `font_size` into a sequence of
/// `page_size x page_size` pages, packing greedily (try the last page
/// first, then allocate a new one). Stops at the first code point the
/// oracle reports as missing or empty only in the sense of recording it
/// with a zero-size rectangle and no page — callers needing strict
/// failure on missing glyphs should filter `chars` first.
pub fn bake<O: SdfOracle, B: TextureBackend>(
    oracle: &mut O,
    backend: &mut B,
    font_bytes: &[u8],
    chars: &[CodePoint],
    font_size: u32,
    pixel_range: f32,
    page_size: u32,
    axes: &[VariationAxis],
) -> BakedSheet<B::Handle> {
    oracle.load_font(font_bytes);

    let mut pages: Vec<Page<B::Handle>> = Vec::new();
    let mut glyphs = Vec::with_capacity(chars.len());

    for &cp in chars {
        if !oracle.has_glyph(cp) {
            glyphs.push(BakedGlyph {
                cp,
                page_index: 0,
                x: 0,
                y: 0,
                width: 0,
                height: 0,
                metrics: GlyphMetrics::default(),
            });
            continue;
        }

        let sample = if axes.is_empty() {
            oracle.generate_mtsdf(cp, font_size, pixel_range)
        } else {
            oracle.generate_mtsdf_var(cp, font_size, pixel_range, axes)
        };

        let Some(glyph) = sample else {
            glyphs.push(BakedGlyph {
                cp,
                page_index: 0,
                x: 0,
                y: 0,
                width: 0,
                height: 0,
                metrics: GlyphMetrics::default(),
            });
            continue;
        };

        let (w, h, metrics, rgba) = to_rgba(&glyph);

        let placed = pages.last_mut().and_then(|p| p.try_add(&rgba, w, h));
        let (page_index, x, y) = match placed {
            Some((x, y)) => (pages.len() - 1, x, y),
            None => {
                let mut fresh = Page::new(backend, page_size, page_size);
                let (x, y) = fresh.try_add(&rgba, w, h).unwrap_or((0, 0));
                pages.push(fresh);
                (pages.len() - 1, x, y)
            }
        };

        glyphs.push(BakedGlyph {
            cp,
            page_index,
            x,
            y,
            width: w,
            height: h,
            metrics,
        });
    }

    for page in &mut pages {
        page.flush(backend);
    }

    BakedSheet { pages, glyphs }
}

fn to_rgba(glyph: &OracleGlyph) -> (u32, u32, GlyphMetrics, Vec<u8>) {
    let OracleMetrics {
        width,
        height,
        advance,
        plane_left,
        plane_bottom,
        plane_right,
        plane_top,
    } = glyph.metrics;

    let to_byte = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;

    let rgba = match glyph.format {
        PixelFormat::Rgba => glyph.pixels.iter().map(|&v| to_byte(v)).collect::<Vec<u8>>(),
        PixelFormat::Rgb => {
            let mut out = Vec::with_capacity(glyph.pixels.len() / 3 * 4);
            for chunk in glyph.pixels.chunks_exact(3) {
                out.push(to_byte(chunk[0]));
                out.push(to_byte(chunk[1]));
                out.push(to_byte(chunk[2]));
                out.push(255);
            }
            out
        }
    };

    let metrics = GlyphMetrics {
        width,
        height,
        advance: advance as f32,
        x_offset: 0.0,
        y_offset: 0.0,
        plane_left,
        plane_bottom,
        plane_right,
        plane_top,
    };

    (width, height, metrics, rgba)
}
