//! The public facade (spec §4.3): maps `(variant_id, render_size)` to a
//! `VariantAtlas`, selects a generation size, owns the deferred-batch
//! scheduler, and drives the `SdfOracle`.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::FontAtlasConfig;
use crate::error::AtlasError;
use crate::glyph::{is_latin, latin_code_points, CodePoint, GlyphInfo, GlyphMetrics};
use crate::oracle::{OracleGlyph, OracleMetrics, PixelFormat, SdfOracle, TextureBackend, VariationAxis};
use crate::scheduler::{DeferredBatchScheduler, PendingGlyph};
use crate::status::Status;
use crate::variant::{Lookup, VariantAtlas};

/// One `getGlyph` call's parameters.
pub struct GlyphRequest {
    pub cp: CodePoint,
    pub variant_id: String,
    pub render_size: u32,
    pub font_bytes: Arc<Vec<u8>>,
    pub axes: Vec<VariationAxis>,
}

/// `variant_id + "_" + gen_size`, the composite key spec §3 describes.
fn variant_key(variant_id: &str, gen_size: u32) -> String {
    format!("{variant_id}_{gen_size}")
}

/// The runtime-adaptive font-atlas cache.
///
/// Generic over the client-supplied `SdfOracle` and `TextureBackend` so the
/// core never depends on a concrete rasterizer or graphics API.
pub struct FontAtlas<O: SdfOracle, B: TextureBackend> {
    config: FontAtlasConfig,
    oracle: O,
    backend: B,
    variants: HashMap<String, VariantAtlas<B::Handle>>,
    scheduler: DeferredBatchScheduler,
    callback: Option<Box<dyn FnMut(usize) + Send>>,
}

impl<O: SdfOracle, B: TextureBackend> FontAtlas<O, B> {
    pub fn new(config: FontAtlasConfig, oracle: O, backend: B) -> Result<Self, AtlasError> {
        config.validate()?;
        Ok(Self {
            config,
            oracle,
            backend,
            variants: HashMap::new(),
            scheduler: DeferredBatchScheduler::new(),
            callback: None,
        })
    }

    /// Install the `onGlyphsReady` callback, invoked once per non-empty
    /// drain with the number of glyphs processed.
    pub fn set_on_glyphs_ready(&mut self, cb: impl FnMut(usize) + Send + 'static) {
        self.callback = Some(Box::new(cb));
    }

    pub fn config(&self) -> &FontAtlasConfig {
        &self.config
    }

    /// Map a render size onto the smallest cached generation size that is
    /// at least as large, per the ascending `size_thresholds` scan; falls
    /// back to the largest configured gen size.
    pub fn select_gen_size(&self, render_size: u32) -> u32 {
        for (i, &threshold) in self.config.size_thresholds.iter().enumerate() {
            if threshold >= render_size {
                return self.config.gen_sizes[i];
            }
        }
        *self.config.gen_sizes.last().expect("validated non-empty")
    }

    /// Look up or reserve a glyph. Returns immediately: either a cached
    /// `GlyphInfo`, or a placeholder one with `cached = false` whose
    /// `texture` already points at the page that will host the pixels.
    pub fn get_glyph(&mut self, req: GlyphRequest) -> GlyphInfo<B::Handle> {
        let gen_size = self.select_gen_size(req.render_size);
        let key = variant_key(&req.variant_id, gen_size);
        let page_size = self.config.page_size;
        let max_mixed_pages = self.config.max_mixed_pages;
        let variant = self
            .variants
            .entry(key.clone())
            .or_insert_with(|| VariantAtlas::new(req.variant_id.clone(), gen_size, page_size, max_mixed_pages));

        let info = match variant.get_glyph(req.cp) {
            Lookup::Ready(loc) => GlyphInfo::from_location(loc, gen_size, true),
            // Idempotent re-request: the pending-set check inside `get_glyph`
            // means we never enqueue a second generation for this code point.
            Lookup::Pending(loc) => GlyphInfo::from_location(loc, gen_size, false),
            Lookup::Unknown => {
                let estimated_height = gen_size;
                let loc = variant.reserve_glyph(&mut self.backend, req.cp, estimated_height);
                let info = GlyphInfo::from_location(loc, gen_size, false);
                let should_schedule = self.scheduler.enqueue(PendingGlyph {
                    cp: req.cp,
                    gen_size,
                    font_bytes: req.font_bytes,
                    axes: req.axes,
                    variant_id: req.variant_id,
                });
                let _ = should_schedule; // host-specific microtask posting would go here
                info
            }
        };
        self.enforce_variant_cap(&key);
        info
    }

    /// Evict least-recently-used variant atlases down to
    /// `config.max_variant_atlases`, if that cap is set. `keep` is the
    /// variant just touched by the caller and is never evicted, even if it
    /// happens to be the oldest (it can't be — it was just accessed).
    fn enforce_variant_cap(&mut self, keep: &str) {
        let Some(max) = self.config.max_variant_atlases else {
            return;
        };
        while self.variants.len() > max {
            let victim = self
                .variants
                .iter()
                .filter(|(k, _)| k.as_str() != keep)
                .min_by_key(|(_, v)| v.last_accessed())
                .map(|(k, _)| k.clone());
            let Some(victim) = victim else { break };
            if let Some(mut v) = self.variants.remove(&victim) {
                v.teardown(&mut self.backend);
                log::debug!("evicted variant atlas {victim} (LRU, cap {max})");
            }
        }
    }

    /// Drive the scheduler: if a drain is outstanding, run it (load fonts,
    /// generate pixels, fill/mark-empty every queued glyph, flush every
    /// dirty page, then fire the callback once). No-op if nothing is queued.
    ///
    /// Call this once per host event-loop iteration/frame — the explicit
    /// entry point spec §9 describes for platforms without a microtask queue.
    pub fn tick(&mut self) -> Result<usize, AtlasError> {
        if !self.scheduler.has_pending_work() {
            return Ok(0);
        }
        self.drain()
    }

    /// Force a drain right now, bypassing the scheduled-task check. Useful
    /// in headless/test contexts with no real event loop driving `tick()`.
    pub fn drain_now(&mut self) -> Result<usize, AtlasError> {
        self.drain()
    }

    fn drain(&mut self) -> Result<usize, AtlasError> {
        let snapshot = self.scheduler.take_snapshot();
        if snapshot.is_empty() {
            return Ok(0);
        }

        for item in &snapshot {
            self.process_pending(item)?;
        }

        self.flush_dirty_variants();

        if let Some(cb) = self.callback.as_mut() {
            cb(snapshot.len());
        }

        Ok(snapshot.len())
    }

    fn process_pending(&mut self, item: &PendingGlyph) -> Result<(), AtlasError> {
        let key = variant_key(&item.variant_id, item.gen_size);
        self.oracle.load_font(&item.font_bytes);

        if !self.oracle.has_glyph(item.cp) {
            let variant = self.variants.get_mut(&key).expect("reserved by get_glyph");
            variant.mark_empty(item.cp, true);
            return Ok(());
        }

        let sample = if item.axes.is_empty() {
            self.oracle.generate_mtsdf(item.cp, item.gen_size, self.config.pixel_range)
        } else {
            self.oracle
                .generate_mtsdf_var(item.cp, item.gen_size, self.config.pixel_range, &item.axes)
        };

        let variant = self.variants.get_mut(&key).expect("reserved by get_glyph");
        match sample {
            None => variant.mark_empty(item.cp, false),
            Some(glyph) => {
                let (w, h, metrics, rgba) = to_rgba(&glyph);
                variant.fill_glyph(&mut self.backend, item.cp, &rgba, w, h, metrics)?;
            }
        }
        Ok(())
    }

    fn flush_dirty_variants(&mut self) {
        let backend = &mut self.backend;
        for variant in self.variants.values_mut() {
            variant.flush(backend);
        }
    }

    /// Synchronous fast-path: warm every Latin code point for a variant
    /// before first render. Does not enqueue, does not schedule a drain,
    /// does not invoke the callback.
    pub fn prefab_latin(
        &mut self,
        variant_id: impl Into<String>,
        font_size: u32,
        font_bytes: &[u8],
        axes: &[VariationAxis],
    ) -> Result<(), AtlasError> {
        let variant_id = variant_id.into();
        let gen_size = self.select_gen_size(font_size);
        let key = variant_key(&variant_id, gen_size);
        let page_size = self.config.page_size;
        let max_mixed_pages = self.config.max_mixed_pages;
        let variant = self
            .variants
            .entry(key.clone())
            .or_insert_with(|| VariantAtlas::new(variant_id, gen_size, page_size, max_mixed_pages));

        self.oracle.load_font(font_bytes);

        for cp in latin_code_points() {
            debug_assert!(is_latin(cp));
            if variant.is_ready(cp) {
                continue;
            }
            if !self.oracle.has_glyph(cp) {
                variant.reserve_glyph(&mut self.backend, cp, gen_size);
                variant.mark_empty(cp, true);
                continue;
            }

            let sample = if axes.is_empty() {
                self.oracle.generate_mtsdf(cp, gen_size, self.config.pixel_range)
            } else {
                self.oracle.generate_mtsdf_var(cp, gen_size, self.config.pixel_range, axes)
            };

            match sample {
                Some(glyph) => {
                    let (w, h, metrics, rgba) = to_rgba(&glyph);
                    variant.add_glyph(&mut self.backend, cp, &rgba, w, h, metrics)?;
                }
                None => {
                    variant.reserve_glyph(&mut self.backend, cp, gen_size);
                    variant.mark_empty(cp, false);
                }
            }
        }

        variant.flush(&mut self.backend);
        self.enforce_variant_cap(&key);
        Ok(())
    }

    pub fn has_pending_work(&self) -> bool {
        self.scheduler.has_pending_work()
    }

    pub fn status(&self) -> Status {
        let atlas_count = self.variants.len();
        let page_count: usize = self.variants.values().map(VariantAtlas::page_count).sum();
        let glyph_count: usize = self.variants.values().map(VariantAtlas::glyph_count).sum();
        Status::with_pages(atlas_count, page_count, glyph_count, self.config.page_size)
    }
}

/// Convert oracle-space floats in `[0, 1]` to bytes via
/// `round(clamp(v, 0, 1) * 255)`, promoting 3-channel input to RGBA with
/// `alpha = 255`. Returns `(width, height, metrics, rgba_bytes)`.
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
