//! A single variant's cache: Latin/mixed page partitioning, the code-point
//! index, and the pending set (spec §4.2).

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::error::AtlasError;
use crate::glyph::{is_latin, CodePoint, GlyphLocation, GlyphMetrics, PageRef};
use crate::oracle::TextureBackend;
use crate::page::Page;

/// Result of a `get_glyph` lookup.
pub enum Lookup<'a, H> {
    /// Cached and ready — here's the location.
    Ready(&'a GlyphLocation<H>),
    /// Reserved but not yet filled — here's the placeholder location, so a
    /// repeat caller can still build a `GlyphInfo` without a second lookup.
    Pending(&'a GlyphLocation<H>),
    /// Never requested.
    Unknown,
}

/// Which page a code point's pixels live on, for precise LRU touch on hit.
#[derive(Debug, Clone, Copy)]
enum PageSlot {
    Latin,
    Mixed(usize),
}

/// One variant's full cache state: a variant-id, a generation size, at most
/// one Latin page, an ordered list of mixed pages, and the code-point index.
pub struct VariantAtlas<H> {
    variant_id: String,
    gen_size: u32,
    page_size: u32,
    max_mixed_pages: usize,
    latin_page: Option<Page<H>>,
    mixed_pages: Vec<Page<H>>,
    index: HashMap<CodePoint, GlyphLocation<H>>,
    owning_page: HashMap<CodePoint, PageSlot>,
    pending: HashSet<CodePoint>,
    last_accessed: Instant,
}

impl<H: Clone + std::fmt::Debug> VariantAtlas<H> {
    pub fn new(variant_id: impl Into<String>, gen_size: u32, page_size: u32, max_mixed_pages: usize) -> Self {
        Self {
            variant_id: variant_id.into(),
            gen_size,
            page_size,
            max_mixed_pages,
            latin_page: None,
            mixed_pages: Vec::new(),
            index: HashMap::new(),
            owning_page: HashMap::new(),
            pending: HashSet::new(),
            last_accessed: Instant::now(),
        }
    }

    pub fn variant_id(&self) -> &str {
        &self.variant_id
    }

    pub fn gen_size(&self) -> u32 {
        self.gen_size
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    pub fn page_count(&self) -> usize {
        usize::from(self.latin_page.is_some()) + self.mixed_pages.len()
    }

    pub fn glyph_count(&self) -> usize {
        self.index.len()
    }

    pub fn has_pending(&self, cp: CodePoint) -> bool {
        self.pending.contains(&cp)
    }

    /// True once `cp` has a filled, non-pending entry (ready, ready-empty,
    /// or ready-missing — any terminal state). Does not touch last-accessed
    /// bookkeeping, unlike `get_glyph`.
    pub fn is_ready(&self, cp: CodePoint) -> bool {
        self.index.contains_key(&cp) && !self.pending.contains(&cp)
    }

    /// Look up a cached glyph. Updates the variant's and the owning page's
    /// last-accessed timestamp on a hit.
    pub fn get_glyph(&mut self, cp: CodePoint) -> Lookup<'_, H> {
        self.last_accessed = Instant::now();
        if self.pending.contains(&cp) {
            return Lookup::Pending(self.index.get(&cp).expect("pending implies an index entry"));
        }
        if !self.index.contains_key(&cp) {
            return Lookup::Unknown;
        }
        match self.owning_page.get(&cp) {
            Some(PageSlot::Latin) => {
                if let Some(p) = self.latin_page.as_mut() {
                    p.touch();
                }
            }
            Some(PageSlot::Mixed(i)) => {
                if let Some(p) = self.mixed_pages.get_mut(*i) {
                    p.touch();
                }
            }
            None => {}
        }
        Lookup::Ready(self.index.get(&cp).expect("just checked"))
    }

    /// Mark `cp` pending and insert a zero-rectangle, placeholder-metrics
    /// location on the page class it will eventually land on.
    pub fn reserve_glyph<B: TextureBackend<Handle = H>>(
        &mut self,
        backend: &mut B,
        cp: CodePoint,
        estimated_height: u32,
    ) -> &GlyphLocation<H> {
        self.pending.insert(cp);
        let page_ref = if is_latin(cp) {
            self.page_ref_for_latin(backend)
        } else {
            self.page_ref_for_mixed(backend, estimated_height)
        };
        self.index.insert(cp, GlyphLocation::reserved(page_ref));
        self.index.get(&cp).expect("just inserted")
    }

    /// Write real pixels/metrics into a previously reserved (or fresh, for
    /// the synchronous prefab path) location.
    pub fn fill_glyph<B: TextureBackend<Handle = H>>(
        &mut self,
        backend: &mut B,
        cp: CodePoint,
        pixels: &[u8],
        w: u32,
        h: u32,
        metrics: GlyphMetrics,
    ) -> Result<(), AtlasError> {
        if is_latin(cp) {
            self.fill_latin(backend, cp, pixels, w, h, metrics)?;
        } else {
            self.fill_mixed(backend, cp, pixels, w, h, metrics)?;
        }
        self.pending.remove(&cp);
        Ok(())
    }

    /// Synchronous-prefab equivalent of `fill_glyph`: inserts a fresh
    /// location with no prior reservation.
    pub fn add_glyph<B: TextureBackend<Handle = H>>(
        &mut self,
        backend: &mut B,
        cp: CodePoint,
        pixels: &[u8],
        w: u32,
        h: u32,
        metrics: GlyphMetrics,
    ) -> Result<(), AtlasError> {
        self.fill_glyph(backend, cp, pixels, w, h, metrics)
    }

    /// Flag a reserved entry as empty and/or missing; clears pending.
    pub fn mark_empty(&mut self, cp: CodePoint, missing: bool) {
        if let Some(loc) = self.index.get_mut(&cp) {
            loc.width = 0;
            loc.height = 0;
            loc.empty = true;
            loc.missing = missing;
        }
        self.pending.remove(&cp);
    }

    pub fn flush<B: TextureBackend<Handle = H>>(&mut self, backend: &mut B) {
        if let Some(p) = self.latin_page.as_mut() {
            p.flush(backend);
        }
        for p in &mut self.mixed_pages {
            p.flush(backend);
        }
    }

    pub fn teardown<B: TextureBackend<Handle = H>>(&mut self, backend: &mut B) {
        if let Some(p) = self.latin_page.take() {
            backend.destroy(p.texture().clone());
        }
        for p in self.mixed_pages.drain(..) {
            backend.destroy(p.texture().clone());
        }
        self.index.clear();
        self.owning_page.clear();
        self.pending.clear();
    }

    fn page_ref_for_latin<B: TextureBackend<Handle = H>>(&mut self, backend: &mut B) -> PageRef<H> {
        let page = self
            .latin_page
            .get_or_insert_with(|| Page::new(backend, self.page_size, self.page_size));
        PageRef {
            texture: page.texture().clone(),
            width: page.width(),
            height: page.height(),
        }
    }

    fn page_ref_for_mixed<B: TextureBackend<Handle = H>>(
        &mut self,
        backend: &mut B,
        estimated_height: u32,
    ) -> PageRef<H> {
        let idx = self.mixed_page_with_headroom(estimated_height);
        let page = match idx {
            Some(i) => &self.mixed_pages[i],
            None => {
                if self.mixed_pages.len() >= self.max_mixed_pages {
                    log::warn!(
                        "variant {}: mixed page count {} reached configured max {}; allocating anyway",
                        self.variant_id,
                        self.mixed_pages.len(),
                        self.max_mixed_pages
                    );
                }
                self.mixed_pages
                    .push(Page::new(backend, self.page_size, self.page_size));
                self.mixed_pages.last().expect("just pushed")
            }
        };
        PageRef {
            texture: page.texture().clone(),
            width: page.width(),
            height: page.height(),
        }
    }

    /// First existing mixed page with vertical headroom for a glyph of
    /// `estimated_height`. This is a coarse pre-check (the real test is
    /// `Page::try_add`'s actual shelf state); it just avoids scanning a page
    /// that's visibly near the bottom before trying it.
    fn mixed_page_with_headroom(&self, estimated_height: u32) -> Option<usize> {
        self.mixed_pages
            .iter()
            .position(|p| estimated_height + 1 <= p.height())
    }

    fn fill_latin<B: TextureBackend<Handle = H>>(
        &mut self,
        backend: &mut B,
        cp: CodePoint,
        pixels: &[u8],
        w: u32,
        h: u32,
        metrics: GlyphMetrics,
    ) -> Result<(), AtlasError> {
        let page = self
            .latin_page
            .get_or_insert_with(|| Page::new(backend, self.page_size, self.page_size));
        let Some((x, y)) = page.try_add(pixels, w, h) else {
            return Err(AtlasError::LatinPageOverflow {
                cp,
                gen_size: self.gen_size,
            });
        };
        self.write_location(
            cp,
            x,
            y,
            w,
            h,
            metrics,
            page.texture().clone(),
            page.width(),
            page.height(),
            PageSlot::Latin,
        );
        Ok(())
    }

    fn fill_mixed<B: TextureBackend<Handle = H>>(
        &mut self,
        backend: &mut B,
        cp: CodePoint,
        pixels: &[u8],
        w: u32,
        h: u32,
        metrics: GlyphMetrics,
    ) -> Result<(), AtlasError> {
        for (i, page) in self.mixed_pages.iter_mut().enumerate() {
            if let Some((x, y)) = page.try_add(pixels, w, h) {
                let (texture, pw, ph) = (page.texture().clone(), page.width(), page.height());
                self.write_location(cp, x, y, w, h, metrics, texture, pw, ph, PageSlot::Mixed(i));
                return Ok(());
            }
        }

        if self.mixed_pages.len() >= self.max_mixed_pages {
            log::warn!(
                "variant {}: mixed page count {} reached configured max {}; allocating anyway",
                self.variant_id,
                self.mixed_pages.len(),
                self.max_mixed_pages
            );
        }

        let mut fresh = Page::new(backend, self.page_size, self.page_size);
        let Some((x, y)) = fresh.try_add(pixels, w, h) else {
            return Err(AtlasError::FreshPageOverflow {
                cp,
                w,
                h,
                page_size: self.page_size,
            });
        };
        let (texture, pw, ph) = (fresh.texture().clone(), fresh.width(), fresh.height());
        let slot = PageSlot::Mixed(self.mixed_pages.len());
        self.mixed_pages.push(fresh);
        self.write_location(cp, x, y, w, h, metrics, texture, pw, ph, slot);
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn write_location(
        &mut self,
        cp: CodePoint,
        x: u32,
        y: u32,
        w: u32,
        h: u32,
        metrics: GlyphMetrics,
        texture: H,
        page_width: u32,
        page_height: u32,
        slot: PageSlot,
    ) {
        self.owning_page.insert(cp, slot);
        let page = PageRef {
            texture,
            width: page_width,
            height: page_height,
        };
        match self.index.get_mut(&cp) {
            Some(loc) => {
                loc.page = page;
                loc.x = x;
                loc.y = y;
                loc.width = w;
                loc.height = h;
                loc.metrics = metrics;
                loc.empty = false;
                loc.missing = false;
            }
            None => {
                let mut loc = GlyphLocation::reserved(page);
                loc.x = x;
                loc.y = y;
                loc.width = w;
                loc.height = h;
                loc.metrics = metrics;
                self.index.insert(cp, loc);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::glyph::latin_code_points;
    use crate::test_support::FakeTextureBackend;

    fn metrics(w: u32, h: u32) -> GlyphMetrics {
        GlyphMetrics {
            width: w,
            height: h,
            ..GlyphMetrics::default()
        }
    }

    fn pixels(w: u32, h: u32) -> Vec<u8> {
        vec![1u8; (w * h * 4) as usize]
    }

    #[test]
    fn reserve_then_fill_transitions_out_of_pending() {
        let mut backend = FakeTextureBackend::default();
        let mut va = VariantAtlas::new("v", 32, 256, 8);
        va.reserve_glyph(&mut backend, 'A' as u32, 20);
        assert!(va.has_pending('A' as u32));
        va.fill_glyph(&mut backend, 'A' as u32, &pixels(10, 10), 10, 10, metrics(10, 10))
            .unwrap();
        assert!(!va.has_pending('A' as u32));
        match va.get_glyph('A' as u32) {
            Lookup::Ready(loc) => assert_eq!((loc.width, loc.height), (10, 10)),
            _ => panic!("expected ready"),
        }
    }

    #[test]
    fn unknown_code_point_is_unknown() {
        let mut va: VariantAtlas<u32> = VariantAtlas::new("v", 32, 256, 8);
        assert!(matches!(va.get_glyph(0x41), Lookup::Unknown));
    }

    #[test]
    fn pending_lookup_before_fill() {
        let mut backend = FakeTextureBackend::default();
        let mut va = VariantAtlas::new("v", 32, 256, 8);
        va.reserve_glyph(&mut backend, 0x41, 20);
        assert!(matches!(va.get_glyph(0x41), Lookup::Pending(_)));
    }

    #[test]
    fn latin_glyphs_all_share_one_page() {
        let mut backend = FakeTextureBackend::default();
        let mut va = VariantAtlas::new("v", 32, 1024, 8);
        for cp in latin_code_points() {
            va.fill_glyph(&mut backend, cp, &pixels(16, 20), 16, 20, metrics(16, 20))
                .unwrap();
        }
        assert_eq!(va.page_count(), 1);
        assert_eq!(va.glyph_count(), 62);
    }

    #[test]
    fn latin_overflow_is_fatal() {
        let mut backend = FakeTextureBackend::default();
        let mut va = VariantAtlas::new("v", 256, 16, 8);
        let err = va
            .fill_glyph(&mut backend, 'A' as u32, &pixels(20, 20), 20, 20, metrics(20, 20))
            .unwrap_err();
        assert!(matches!(err, AtlasError::LatinPageOverflow { .. }));
    }

    #[test]
    fn mixed_pages_grow_when_full() {
        let mut backend = FakeTextureBackend::default();
        let mut va = VariantAtlas::new("v", 32, 32, 8);
        // 32x32 page, 20x20 glyphs: only one fits per page (with gutter).
        va.fill_glyph(&mut backend, 0x4E2D, &pixels(20, 20), 20, 20, metrics(20, 20))
            .unwrap();
        va.fill_glyph(&mut backend, 0x4E2E, &pixels(20, 20), 20, 20, metrics(20, 20))
            .unwrap();
        assert_eq!(va.page_count(), 2);
    }

    #[test]
    fn fresh_page_overflow_is_fatal() {
        let mut backend = FakeTextureBackend::default();
        let mut va = VariantAtlas::new("v", 32, 16, 8);
        let err = va
            .fill_glyph(&mut backend, 0x4E2D, &pixels(20, 20), 20, 20, metrics(20, 20))
            .unwrap_err();
        assert!(matches!(err, AtlasError::FreshPageOverflow { .. }));
    }

    #[test]
    fn mark_empty_sets_flags_and_clears_pending() {
        let mut backend = FakeTextureBackend::default();
        let mut va = VariantAtlas::new("v", 32, 256, 8);
        va.reserve_glyph(&mut backend, 0x20, 10);
        va.mark_empty(0x20, false);
        match va.get_glyph(0x20) {
            Lookup::Ready(loc) => {
                assert!(loc.empty);
                assert!(!loc.missing);
                assert_eq!(loc.width, 0);
            }
            _ => panic!("expected ready"),
        }
        assert!(!va.has_pending(0x20));
    }

    #[test]
    fn mark_missing_sets_missing_flag() {
        let mut backend = FakeTextureBackend::default();
        let mut va = VariantAtlas::new("v", 32, 256, 8);
        va.reserve_glyph(&mut backend, 0x1F600, 10);
        va.mark_empty(0x1F600, true);
        match va.get_glyph(0x1F600) {
            Lookup::Ready(loc) => {
                assert!(loc.missing);
                assert!(loc.empty);
            }
            _ => panic!("expected ready"),
        }
    }
}
