//! A fixed-size RGBA pixel page with row-shelf packing (spec §4.1).
//!
//! Shelf packing is sub-optimal but bounded and O(1) per insert; glyphs of
//! similar height (what text actually produces) pack efficiently. A 1-pixel
//! gutter on the right and bottom of every placed rectangle prevents
//! bilinear sampling from bleeding into neighbours.

use std::time::Instant;

use crate::oracle::TextureBackend;

/// One fixed-size RGBA atlas page plus its texture handle.
///
/// Invariants: `cursor_x in [0, width]`, `cursor_y in [0, height]`,
/// `row_height >= height of every glyph placed in the current shelf row`,
/// every placed glyph rectangle lies fully within `[0, width) x [0, height)`.
pub struct Page<H> {
    width: u32,
    height: u32,
    buffer: Vec<u8>,
    texture: H,
    cursor_x: u32,
    cursor_y: u32,
    row_height: u32,
    dirty: bool,
    last_accessed: Instant,
}

impl<H: Clone> Page<H> {
    /// Create a new blank page and register its texture with the backend.
    pub fn new<B: TextureBackend<Handle = H>>(backend: &mut B, width: u32, height: u32) -> Self {
        let buffer = vec![0u8; (width * height * 4) as usize];
        let texture = backend.create(width, height, &buffer);
        Self {
            width,
            height,
            buffer,
            texture,
            cursor_x: 0,
            cursor_y: 0,
            row_height: 0,
            dirty: false,
            last_accessed: Instant::now(),
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn texture(&self) -> &H {
        &self.texture
    }

    pub fn dirty(&self) -> bool {
        self.dirty
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    pub fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }

    /// Attempt to place a `w x h` RGBA glyph bitmap. `pixels` must be
    /// `w * h * 4` bytes, row-major, top-left origin.
    ///
    /// Returns the `(x, y)` top-left position the glyph was placed at, or
    /// `None` if the page has no room (the caller should allocate a fresh
    /// page and retry, or treat it as fatal for the Latin page).
    pub fn try_add(&mut self, pixels: &[u8], w: u32, h: u32) -> Option<(u32, u32)> {
        debug_assert_eq!(pixels.len(), (w * h * 4) as usize);

        let padded_w = w + 1;
        let padded_h = h + 1;

        if self.cursor_x + padded_w > self.width {
            self.cursor_y += self.row_height + 1;
            self.cursor_x = 0;
            self.row_height = 0;
        }

        if self.cursor_y + padded_h > self.height {
            return None;
        }

        let (x, y) = (self.cursor_x, self.cursor_y);
        self.blit_flipped(pixels, x, y, w, h);

        self.cursor_x += padded_w;
        self.row_height = self.row_height.max(padded_h);
        self.dirty = true;
        self.last_accessed = Instant::now();

        Some((x, y))
    }

    /// Blit `pixels` into the page buffer at `(x, y)` with a vertical flip:
    /// source row `r` writes into destination row `h - 1 - r`. Byte-for-byte
    /// RGBA copy, no color conversion.
    ///
    /// The flip lives here, not in the oracle wrapper, because only the page
    /// knows the destination stride (spec §9).
    fn blit_flipped(&mut self, pixels: &[u8], x: u32, y: u32, w: u32, h: u32) {
        let stride = (self.width * 4) as usize;
        let row_bytes = (w * 4) as usize;
        for src_row in 0..h {
            let dst_row = h - 1 - src_row;
            let src_off = (src_row * w * 4) as usize;
            let dst_off = ((y + dst_row) as usize) * stride + (x as usize) * 4;
            self.buffer[dst_off..dst_off + row_bytes]
                .copy_from_slice(&pixels[src_off..src_off + row_bytes]);
        }
    }

    /// Upload the buffer to the texture backend if dirty, then clear the
    /// dirty flag. No-op if nothing changed since the last flush.
    pub fn flush<B: TextureBackend<Handle = H>>(&mut self, backend: &mut B) {
        if self.dirty {
            backend.update(&self.texture, &self.buffer);
            self.dirty = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeTextureBackend;

    fn solid(w: u32, h: u32, value: u8) -> Vec<u8> {
        vec![value; (w * h * 4) as usize]
    }

    #[test]
    fn first_glyph_lands_at_origin() {
        let mut backend = FakeTextureBackend::default();
        let mut page = Page::new(&mut backend, 64, 64);
        let pos = page.try_add(&solid(8, 8, 0xFF), 8, 8);
        assert_eq!(pos, Some((0, 0)));
    }

    #[test]
    fn gutter_separates_consecutive_glyphs_on_a_row() {
        let mut backend = FakeTextureBackend::default();
        let mut page = Page::new(&mut backend, 64, 64);
        let a = page.try_add(&solid(8, 8, 1), 8, 8).unwrap();
        let b = page.try_add(&solid(8, 8, 2), 8, 8).unwrap();
        assert_eq!(a, (0, 0));
        // 8px glyph + 1px gutter.
        assert_eq!(b, (9, 0));
    }

    #[test]
    fn row_wraps_when_width_exceeded() {
        let mut backend = FakeTextureBackend::default();
        let mut page = Page::new(&mut backend, 20, 64);
        let a = page.try_add(&solid(10, 5, 1), 10, 5).unwrap();
        let b = page.try_add(&solid(10, 5, 1), 10, 5).unwrap();
        assert_eq!(a, (0, 0));
        // Second 10px glyph + gutter would exceed width 20, so it wraps.
        assert_eq!(b, (0, 6));
    }

    #[test]
    fn returns_none_when_page_exhausted() {
        let mut backend = FakeTextureBackend::default();
        let mut page = Page::new(&mut backend, 16, 16);
        assert!(page.try_add(&solid(15, 15, 1), 15, 15).is_some());
        assert!(page.try_add(&solid(15, 15, 1), 15, 15).is_none());
    }

    #[test]
    fn placed_rectangle_lies_within_page_bounds() {
        let mut backend = FakeTextureBackend::default();
        let mut page = Page::new(&mut backend, 100, 100);
        for _ in 0..10 {
            if let Some((x, y)) = page.try_add(&solid(12, 9, 1), 12, 9) {
                assert!(x + 12 <= page.width());
                assert!(y + 9 <= page.height());
            }
        }
    }

    #[test]
    fn vertical_flip_applied_on_blit() {
        let mut backend = FakeTextureBackend::default();
        let mut page = Page::new(&mut backend, 16, 16);
        // 2x2 glyph: top row red, bottom row blue.
        let mut pixels = vec![0u8; 2 * 2 * 4];
        pixels[0..4].copy_from_slice(&[255, 0, 0, 255]); // row 0 col 0: red
        pixels[4..8].copy_from_slice(&[255, 0, 0, 255]); // row 0 col 1: red
        pixels[8..12].copy_from_slice(&[0, 0, 255, 255]); // row 1 col 0: blue
        pixels[12..16].copy_from_slice(&[0, 0, 255, 255]); // row 1 col 1: blue

        let (x, y) = page.try_add(&pixels, 2, 2).unwrap();
        let stride = (page.width() * 4) as usize;
        // Destination row 0 (y) should now hold the source's bottom row (blue).
        let top = &page.buffer[(y as usize) * stride + (x as usize) * 4..][..4];
        let bottom = &page.buffer[((y + 1) as usize) * stride + (x as usize) * 4..][..4];
        assert_eq!(top, &[0, 0, 255, 255]);
        assert_eq!(bottom, &[255, 0, 0, 255]);
    }

    #[test]
    fn flush_clears_dirty_and_calls_backend() {
        let mut backend = FakeTextureBackend::default();
        let mut page = Page::new(&mut backend, 16, 16);
        page.try_add(&solid(4, 4, 9), 4, 4);
        assert!(page.dirty());
        page.flush(&mut backend);
        assert!(!page.dirty());
        assert_eq!(backend.update_calls, 1);
    }

    #[test]
    fn flush_is_noop_when_not_dirty() {
        let mut backend = FakeTextureBackend::default();
        let mut page = Page::new(&mut backend, 16, 16);
        page.flush(&mut backend);
        assert_eq!(backend.update_calls, 0);
    }
}
