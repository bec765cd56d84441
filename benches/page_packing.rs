//! Benchmarks for the row-shelf page packer, the hottest path in a drain:
//! every generated glyph goes through `Page::try_add` once.
//!
//! Sizes chosen to match real usage:
//!
//! - **ASCII burst**: a typical editor/terminal UI warming up its Latin set.
//! - **CJK burst**: worst case for the packer — every glyph roughly square
//!   and tall enough that shelf wraps happen often.
//! - **mixed heights**: icons and CJK interleaved with Latin, the case that
//!   makes shelf packing waste the most space.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use sdf_atlas::page::Page;
use sdf_atlas::TextureBackend;

#[derive(Default)]
struct NoopBackend;

impl TextureBackend for NoopBackend {
    type Handle = ();

    fn create(&mut self, _width: u32, _height: u32, _initial: &[u8]) -> Self::Handle {}
    fn update(&mut self, _handle: &Self::Handle, _buffer: &[u8]) {}
    fn destroy(&mut self, _handle: Self::Handle) {}
}

fn solid(w: u32, h: u32) -> Vec<u8> {
    vec![0xFFu8; (w * h * 4) as usize]
}

/// Fill a 1024x1024 page with 16x16 glyphs (typical Latin-at-32px sizing)
/// until it's exhausted.
fn bench_pack_ascii_sized(c: &mut Criterion) {
    c.bench_function("pack/ascii_16x16", |b| {
        b.iter(|| {
            let mut backend = NoopBackend;
            let mut page = Page::new(&mut backend, 1024, 1024);
            let glyph = solid(16, 16);
            let mut placed = 0;
            while page.try_add(black_box(&glyph), 16, 16).is_some() {
                placed += 1;
            }
            black_box(placed)
        });
    });
}

/// Fill a 1024x1024 page with 48x48 glyphs (CJK-at-64px sizing): fewer
/// glyphs fit, but each `try_add` touches more bytes per blit.
fn bench_pack_cjk_sized(c: &mut Criterion) {
    c.bench_function("pack/cjk_48x48", |b| {
        b.iter(|| {
            let mut backend = NoopBackend;
            let mut page = Page::new(&mut backend, 1024, 1024);
            let glyph = solid(48, 48);
            let mut placed = 0;
            while page.try_add(black_box(&glyph), 48, 48).is_some() {
                placed += 1;
            }
            black_box(placed)
        });
    });
}

/// Interleaved heights: 12px icons next to 40px CJK next to 8px Latin, the
/// shelf-packing worst case for wasted vertical space.
fn bench_pack_mixed_heights(c: &mut Criterion) {
    let mut group = c.benchmark_group("pack/mixed_heights");
    for &page_size in &[512u32, 1024, 2048] {
        group.bench_with_input(BenchmarkId::from_parameter(page_size), &page_size, |b, &page_size| {
            let sizes = [(8, 8), (40, 40), (12, 12), (16, 20)];
            b.iter(|| {
                let mut backend = NoopBackend;
                let mut page = Page::new(&mut backend, page_size, page_size);
                let mut placed = 0;
                let mut i = 0;
                loop {
                    let (w, h) = sizes[i % sizes.len()];
                    let glyph = solid(w, h);
                    if page.try_add(black_box(&glyph), w, h).is_none() {
                        break;
                    }
                    placed += 1;
                    i += 1;
                }
                black_box(placed)
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_pack_ascii_sized, bench_pack_cjk_sized, bench_pack_mixed_heights);
criterion_main!(benches);
