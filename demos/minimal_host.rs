//! Minimal host wiring for `FontAtlas`, using in-memory fake collaborators
//! instead of a real rasterizer/GPU backend. Not compiled as part of the
//! crate or its tests — read this to see the shape of an integration.
//!
//! A real host would implement `SdfOracle` over something like a WASM
//! msdfgen build, and `TextureBackend` over wgpu/OpenGL texture objects.

use std::collections::HashSet;
use std::sync::Arc;

use sdf_atlas::{
    CodePoint, FontAtlas, FontAtlasConfig, GlyphRequest, OracleGlyph, OracleMetrics, PixelFormat, SdfOracle,
    TextureBackend, VariationAxis,
};

struct DemoOracle {
    missing: HashSet<CodePoint>,
}

impl SdfOracle for DemoOracle {
    fn load_font(&mut self, _bytes: &[u8]) {}

    fn has_glyph(&self, cp: CodePoint) -> bool {
        !self.missing.contains(&cp)
    }

    fn generate(&mut self, cp: CodePoint, font_size: u32, pixel_range: f32) -> Option<OracleGlyph> {
        self.generate_mtsdf(cp, font_size, pixel_range)
    }

    fn generate_mtsdf(&mut self, _cp: CodePoint, font_size: u32, _pixel_range: f32) -> Option<OracleGlyph> {
        let side = (font_size / 2).max(1);
        Some(OracleGlyph {
            metrics: OracleMetrics {
                width: side,
                height: side,
                advance: (side + 2) as i32,
                plane_left: 0.0,
                plane_bottom: 0.0,
                plane_right: 1.0,
                plane_top: 1.0,
            },
            format: PixelFormat::Rgba,
            pixels: vec![1.0f32; (side * side * 4) as usize],
        })
    }

    fn generate_mtsdf_var(
        &mut self,
        cp: CodePoint,
        font_size: u32,
        pixel_range: f32,
        _axes: &[VariationAxis],
    ) -> Option<OracleGlyph> {
        self.generate_mtsdf(cp, font_size, pixel_range)
    }
}

#[derive(Default)]
struct DemoBackend {
    next_id: u32,
}

impl TextureBackend for DemoBackend {
    type Handle = u32;

    fn create(&mut self, width: u32, height: u32, _initial: &[u8]) -> Self::Handle {
        self.next_id += 1;
        println!("creating {width}x{height} texture #{}", self.next_id);
        self.next_id
    }

    fn update(&mut self, handle: &Self::Handle, buffer: &[u8]) {
        println!("uploading {} bytes to texture #{handle}", buffer.len());
    }

    fn destroy(&mut self, handle: Self::Handle) {
        println!("destroying texture #{handle}");
    }
}

fn main() {
    let oracle = DemoOracle {
        missing: HashSet::new(),
    };
    let backend = DemoBackend::default();
    let mut atlas = FontAtlas::new(FontAtlasConfig::default(), oracle, backend).unwrap();

    atlas.set_on_glyphs_ready(|n| println!("{n} glyphs ready"));

    let font_bytes = Arc::new(vec![0u8; 4]);
    for ch in "Hello, atlas!".chars() {
        let info = atlas.get_glyph(GlyphRequest {
            cp: ch as u32,
            variant_id: "ui".into(),
            render_size: 32,
            font_bytes: font_bytes.clone(),
            axes: Vec::new(),
        });
        println!("{ch:?} cached={}", info.cached);
    }

    // Drive the deferred batch: a real host calls `tick()` once per frame.
    atlas.tick().unwrap();
    println!("{}", atlas.status());
}
