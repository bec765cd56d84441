//! In-memory fakes of the external collaborators, shared by unit tests
//! across the crate. Not part of the public API.

use std::collections::HashSet;

use crate::glyph::CodePoint;
use crate::oracle::{OracleGlyph, OracleMetrics, PixelFormat, SdfOracle, TextureBackend, VariationAxis};

/// Records every `create`/`update`/`destroy` call; handles are just
/// incrementing ids.
#[derive(Default)]
pub struct FakeTextureBackend {
    pub next_id: u32,
    pub create_calls: u32,
    pub update_calls: u32,
    pub destroy_calls: u32,
}

impl TextureBackend for FakeTextureBackend {
    type Handle = u32;

    fn create(&mut self, _width: u32, _height: u32, _initial: &[u8]) -> Self::Handle {
        self.create_calls += 1;
        self.next_id += 1;
        self.next_id
    }

    fn update(&mut self, _handle: &Self::Handle, _buffer: &[u8]) {
        self.update_calls += 1;
    }

    fn destroy(&mut self, _handle: Self::Handle) {
        self.destroy_calls += 1;
    }
}

/// A deterministic fake oracle: every code point except those in `missing`
/// "exists". Code point `0x20` (space) and any code point in `empty` produces
/// `None` from `generate*` (present but no visible pixels). All other glyphs
/// render as a solid `size x size` block.
pub struct FakeSdfOracle {
    pub missing: HashSet<CodePoint>,
    pub empty: HashSet<CodePoint>,
    pub loaded: Vec<Vec<u8>>,
    pub generate_calls: u32,
}

impl Default for FakeSdfOracle {
    fn default() -> Self {
        Self {
            missing: HashSet::new(),
            empty: HashSet::from([0x20]),
            loaded: Vec::new(),
            generate_calls: 0,
        }
    }
}

impl FakeSdfOracle {
    fn make(&mut self, cp: CodePoint, font_size: u32, channels: usize) -> Option<OracleGlyph> {
        self.generate_calls += 1;
        if self.empty.contains(&cp) {
            return None;
        }
        let side = (font_size / 2).max(1);
        let format = if channels == 4 {
            PixelFormat::Rgba
        } else {
            PixelFormat::Rgb
        };
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
            format,
            pixels: vec![0.5f32; (side * side) as usize * channels],
        })
    }
}

impl SdfOracle for FakeSdfOracle {
    fn load_font(&mut self, bytes: &[u8]) {
        self.loaded.push(bytes.to_vec());
    }

    fn has_glyph(&self, cp: CodePoint) -> bool {
        !self.missing.contains(&cp)
    }

    fn generate(&mut self, cp: CodePoint, font_size: u32, _pixel_range: f32) -> Option<OracleGlyph> {
        self.make(cp, font_size, 3)
    }

    fn generate_mtsdf(
        &mut self,
        cp: CodePoint,
        font_size: u32,
        _pixel_range: f32,
    ) -> Option<OracleGlyph> {
        self.make(cp, font_size, 4)
    }

    fn generate_mtsdf_var(
        &mut self,
        cp: CodePoint,
        font_size: u32,
        _pixel_range: f32,
        _axes: &[VariationAxis],
    ) -> Option<OracleGlyph> {
        self.make(cp, font_size, 4)
    }
}
