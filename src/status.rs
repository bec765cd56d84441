//! Observability snapshot (spec §6).

use std::fmt;

/// Point-in-time counters across every variant atlas a `FontAtlas` owns.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Status {
    pub atlas_count: usize,
    pub page_count: usize,
    pub glyph_count: usize,
    pub memory_bytes: u64,
}

impl Status {
    /// `memory_bytes = sum over variants of page_count * page_size^2 * 4`.
    pub fn with_pages(atlas_count: usize, page_count: usize, glyph_count: usize, page_size: u32) -> Self {
        let memory_bytes = page_count as u64 * u64::from(page_size) * u64::from(page_size) * 4;
        Self {
            atlas_count,
            page_count,
            glyph_count,
            memory_bytes,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} atlases, {} pages, {} glyphs, {:.1} MiB",
            self.atlas_count,
            self.page_count,
            self.glyph_count,
            self.memory_bytes as f64 / (1024.0 * 1024.0)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_bytes_matches_formula() {
        let s = Status::with_pages(2, 3, 100, 1024);
        assert_eq!(s.memory_bytes, 3 * 1024 * 1024 * 4);
    }

    #[test]
    fn display_is_human_readable() {
        let s = Status::with_pages(1, 1, 1, 1024);
        let text = format!("{s}");
        assert!(text.contains("atlases"));
        assert!(text.contains("MiB"));
    }
}
