//! Tunable configuration (spec §6), grounded on `ori_term::config::Config`'s
//! `#[serde(default)]` struct-of-structs idiom with TOML (de)serialization.

use serde::{Deserialize, Serialize};

use crate::error::AtlasError;

/// `FontAtlas` construction options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontAtlasConfig {
    /// Ascending, non-empty sequence of cached generation sizes.
    pub gen_sizes: Vec<u32>,
    /// `gen_sizes.len() - 1` render-size thresholds used to pick a gen size.
    pub size_thresholds: Vec<u32>,
    /// Side of a square page, in pixels.
    pub page_size: u32,
    /// Cap on mixed pages per variant before a warning is logged.
    pub max_mixed_pages: usize,
    /// Pixel range passed to the SDF oracle.
    pub pixel_range: f32,
    /// Opt-in cap on live variant atlases. `None` (the default) matches
    /// spec.md's literal described behavior: grow forever, never evict.
    /// `Some(n)` evicts the least-recently-used variant atlas above `n`
    /// (see DESIGN.md, "Eviction").
    pub max_variant_atlases: Option<usize>,
}

impl Default for FontAtlasConfig {
    fn default() -> Self {
        Self {
            gen_sizes: vec![32, 64, 128],
            size_thresholds: vec![40, 80],
            page_size: 1024,
            max_mixed_pages: 8,
            pixel_range: 4.0,
            max_variant_atlases: None,
        }
    }
}

impl FontAtlasConfig {
    /// Validate structural invariants not expressible in the type alone.
    pub fn validate(&self) -> Result<(), AtlasError> {
        if self.gen_sizes.is_empty() {
            return Err(AtlasError::InvalidConfig("gen_sizes must be non-empty".into()));
        }
        if !self.gen_sizes.windows(2).all(|w| w[0] < w[1]) {
            return Err(AtlasError::InvalidConfig("gen_sizes must be strictly ascending".into()));
        }
        if self.size_thresholds.len() + 1 != self.gen_sizes.len() {
            return Err(AtlasError::InvalidConfig(format!(
                "size_thresholds must have {} entries (gen_sizes.len() - 1), got {}",
                self.gen_sizes.len() - 1,
                self.size_thresholds.len()
            )));
        }
        if self.page_size == 0 {
            return Err(AtlasError::InvalidConfig("page_size must be positive".into()));
        }
        if self.max_mixed_pages == 0 {
            return Err(AtlasError::InvalidConfig("max_mixed_pages must be positive".into()));
        }
        if self.pixel_range <= 0.0 {
            return Err(AtlasError::InvalidConfig("pixel_range must be positive".into()));
        }
        Ok(())
    }

    pub fn from_toml_str(s: &str) -> Result<Self, AtlasError> {
        let cfg: Self = toml::from_str(s)?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("FontAtlasConfig always serializes")
    }
}

/// `WorkerPool` construction options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerPoolConfig {
    pub num_workers: usize,
    /// When true, the pool never falls back to synchronous single-thread
    /// generation even if `num_workers == 0`; callers get `PoolDisposed`-style
    /// errors instead. Hosts that want an always-available fallback path
    /// should leave this `false`.
    pub workers_only: bool,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            num_workers: 1,
            workers_only: false,
        }
    }
}
