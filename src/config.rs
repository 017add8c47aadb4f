//! Cache and per-run configuration

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::core::{Error, Result};

/// Tuning parameters shared by every mesh cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Minimum element count before an extraction run goes multi-threaded.
    /// Also the chunk length of the parallel range scan.
    pub min_range_per_thread: usize,
    /// Use 16-bit normals instead of packed 10-bit ones
    pub use_hq_normals: bool,
    /// GPU memory budget in bytes (0 = unlimited)
    pub gpu_budget_bytes: usize,
    /// Worker threads for the global pool (0 = rayon default)
    pub num_threads: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            min_range_per_thread: 8192,
            use_hq_normals: false,
            gpu_budget_bytes: 0,
            num_threads: 0,
        }
    }
}

impl CacheConfig {
    /// Reject values that would stall the range runner.
    pub fn validate(&self) -> Result<()> {
        if self.min_range_per_thread == 0 {
            return Err(Error::Config("min_range_per_thread must be at least 1".to_string()));
        }
        Ok(())
    }

    /// Save to a JSON file
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Load from a JSON file; missing fields take their defaults
    pub fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }
}

/// Per-run inputs selecting cache variants and optional data.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunFlags {
    /// The object is in edit mode
    pub is_editmode: bool,
    /// A paint mode with face/vertex masking is active
    pub is_paint_mode: bool,
    /// The object takes part in the active mode (selection is drawn)
    pub is_mode_active: bool,
    /// Draw the final evaluated mesh in edit mode
    pub do_final_mesh: bool,
    /// Build a separate UV-editing cage
    pub do_uv_cage: bool,
    /// Skip hidden elements in index buffers
    pub use_hide: bool,
}

impl RunFlags {
    /// Object mode drawing.
    pub fn object_mode() -> Self {
        Self { is_mode_active: true, do_final_mesh: true, ..Default::default() }
    }

    /// Edit mode drawing with hidden elements skipped.
    pub fn edit_mode() -> Self {
        Self {
            is_editmode: true,
            is_mode_active: true,
            use_hide: true,
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        let config = CacheConfig::default();
        assert_eq!(config.min_range_per_thread, 8192);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threshold_rejected() {
        let config = CacheConfig { min_range_per_thread: 0, ..Default::default() };
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_save_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("cache.json");
        let config = CacheConfig {
            min_range_per_thread: 1024,
            use_hq_normals: true,
            gpu_budget_bytes: 1 << 20,
            num_threads: 4,
        };
        config.save(&path).unwrap();
        assert_eq!(CacheConfig::load(&path).unwrap(), config);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, r#"{ "use_hq_normals": true }"#).unwrap();
        let config = CacheConfig::load(&path).unwrap();
        assert!(config.use_hq_normals);
        assert_eq!(config.min_range_per_thread, 8192);
    }

    #[test]
    fn test_run_flags_json() {
        let flags = RunFlags::edit_mode();
        let json = serde_json::to_string(&flags).unwrap();
        let back: RunFlags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, flags);
        assert!(back.is_editmode && back.use_hide);
    }
}
