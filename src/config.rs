/// Runtime configuration
///
/// Loaded from a TOML file; a missing file means defaults. The defaults
/// match the production site: manifest `restaurants_italy.json`, webp
/// images converted to jpg, and a `pic` directory under the working
/// directory as the fallback image root.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::organize::link::RECOGNIZED_EXTENSIONS;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// JSON manifest to organize.
    pub manifest: PathBuf,
    /// Base directory holding one folder per entity. When unset, or set to a
    /// path that does not exist, `pic` under the working directory is used.
    pub base_dir: Option<PathBuf>,
    /// Legacy extension -> canonical extension conversions, both lowercase
    /// and without the leading dot.
    pub conversions: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        let mut conversions = BTreeMap::new();
        conversions.insert("webp".to_string(), "jpg".to_string());
        Self {
            manifest: PathBuf::from("restaurants_italy.json"),
            base_dir: None,
            conversions,
        }
    }
}

impl Config {
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let mut config = Self::default();
        if let Ok(raw) = fs::read_to_string(path.as_ref()) {
            config = toml::from_str(&raw)
                .with_context(|| format!("invalid config file {}", path.as_ref().display()))?;
        }
        Ok(config)
    }

    /// Reject conversion entries the rest of the pipeline cannot honor.
    ///
    /// Extensions are matched against lowercased file extensions, so the map
    /// keys must be lowercase, and a conversion target outside the recognized
    /// image set would produce files the manifest linker never picks up.
    pub fn validate(&self) -> Result<()> {
        for (legacy, target) in &self.conversions {
            if legacy.is_empty() || target.is_empty() {
                bail!("conversion entries must name both extensions, got {legacy:?} -> {target:?}");
            }
            if legacy.starts_with('.') || target.starts_with('.') {
                bail!("conversion extensions must not include the dot: {legacy:?} -> {target:?}");
            }
            if *legacy != legacy.to_lowercase() || *target != target.to_lowercase() {
                bail!("conversion extensions must be lowercase: {legacy:?} -> {target:?}");
            }
            if !RECOGNIZED_EXTENSIONS.contains(&target.as_str()) {
                bail!(
                    "conversion target {target:?} for {legacy:?} is not a recognized image format"
                );
            }
        }
        Ok(())
    }

    /// Resolve the image root once at startup: the configured directory if it
    /// exists on disk, otherwise `pic` under the current working directory.
    pub fn resolve_base_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.base_dir {
            if dir.exists() {
                return Ok(dir.clone());
            }
        }
        let cwd = env::current_dir().context("cannot determine the working directory")?;
        Ok(cwd.join("pic"))
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
