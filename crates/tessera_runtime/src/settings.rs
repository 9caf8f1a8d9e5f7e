//! Runtime settings

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tessera_core::pool::AllocatorKind;
use tessera_core::StoreConfig;

/// Demo settings, read from an optional JSON file. Missing fields take
/// their defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub store: StoreConfig,
    /// Allocator used by the per-slot demo components.
    pub allocator: AllocatorKind,
    pub entities: usize,
    pub frames: usize,
    /// Entities destroyed and respawned every frame.
    pub churn: usize,
    pub factions: Vec<String>,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            allocator: AllocatorKind::default(),
            entities: 10_000,
            frames: 120,
            churn: 64,
            factions: vec!["red".into(), "green".into(), "blue".into()],
        }
    }
}

impl RuntimeSettings {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let settings: Self = serde_json::from_str(json).context("parsing runtime settings")?;
        settings.store.validate().context("invalid store settings")?;
        anyhow::ensure!(!settings.factions.is_empty(), "at least one faction is required");
        if let AllocatorKind::Fixed { group } = settings.allocator {
            anyhow::ensure!(
                settings.store.max_capacity() <= group,
                "fixed allocator group {group} is smaller than the largest page ({})",
                settings.store.max_capacity()
            );
        }
        Ok(settings)
    }

    /// Read settings from `path`, or fall back to the defaults.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .with_context(|| format!("reading settings from {}", path.display()))?;
                Self::from_json_str(&json)
            }
            None => Ok(Self::default()),
        }
    }
}
