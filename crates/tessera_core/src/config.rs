//! Store configuration.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Page capacities by number of pages an archetype already owns. The last
/// entry repeats for every page after it.
pub const DEFAULT_PAGE_CAPACITIES: [usize; 9] = [1, 4, 16, 64, 128, 256, 512, 1024, 2048];

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("page capacity table is empty")]
    EmptyCapacityTable,

    #[error("page capacity at position {position} is zero")]
    ZeroCapacity { position: usize },

    #[error("failed to parse store config: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub page_capacities: Vec<usize>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            page_capacities: DEFAULT_PAGE_CAPACITIES.to_vec(),
        }
    }
}

impl StoreConfig {
    pub fn with_page_capacities(capacities: impl Into<Vec<usize>>) -> Self {
        Self {
            page_capacities: capacities.into(),
        }
    }

    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.page_capacities.is_empty() {
            return Err(ConfigError::EmptyCapacityTable);
        }
        if let Some(position) = self.page_capacities.iter().position(|&c| c == 0) {
            return Err(ConfigError::ZeroCapacity { position });
        }
        Ok(())
    }

    /// Capacity of the next page for an archetype that owns `page_count` pages.
    pub fn capacity_for(&self, page_count: usize) -> usize {
        self.page_capacities
            .get(page_count)
            .or_else(|| self.page_capacities.last())
            .copied()
            .unwrap_or(1)
    }

    /// Largest page this configuration will ever create.
    pub fn max_capacity(&self) -> usize {
        self.page_capacities.iter().copied().max().unwrap_or(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capacity_table_repeats_last_entry() {
        let config = StoreConfig::default();
        assert_eq!(config.capacity_for(0), 1);
        assert_eq!(config.capacity_for(3), 64);
        assert_eq!(config.capacity_for(8), 2048);
        assert_eq!(config.capacity_for(50), 2048);
        assert_eq!(config.max_capacity(), 2048);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let config = StoreConfig::from_json_str("{}").unwrap();
        assert_eq!(config, StoreConfig::default());

        let capped = StoreConfig::from_json_str(r#"{"page_capacities":[1,4,16,32]}"#).unwrap();
        assert_eq!(capped.capacity_for(10), 32);
    }

    #[test]
    fn rejects_bad_tables() {
        assert!(matches!(
            StoreConfig::from_json_str(r#"{"page_capacities":[]}"#),
            Err(ConfigError::EmptyCapacityTable)
        ));
        assert!(matches!(
            StoreConfig::with_page_capacities([4, 0]).validate(),
            Err(ConfigError::ZeroCapacity { position: 1 })
        ));
        assert!(matches!(
            StoreConfig::from_json_str("not json"),
            Err(ConfigError::Parse(_))
        ));
    }
}
