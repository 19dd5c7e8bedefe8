//! Per-node execution settings.

use serde::{Deserialize, Serialize};

use super::{DEFAULT_KEY_PAGE_SIZE, DEFAULT_VALUE_PAGE_SIZE, MIN_PAGE_SIZE};
use crate::error::PlanError;

/// Sizing for arena-backed plan nodes.
///
/// Sizes are rounded up to the next power of two. [`QueryConfig::validate`]
/// is called by every node that consumes the config, so a bad value is a
/// configuration error raised before any row is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryConfig {
    key_page_size: usize,
    value_page_size: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            key_page_size: DEFAULT_KEY_PAGE_SIZE,
            value_page_size: DEFAULT_VALUE_PAGE_SIZE,
        }
    }
}

impl QueryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_key_page_size(mut self, nodes: usize) -> Self {
        self.key_page_size = nodes.max(1).next_power_of_two();
        self
    }

    pub fn with_value_page_size(mut self, bytes: usize) -> Self {
        self.value_page_size = bytes.max(1).next_power_of_two();
        self
    }

    pub fn key_page_size(&self) -> usize {
        self.key_page_size
    }

    pub fn value_page_size(&self) -> usize {
        self.value_page_size
    }

    pub fn validate(&self) -> Result<(), PlanError> {
        if self.value_page_size < MIN_PAGE_SIZE {
            return Err(PlanError::InvalidConfig {
                setting: "value_page_size",
                reason: format!(
                    "{} bytes is below the minimum of {} bytes",
                    self.value_page_size, MIN_PAGE_SIZE
                ),
            });
        }
        if !self.value_page_size.is_power_of_two() || !self.key_page_size.is_power_of_two() {
            return Err(PlanError::InvalidConfig {
                setting: "page_size",
                reason: "page sizes must be powers of two".to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(QueryConfig::default().validate().is_ok());
    }

    #[test]
    fn page_sizes_round_up_to_power_of_two() {
        let config = QueryConfig::new()
            .with_key_page_size(100)
            .with_value_page_size(1000);

        assert_eq!(config.key_page_size(), 128);
        assert_eq!(config.value_page_size(), 1024);
    }

    #[test]
    fn tiny_value_page_is_rejected() {
        let config = QueryConfig::new().with_value_page_size(16);
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("value_page_size"));
    }

    #[test]
    fn config_round_trips_through_json() {
        let config = QueryConfig::new().with_value_page_size(256);
        let json = serde_json::to_string(&config).unwrap();
        let back: QueryConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(config, back);
    }
}
