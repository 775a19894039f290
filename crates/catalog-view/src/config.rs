//! View settings, loaded from TOML.
//!
//! ```toml
//! collection_key = "products"
//! page_size = 20
//! enabled_filters = ["not_contacted"]
//!
//! [default_sort]
//! column = "price"
//! direction = "asc"
//! ```

use std::num::NonZeroUsize;
use std::path::Path;

use catalog_model::{CollectionKey, SortSpec};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::filter::FilterName;
use crate::page::DEFAULT_PAGE_SIZE;

/// Settings a view engine starts from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    /// Store collection the view subscribes to.
    pub collection_key: CollectionKey,

    /// Rows per page. Must be at least 1.
    pub page_size: usize,

    /// Filters switched on when the view opens.
    pub enabled_filters: Vec<FilterName>,

    /// Ordering used until the user clicks a column header.
    pub default_sort: SortSpec,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            collection_key: CollectionKey::default(),
            page_size: DEFAULT_PAGE_SIZE.get(),
            enabled_filters: Vec::new(),
            default_sort: SortSpec::default(),
        }
    }
}

impl ViewConfig {
    /// Load settings from a TOML file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|source| ConfigError::Parse { source })?;
        config.page_size()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|source| ConfigError::Serialize { source })
    }

    /// Validated page size.
    pub fn page_size(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.page_size).ok_or(ConfigError::InvalidPageSize(self.page_size))
    }
}
