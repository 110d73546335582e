//! The saved filter and rule set.
//!
//! Stored as pretty-printed JSON:
//!
//! ```json
//! {
//!   "version": 1,
//!   "name": "Q4 bookings",
//!   "column_types": { "amount": "number", "category": "text" },
//!   "filters": [
//!     { "column": "amount", "condition": { "operator": "range", "min": 1000.0, "max": null } }
//!   ],
//!   "rules": [
//!     {
//!       "name": "DT",
//!       "stratum": { "kind": "value", "column": "category", "value": "DT" },
//!       "size": { "count": 5 },
//!       "method": "random"
//!     }
//!   ],
//!   "seed": 42
//! }
//! ```

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::filter::DimensionalFilter;
use crate::data::model::{ColumnType, Dataset};
use crate::sampling::SamplingRule;

/// Schema version written by this build.
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub version: u32,
    pub name: String,
    /// Column types of the dataset the configuration was made for.
    #[serde(default)]
    pub column_types: BTreeMap<String, ColumnType>,
    #[serde(default)]
    pub filters: Vec<DimensionalFilter>,
    #[serde(default)]
    pub rules: Vec<SamplingRule>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
}

/// How many entries [`SamplingConfig::prune_for`] dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pruned {
    pub filters: usize,
    pub rules: usize,
}

impl SamplingConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            version: CONFIG_VERSION,
            name: name.into(),
            column_types: BTreeMap::new(),
            filters: Vec::new(),
            rules: Vec::new(),
            seed: None,
        }
    }

    /// An empty configuration that remembers `dataset`'s column types.
    pub fn for_dataset(name: impl Into<String>, dataset: &Dataset) -> Self {
        let mut config = Self::new(name);
        config.column_types = dataset
            .columns
            .iter()
            .map(|c| (c.name.clone(), c.column_type()))
            .collect();
        config
    }

    pub fn from_json(text: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(text).context("parsing sampling configuration")?;
        if config.version == 0 || config.version > CONFIG_VERSION {
            bail!(
                "Unsupported configuration version {} (this build reads up to {CONFIG_VERSION})",
                config.version
            );
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).context("serializing sampling configuration")
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading configuration {}", path.display()))?;
        let config = Self::from_json(&text)?;
        log::info!(
            "loaded configuration '{}': {} filter(s), {} rule(s)",
            config.name,
            config.filters.len(),
            config.rules.len()
        );
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        std::fs::write(path, self.to_json()? + "\n")
            .with_context(|| format!("writing configuration {}", path.display()))
    }

    /// Drop filters and rules that refer to columns `dataset` does not have,
    /// and warn where a saved column type differs from the detected one.
    pub fn prune_for(&mut self, dataset: &Dataset) -> Pruned {
        for (name, saved) in &self.column_types {
            if let Some(column) = dataset.column(name) {
                if column.column_type() != *saved {
                    log::warn!(
                        "column '{name}' was {saved} when the configuration was saved, now {}",
                        column.column_type()
                    );
                }
            }
        }

        let filters_before = self.filters.len();
        self.filters.retain(|f| {
            let keep = dataset.column(&f.column).is_some();
            if !keep {
                log::warn!("dropping filter on unknown column '{}'", f.column);
            }
            keep
        });

        let rules_before = self.rules.len();
        self.rules.retain(|r| match r.stratum.column() {
            Some(column) if dataset.column(column).is_none() => {
                log::warn!("dropping rule '{}' on unknown column '{column}'", r.name);
                false
            }
            _ => true,
        });

        Pruned {
            filters: filters_before - self.filters.len(),
            rules: rules_before - self.rules.len(),
        }
    }
}
