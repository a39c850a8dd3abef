//! Runtime Configuration
//!
//! A [`RuntimeConfig`] controls the bookkeeping side of a runtime. None of
//! its fields change which effects run or in what order.
//!
//! Configurations can be built in code or loaded from JSON:
//!
//! ```rust
//! use trellis_core::config::RuntimeConfig;
//!
//! let config = RuntimeConfig::from_json(r#"{ "sweep_interval": 64 }"#).unwrap();
//! assert_eq!(config.sweep_interval, 64);
//! assert_eq!(config.store_capacity, 0);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default number of new store entries between dead-target purges.
pub const DEFAULT_SWEEP_INTERVAL: usize = 256;

/// Upper bound for the preallocated store capacity.
const MAX_STORE_CAPACITY: usize = 1 << 24;

/// Tunables for a [`Runtime`](crate::reactive::Runtime).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    /// Number of newly observed targets after which entries belonging to
    /// dropped targets are purged from the dependency store.
    ///
    /// `0` disables automatic purging; call
    /// [`Runtime::purge_dead_targets`](crate::reactive::Runtime::purge_dead_targets)
    /// manually instead.
    pub sweep_interval: usize,

    /// Initial capacity of the dependency store.
    pub store_capacity: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            store_capacity: 0,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a configuration from a JSON document.
    ///
    /// Missing fields take their default values.
    pub fn from_json(source: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Check that every field holds a usable value.
    pub fn validate(&self) -> Result<()> {
        if self.store_capacity > MAX_STORE_CAPACITY {
            return Err(Error::InvalidConfig(format!(
                "store_capacity {} exceeds the maximum of {}",
                self.store_capacity, MAX_STORE_CAPACITY
            )));
        }
        Ok(())
    }

    /// Whether the store purges dead targets on its own.
    pub fn auto_sweep(&self) -> bool {
        self.sweep_interval > 0
    }
}
