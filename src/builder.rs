//! Cache configuration and builder.
//!
//! ## Example
//!
//! ```rust
//! use regexkit::builder::CacheBuilder;
//! use regexkit::engine::AutomataEngine;
//!
//! let cache = CacheBuilder::new(64)
//!     .jit_stack_size(16 * 1024, 64 * 1024)
//!     .max_displayed_pattern_length(80)
//!     .try_build(AutomataEngine::new())
//!     .unwrap();
//! assert_eq!(cache.capacity(), 64);
//! ```

use crate::cache::PatternCache;
use crate::engine::{JitStackSize, RegexEngine};
use crate::error::ConfigError;

/// Slots per cache when none is configured.
pub const DEFAULT_CAPACITY: usize = 16;
/// Largest accepted capacity.
pub const MAX_CAPACITY: usize = 1024;
/// Bytes of pattern or subject text shown in error messages.
pub const DEFAULT_MAX_DISPLAYED_PATTERN_LENGTH: usize = 256;

/// Settings fixed for the lifetime of one cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CacheConfig {
    pub capacity: usize,
    pub jit_stack: JitStackSize,
    pub max_displayed_pattern_length: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            jit_stack: JitStackSize::default(),
            max_displayed_pattern_length: DEFAULT_MAX_DISPLAYED_PATTERN_LENGTH,
        }
    }
}

impl CacheConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_CAPACITY).contains(&self.capacity) {
            return Err(ConfigError::new(format!(
                "capacity must be in 1..={MAX_CAPACITY}, got {}",
                self.capacity
            )));
        }
        if self.jit_stack.start == 0 {
            return Err(ConfigError::new("jit stack start size must be > 0"));
        }
        if self.jit_stack.start > self.jit_stack.max {
            return Err(ConfigError::new(format!(
                "jit stack start size ({}) exceeds max size ({})",
                self.jit_stack.start, self.jit_stack.max
            )));
        }
        Ok(())
    }
}

/// Builder for [`PatternCache`].
#[derive(Debug, Clone)]
pub struct CacheBuilder {
    config: CacheConfig,
}

impl CacheBuilder {
    /// Create a new builder with the given slot count and default limits.
    pub fn new(capacity: usize) -> Self {
        Self {
            config: CacheConfig {
                capacity,
                ..CacheConfig::default()
            },
        }
    }

    /// Start from an existing configuration.
    pub fn from_config(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn jit_stack_size(mut self, start: usize, max: usize) -> Self {
        self.config.jit_stack = JitStackSize { start, max };
        self
    }

    pub fn max_displayed_pattern_length(mut self, len: usize) -> Self {
        self.config.max_displayed_pattern_length = len;
        self
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Validates the configuration and builds the cache.
    pub fn try_build<E: RegexEngine>(self, engine: E) -> Result<PatternCache<E>, ConfigError> {
        PatternCache::with_config(engine, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::AutomataEngine;

    #[test]
    fn default_config_is_valid() {
        let config = CacheConfig::default();
        assert_eq!(config.capacity, 16);
        assert_eq!(config.jit_stack.start, 32 * 1024);
        assert_eq!(config.jit_stack.max, 32 * 1024);
        assert_eq!(config.max_displayed_pattern_length, 256);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn capacity_bounds_are_enforced() {
        assert!(CacheBuilder::new(0).try_build(AutomataEngine::new()).is_err());
        assert!(CacheBuilder::new(MAX_CAPACITY + 1)
            .try_build(AutomataEngine::new())
            .is_err());
        assert!(CacheBuilder::new(1).try_build(AutomataEngine::new()).is_ok());
        assert!(CacheBuilder::new(MAX_CAPACITY)
            .try_build(AutomataEngine::new())
            .is_ok());
    }

    #[test]
    fn jit_stack_bounds_are_enforced() {
        let err = CacheBuilder::new(4)
            .jit_stack_size(0, 1024)
            .try_build(AutomataEngine::new())
            .unwrap_err();
        assert!(err.message().contains("start size"));

        let err = CacheBuilder::new(4)
            .jit_stack_size(4096, 1024)
            .try_build(AutomataEngine::new())
            .unwrap_err();
        assert!(err.message().contains("exceeds max"));
    }

    #[test]
    fn builder_carries_settings_into_cache() {
        let cache = CacheBuilder::new(8)
            .jit_stack_size(1024, 2048)
            .max_displayed_pattern_length(10)
            .try_build(AutomataEngine::new())
            .unwrap();
        assert_eq!(cache.capacity(), 8);
        assert_eq!(cache.config().jit_stack, JitStackSize { start: 1024, max: 2048 });
        assert_eq!(cache.config().max_displayed_pattern_length, 10);
    }
}
