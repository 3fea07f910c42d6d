//! Execution configuration.
//!
//! [`ExecutionConfig`] aggregates the limits the step function enforces, the memory
//! budget of the value pool and the abort policy of the scheduler.

/// Top-level configuration of a virtual machine instance.
///
/// # Default Configuration
///
/// - 1024 frames maximum call depth
/// - 100,000 transitions per step before the thread is forced to yield
/// - 64 MB of pool storage
/// - Values of aborted threads are leaked (`release_on_abort = false`)
///
/// # Example
///
/// ```rust
/// use dotframe::emulation::{ExecutionConfig, ExecutionLimits, MemoryConfig};
///
/// let config = ExecutionConfig::default()
///     .with_limits(ExecutionLimits::new().with_max_call_depth(256))
///     .with_memory(MemoryConfig::new().with_max_pool_bytes(1024 * 1024))
///     .with_release_on_abort(true);
///
/// assert_eq!(config.limits.max_call_depth, 256);
/// assert!(config.release_on_abort);
/// ```
#[derive(Clone, Debug, Default)]
pub struct ExecutionConfig {
    /// Limits enforced while stepping threads.
    pub limits: ExecutionLimits,

    /// Value pool configuration.
    pub memory: MemoryConfig,

    /// Whether the scheduler releases every value owned by a thread whose step failed.
    ///
    /// The step function itself never cleans up after an error; with this disabled the
    /// values of an aborted thread stay allocated until the pool is dropped.
    pub release_on_abort: bool,
}

impl ExecutionConfig {
    /// Creates the default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the execution limits
    #[must_use]
    pub fn with_limits(mut self, limits: ExecutionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Sets the memory configuration
    #[must_use]
    pub fn with_memory(mut self, memory: MemoryConfig) -> Self {
        self.memory = memory;
        self
    }

    /// Sets the abort policy
    #[must_use]
    pub fn with_release_on_abort(mut self, release: bool) -> Self {
        self.release_on_abort = release;
        self
    }
}

/// Limits for stepping threads.
///
/// | Limit | Default Value |
/// |-------|---------------|
/// | `max_call_depth` | 1,024 |
/// | `max_transitions_per_step` | 100,000 |
#[derive(Clone, Debug)]
pub struct ExecutionLimits {
    /// Maximum number of frames on one thread.
    ///
    /// Set to 0 for no limit. Checked when a frame is resolved.
    pub max_call_depth: usize,

    /// Maximum number of frame transitions in a single call to `step`.
    ///
    /// Set to 0 for no limit. When reached the thread yields as if it was suspended, so a
    /// body that never returns cannot starve the other threads.
    pub max_transitions_per_step: usize,
}

impl ExecutionLimits {
    /// Creates the default limits
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum call depth
    #[must_use]
    pub fn with_max_call_depth(mut self, max: usize) -> Self {
        self.max_call_depth = max;
        self
    }

    /// Sets the maximum number of transitions per step
    #[must_use]
    pub fn with_max_transitions_per_step(mut self, max: usize) -> Self {
        self.max_transitions_per_step = max;
        self
    }
}

impl Default for ExecutionLimits {
    fn default() -> Self {
        Self {
            max_call_depth: 1024,
            max_transitions_per_step: 100_000,
        }
    }
}

/// Value pool configuration.
#[derive(Clone, Debug)]
pub struct MemoryConfig {
    /// Maximum number of bytes of live pool storage (default 64 MB).
    pub max_pool_bytes: usize,
}

impl MemoryConfig {
    /// Creates the default memory configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the pool budget
    #[must_use]
    pub fn with_max_pool_bytes(mut self, max: usize) -> Self {
        self.max_pool_bytes = max;
        self
    }
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            max_pool_bytes: 64 * 1024 * 1024,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutionConfig::default();
        assert_eq!(config.limits.max_call_depth, 1024);
        assert_eq!(config.limits.max_transitions_per_step, 100_000);
        assert_eq!(config.memory.max_pool_bytes, 64 * 1024 * 1024);
        assert!(!config.release_on_abort);
    }

    #[test]
    fn test_builders() {
        let limits = ExecutionLimits::new()
            .with_max_call_depth(8)
            .with_max_transitions_per_step(0);
        assert_eq!(limits.max_call_depth, 8);
        assert_eq!(limits.max_transitions_per_step, 0);

        let config = ExecutionConfig::new()
            .with_limits(limits)
            .with_memory(MemoryConfig::new().with_max_pool_bytes(16));
        assert_eq!(config.limits.max_call_depth, 8);
        assert_eq!(config.memory.max_pool_bytes, 16);
    }
}
