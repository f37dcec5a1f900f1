//! Repository configuration.

use std::time::Duration;

/// Default lifetime of a cached result set.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(600);

/// How rows are pulled from the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Fetch the whole result set before returning.
    #[default]
    Eager,
    /// Step the statement one row at a time.
    Lazy,
}

/// What to do with a row that has no identity column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MissingIdentityPolicy {
    /// Fail materialization.
    #[default]
    HardError,
    /// Log a warning and build the object with identity `0`.
    LogAndContinue,
}

/// Configuration for an [`EntityRepository`](crate::EntityRepository).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Row fetch strategy for materialization.
    pub execution_mode: ExecutionMode,
    /// Whether materialized result sets go through the result cache.
    pub cache_enabled: bool,
    /// Lifetime of cached result sets. `None` never expires.
    pub cache_ttl: Option<Duration>,
    /// Handling of rows without identity.
    pub missing_identity: MissingIdentityPolicy,
    /// Registered cache backend to use. `None` means the registry default.
    pub cache_backend: Option<String>,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            execution_mode: ExecutionMode::Eager,
            cache_enabled: false,
            cache_ttl: Some(DEFAULT_CACHE_TTL),
            missing_identity: MissingIdentityPolicy::HardError,
            cache_backend: None,
        }
    }
}

impl RepositoryConfig {
    /// Create a new config with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution mode. Ignored while caching is on.
    #[must_use]
    pub fn execution_mode(mut self, mode: ExecutionMode) -> Self {
        self.execution_mode = if self.cache_enabled {
            ExecutionMode::Eager
        } else {
            mode
        };
        self
    }

    /// Turn result caching on with the given lifetime.
    ///
    /// Cached sets must be complete, so this also switches to eager fetch.
    #[must_use]
    pub fn cache(mut self, ttl: Option<Duration>) -> Self {
        self.cache_enabled = true;
        self.cache_ttl = ttl;
        self.execution_mode = ExecutionMode::Eager;
        self
    }

    #[must_use]
    pub fn no_cache(mut self) -> Self {
        self.cache_enabled = false;
        self
    }

    #[must_use]
    pub fn missing_identity(mut self, policy: MissingIdentityPolicy) -> Self {
        self.missing_identity = policy;
        self
    }

    #[must_use]
    pub fn cache_backend(mut self, name: impl Into<String>) -> Self {
        self.cache_backend = Some(name.into());
        self
    }

    /// The mode actually used for materialization.
    pub fn effective_mode(&self) -> ExecutionMode {
        if self.cache_enabled {
            ExecutionMode::Eager
        } else {
            self.execution_mode
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RepositoryConfig::default();
        assert_eq!(config.execution_mode, ExecutionMode::Eager);
        assert!(!config.cache_enabled);
        assert_eq!(config.cache_ttl, Some(Duration::from_secs(600)));
        assert_eq!(config.missing_identity, MissingIdentityPolicy::HardError);
        assert_eq!(config.cache_backend, None);
    }

    #[test]
    fn test_cache_forces_eager() {
        let config = RepositoryConfig::new()
            .execution_mode(ExecutionMode::Lazy)
            .cache(None);
        assert_eq!(config.execution_mode, ExecutionMode::Eager);
        assert_eq!(config.cache_ttl, None);

        let config = config.execution_mode(ExecutionMode::Lazy);
        assert_eq!(config.effective_mode(), ExecutionMode::Eager);
    }

    #[test]
    fn test_lazy_without_cache() {
        let config = RepositoryConfig::new().execution_mode(ExecutionMode::Lazy);
        assert_eq!(config.effective_mode(), ExecutionMode::Lazy);

        let config = config.cache(Some(Duration::from_secs(5))).no_cache();
        assert!(!config.cache_enabled);
        assert_eq!(config.effective_mode(), ExecutionMode::Eager);
    }
}
