//! Session configuration.

use tmorm_cache::MEMORY;
use tmorm_core::ConnectPolicy;
use tmorm_repository::RepositoryConfig;
use tmorm_sqlite::SqliteConfig;

/// Everything needed to open a [`Session`](crate::Session).
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Database to open.
    pub database: SqliteConfig,
    /// Retry behavior while opening the database.
    pub connect: ConnectPolicy,
    /// Name of the cache backend used when a repository does not pick one.
    pub default_cache: String,
    /// Configuration handed to repositories created by the session.
    pub repository: RepositoryConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            database: SqliteConfig::memory(),
            connect: ConnectPolicy::default(),
            default_cache: MEMORY.to_string(),
            repository: RepositoryConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Config for a database file.
    pub fn file(path: impl Into<String>) -> Self {
        Self {
            database: SqliteConfig::file(path),
            ..Self::default()
        }
    }

    /// Config for a private in-memory database.
    pub fn memory() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn database(mut self, database: SqliteConfig) -> Self {
        self.database = database;
        self
    }

    #[must_use]
    pub fn connect_policy(mut self, policy: ConnectPolicy) -> Self {
        self.connect = policy;
        self
    }

    #[must_use]
    pub fn default_cache(mut self, name: impl Into<String>) -> Self {
        self.default_cache = name.into();
        self
    }

    #[must_use]
    pub fn repository(mut self, config: RepositoryConfig) -> Self {
        self.repository = config;
        self
    }
}
