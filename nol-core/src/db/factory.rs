use std::collections::HashMap;

use async_trait::async_trait;

use super::repository::{NolRepository, RepositoryError};

/// Backend-agnostic connection configuration.
///
/// `backend` must match the [`RepositoryFactory::backend_name`] of a
/// registered factory.  `connection_string` is passed through to that
/// factory unchanged — its meaning is entirely backend-specific.
///
/// | backend    | connection_string examples          |
/// |------------|-------------------------------------|
/// | `sqlite`   | `nol.db`, `:memory:`                |
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    /// Lowercase identifier matching a registered factory (e.g. `"sqlite"`).
    pub backend: String,
    /// Opaque value forwarded to the factory's `create` method.
    pub connection_string: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            backend: "sqlite".to_string(),
            connection_string: ":memory:".to_string(),
        }
    }
}

/// One implementation per database backend.  Each backend crate exports a
/// single unit struct that implements this trait and is registered with a
/// [`RepositoryRegistry`] at startup.
#[async_trait]
pub trait RepositoryFactory: Send + Sync {
    /// Unique, lowercase identifier for this backend.
    fn backend_name(&self) -> &'static str;

    /// Open (or create) a connection and return a ready-to-use repository.
    /// Implementations are free to run migrations or warm connection pools
    /// inside this method.
    async fn create(&self, config: &DbConfig)
    -> Result<Box<dyn NolRepository>, RepositoryError>;
}

/// Registry of [`RepositoryFactory`] instances, keyed by backend name.
///
/// Typical lifetime:
/// 1. Create with `RepositoryRegistry::new()`.
/// 2. Call `register` once per known backend.
/// 3. Call `create` whenever a new repository is needed.
pub struct RepositoryRegistry {
    factories: HashMap<&'static str, Box<dyn RepositoryFactory>>,
}

impl RepositoryRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a backend factory.
    ///
    /// If a factory with the same [`RepositoryFactory::backend_name`] is
    /// already present it is silently replaced.
    pub fn register(&mut self, factory: Box<dyn RepositoryFactory>) {
        self.factories.insert(factory.backend_name(), factory);
    }

    /// Names of every registered backend, sorted alphabetically.
    pub fn available_backends(&self) -> Vec<&'static str> {
        let mut names: Vec<_> = self.factories.keys().copied().collect();
        names.sort_unstable();
        names
    }

    /// Dispatch to the factory that matches `config.backend` and return
    /// the repository it produces.
    ///
    /// # Errors
    /// * [`RepositoryError::Configuration`] — no factory is registered for
    ///   the requested backend name.
    /// * Any error the chosen factory itself returns.
    pub async fn create(
        &self,
        config: &DbConfig,
    ) -> Result<Box<dyn NolRepository>, RepositoryError> {
        let factory = self
            .factories
            .get(config.backend.as_str())
            .ok_or_else(|| {
                RepositoryError::Configuration(format!(
                    "unknown backend '{}'; available: {:?}",
                    config.backend,
                    self.available_backends()
                ))
            })?;

        factory.create(config).await
    }
}

impl Default for RepositoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    struct FakeFactory(&'static str);

    #[async_trait]
    impl RepositoryFactory for FakeFactory {
        fn backend_name(&self) -> &'static str {
            self.0
        }

        async fn create(
            &self,
            _config: &DbConfig,
        ) -> Result<Box<dyn NolRepository>, RepositoryError> {
            Err(RepositoryError::Connection("fake backend".to_string()))
        }
    }

    #[test]
    fn registry_lists_backends_sorted() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(FakeFactory("zeta")));
        registry.register(Box::new(FakeFactory("alpha")));

        assert_eq!(registry.available_backends(), vec!["alpha", "zeta"]);
    }

    #[tokio::test]
    async fn unknown_backend_is_a_configuration_error() {
        let registry = RepositoryRegistry::new();
        let config = DbConfig {
            backend: "nope".to_string(),
            connection_string: String::new(),
        };

        let result = registry.create(&config).await;

        assert!(matches!(
            result.err(),
            Some(RepositoryError::Configuration(_))
        ));
    }

    #[tokio::test]
    async fn registered_backend_is_dispatched() {
        let mut registry = RepositoryRegistry::new();
        registry.register(Box::new(FakeFactory("fake")));
        let config = DbConfig {
            backend: "fake".to_string(),
            connection_string: String::new(),
        };

        let result = registry.create(&config).await;

        assert_eq!(
            result.err(),
            Some(RepositoryError::Connection("fake backend".to_string()))
        );
    }
}
