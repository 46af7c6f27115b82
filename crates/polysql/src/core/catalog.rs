//! Driver catalog: scheme-keyed connection factories.
//!
//! The [`DriverCatalog`] maps URL schemes (`sqlite`, `postgresql`, `mariadb`,
//! ...) to [`ConnectionFactory`] implementations. It is explicitly constructed
//! rather than a global registry; [`crate::connect`] uses a catalog holding the
//! built-in drivers.
//!
//! Looking up an unknown scheme is not an error: [`DriverCatalog::create_connection`]
//! returns `Ok(None)` so callers can probe for driver availability, while a
//! known driver failing to connect returns `Err`.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::debug;

use super::traits::{ConnectionFactory, ConnectionHandle};
use crate::config::ConnectionConfig;
use crate::error::{Result, SqlError};

/// Split `url` into its lower-cased scheme and the remainder after `:`.
///
/// Returns `None` when the text before the first `:` is not a valid scheme
/// (empty, or containing characters other than ASCII letters, digits, `+`,
/// `-` and `.`).
pub fn split_scheme(url: &str) -> Option<(String, &str)> {
    let (scheme, rest) = url.split_once(':')?;
    let valid = !scheme.is_empty()
        && scheme.starts_with(|c: char| c.is_ascii_alphabetic())
        && scheme
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'));
    valid.then(|| (scheme.to_ascii_lowercase(), rest))
}

/// Registry of connection factories.
///
/// # Example
///
/// ```rust,no_run
/// use polysql::core::DriverCatalog;
///
/// let catalog = DriverCatalog::with_builtins();
/// let conn = catalog
///     .create_connection("sqlite::memory:")?
///     .expect("sqlite driver is compiled in");
/// conn.execute("CREATE TABLE t (id INTEGER)")?;
/// # Ok::<(), polysql::SqlError>(())
/// ```
#[derive(Default, Clone)]
pub struct DriverCatalog {
    /// Factories by lower-case scheme.
    factories: BTreeMap<String, Arc<dyn ConnectionFactory>>,
}

impl DriverCatalog {
    /// Create a new empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a catalog with every driver enabled by Cargo features.
    pub fn with_builtins() -> Self {
        let mut catalog = Self::new();
        crate::drivers::register_builtins(&mut catalog);
        catalog
    }

    /// Register `factory` under each of its schemes, replacing earlier
    /// registrations for the same scheme.
    pub fn register(&mut self, factory: impl ConnectionFactory + 'static) {
        self.register_arc(Arc::new(factory));
    }

    /// Register a factory as an Arc (for sharing).
    pub fn register_arc(&mut self, factory: Arc<dyn ConnectionFactory>) {
        for scheme in factory.supported_schemes() {
            self.factories
                .insert(scheme.to_ascii_lowercase(), Arc::clone(&factory));
        }
    }

    /// Get the factory for `scheme` (case-insensitive).
    pub fn get_factory(&self, scheme: &str) -> Option<Arc<dyn ConnectionFactory>> {
        self.factories.get(&scheme.to_ascii_lowercase()).cloned()
    }

    /// Check if a scheme is registered.
    pub fn has_scheme(&self, scheme: &str) -> bool {
        self.factories.contains_key(&scheme.to_ascii_lowercase())
    }

    /// All registered schemes, sorted.
    pub fn schemes(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Registered drivers with their schemes, sorted by driver name.
    pub fn drivers(&self) -> Vec<(&'static str, Vec<&'static str>)> {
        let mut drivers: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
        for factory in self.factories.values() {
            drivers
                .entry(factory.name())
                .or_insert_with(|| factory.supported_schemes().to_vec());
        }
        drivers.into_iter().collect()
    }

    /// Open a connection for `url`.
    ///
    /// Returns `Ok(None)` when no driver handles the scheme (or the URL has
    /// none) and `Err` when the driver fails to connect.
    pub fn create_connection(&self, url: &str) -> Result<Option<ConnectionHandle>> {
        let Some((scheme, target)) = split_scheme(url) else {
            debug!("No scheme in connection URL");
            return Ok(None);
        };
        let Some(factory) = self.get_factory(&scheme) else {
            debug!("No driver registered for scheme '{}'", scheme);
            return Ok(None);
        };
        debug!(driver = factory.name(), "Opening {} connection", scheme);
        factory.create(&scheme, target).map(Some)
    }

    /// Open a connection for `url`, returning an error if no driver matches.
    pub fn require_connection(&self, url: &str) -> Result<ConnectionHandle> {
        self.create_connection(url)?.ok_or_else(|| {
            let scheme = split_scheme(url).map(|(s, _)| s).unwrap_or_default();
            SqlError::Config(format!(
                "No driver for scheme '{}'. Supported schemes: {}",
                scheme,
                self.schemes().join(", ")
            ))
        })
    }

    /// Open a configured connection profile and run its `init` statements.
    pub fn open_profile(&self, profile: &ConnectionConfig) -> Result<ConnectionHandle> {
        let conn = self.require_connection(&profile.url)?;
        for sql in &profile.init {
            conn.execute(sql)?;
        }
        Ok(conn)
    }
}

impl std::fmt::Debug for DriverCatalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DriverCatalog")
            .field("schemes", &self.schemes())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::resultset::StatsResult;
    use crate::core::traits::{Connection, Statement};
    use std::rc::Rc;

    struct NullConnection;

    impl Connection for NullConnection {
        fn driver(&self) -> &'static str {
            "null"
        }

        fn execute(&self, _sql: &str) -> Result<StatsResult> {
            Ok(StatsResult::new(1, 0))
        }

        fn prepare(&self, _sql: &str) -> Result<Box<dyn Statement>> {
            Err(SqlError::prepare("0", "not supported"))
        }
    }

    struct NullFactory;

    impl ConnectionFactory for NullFactory {
        fn name(&self) -> &'static str {
            "null"
        }

        fn supported_schemes(&self) -> &'static [&'static str] {
            &["null", "void"]
        }

        fn create(&self, _scheme: &str, target: &str) -> Result<ConnectionHandle> {
            if target == "fail" {
                return Err(SqlError::connection("08001", "refused"));
            }
            Ok(Rc::new(NullConnection))
        }
    }

    #[test]
    fn test_split_scheme() {
        assert_eq!(
            split_scheme("sqlite::memory:"),
            Some(("sqlite".to_string(), ":memory:"))
        );
        assert_eq!(
            split_scheme("PostgreSQL://u@h/db"),
            Some(("postgresql".to_string(), "//u@h/db"))
        );
        assert_eq!(split_scheme("no scheme here"), None);
        assert_eq!(split_scheme(":memory:"), None);
        assert_eq!(split_scheme("1abc:x"), None);
    }

    #[test]
    fn test_unknown_scheme_is_not_an_error() {
        let catalog = DriverCatalog::new();
        assert!(catalog.create_connection("unknownscheme:whatever").unwrap().is_none());
        assert!(catalog.create_connection("no-colon").unwrap().is_none());
        assert!(matches!(
            catalog.require_connection("toto:memory:"),
            Err(SqlError::Config(_))
        ));
    }

    #[test]
    fn test_registered_factory_is_used_for_every_scheme() {
        let mut catalog = DriverCatalog::new();
        catalog.register(NullFactory);
        assert!(catalog.has_scheme("VOID"));
        assert_eq!(catalog.schemes(), ["null", "void"]);
        assert_eq!(catalog.drivers(), vec![("null", vec!["null", "void"])]);

        let conn = catalog.create_connection("void:x").unwrap().unwrap();
        assert_eq!(conn.driver(), "null");
    }

    #[test]
    fn test_driver_failure_is_an_error() {
        let mut catalog = DriverCatalog::new();
        catalog.register(NullFactory);
        assert!(matches!(
            catalog.create_connection("null:fail"),
            Err(SqlError::Connection { .. })
        ));
    }

    #[test]
    fn test_open_profile_runs_init_statements() {
        let mut catalog = DriverCatalog::new();
        catalog.register(NullFactory);
        let profile = ConnectionConfig {
            url: "null:db".to_string(),
            init: vec!["SET x = 1".to_string()],
            description: None,
        };
        let conn = catalog.open_profile(&profile).unwrap();
        assert_eq!(conn.driver(), "null");
    }

    #[cfg(feature = "sqlite")]
    #[test]
    fn test_builtins_include_sqlite() {
        let catalog = DriverCatalog::with_builtins();
        assert!(catalog.has_scheme("sqlite"));
        assert!(catalog.create_connection("sqlite::memory:").unwrap().is_some());
    }
}
