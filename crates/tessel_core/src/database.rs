//! Database facade.

use crate::chain::{ReadChain, WriteChain};
use crate::config::Config;
use crate::query::{Query, Unscoped};
use parking_lot::RwLock;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use tessel_engine::Connection;
use tracing::debug;

/// Entry point for queries and transaction chains.
///
/// Wraps an already opened [`Connection`]. Cloning is cheap; clones share
/// the connection and the registered defaults. Every query and chain opens
/// its own transaction.
///
/// # Example
///
/// ```rust,no_run
/// use tessel_core::Database;
/// use tessel_engine::{CollectionSchema, IndexSchema, MemoryEngine};
///
/// # async fn demo() -> tessel_core::CoreResult<()> {
/// let engine = MemoryEngine::builder("shop", 1)
///     .collection(
///         CollectionSchema::new("products")
///             .key_path("id")
///             .index(IndexSchema::new("price", "price")),
///     )
///     .build()?;
/// let db = Database::new(engine);
///
/// let mut write = db.write(["products"]);
/// write.put("products", serde_json::json!({"id": 1, "price": 100}));
/// write.commit().await?;
///
/// let cheap = db.query("products").index("price").lt(150).find_all().await?;
/// assert_eq!(cheap.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Database {
    connection: Arc<dyn Connection>,
    config: Config,
    defaults: Arc<RwLock<HashMap<String, Map<String, Value>>>>,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.connection.name())
            .field("version", &self.connection.version())
            .field("config", &self.config)
            .finish()
    }
}

impl Database {
    /// Wraps a connection with the default configuration.
    pub fn new(connection: impl Connection + 'static) -> Self {
        Self::with_config(connection, Config::default())
    }

    /// Wraps a connection with `config`.
    pub fn with_config(connection: impl Connection + 'static, config: Config) -> Self {
        Self::from_shared(Arc::new(connection), config)
    }

    /// Wraps a shared connection.
    pub fn from_shared(connection: Arc<dyn Connection>, config: Config) -> Self {
        debug!(
            name = connection.name(),
            version = connection.version(),
            "database ready"
        );
        Self {
            connection,
            config,
            defaults: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The underlying connection.
    #[must_use]
    pub fn connection(&self) -> &dyn Connection {
        self.connection.as_ref()
    }

    /// The active configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Registers default field values for records read from `collection`.
    ///
    /// Query results are merged over these defaults: fields missing from
    /// a stored record take the default, fields present keep their value.
    /// Registering again replaces the previous defaults.
    pub fn register_defaults(&self, collection: impl Into<String>, defaults: Map<String, Value>) {
        let collection = collection.into();
        debug!(%collection, fields = defaults.len(), "defaults registered");
        self.defaults.write().insert(collection, defaults);
    }

    /// The defaults registered for `collection`, if any.
    #[must_use]
    pub fn defaults_for(&self, collection: &str) -> Option<Map<String, Value>> {
        self.defaults.read().get(collection).cloned()
    }

    /// Starts a query over `collection`.
    #[must_use]
    pub fn query(&self, collection: impl Into<String>) -> Query<Unscoped> {
        Query::new(self.clone(), collection)
    }

    /// Starts a read chain over `scope`.
    #[must_use]
    pub fn read<I, S>(&self, scope: I) -> ReadChain
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ReadChain::new(
            Arc::clone(&self.connection),
            collect_scope(scope),
            self.config.timeout,
        )
    }

    /// Starts a write chain over `scope`.
    #[must_use]
    pub fn write<I, S>(&self, scope: I) -> WriteChain
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        WriteChain::new(
            Arc::clone(&self.connection),
            collect_scope(scope),
            self.config.timeout,
        )
    }
}

fn collect_scope<I, S>(scope: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    scope.into_iter().map(Into::into).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tessel_engine::{CollectionSchema, MemoryEngine};

    fn db() -> Database {
        let engine = MemoryEngine::builder("shop", 2)
            .collection(CollectionSchema::new("users").key_path("id"))
            .build()
            .unwrap();
        Database::new(engine)
    }

    #[test]
    fn defaults_are_shared_between_clones() {
        let db = db();
        let clone = db.clone();
        let defaults = json!({"role": "member"}).as_object().cloned().unwrap();
        db.register_defaults("users", defaults.clone());
        assert_eq!(clone.defaults_for("users"), Some(defaults));
        assert_eq!(clone.defaults_for("posts"), None);
    }

    #[tokio::test]
    async fn defaults_apply_to_query_results() {
        let db = db();
        let mut write = db.write(["users"]);
        write.put("users", json!({"id": "u1", "name": "Ada"}));
        write.commit().await.unwrap();

        db.register_defaults(
            "users",
            json!({"role": "member", "name": "anonymous"})
                .as_object()
                .cloned()
                .unwrap(),
        );
        let user = db.query("users").equals("u1").find().await.unwrap().unwrap();
        assert_eq!(user, json!({"id": "u1", "name": "Ada", "role": "member"}));
    }

    #[test]
    fn debug_shows_connection() {
        let rendered = format!("{:?}", db());
        assert!(rendered.contains("shop"));
    }
}
