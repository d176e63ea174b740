//! SurrealDB connection management.

use std::env;

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

/// Configuration for connecting to SurrealDB.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// WebSocket URL (e.g., `127.0.0.1:8000`).
    pub url: String,
    /// SurrealDB namespace.
    pub namespace: String,
    /// SurrealDB database name.
    pub database: String,
    /// Root username for authentication.
    pub username: String,
    /// Root password for authentication.
    pub password: String,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            url: "127.0.0.1:8000".into(),
            namespace: "cohort".into(),
            database: "main".into(),
            username: "root".into(),
            password: "root".into(),
        }
    }
}

impl DbConfig {
    /// Defaults overridden by `COHORT_DB_URL`, `COHORT_DB_NAMESPACE`,
    /// `COHORT_DB_DATABASE`, `COHORT_DB_USERNAME` and `COHORT_DB_PASSWORD`.
    /// A `.env` file in the working directory is loaded first if present.
    pub fn from_env() -> Self {
        // A missing .env file is normal outside development.
        let _ = dotenvy::dotenv();

        let mut config = Self::default();
        if let Ok(v) = env::var("COHORT_DB_URL") {
            config.url = v;
        }
        if let Ok(v) = env::var("COHORT_DB_NAMESPACE") {
            config.namespace = v;
        }
        if let Ok(v) = env::var("COHORT_DB_DATABASE") {
            config.database = v;
        }
        if let Ok(v) = env::var("COHORT_DB_USERNAME") {
            config.username = v;
        }
        if let Ok(v) = env::var("COHORT_DB_PASSWORD") {
            config.password = v;
        }
        config
    }
}

/// Manages a connection to SurrealDB.
#[derive(Clone)]
pub struct DbManager {
    db: Surreal<Client>,
}

impl DbManager {
    /// Connect to SurrealDB using the provided configuration.
    ///
    /// Authenticates as root, selects the configured namespace and
    /// database, and returns a ready-to-use manager.
    pub async fn connect(config: &DbConfig) -> Result<Self, surrealdb::Error> {
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            "Connecting to SurrealDB"
        );

        let db = Surreal::new::<Ws>(&config.url).await?;

        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;

        db.use_ns(&config.namespace)
            .use_db(&config.database)
            .await?;

        info!("Successfully connected to SurrealDB");

        Ok(Self { db })
    }

    /// Returns a reference to the underlying SurrealDB client.
    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }
}
