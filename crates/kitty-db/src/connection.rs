//! Opening the ledger database.

use surrealdb::Surreal;
use surrealdb::engine::remote::ws::{Client, Ws};
use surrealdb::opt::auth::Root;
use tracing::info;

use crate::error::DbError;
use crate::schema;

/// Where the ledger lives. Filled from the operator's command line or
/// environment; there is no built-in fallback.
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// `host:port` of the SurrealDB WebSocket endpoint.
    pub url: String,
    pub namespace: String,
    pub database: String,
    pub username: String,
    pub password: String,
}

/// A connected ledger whose schema is at [`crate::SCHEMA_VERSION`].
#[derive(Clone)]
pub struct LedgerDb {
    db: Surreal<Client>,
    schema_version: u32,
}

impl LedgerDb {
    /// Connect, sign in, select the ledger database and upgrade its
    /// schema. Nothing is handed out before the schema is current.
    pub async fn open(config: &DbConfig) -> Result<Self, DbError> {
        let db = Surreal::new::<Ws>(config.url.as_str()).await?;
        db.signin(Root {
            username: config.username.clone(),
            password: config.password.clone(),
        })
        .await?;
        db.use_ns(config.namespace.as_str())
            .use_db(config.database.as_str())
            .await?;

        let schema_version = schema::migrate(&db).await?;
        info!(
            url = %config.url,
            namespace = %config.namespace,
            database = %config.database,
            schema_version,
            "ledger opened"
        );

        Ok(Self { db, schema_version })
    }

    pub fn client(&self) -> &Surreal<Client> {
        &self.db
    }

    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }
}
