//! Relational backend on top of `sqlx`'s `Any` driver, so the same queries run
//! against PostgreSQL in production and SQLite for single-node setups and tests.
//! Every write is followed by a read so callers get the database's view of the row.

use async_trait::async_trait;
use sqlx::any::{install_default_drivers, AnyPoolOptions};
use sqlx::{AnyPool, FromRow};
use tracing::{debug, info};

use crate::error::{Error, Result, StorageError};
use crate::models::{AuthenticationMethod, ClusterRecord, ConnectionSettings};
use crate::repositories::{ClusterRepository, ConnectionSettingsRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseVendor {
    Postgres,
    Sqlite,
}

const POSTGRES_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS cluster_connection_settings (
        id BIGSERIAL PRIMARY KEY,
        service_url TEXT NOT NULL,
        authentication_method VARCHAR(32) NOT NULL,
        authentication_details TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cluster (
        id VARCHAR(64) PRIMARY KEY,
        display_name TEXT NOT NULL,
        icon TEXT NOT NULL,
        color TEXT NOT NULL,
        client_connection_settings_id BIGINT NOT NULL,
        admin_connection_settings_id BIGINT NOT NULL
    )"#,
];

const SQLITE_SCHEMA: &[&str] = &[
    r#"CREATE TABLE IF NOT EXISTS cluster_connection_settings (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        service_url TEXT NOT NULL,
        authentication_method TEXT NOT NULL,
        authentication_details TEXT
    )"#,
    r#"CREATE TABLE IF NOT EXISTS cluster (
        id TEXT PRIMARY KEY,
        display_name TEXT NOT NULL,
        icon TEXT NOT NULL,
        color TEXT NOT NULL,
        client_connection_settings_id INTEGER NOT NULL,
        admin_connection_settings_id INTEGER NOT NULL
    )"#,
];

impl DatabaseVendor {
    pub fn from_url(database_url: &str) -> Result<Self> {
        let scheme = database_url.split(':').next().unwrap_or_default();
        match scheme {
            "postgres" | "postgresql" => Ok(DatabaseVendor::Postgres),
            "sqlite" => Ok(DatabaseVendor::Sqlite),
            other => Err(Error::InvalidInput(format!(
                "unsupported database scheme '{}'",
                other
            ))),
        }
    }

    fn schema(&self) -> &'static [&'static str] {
        match self {
            DatabaseVendor::Postgres => POSTGRES_SCHEMA,
            DatabaseVendor::Sqlite => SQLITE_SCHEMA,
        }
    }
}

/// Opens a pool for `database_url` and makes sure both tables exist.
pub async fn connect(database_url: &str, max_connections: u32) -> Result<AnyPool> {
    let vendor = DatabaseVendor::from_url(database_url)?;
    install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(max_connections)
        .connect(database_url)
        .await
        .map_err(StorageError::from)?;

    for statement in vendor.schema() {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .map_err(StorageError::from)?;
    }

    info!("Database is configured with vendor: {:?}", vendor);
    Ok(pool)
}

#[derive(Debug, FromRow)]
struct DbConnectionSettings {
    id: i64,
    service_url: String,
    authentication_method: String,
    authentication_details: Option<String>,
}

impl TryFrom<DbConnectionSettings> for ConnectionSettings {
    type Error = StorageError;

    fn try_from(row: DbConnectionSettings) -> std::result::Result<Self, Self::Error> {
        let authentication_method = row
            .authentication_method
            .parse::<AuthenticationMethod>()
            .map_err(StorageError::Corrupt)?;

        Ok(ConnectionSettings {
            id: Some(row.id),
            service_url: row.service_url,
            authentication_method,
            authentication_details: row.authentication_details,
        })
    }
}

#[derive(Debug, FromRow)]
struct DbCluster {
    id: String,
    display_name: String,
    icon: String,
    color: String,
    client_connection_settings_id: i64,
    admin_connection_settings_id: i64,
}

impl From<DbCluster> for ClusterRecord {
    fn from(row: DbCluster) -> Self {
        ClusterRecord {
            id: row.id,
            display_name: row.display_name,
            icon: row.icon,
            color: row.color,
            client_connection_settings_id: row.client_connection_settings_id,
            admin_connection_settings_id: row.admin_connection_settings_id,
            internal_name: None,
        }
    }
}

const SELECT_CLUSTER: &str = "SELECT id, display_name, icon, color, \
     client_connection_settings_id, admin_connection_settings_id FROM cluster";

const SELECT_CONNECTION_SETTINGS: &str = "SELECT id, service_url, authentication_method, \
     authentication_details FROM cluster_connection_settings";

pub struct ClusterSqlRepository {
    pool: AnyPool,
}

impl ClusterSqlRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ClusterRepository for ClusterSqlRepository {
    async fn find_all(&self) -> Result<Vec<ClusterRecord>> {
        let rows = sqlx::query_as::<_, DbCluster>(&format!("{} ORDER BY id", SELECT_CLUSTER))
            .fetch_all(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(rows.into_iter().map(ClusterRecord::from).collect())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ClusterRecord>> {
        let row = sqlx::query_as::<_, DbCluster>(&format!("{} WHERE id = $1", SELECT_CLUSTER))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(StorageError::from)?;

        Ok(row.map(ClusterRecord::from))
    }

    async fn save(&self, cluster: ClusterRecord) -> Result<ClusterRecord> {
        if cluster.id.trim().is_empty() {
            return Err(Error::InvalidInput("cluster id must not be blank".to_string()));
        }

        sqlx::query(
            r#"INSERT INTO cluster (id, display_name, icon, color, client_connection_settings_id, admin_connection_settings_id)
               VALUES ($1, $2, $3, $4, $5, $6)
               ON CONFLICT (id) DO UPDATE SET
                   display_name = EXCLUDED.display_name,
                   icon = EXCLUDED.icon,
                   color = EXCLUDED.color,
                   client_connection_settings_id = EXCLUDED.client_connection_settings_id,
                   admin_connection_settings_id = EXCLUDED.admin_connection_settings_id"#,
        )
        .bind(&cluster.id)
        .bind(&cluster.display_name)
        .bind(&cluster.icon)
        .bind(&cluster.color)
        .bind(cluster.client_connection_settings_id)
        .bind(cluster.admin_connection_settings_id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;

        debug!("Upserted cluster '{}'", cluster.id);
        self.find_by_id(&cluster.id).await?.ok_or_else(|| {
            StorageError::Corrupt(format!("cluster '{}' missing after save", cluster.id)).into()
        })
    }

    async fn delete_by_id(&self, id: &str) -> Result<()> {
        sqlx::query("DELETE FROM cluster WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM cluster")
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}

pub struct ConnectionSettingsSqlRepository {
    pool: AnyPool,
}

impl ConnectionSettingsSqlRepository {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool }
    }

    async fn update(&self, id: i64, settings: &ConnectionSettings) -> Result<()> {
        sqlx::query(
            r#"UPDATE cluster_connection_settings
               SET service_url = $1,
                   authentication_method = $2,
                   authentication_details = $3
               WHERE id = $4"#,
        )
        .bind(&settings.service_url)
        .bind(settings.authentication_method.as_str())
        .bind(settings.authentication_details.clone())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(())
    }

    async fn insert(&self, settings: &ConnectionSettings) -> Result<i64> {
        let id = sqlx::query_scalar::<_, i64>(
            r#"INSERT INTO cluster_connection_settings (service_url, authentication_method, authentication_details)
               VALUES ($1, $2, $3)
               RETURNING id"#,
        )
        .bind(&settings.service_url)
        .bind(settings.authentication_method.as_str())
        .bind(settings.authentication_details.clone())
        .fetch_one(&self.pool)
        .await
        .map_err(StorageError::from)?;
        Ok(id)
    }
}

#[async_trait]
impl ConnectionSettingsRepository for ConnectionSettingsSqlRepository {
    async fn find_all(&self) -> Result<Vec<ConnectionSettings>> {
        let rows = sqlx::query_as::<_, DbConnectionSettings>(&format!(
            "{} ORDER BY id",
            SELECT_CONNECTION_SETTINGS
        ))
        .fetch_all(&self.pool)
        .await
        .map_err(StorageError::from)?;

        rows.into_iter()
            .map(|row| ConnectionSettings::try_from(row).map_err(Error::from))
            .collect()
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<ConnectionSettings>> {
        let row = sqlx::query_as::<_, DbConnectionSettings>(&format!(
            "{} WHERE id = $1",
            SELECT_CONNECTION_SETTINGS
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(StorageError::from)?;

        row.map(ConnectionSettings::try_from)
            .transpose()
            .map_err(Error::from)
    }

    async fn save(&self, settings: ConnectionSettings) -> Result<ConnectionSettings> {
        let existing_id = match settings.id {
            Some(id) if self.find_by_id(id).await?.is_some() => Some(id),
            _ => None,
        };

        let id = match existing_id {
            Some(id) => {
                self.update(id, &settings).await?;
                id
            }
            None => self.insert(&settings).await?,
        };

        debug!("Saved connection settings [{}]", id);
        self.find_by_id(id).await?.ok_or_else(|| {
            StorageError::Corrupt(format!("connection settings [{}] missing after save", id)).into()
        })
    }

    async fn delete_by_id(&self, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM cluster_connection_settings WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }

    async fn delete_all(&self) -> Result<()> {
        sqlx::query("DELETE FROM cluster_connection_settings")
            .execute(&self.pool)
            .await
            .map_err(StorageError::from)?;
        Ok(())
    }
}
