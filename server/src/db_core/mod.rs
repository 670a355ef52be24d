pub mod queries;

use std::time::Duration;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};

use crate::{
    error::{AppResult, ReportError},
    server_config::ServerConfig,
};

/// Opens a single-connection pool for one report run. The caller closes it
/// once the query phase is over.
pub async fn connect(cfg: &ServerConfig) -> AppResult<DatabaseConnection> {
    let timeout = Duration::from_secs(cfg.report.db_connect_timeout_secs);
    let mut db_options = ConnectOptions::new(cfg.database_url()?);
    db_options
        .max_connections(1)
        .min_connections(0)
        .connect_timeout(timeout)
        .acquire_timeout(timeout)
        .sqlx_logging(false);

    Database::connect(db_options)
        .await
        .map_err(ReportError::Connect)
}
