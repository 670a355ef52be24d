use derive_more::Display;
use sea_orm::DbErr;

use crate::{db_core::queries::ReportQuery, report::ShapeError};

pub type AppResult<T> = Result<T, ReportError>;

#[derive(Debug, Display)]
pub enum ReportError {
    #[display("Configuration error: {_0}")]
    Config(config::ConfigError),
    #[display("Invalid configuration: {_0}")]
    InvalidConfig(String),
    #[display("Database connection failed: {_0}")]
    Connect(DbErr),
    #[display("Query {query} failed: {source}")]
    Query { query: ReportQuery, source: DbErr },
    #[display("Could not shape rows of {query}: {source}")]
    Shape { query: ReportQuery, source: ShapeError },
    #[display("Access token request failed with status {status}: {body}")]
    Auth { status: u16, body: String },
    #[display("Email delivery failed with status {status}: {body}")]
    Delivery { status: u16, body: String },
    #[display("HTTP error: {_0}")]
    Http(reqwest::Error),
    #[display("Template error: {_0}")]
    Template(minijinja::Error),
    #[display("Internal error: {_0}")]
    Internal(anyhow::Error),
}

impl ReportError {
    /// Short, stable name of the failure class, used as a log field.
    pub fn kind(&self) -> &'static str {
        match self {
            ReportError::Config(_) | ReportError::InvalidConfig(_) => "config",
            ReportError::Connect(_) | ReportError::Query { .. } => "query",
            ReportError::Shape { .. } => "shape",
            ReportError::Auth { .. } => "auth",
            ReportError::Delivery { .. } => "delivery",
            ReportError::Http(_) => "http",
            ReportError::Template(_) => "template",
            ReportError::Internal(_) => "internal",
        }
    }
}

impl std::error::Error for ReportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReportError::Config(e) => Some(e),
            ReportError::Connect(e) => Some(e),
            ReportError::Query { source, .. } => Some(source),
            ReportError::Shape { source, .. } => Some(source),
            ReportError::Http(e) => Some(e),
            ReportError::Template(e) => Some(e),
            ReportError::Internal(e) => Some(&**e),
            ReportError::InvalidConfig(_) | ReportError::Auth { .. } | ReportError::Delivery { .. } => {
                None
            }
        }
    }
}

impl From<anyhow::Error> for ReportError {
    fn from(error: anyhow::Error) -> Self {
        ReportError::Internal(error)
    }
}

impl From<config::ConfigError> for ReportError {
    fn from(error: config::ConfigError) -> Self {
        ReportError::Config(error)
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(error: reqwest::Error) -> Self {
        tracing::error!("Reqwest error: {:?}", error);
        ReportError::Http(error)
    }
}

impl From<minijinja::Error> for ReportError {
    fn from(error: minijinja::Error) -> Self {
        ReportError::Template(error)
    }
}
