pub mod config;
pub mod context;
pub mod controllers;
pub mod db;
pub mod error;
pub mod http;
pub mod routing;
pub mod session;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum BlogError {
    #[error("controller not found: {0}")]
    ControllerNotFound(String),

    #[error("action not found: {0}")]
    ActionNotFound(String),

    #[error("database connection failed: {0}")]
    Connection(String),

    #[error("query failed: {message}")]
    Query { statement: String, message: String },

    #[error(transparent)]
    Validation(#[from] error::ValidationError),

    #[error(transparent)]
    Http(#[from] error::HttpError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BlogError>;

impl BlogError {
    /// Get the HTTP status code this error maps to at the dispatch boundary
    pub fn http_status(&self) -> u16 {
        match self {
            BlogError::ControllerNotFound(_) => 404,
            BlogError::ActionNotFound(_) => 404,
            BlogError::Connection(_) => 500,
            BlogError::Query { .. } => 500,
            BlogError::Validation(_) => 422,
            BlogError::Http(e) => e.status,
            BlogError::Io(_) => 500,
        }
    }
}
