//! Unified error types and result handling.
//!
//! Every fallible operation in the crate returns [`Result`]. Local form
//! problems are carried as [`ValidationError`] inside [`Error::Validation`];
//! everything the treasury refuses while applying a request is an
//! [`Error::Rejected`] whose message is shown to the operator verbatim.

use crate::core::allocation::ValidationError;
use thiserror::Error;

/// Crate-wide error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be read or is inconsistent
    #[error("Configuration error: {message}")]
    Config {
        /// What went wrong
        message: String,
    },

    /// Database driver or query failure
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    /// An amount was not a usable number
    #[error("Invalid amount: {amount}")]
    InvalidAmount {
        /// The offending amount as entered
        amount: f64,
    },

    /// A referenced record does not exist
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of record (e.g. "obligacion", "caja")
        entity: &'static str,
        /// Identifier that was looked up
        id: i64,
    },

    /// The allocation form failed local validation
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// The treasury refused to apply a request
    #[error("{message}")]
    Rejected {
        /// Message surfaced to the operator as-is
        message: String,
    },

    /// A rinde record already exists for the branch and period
    #[error("Rinde already recorded for sucursal {sucursal_id}, {mes:02}/{anio}")]
    DuplicateRinde {
        /// Branch
        sucursal_id: i64,
        /// Month (1-12)
        mes: u32,
        /// Year
        anio: i32,
    },

    /// The expected amount is zero, so no percentage can be computed
    #[error("Rinde input is incomplete: expected amount is zero")]
    IncompleteRinde,

    /// A caja session is already open for the branch
    #[error("Caja {caja_id} is already open for sucursal {sucursal_id}")]
    CajaAlreadyOpen {
        /// Open session id
        caja_id: i64,
        /// Branch
        sucursal_id: i64,
    },

    /// The caja session was already closed
    #[error("Caja {caja_id} is already closed")]
    CajaClosed {
        /// Session id
        caja_id: i64,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Environment variable error
    #[error("Environment variable error: {0}")]
    EnvVar(#[from] std::env::VarError),

    /// JSON encoding error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Serenity/Poise framework error
    #[error("Serenity/Poise framework error: {0}")]
    Framework(Box<poise::serenity_prelude::Error>),
}

impl From<poise::serenity_prelude::Error> for Error {
    fn from(value: poise::serenity_prelude::Error) -> Self {
        Self::Framework(Box::new(value))
    }
}

impl Error {
    /// Builds a rejection carrying an operator-facing message.
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
        }
    }
}

/// Convenience `Result` type
pub type Result<T> = std::result::Result<T, Error>;
