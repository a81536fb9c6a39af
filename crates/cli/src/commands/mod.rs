//! Command implementations.

pub mod admin;
pub mod auth;
pub mod output;
pub mod shop;

use thiserror::Error;

use boighor_storefront::AppError;
use boighor_storefront::config::ConfigError;

/// Why a command failed.
///
/// Controller failures have already been shown as notices, so only the
/// remaining variants print anything.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    App(#[from] AppError),

    #[error("Could not write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{0}")]
    NotFound(String),
}
