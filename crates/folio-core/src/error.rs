//! Error kinds surfaced by folio-core. Every variant here is a startup-time
//! failure; per-request paths never return these.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("portfolio file {path}: {source}")]
    PortfolioRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("portfolio file {path} is not valid JSON: {source}")]
    PortfolioParse {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    /// The document parsed as JSON but the typed view is missing required
    /// fields (personal_info / contact block).
    #[error("portfolio document has an invalid shape: {0}")]
    PortfolioShape(#[source] serde_json::Error),

    #[error("config: {0}")]
    Config(#[from] config::ConfigError),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}
