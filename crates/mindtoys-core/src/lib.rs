pub mod app_config;
pub mod catalog;
pub mod config;
pub mod products;
pub mod store;

pub use app_config::{AppConfig, Environment, SessionKind};
pub use catalog::{
    load_catalog, parse_catalog, CatalogFile, CategoryTarget, ExtractionProfile, ImageSource,
    StrategyConfig,
};
pub use config::{load_app_config, load_app_config_from_env};
pub use products::{
    dedup_key, NormalizedRecord, StoredIdentity, DEFAULT_QTY, MAX_PRICE, MIN_NAME_CHARS,
};
pub use store::ProductStore;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },

    #[error("failed to read catalog file {path}: {source}")]
    CatalogIo {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog file: {0}")]
    CatalogParse(#[from] serde_yaml::Error),

    #[error("catalog validation failed: {0}")]
    Validation(String),
}
