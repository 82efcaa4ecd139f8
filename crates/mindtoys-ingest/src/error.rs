use mindtoys_scraper::ScraperError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    /// The product store rejected a read or write. Ends the current category.
    #[error("product store failure: {0}")]
    Store(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("failed to open page session: {0}")]
    Session(#[from] ScraperError),
}

impl IngestError {
    pub(crate) fn store<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Store(Box::new(err))
    }
}
