use thiserror::Error;

/// Failure modes of a single page navigation. Retry policy lives with the
/// callers: the detail fetcher retries with backoff, the walker surfaces
/// listing failures to the orchestrator which skips the category.
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("unexpected HTTP status {status} from {url}")]
    Status { status: u16, url: String },
}
