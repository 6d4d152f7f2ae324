use thiserror::Error;

pub type Result<T> = std::result::Result<T, ScrapeError>;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("{url} answered with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("invalid CSS selector: {0}")]
    Selector(String),

    #[error("invalid pattern {pattern}: {message}")]
    Pattern { pattern: String, message: String },

    #[error("failed to start {workers} detail workers: {message}")]
    WorkerPool { workers: usize, message: String },

    #[error("invalid URL {url}: {message}")]
    InvalidUrl { url: String, message: String },
}

impl ScrapeError {
    pub fn from_reqwest(url: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            ScrapeError::Timeout { url: url.to_string() }
        } else if let Some(status) = err.status() {
            ScrapeError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            }
        } else {
            ScrapeError::Transport {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Whether a single listing may be skipped on this error while the page continues.
    pub fn is_recoverable_for_listing(&self) -> bool {
        matches!(
            self,
            ScrapeError::Transport { .. }
                | ScrapeError::Timeout { .. }
                | ScrapeError::Status { .. }
                | ScrapeError::InvalidUrl { .. }
        )
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum CriteriaError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("unknown job type '{0}' (expected full time, internship or part time)")]
    JobType(String),

    #[error("unknown experience level '{0}' (expected entry level, mid level or senior level)")]
    Experience(String),

    #[error("'{0}' is not a valid number")]
    Number(String),
}
