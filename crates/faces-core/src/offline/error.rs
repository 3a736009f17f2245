use thiserror::Error;

#[derive(Error, Debug)]
pub enum OfflineError {
    #[error("Network error fetching {url}: {message}")]
    Network { url: String, message: String },

    #[error("{url} returned status {status}")]
    BadStatus { url: String, status: u16 },

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

impl OfflineError {
    pub fn network(url: &str, err: impl std::fmt::Display) -> Self {
        OfflineError::Network {
            url: url.to_string(),
            message: err.to_string(),
        }
    }
}
