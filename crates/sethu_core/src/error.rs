use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Content service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("Scraping error: {0}")]
    Scraping(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Proxy error: {0}")]
    Proxy(String),

    #[error("External error: {0}")]
    External(#[from] anyhow::Error),
}

impl Error {
    /// True for failures that mean "the other side could not be reached",
    /// as opposed to bad input or a missing record.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Error::Http(_) | Error::RemoteUnavailable(_) | Error::Proxy(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_classification() {
        assert!(Error::RemoteUnavailable("down".into()).is_unavailable());
        assert!(Error::Proxy("refused".into()).is_unavailable());
        assert!(!Error::NotFound("ivf-10-min".into()).is_unavailable());
        assert!(!Error::Validation("lens".into()).is_unavailable());
    }

    #[test]
    fn test_messages() {
        assert_eq!(Error::NotFound("abc".into()).to_string(), "Not found: abc");
        assert_eq!(
            Error::Validation("phone is required".into()).to_string(),
            "Invalid input: phone is required"
        );
    }
}
