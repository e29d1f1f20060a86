//! Common error types

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Logging error: {0}")]
    Logging(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Config("bad vendor id".to_string());
        assert_eq!(err.to_string(), "Configuration error: bad vendor id");

        let err = Error::Logging("subscriber already set".to_string());
        assert_eq!(err.to_string(), "Logging error: subscriber already set");
    }
}
