use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    #[error("Login error: {0}")]
    Login(String),

    #[error("Scraping error: {0}")]
    Scraping(String),
}

// Result type alias for convenience
pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serde_error_conversion() {
        let json_err = serde_json::from_str::<serde_json::Value>("{not json").unwrap_err();
        let app_err: AppError = json_err.into();
        assert!(matches!(app_err, AppError::Serialization(_)));
    }

    #[test]
    fn test_url_error_conversion() {
        let url_err = url::Url::parse("://missing-scheme").unwrap_err();
        let app_err: AppError = url_err.into();
        assert!(matches!(app_err, AppError::Url(_)));
    }

    #[test]
    fn test_login_error() {
        let err = AppError::Login("invalid credentials".to_string());
        assert_eq!(err.to_string(), "Login error: invalid credentials");
    }

    #[test]
    fn test_scraping_error() {
        let err = AppError::Scraping("invalid row selector".to_string());
        assert_eq!(err.to_string(), "Scraping error: invalid row selector");
    }
}
