use thiserror::Error;

/// Problems with the process environment, fatal at startup.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} should be set")]
    Missing(&'static str),
    #[error("{name} has an invalid value '{value}': {reason}")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

/// Failures while pulling the word list from the spreadsheet.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("spreadsheet request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("spreadsheet export is not valid CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("spreadsheet has no '{0}' column")]
    MissingColumn(&'static str),
    #[error("spreadsheet request timed out after {0:?}")]
    Timeout(std::time::Duration),
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum SessionError {
    #[error("no active quiz")]
    NoActiveSession,
}
