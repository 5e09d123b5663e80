use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(String),

    #[error("File I/O Error: {0}")]
    Io(String),

    #[error("{0}")]
    Validation(String),

    // Every fetch failure (spawn, timeout, exit code, bad JSON) lands here.
    #[error("Fetch Error: {0}")]
    Fetch(String),

    #[error("Script Error: {0}")]
    Script(String),

    #[error("Bridge Error: {0}")]
    Bridge(String),

    #[error("Resource Not Found: {0}")]
    NotFound(String),
}

// Allow conversion from std::io::Error to AppError::Io
impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Io(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Config(format!("JSON error: {}", err))
    }
}
