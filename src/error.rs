//! Error types for the smoke test

use thiserror::Error;

/// Result type alias for smoke-test operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while running the smoke test.
///
/// Check failures are not errors; they are reported through
/// [`crate::Verdict`]. This enum covers environment problems and unexpected
/// failures in the server or the browser session.
#[derive(Error, Debug)]
pub enum Error {
    /// No usable Chrome/Chromium executable was found
    #[error("headless Chrome is not available: {0}")]
    BrowserUnavailable(String),

    /// The static file server failed to start or serve
    #[error("static server error: {0}")]
    Server(String),

    /// The browser process failed to launch or initialize
    #[error("browser launch failed: {0}")]
    Launch(String),

    /// Navigation to the page under test failed
    #[error("failed to load page: {0}")]
    Load(String),

    /// In-page JavaScript evaluation failed
    #[error("script evaluation failed: {0}")]
    Script(String),

    /// Capturing or writing the screenshot failed
    #[error("screenshot failed: {0}")]
    Screenshot(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Other(err.to_string())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Other(err.to_string())
    }
}
