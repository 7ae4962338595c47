//! Error types for the show-panel hardware library.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur when interacting with the display.
#[derive(Error, Debug)]
pub enum Error {
    /// Color name not in the known color set.
    #[error("Invalid color: {0}")]
    InvalidColor(String),

    /// Text size scale factor out of range.
    #[error("Invalid text size (must be positive): {0}")]
    InvalidTextSize(u32),

    /// Serial port communication error.
    #[error("Serial port error: {0}")]
    Serial(#[from] tokio_serial::Error),

    /// Serial I/O error.
    #[error("Serial I/O error: {0}")]
    Io(#[from] std::io::Error),
}
