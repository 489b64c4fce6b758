//! Error types for pagesift.
//!
//! Expected absences (no consent banner, unknown byte size, inaccessible
//! nested document) are modelled as data, not errors; the variants here
//! cover the fail-fast paths only.

/// Error type for page analysis operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The supplied configuration failed validation.
    #[error("invalid configuration: {0}")]
    BadConfig(String),

    /// A page driver failed while being prepared for analysis.
    #[error(transparent)]
    Driver(#[from] crate::page::DriverError),
}

/// Result type alias for page analysis operations.
pub type Result<T> = std::result::Result<T, Error>;
