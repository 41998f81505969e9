use thiserror::Error;

/// Result type alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    /// A network or training description is inconsistent
    /// (e.g. activation list length differs from the layer count).
    #[error("invalid configuration: {0}")]
    Configuration(String),

    /// A vector does not match the width of the layer it is fed to.
    #[error("shape mismatch for {context}: expected {expected} values, got {actual}")]
    ShapeMismatch {
        context: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("unsupported activation: {0}")]
    UnsupportedActivation(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub(crate) fn shape(context: &'static str, expected: usize, actual: usize) -> Self {
        Error::ShapeMismatch { context, expected, actual }
    }

    /// Fails with `ShapeMismatch` unless `actual == expected`.
    pub(crate) fn check_len(context: &'static str, expected: usize, actual: usize) -> Result<()> {
        if expected == actual {
            Ok(())
        } else {
            Err(Error::shape(context, expected, actual))
        }
    }
}
