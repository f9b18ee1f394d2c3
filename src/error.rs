use std::fmt;

/// Errors produced while laying out or rendering a document.
#[derive(Debug)]
pub enum Error {
    /// Page and margin sizes leave no positive content rectangle.
    InvalidGeometry(String),
    /// Document text contains characters that cannot be laid out (e.g. NUL).
    InvalidDocument(String),
    /// Formatting options violate an invariant (non-positive font size or
    /// line spacing). Rejected, never clamped.
    InvalidOptions(String),
    /// Metrics for the requested font family are unavailable. Propagated to
    /// the caller; no silent substitution.
    MeasurementFailure(String),
    /// File I/O failure while reading a font file or writing output.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidGeometry(msg) => write!(f, "invalid page geometry: {msg}"),
            Error::InvalidDocument(msg) => write!(f, "invalid document: {msg}"),
            Error::InvalidOptions(msg) => write!(f, "invalid formatting options: {msg}"),
            Error::MeasurementFailure(msg) => write!(f, "font measurement failure: {msg}"),
            Error::Io(err) => write!(f, "I/O error: {err}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io(err)
    }
}
