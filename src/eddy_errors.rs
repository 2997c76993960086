use thiserror::Error;

#[derive(Error, Debug)]
pub enum EddyError {
    #[error("Invalid configuration parameter: {0}")]
    InvalidConfig(String),

    #[error("Unknown domain type: {0}")]
    UnknownDomain(String),

    #[error("Unknown diagnostic type: {0}")]
    UnknownDiagnostic(String),

    #[error("Unknown smoothing filter: {0}")]
    UnknownSmoothing(String),

    #[error("Start date {start} is after end date {end}")]
    InvalidDateRange { start: String, end: String },

    #[error("Smoothing is enabled but no field filter was provided")]
    MissingFilter,

    #[error("Invalid or missing frame timestamp: {0}")]
    InvalidTimestamp(String),

    #[error("Grid shape mismatch: expected {expected:?}, found {found:?}")]
    ShapeMismatch {
        expected: (usize, usize),
        found: (usize, usize),
    },

    #[error("Grid axis '{0}' must be non-empty and strictly increasing")]
    InvalidAxis(&'static str),

    #[error("Field filter returned a field of shape {0:?}")]
    FilterShape((usize, usize)),

    #[error("Malformed track archive record: {0}")]
    ArchiveFormat(String),

    #[error("Unable to perform file operation: {0}")]
    IoError(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

impl PartialEq for EddyError {
    fn eq(&self, other: &Self) -> bool {
        use EddyError::*;
        match (self, other) {
            (InvalidConfig(a), InvalidConfig(b)) => a == b,
            (UnknownDomain(a), UnknownDomain(b)) => a == b,
            (UnknownDiagnostic(a), UnknownDiagnostic(b)) => a == b,
            (UnknownSmoothing(a), UnknownSmoothing(b)) => a == b,
            (
                InvalidDateRange { start: s1, end: e1 },
                InvalidDateRange { start: s2, end: e2 },
            ) => s1 == s2 && e1 == e2,
            (InvalidTimestamp(a), InvalidTimestamp(b)) => a == b,
            (
                ShapeMismatch {
                    expected: e1,
                    found: f1,
                },
                ShapeMismatch {
                    expected: e2,
                    found: f2,
                },
            ) => e1 == e2 && f1 == f2,
            (InvalidAxis(a), InvalidAxis(b)) => a == b,
            (FilterShape(a), FilterShape(b)) => a == b,
            (ArchiveFormat(a), ArchiveFormat(b)) => a == b,

            // Wrapped errors are not comparable: same variant means equal
            (IoError(_), IoError(_)) => true,
            (CsvError(_), CsvError(_)) => true,

            (MissingFilter, MissingFilter) => true,

            _ => false,
        }
    }
}
