/// Broad failure categories surfaced to the user.
///
/// The kind decides how far a failure propagates: `DataUnavailable` ends the
/// session, `NoMatchingData` only affects the one region it was raised for,
/// and `UnfittableModel` is usually reported as a warning next to the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad arguments or configuration.
    Usage,
    /// The data source is missing, unreadable, or empty after cleaning.
    DataUnavailable,
    /// The encoded design matrix is degenerate, or the solve produced garbage.
    UnfittableModel,
    /// A requested filter combination has no historical rows.
    NoMatchingData,
    /// An encoded row was built against a different schema than the model.
    SchemaMismatch,
    /// Terminal or output failures.
    Io,
}

impl ErrorKind {
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Usage => 2,
            ErrorKind::DataUnavailable => 3,
            ErrorKind::UnfittableModel | ErrorKind::Io => 4,
            ErrorKind::NoMatchingData => 5,
            ErrorKind::SchemaMismatch => 6,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            exit_code: kind.exit_code(),
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Usage, message)
    }

    pub fn data_unavailable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::DataUnavailable, message)
    }

    pub fn unfittable(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnfittableModel, message)
    }

    pub fn no_matching_data(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NoMatchingData, message)
    }

    pub fn schema_mismatch(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaMismatch, message)
    }

    pub fn io(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Io, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("kind", &self.kind)
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_code_follows_kind() {
        assert_eq!(AppError::data_unavailable("x").exit_code(), 3);
        assert_eq!(AppError::no_matching_data("x").exit_code(), 5);
        assert_eq!(AppError::usage("x").kind(), ErrorKind::Usage);
    }
}
