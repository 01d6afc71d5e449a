/// Failure categories surfaced by the data subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// A blob is missing or the backing store is unreachable.
    NotFound,
    /// A blob was fetched but does not match the expected schema.
    MalformedData,
    /// No weight table exists for the requested currency.
    UnknownCurrency,
    /// Every measure for a currency failed to load or validate.
    NoValidMeasures,
    /// A loaded series failed validation.
    Validation,
    /// A measure (or the whole consensus) could not be computed.
    Calculation,
    /// Caller-supplied arguments are out of range.
    InvalidInput,
    /// Settings could not be read.
    Config,
}

impl ErrorKind {
    pub fn label(self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::MalformedData => "malformed_data",
            ErrorKind::UnknownCurrency => "unknown_currency",
            ErrorKind::NoValidMeasures => "no_valid_measures",
            ErrorKind::Validation => "validation",
            ErrorKind::Calculation => "calculation",
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::Config => "config",
        }
    }

    /// Process exit code used by the `infl` binary.
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::InvalidInput | ErrorKind::Config => 2,
            ErrorKind::UnknownCurrency | ErrorKind::NoValidMeasures => 3,
            ErrorKind::NotFound
            | ErrorKind::MalformedData
            | ErrorKind::Validation
            | ErrorKind::Calculation => 4,
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    kind: ErrorKind,
    message: String,
}

impl AppError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotFound, message)
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::MalformedData, message)
    }

    pub fn unknown_currency(currency: &str) -> Self {
        Self::new(
            ErrorKind::UnknownCurrency,
            format!("No measure weights defined for currency {currency}."),
        )
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Validation, message)
    }

    pub fn calculation(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Calculation, message)
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn exit_code(&self) -> u8 {
        self.kind.exit_code()
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
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_kind() {
        assert_eq!(AppError::invalid_input("bad").exit_code(), 2);
        assert_eq!(AppError::unknown_currency("ZZZ").exit_code(), 3);
        assert_eq!(AppError::not_found("gone").exit_code(), 4);
        assert_eq!(AppError::unknown_currency("ZZZ").to_string(), "No measure weights defined for currency ZZZ.");
    }
}
