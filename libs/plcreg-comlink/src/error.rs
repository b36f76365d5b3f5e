//! Register Link Error Types
//!
//! Every failure carries one of three classes: validation (the request was
//! rejected before any transport call), transport (the external client
//! failed) or codec (the bytes and the declared type disagree).

use thiserror::Error;

/// Result type for register operations
pub type Result<T> = std::result::Result<T, RegisterError>;

/// Result type for transport collaborators
pub type TransportResult<T> = std::result::Result<T, TransportError>;

/// Coarse error class reported alongside every failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorClass {
    Validation,
    Transport,
    Codec,
}

impl ErrorClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorClass::Validation => "validation",
            ErrorClass::Transport => "transport",
            ErrorClass::Codec => "codec",
        }
    }
}

impl std::fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failures raised by transport clients (connect, I/O, timeouts)
#[derive(Debug, Error, Clone, PartialEq)]
pub enum TransportError {
    /// Connection could not be established
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Connect or request deadline expired
    #[error("Timeout: {0}")]
    Timeout(String),

    /// I/O failure on an established connection
    #[error("IO error: {0}")]
    Io(String),

    /// Device answered with fewer bytes than requested
    #[error("Short read: expected {expected} bytes, got {actual}")]
    ShortRead { expected: usize, actual: usize },

    /// Device answered with an exception or malformed response
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl From<std::io::Error> for TransportError {
    fn from(err: std::io::Error) -> Self {
        TransportError::Io(err.to_string())
    }
}

impl TransportError {
    pub fn connection(msg: impl Into<String>) -> Self {
        TransportError::ConnectionFailed(msg.into())
    }

    pub fn timeout(msg: impl Into<String>) -> Self {
        TransportError::Timeout(msg.into())
    }

    pub fn io(msg: impl Into<String>) -> Self {
        TransportError::Io(msg.into())
    }

    pub fn protocol(msg: impl Into<String>) -> Self {
        TransportError::Protocol(msg.into())
    }
}

/// Register operation errors
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RegisterError {
    /// Type tag not in the register table
    #[error("Unknown register type: {0}")]
    UnknownRegisterType(String),

    /// Byte order token not recognized or not applicable
    #[error("Unsupported byte order: {0}")]
    UnsupportedByteOrder(String),

    /// Byte order width differs from the value width
    #[error("Byte order {order} does not apply to {width}-byte values")]
    ByteOrderWidthMismatch { order: &'static str, width: usize },

    /// Bit position outside 0-15, or bit value outside {0, 1}
    #[error("Bit position out of range: {0}")]
    BitPositionOutOfRange(String),

    /// Raw buffer length differs from the declared type
    #[error("Invalid length for {context}: expected {expected} bytes, got {actual}")]
    InvalidLength {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Register bit access without a bit position
    #[error("Missing bit selector for {0}")]
    MissingBitSelector(String),

    /// Register bit write without the current register word
    #[error("Missing current word for read-modify-write of {0}")]
    MissingCurrentWord(String),

    /// Value does not fit the target width
    #[error("Value out of range for {target}: {value}")]
    ValueOutOfRange { target: String, value: String },

    /// Value text is not a number of the target kind
    #[error("Invalid value for {target}: {value}")]
    InvalidValue { target: String, value: String },

    /// Request field present but malformed
    #[error("Invalid field '{field}': {reason}")]
    InvalidField { field: String, reason: String },

    /// Required request field absent
    #[error("Missing field: {0}")]
    MissingField(String),

    /// Area and kind combination cannot be read or written
    #[error("Unsupported operation: {0}")]
    UnsupportedOperation(String),

    /// Transport collaborator failure
    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl RegisterError {
    pub fn invalid_length(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        RegisterError::InvalidLength {
            context: context.into(),
            expected,
            actual,
        }
    }

    pub fn out_of_range(target: impl Into<String>, value: impl ToString) -> Self {
        RegisterError::ValueOutOfRange {
            target: target.into(),
            value: value.to_string(),
        }
    }

    pub fn invalid_value(target: impl Into<String>, value: impl ToString) -> Self {
        RegisterError::InvalidValue {
            target: target.into(),
            value: value.to_string(),
        }
    }

    pub fn invalid_field(field: impl Into<String>, reason: impl Into<String>) -> Self {
        RegisterError::InvalidField {
            field: field.into(),
            reason: reason.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        RegisterError::UnsupportedOperation(msg.into())
    }

    /// Class of this error
    pub fn class(&self) -> ErrorClass {
        match self {
            RegisterError::InvalidLength { .. }
            | RegisterError::MissingBitSelector(_)
            | RegisterError::MissingCurrentWord(_)
            | RegisterError::ValueOutOfRange { .. } => ErrorClass::Codec,
            RegisterError::Transport(_) => ErrorClass::Transport,
            RegisterError::UnknownRegisterType(_)
            | RegisterError::UnsupportedByteOrder(_)
            | RegisterError::ByteOrderWidthMismatch { .. }
            | RegisterError::BitPositionOutOfRange(_)
            | RegisterError::InvalidValue { .. }
            | RegisterError::InvalidField { .. }
            | RegisterError::MissingField(_)
            | RegisterError::UnsupportedOperation(_) => ErrorClass::Validation,
        }
    }

    /// Whether a fresh attempt of the same operation may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RegisterError::Transport(
                TransportError::Timeout(_)
                    | TransportError::Io(_)
                    | TransportError::ConnectionFailed(_)
            )
        )
    }
}
