use thiserror::Error;

/// Failure raised by a generated read routine
#[derive(Debug, Error)]
pub enum ReadError {
    /// Input was not well-formed JSON
    #[error("malformed input: {0}")]
    Syntax(#[from] serde_json::Error),

    /// A token of a different kind was found where the routine expected another
    #[error("expected {expected} but found {found} at {path}")]
    UnexpectedToken {
        expected: &'static str,
        found: &'static str,
        path: String,
    },

    /// A number did not fit the declared numeric kind
    #[error("number {value} does not fit in {kind} at {path}")]
    OutOfRange {
        kind: &'static str,
        value: String,
        path: String,
    },

    /// A property under the throw-if-missing policy was absent
    #[error("{message} (at {path})")]
    MissingProperty { message: String, path: String },

    /// No enum constant matched the token
    #[error("unknown value {value:?} for enum {enum_name} at {path}")]
    UnknownEnumValue {
        enum_name: &'static str,
        value: String,
        path: String,
    },

    /// The reader was driven out of order (e.g. a value read before its name)
    #[error("invalid reader state: {message} at {path}")]
    State { message: &'static str, path: String },
}

/// Failure raised by a generated write routine
#[derive(Debug, Error)]
pub enum WriteError {
    /// JSON cannot carry NaN or infinite numbers
    #[error("cannot write non-finite number {0}")]
    NonFinite(f64),

    /// The writer was driven out of order (e.g. a value without a name inside an object)
    #[error("invalid writer state: {0}")]
    State(&'static str),
}

/// Failure raised by a generated check routine under the `ERROR` enforcement mode
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{path}: {message}")]
pub struct ValidationError {
    /// Property path, including index markers for enclosing arrays and lists
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}
