use std::{io, sync::Arc};

use thiserror::Error;

use crate::IonType;

/// Result alias used throughout the crate.
pub type Result<T, E = Error> = core::result::Result<T, E>;

/// Errors reported by the reader and its accessors.
///
/// [`Error::Io`] and [`Error::Syntax`] are fatal: once either is produced by
/// [`Reader::next`](crate::Reader::next) it latches on the reader, which then
/// stops making progress. The remaining variants are local to the call that
/// returned them.
#[derive(Error, Debug, Clone)]
pub enum Error {
    /// The underlying byte source failed.
    #[error("i/o error: {0}")]
    Io(#[source] Arc<io::Error>),

    /// The input is not well-formed Ion text.
    #[error("{source} at {line}:{column}")]
    Syntax {
        /// What was malformed.
        source: SyntaxError,
        /// Line of the furthest character read, starting at 1.
        line: usize,
        /// Column of the furthest character read, starting at 1.
        column: usize,
    },

    /// The current value is well-formed text, but an accessor could not
    /// decode it, e.g. a decimal whose exponent does not fit in an `i64`.
    #[error("cannot decode value at {line}:{column}: {source}")]
    InvalidValue {
        /// What could not be decoded.
        source: SyntaxError,
        /// Line where the value ends, starting at 1.
        line: usize,
        /// Column where the value ends, starting at 1.
        column: usize,
    },

    /// An accessor was called on a value of a different type, or with no
    /// current value.
    #[error("cannot read {requested} from {}", describe(.actual))]
    TypeMismatch {
        /// The representation the caller asked for.
        requested: &'static str,
        /// The type of the current value, if any.
        actual: Option<IonType>,
    },

    /// The integer does not fit the requested representation. Retry with
    /// [`Reader::big_int_value`](crate::Reader::big_int_value).
    #[error("integer does not fit in {target}")]
    Overflow {
        /// The representation that was too narrow.
        target: &'static str,
    },

    /// `step_in` or `step_out` was called where it is not allowed.
    #[error("invalid reader state: {0}")]
    InvalidState(&'static str),

    /// Stepping in would exceed
    /// [`ReaderOptions::max_container_depth`](crate::ReaderOptions::max_container_depth).
    #[error("container depth limit of {0} exceeded")]
    DepthLimitExceeded(usize),
}

impl Error {
    /// Returns `true` for errors that latch on the reader.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::Io(_) | Error::Syntax { .. })
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Error::Io(Arc::new(err))
    }
}

fn describe(actual: &Option<IonType>) -> &'static str {
    actual.map_or("no current value", IonType::as_str)
}

/// Lexical errors in Ion text.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyntaxError {
    /// A `/*` comment was not closed before end of input.
    #[error("unterminated block comment")]
    UnterminatedComment,
    /// A quoted string or symbol was not closed.
    #[error("unterminated quoted text")]
    UnterminatedString,
    /// A list, s-expression, or struct was not closed.
    #[error("unterminated container")]
    UnterminatedContainer,
    /// A backslash escape was not recognized or was incomplete.
    #[error("invalid escape sequence '\\{0}'")]
    InvalidEscape(char),
    /// A character that cannot start or continue a token.
    #[error("invalid character '{0}'")]
    InvalidCharacter(char),
    /// A well-formed token appeared where it is not allowed.
    #[error("unexpected {0}")]
    UnexpectedToken(&'static str),
    /// A numeric or timestamp literal is malformed.
    #[error("invalid numeric literal '{0}'")]
    InvalidNumeric(String),
    /// `null.` was followed by something other than an Ion type name.
    #[error("invalid typed null 'null.{0}'")]
    InvalidTypedNull(String),
    /// A blob or clob is malformed.
    #[error("invalid lob: {0}")]
    InvalidLob(&'static str),
    /// Annotations or a field name were not followed by a value.
    #[error("missing value")]
    MissingValue,
    /// Input ended inside a value.
    #[error("unexpected end of input")]
    UnexpectedEndOfInput,
}
