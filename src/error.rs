use std::{error, fmt, io, result};

/// Where an error occurred in the source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Position {
    /// Byte offset in the source (BOM included).
    pub byte: u64,
    /// 1-based row number.
    pub row: u64,
}

/// The specific type of an error.
#[derive(Debug)]
#[non_exhaustive]
pub enum ErrorKind {
    /// Wrap a [std::io::Error].
    Io(io::Error),

    /// A row could not be decoded as UTF-8. `pos.byte` is the offset at which
    /// the row starts.
    Utf8 { pos: Position },

    /// Strict mode only: a quote was found in the middle of an unquoted field.
    UnexpectedQuote { pos: Position },

    /// Strict mode only: something other than a delimiter, a line separator or
    /// whitespace followed the closing quote of a field.
    TrailingCharacters { pos: Position },

    /// Strict mode only: input ended inside a quoted field.
    UnterminatedQuote { pos: Position },
}

/// An error occurring when reading/writing CSV data.
#[derive(Debug)]
pub struct Error(ErrorKind);

impl Error {
    pub(crate) fn new(kind: ErrorKind) -> Self {
        Self(kind)
    }

    /// Return whether the wrapped error is a [`std::io::Error`].
    pub fn is_io_error(&self) -> bool {
        matches!(self.0, ErrorKind::Io(_))
    }

    /// Return the position of the error, if it is not an io error.
    pub fn position(&self) -> Option<Position> {
        match self.0 {
            ErrorKind::Io(_) => None,
            ErrorKind::Utf8 { pos }
            | ErrorKind::UnexpectedQuote { pos }
            | ErrorKind::TrailingCharacters { pos }
            | ErrorKind::UnterminatedQuote { pos } => Some(pos),
        }
    }

    /// Return a reference to the underlying [`ErrorKind`].
    pub fn kind(&self) -> &ErrorKind {
        &self.0
    }

    /// Unwraps the error into its underlying [`ErrorKind`].
    pub fn into_kind(self) -> ErrorKind {
        self.0
    }
}

impl From<io::Error> for Error {
    fn from(err: io::Error) -> Self {
        Self(ErrorKind::Io(err))
    }
}

impl From<Error> for io::Error {
    fn from(err: Error) -> Self {
        match err.0 {
            ErrorKind::Io(inner) => inner,
            kind => Self::new(io::ErrorKind::InvalidData, Error(kind)),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self.0 {
            ErrorKind::Io(ref err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self.0 {
            ErrorKind::Io(ref err) => err.fmt(f),
            ErrorKind::Utf8 { pos } => write!(
                f,
                "CSV error: row {} (byte: {}): invalid UTF-8",
                pos.row, pos.byte
            ),
            ErrorKind::UnexpectedQuote { pos } => write!(
                f,
                "CSV error: row {} (byte: {}): unexpected quote in unquoted field",
                pos.row, pos.byte
            ),
            ErrorKind::TrailingCharacters { pos } => write!(
                f,
                "CSV error: row {} (byte: {}): unexpected character after closing quote",
                pos.row, pos.byte
            ),
            ErrorKind::UnterminatedQuote { pos } => write!(
                f,
                "CSV error: row {} (byte: {}): quoted field is never closed",
                pos.row, pos.byte
            ),
        }
    }
}

/// A type alias for `Result<T, tidy_csv::Error>`.
pub type Result<T> = result::Result<T, Error>;
