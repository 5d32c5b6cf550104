use std::error::Error;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

pub type OpResult<T> = Result<T, OpError>;

///
/// Errors raised by chain adapters while lifting a raw record into a `Block`.
///
/// These carry no location; the analyzer attaches path and line number
/// when it wraps them into an `OpError`.
///
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// the record is not a well-formed JSON document
    MalformedJson(String),
    /// a required field is absent (dotted path, e.g. `header.level`)
    MissingField(String),
    /// a field is present but holds the wrong JSON type
    TypeMismatch {
        field: String,
        expected: &'static str,
    },
}

impl ParseError {
    pub(crate) fn missing(field: &str) -> Self {
        ParseError::MissingField(field.to_owned())
    }

    pub(crate) fn mismatch(field: &str, expected: &'static str) -> Self {
        ParseError::TypeMismatch {
            field: field.to_owned(),
            expected,
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseError::MalformedJson(msg) => write!(f, "malformed JSON: {}", msg),
            ParseError::MissingField(field) => write!(f, "missing field `{}`", field),
            ParseError::TypeMismatch { field, expected } => {
                write!(f, "field `{}`: expected {}", field, expected)
            }
        }
    }
}

impl Error for ParseError {}

impl From<serde_json::Error> for ParseError {
    fn from(err: serde_json::Error) -> Self {
        ParseError::MalformedJson(err.to_string())
    }
}

#[derive(Debug)]
pub enum OpErrorKind {
    /// underlying stream could not be opened or read
    IoError(io::Error),
    /// framing or compression layer is broken
    FormatError,
    /// a record could not be parsed by the chain adapter
    ParseError(ParseError),
    /// the caller requested cancellation
    Cancelled,
    RuntimeError,
}

impl fmt::Display for OpErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OpErrorKind::IoError(err) => write!(f, "IO error: {}", err),
            OpErrorKind::FormatError => write!(f, "format error"),
            OpErrorKind::ParseError(err) => write!(f, "parse error: {}", err),
            OpErrorKind::Cancelled => write!(f, "cancelled"),
            OpErrorKind::RuntimeError => write!(f, "runtime error"),
        }
    }
}

#[derive(Debug)]
pub struct OpError {
    kind: OpErrorKind,
    message: String,
    path: Option<PathBuf>,
    line: Option<usize>,
}

impl OpError {
    pub fn new(kind: OpErrorKind) -> Self {
        OpError {
            kind,
            message: String::new(),
            path: None,
            line: None,
        }
    }

    pub fn join_msg(mut self, msg: &str) -> Self {
        if !self.message.is_empty() {
            self.message.push_str("; ");
        }
        self.message.push_str(msg);
        self
    }

    /// attach the archive path, unless one is already known
    pub fn with_path(mut self, path: Option<&Path>) -> Self {
        if self.path.is_none() {
            self.path = path.map(Path::to_path_buf);
        }
        self
    }

    /// attach the 1-based line number of the offending record
    pub fn at_line(mut self, line: usize) -> Self {
        self.line = Some(line);
        self
    }

    pub fn kind(&self) -> &OpErrorKind {
        &self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn line(&self) -> Option<usize> {
        self.line
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self.kind, OpErrorKind::Cancelled)
    }

    /// the adapter error, if this is a parse failure
    pub fn parse_error(&self) -> Option<&ParseError> {
        match &self.kind {
            OpErrorKind::ParseError(err) => Some(err),
            _ => None,
        }
    }
}

impl fmt::Display for OpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        match (&self.path, self.line) {
            (Some(path), Some(line)) => write!(f, " ({}:{})", path.display(), line),
            (Some(path), None) => write!(f, " ({})", path.display()),
            (None, Some(line)) => write!(f, " (line {})", line),
            (None, None) => Ok(()),
        }
    }
}

impl Error for OpError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match &self.kind {
            OpErrorKind::IoError(err) => Some(err),
            OpErrorKind::ParseError(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for OpError {
    fn from(err: io::Error) -> Self {
        OpError::new(OpErrorKind::IoError(err))
    }
}

impl From<ParseError> for OpError {
    fn from(err: ParseError) -> Self {
        OpError::new(OpErrorKind::ParseError(err))
    }
}

impl From<serde_json::Error> for OpError {
    fn from(err: serde_json::Error) -> Self {
        OpError::from(ParseError::from(err))
    }
}

impl From<&str> for OpError {
    fn from(msg: &str) -> Self {
        OpError::new(OpErrorKind::RuntimeError).join_msg(msg)
    }
}
