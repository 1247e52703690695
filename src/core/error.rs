use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Io,
    Parse,
    EmptySource,
    InvalidInput,
    Cancelled,
    Internal,
}

#[derive(Debug)]
pub struct Error {
    pub kind: ErrorKind,
    pub context: String,
}

impl Error {
    pub fn new(kind: ErrorKind, context: String) -> Self {
        Error { kind, context }
    }

    pub fn invalid_input(context: impl Into<String>) -> Self {
        Error::new(ErrorKind::InvalidInput, context.into())
    }

    pub fn cancelled() -> Self {
        Error::new(ErrorKind::Cancelled, "Request cancelled".to_string())
    }

    pub fn is_cancelled(&self) -> bool {
        self.kind == ErrorKind::Cancelled
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.context)
    }
}

impl std::error::Error for Error {}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error {
            kind: ErrorKind::Io,
            context: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error {
            kind: ErrorKind::Parse,
            context: err.to_string(),
        }
    }
}

impl From<fst::Error> for Error {
    fn from(err: fst::Error) -> Self {
        Error {
            kind: ErrorKind::Internal,
            context: format!("FST error: {}", err),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
