#![forbid(unsafe_code)]

//! Error type for the 9P codec.

use std::fmt;
use std::io;

/// Errors raised while reading or writing 9P messages.
#[derive(Debug)]
pub enum NinepError {
    /// The connection failed or closed mid-message.
    Io(io::Error),
    /// A message was truncated, oversized, or carried an unknown type.
    Format(String),
}

impl fmt::Display for NinepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(err) => write!(f, "9p io: {err}"),
            Self::Format(msg) => write!(f, "9p format: {msg}"),
        }
    }
}

impl std::error::Error for NinepError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(err) => Some(err),
            Self::Format(_) => None,
        }
    }
}

impl From<io::Error> for NinepError {
    fn from(err: io::Error) -> Self {
        Self::Io(err)
    }
}

pub type NinepResult<T> = Result<T, NinepError>;
