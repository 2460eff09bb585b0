//! Error type for draw-protocol operations.

use std::fmt;
use std::io;

/// Errors raised by the draw client.
///
/// The variants follow the failure classes of the protocol: bad caller
/// input, malformed device replies, device I/O failure, server-side
/// refusal, and malformed files.
#[derive(Debug)]
pub enum DrawError {
    /// Bad rectangle, channel descriptor, name, or other caller input.
    Config(String),
    /// Short or malformed reply from the device.
    Protocol(String),
    /// Device I/O failed. The command buffer has been reset.
    Transport(io::Error),
    /// The server refused to allocate a resource.
    Resource(String),
    /// A font, subfont, or image file is malformed.
    Parse(String),
}

impl fmt::Display for DrawError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(msg) => write!(f, "draw: {msg}"),
            Self::Protocol(msg) => write!(f, "draw protocol: {msg}"),
            Self::Transport(err) => write!(f, "draw transport: {err}"),
            Self::Resource(msg) => write!(f, "draw resource: {msg}"),
            Self::Parse(msg) => write!(f, "draw parse: {msg}"),
        }
    }
}

impl std::error::Error for DrawError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Transport(err) => Some(err),
            _ => None,
        }
    }
}

impl From<io::Error> for DrawError {
    fn from(err: io::Error) -> Self {
        Self::Transport(err)
    }
}

/// Result alias for draw operations.
pub type DrawResult<T> = Result<T, DrawError>;
