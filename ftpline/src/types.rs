//! # Types
//!
//! Error and response types shared by the whole engine

use std::fmt;
use std::io;
use std::path::PathBuf;

use thiserror::Error;

use super::status::{Status, StatusClass};

/// A shorthand for a Result whose error type is always an FtpError.
pub type FtpResult<T> = std::result::Result<T, FtpError>;

/// `FtpError` is a library-global error type to describe the different kinds of
/// errors that might occur while talking to the server.
#[derive(Debug, Error)]
pub enum FtpError {
    /// Connect, read, write or timeout failure on the control or on a data connection
    #[error("Connection error: {0}")]
    ConnectionError(io::Error),
    /// Unexpected response from remote. The command expected a certain response, but got another one.
    /// Contains the response data.
    #[error("Invalid response: {0}")]
    UnexpectedResponse(Response),
    /// The response syntax is invalid
    #[error("Response contains an invalid syntax: {0}")]
    BadResponse(String),
    /// The passive address in the response could not be decoded
    #[error("Invalid passive address: {0}")]
    InvalidAddress(String),
    /// The command requires a completed login
    #[error("not authenticated - use 'auth' command first")]
    NotAuthenticated,
    /// The command requires a negotiated data address
    #[error("no data connection available - run 'pasv' or 'epsv' command first")]
    NoDataAddress,
    /// A required argument was not given
    #[error("must provide {0}")]
    MissingArgument(&'static str),
    /// An argument was given but can't be used
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A local file could not be opened or created
    #[error("failed to open local file {}: {source}", path.display())]
    LocalFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// Reading or writing local data failed during a transfer
    #[error("Local I/O error: {0}")]
    LocalIo(io::Error),
}

/// Broad category of an [`FtpError`]
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    Transport,
    ProtocolStatus,
    Format,
    Precondition,
    LocalIo,
}

impl FtpError {
    /// Get the category of this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ConnectionError(_) => ErrorKind::Transport,
            Self::UnexpectedResponse(_) => ErrorKind::ProtocolStatus,
            Self::BadResponse(_) | Self::InvalidAddress(_) => ErrorKind::Format,
            Self::NotAuthenticated
            | Self::NoDataAddress
            | Self::MissingArgument(_)
            | Self::InvalidArgument(_) => ErrorKind::Precondition,
            Self::LocalFile { .. } | Self::LocalIo(_) => ErrorKind::LocalIo,
        }
    }
}

/// Defines a response from the ftp server.
///
/// A response is made of all the raw lines received for one reply, in arrival order.
/// The code is taken from the first line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Response {
    pub status: Status,
    code: u32,
    class: StatusClass,
    lines: Vec<String>,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.as_string())
    }
}

impl Response {
    /// Instantiates a new `Response`
    pub fn new(code: u32, lines: Vec<String>) -> Self {
        Self {
            status: Status::from(code),
            code,
            class: StatusClass::from_code(code),
            lines,
        }
    }

    /// Numeric reply code, as received
    pub fn code(&self) -> u32 {
        self.code
    }

    /// Reply class of the code
    pub fn class(&self) -> StatusClass {
        self.class
    }

    /// Whether the reply is a positive completion (2xx)
    pub fn is_success(&self) -> bool {
        self.class == StatusClass::PositiveCompletion
    }

    /// Raw lines, line terminators included
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// First line without its terminator
    pub fn first_line(&self) -> &str {
        self.lines
            .first()
            .map(|x| x.trim_end_matches(['\r', '\n']))
            .unwrap_or_default()
    }

    /// Full response text, exactly as received
    pub fn text(&self) -> String {
        self.lines.concat()
    }

    /// Get response as string, without trailing whitespace
    pub fn as_string(&self) -> String {
        self.text().trim_end().to_string()
    }
}
