//! # Command
//!
//! The set of FTP commands sent on the control channel

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Commands sent on the control channel
pub enum Command {
    /// Go up one directory
    Cdup,
    /// Enter a directory
    Cwd(String),
    /// Extended passive mode (RFC 2428)
    Epsv,
    /// Ask the server for its help text
    Help,
    /// Directory listing of the path, or of the working directory
    List(Option<String>),
    /// Do nothing; keeps the connection alive
    Noop,
    /// Login password
    Pass(String),
    /// Passive mode
    Pasv,
    /// Working directory
    Pwd,
    /// Quit
    Quit,
    /// Download a remote file
    Retr(String),
    /// Size of a remote file
    Size(String),
    /// Server status, or status of the specified path
    Stat(Option<String>),
    /// Upload to the given remote path
    Store(String),
    /// Login user name
    User(String),
}

impl Command {
    /// Command line as it may be written to logs; secrets are masked
    pub fn loggable(&self) -> String {
        match self {
            Self::Pass(_) => "PASS ********".to_string(),
            cmd => cmd.to_string(),
        }
    }
}

// -- stringify

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cdup => write!(f, "CDUP"),
            Self::Cwd(d) => write!(f, "CWD {d}"),
            Self::Epsv => write!(f, "EPSV"),
            Self::Help => write!(f, "HELP"),
            Self::List(Some(p)) => write!(f, "LIST {p}"),
            Self::List(None) => write!(f, "LIST"),
            Self::Noop => write!(f, "NOOP"),
            Self::Pass(p) => write!(f, "PASS {p}"),
            Self::Pasv => write!(f, "PASV"),
            Self::Pwd => write!(f, "PWD"),
            Self::Quit => write!(f, "QUIT"),
            Self::Retr(p) => write!(f, "RETR {p}"),
            Self::Size(p) => write!(f, "SIZE {p}"),
            Self::Stat(Some(p)) => write!(f, "STAT {p}"),
            Self::Stat(None) => write!(f, "STAT"),
            Self::Store(p) => write!(f, "STOR {p}"),
            Self::User(u) => write!(f, "USER {u}"),
        }
    }
}
