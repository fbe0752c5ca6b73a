#![crate_name = "ftpline"]
#![crate_type = "lib"]

//! # ftpline
//!
//! ftpline is the engine of an interactive FTP client: one operator, one server, one prompt.
//!
//! It provides:
//!
//! - a framed reader for single and multi-line control replies
//! - decoding of the data address announced by `PASV` and `EPSV`
//! - data transfers with progress reports, half-closed orderly and acknowledged by the server
//! - a background keep-alive which shares the control connection with the commands typed at the
//!   prompt, without ever interleaving with them, and which reports a dead connection
//! - a command table and a read-dispatch loop driving a [`Session`]
//!
//! ## Get started
//!
//! ```toml
//! ftpline = "^0.1"
//! ```
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::mpsc;
//! use ftpline::{Config, Session};
//!
//! let (events_tx, _events_rx) = mpsc::channel();
//! let config = Config::new("127.0.0.1", "test", "test").with_port(10021);
//! let mut session = Session::connect(config, events_tx).unwrap();
//! session.login().unwrap();
//! session.pasv().unwrap();
//! session
//!     .list(None, |line| println!("{line}"))
//!     .unwrap();
//! // Disconnect from server
//! assert!(session.quit().is_ok());
//! ```
//!
//! ## Interactive driver
//!
//! Keep-alive reports and input lines travel on the same channel, so the driver wakes up for
//! whichever comes first.
//!
//! ```rust,no_run
//! use std::io;
//! use std::sync::mpsc;
//! use ftpline::{spawn_input_reader, CommandTable, Config, Repl, Session};
//!
//! let (events_tx, events_rx) = mpsc::channel();
//! let mut session = Session::connect(Config::new("127.0.0.1", "test", "test"), events_tx.clone())
//!     .unwrap();
//! spawn_input_reader(io::BufReader::new(io::stdin()), events_tx).unwrap();
//! let mut repl = Repl::new(CommandTable::standard(), io::stdout());
//! repl.run(&mut session, &events_rx);
//! ```
//!

// -- common deps
#[macro_use]
extern crate lazy_regex;
#[macro_use]
extern crate log;

// -- private
mod address;
mod command;
mod control;
mod reader;
mod regex;
mod status;
#[cfg(test)]
mod test_server;

// -- public
pub mod commands;
pub mod config;
pub mod data_stream;
pub mod event;
pub mod keepalive;
pub mod repl;
pub mod session;
pub mod types;

// -- export (common)
pub use address::{parse_epsv_address, parse_pasv_address};
pub use command::Command;
pub use commands::{CommandSpec, CommandTable, Flow, Handler};
pub use config::{Config, Credentials, KeepAliveConfig, Timeouts, DEFAULT_PORT};
pub use control::{ControlChannel, SharedControl};
pub use data_stream::{Completion, DataChannel, Progress, TransferOutcome};
pub use event::SessionEvent;
pub use keepalive::{KeepAlive, KeepAliveState};
pub use reader::ResponseReader;
pub use repl::{spawn_input_reader, Exit, Repl};
pub use session::{Login, Retrieval, Session, Upload, WorkingDirectory};
pub use status::{Status, StatusClass};
pub use types::{ErrorKind, FtpError, FtpResult, Response};

// -- test logging
#[cfg(test)]
pub fn log_init() {
    let _ = env_logger::builder().is_test(true).try_init();
}
