//! # Control
//!
//! The control connection: one command line out, one reply in

use std::io::{self, BufReader, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard};

use super::command::Command;
use super::config::Timeouts;
use super::reader::ResponseReader;
use super::status::Status;
use super::types::{FtpError, FtpResult, Response};

/// Control channel shared between the foreground commands and the keep-alive probe.
///
/// Whoever holds the lock owns the whole exchange.
pub type SharedControl = Arc<Mutex<ControlChannel>>;

/// Lock the shared control channel, recovering it if a previous holder panicked
pub fn lock(control: &SharedControl) -> MutexGuard<'_, ControlChannel> {
    control
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Stream to interface with the FTP server. This interface is only for the command stream.
#[derive(Debug)]
pub struct ControlChannel {
    reader: ResponseReader<BufReader<TcpStream>>,
    peer: SocketAddr,
    timeouts: Timeouts,
}

impl ControlChannel {
    /// Try to connect to the remote server, returning the channel and the welcome reply
    pub fn connect<A: ToSocketAddrs>(addr: A, timeouts: Timeouts) -> FtpResult<(Self, Response)> {
        debug!("Connecting to server");
        let mut last_err =
            io::Error::new(io::ErrorKind::InvalidInput, "could not resolve to any address");
        for addr in addr.to_socket_addrs().map_err(FtpError::ConnectionError)? {
            match TcpStream::connect_timeout(&addr, timeouts.connect) {
                Ok(stream) => return Self::connect_with_stream(stream, timeouts),
                Err(err) => {
                    debug!("Could not connect to {addr}: {err}");
                    last_err = err;
                }
            }
        }
        Err(FtpError::ConnectionError(last_err))
    }

    /// Connect using provided configured tcp stream; the server must greet with 220
    pub fn connect_with_stream(stream: TcpStream, timeouts: Timeouts) -> FtpResult<(Self, Response)> {
        let peer = stream.peer_addr().map_err(FtpError::ConnectionError)?;
        debug!("Established connection with server {peer}");
        let mut channel = Self {
            reader: ResponseReader::new(BufReader::new(stream)),
            peer,
            timeouts,
        };
        debug!("Reading server response...");
        let welcome = channel.read_response()?;
        if welcome.status != Status::Ready {
            return Err(FtpError::UnexpectedResponse(welcome));
        }
        debug!("Server READY; response: {:?}", welcome.as_string());
        Ok((channel, welcome))
    }

    /// Remote peer of the control connection
    pub fn peer_addr(&self) -> SocketAddr {
        self.peer
    }

    /// Returns a reference to the underlying [`TcpStream`].
    pub fn get_ref(&self) -> &TcpStream {
        self.reader.get_ref().get_ref()
    }

    /// Send a command and read its reply
    pub fn exchange(&mut self, command: Command) -> FtpResult<Response> {
        self.perform(&command)?;
        self.read_response()
    }

    /// Write command line to stream
    pub fn perform(&mut self, command: &Command) -> FtpResult<()> {
        trace!("CC OUT: {}", command.loggable());
        let stream = self.reader.get_mut().get_mut();
        stream
            .set_write_timeout(Some(self.timeouts.write))
            .map_err(FtpError::ConnectionError)?;
        stream
            .write_all(format!("{command}\r\n").as_bytes())
            .and_then(|_| stream.flush())
            .map_err(FtpError::ConnectionError)
    }

    /// Read the next reply, without sending anything
    pub fn read_response(&mut self) -> FtpResult<Response> {
        self.get_ref()
            .set_read_timeout(Some(self.timeouts.read))
            .map_err(FtpError::ConnectionError)?;
        self.reader.read_response()
    }

    /// Close both directions of the control connection
    pub fn shutdown(&self) -> FtpResult<()> {
        debug!("Closing control connection");
        match self.get_ref().shutdown(Shutdown::Both) {
            Err(err) if err.kind() != io::ErrorKind::NotConnected => {
                Err(FtpError::ConnectionError(err))
            }
            _ => Ok(()),
        }
    }
}
