//! # Data Stream
//!
//! This module exposes the data connection where listings and file content flow,
//! and the closing status read on the control channel once it is gone.

use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream};
use std::time::Duration;

use super::control::ControlChannel;
use super::status::Status;
use super::types::{FtpError, FtpResult, Response};

const BUFFER_SIZE: usize = 8192;

/// Transfer progress; `total` is 0 when the size is unknown
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Progress {
    pub transferred: u64,
    pub total: u64,
}

impl Progress {
    /// Percentage of the transfer done, if the total is known
    pub fn percentage(&self) -> Option<f64> {
        (self.total > 0).then(|| self.transferred as f64 / self.total as f64 * 100.0)
    }
}

impl fmt::Display for Progress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.percentage() {
            Some(percentage) => write!(
                f,
                "Progress: {}/{} bytes ({:.1}%)",
                self.transferred, self.total, percentage
            ),
            None => write!(f, "Progress: {} bytes", self.transferred),
        }
    }
}

/// How the server acknowledged the end of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Completion {
    /// Positive completion reply
    Clean(Response),
    /// 426: the data arrived, but the server complained about the data connection
    Warning(Response),
}

impl Completion {
    pub fn response(&self) -> &Response {
        match self {
            Self::Clean(response) | Self::Warning(response) => response,
        }
    }

    pub fn is_warning(&self) -> bool {
        matches!(self, Self::Warning(_))
    }
}

/// Result of a completed transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferOutcome {
    /// Preliminary reply announcing the transfer
    pub opening: Response,
    /// Bytes moved on the data connection
    pub bytes: u64,
    pub completion: Completion,
}

/// Data connection used for a single listing or file transfer
#[derive(Debug)]
pub struct DataChannel {
    stream: TcpStream,
}

/// Which side of a copy failed
enum CopyError {
    Read(io::Error),
    Write(io::Error),
}

impl DataChannel {
    /// Connect to the address announced by the server
    pub fn open(addr: SocketAddr, timeout: Duration) -> FtpResult<Self> {
        debug!("Opening data connection to {addr}");
        TcpStream::connect_timeout(&addr, timeout)
            .map(|stream| Self { stream })
            .map_err(FtpError::ConnectionError)
    }

    /// Returns a reference to the underlying TcpStream.
    pub fn get_ref(&self) -> &TcpStream {
        &self.stream
    }

    /// Read the connection line by line until the server closes it, handing every line to `on_line`
    /// as soon as it arrives. Returns the amount of bytes read.
    pub fn stream_lines<F>(&mut self, mut on_line: F) -> FtpResult<u64>
    where
        F: FnMut(&str),
    {
        let mut reader = BufReader::new(&self.stream);
        let mut bytes = 0;
        let mut line_buf = Vec::new();
        loop {
            line_buf.clear();
            match reader.read_until(b'\n', &mut line_buf) {
                Ok(0) => break,
                Ok(len) => {
                    bytes += len as u64;
                    let line = String::from_utf8_lossy(&line_buf);
                    let line = line.trim_end_matches(['\r', '\n']);
                    trace!("DATA IN: {:?}", line);
                    on_line(line);
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
                Err(err) => {
                    error!("failed to get lines from stream: {err}");
                    return Err(FtpError::ConnectionError(err));
                }
            }
        }
        Ok(bytes)
    }

    /// Copy everything the server sends into `sink`
    pub fn download<W, P>(&mut self, sink: &mut W, total: u64, progress: P) -> FtpResult<u64>
    where
        W: Write,
        P: FnMut(Progress),
    {
        copy_with_progress(&mut self.stream, sink, total, progress).map_err(|err| match err {
            CopyError::Read(err) => FtpError::ConnectionError(err),
            CopyError::Write(err) => FtpError::LocalIo(err),
        })
    }

    /// Copy `source` to the server
    pub fn upload<R, P>(&mut self, source: &mut R, total: u64, progress: P) -> FtpResult<u64>
    where
        R: Read,
        P: FnMut(Progress),
    {
        copy_with_progress(source, &mut self.stream, total, progress).map_err(|err| match err {
            CopyError::Read(err) => FtpError::LocalIo(err),
            CopyError::Write(err) => FtpError::ConnectionError(err),
        })
    }

    /// Half-close the write side, then the read side, then drop the connection.
    ///
    /// Some servers hold the closing reply back when the socket goes away abruptly.
    pub fn close(self) -> FtpResult<()> {
        debug!("Closing data connection");
        for how in [Shutdown::Write, Shutdown::Read] {
            match self.stream.shutdown(how) {
                Err(err) if err.kind() != io::ErrorKind::NotConnected => {
                    return Err(FtpError::ConnectionError(err));
                }
                _ => trace!("data connection shutdown {how:?}"),
            }
        }
        Ok(())
    }
}

/// Read the reply closing a transfer, once the data connection is gone.
///
/// 2xx completes the transfer, 426 completes it with a warning, anything else is an error.
pub fn read_closing_status(control: &mut ControlChannel) -> FtpResult<Completion> {
    let response = control.read_response()?;
    if response.is_success() {
        Ok(Completion::Clean(response))
    } else if response.status == Status::TransferAborted {
        warn!("transfer complete, but data connection didn't close gracefully: {response}");
        Ok(Completion::Warning(response))
    } else {
        Err(FtpError::UnexpectedResponse(response))
    }
}

fn copy_with_progress<R, W, P>(
    reader: &mut R,
    writer: &mut W,
    total: u64,
    mut progress: P,
) -> Result<u64, CopyError>
where
    R: Read + ?Sized,
    W: Write + ?Sized,
    P: FnMut(Progress),
{
    let mut buf = [0u8; BUFFER_SIZE];
    let mut transferred = 0;
    loop {
        let len = match reader.read(&mut buf) {
            Ok(0) => break,
            Ok(len) => len,
            Err(err) if err.kind() == io::ErrorKind::Interrupted => continue,
            Err(err) => return Err(CopyError::Read(err)),
        };
        writer.write_all(&buf[..len]).map_err(CopyError::Write)?;
        transferred += len as u64;
        progress(Progress { transferred, total });
    }
    writer.flush().map_err(CopyError::Write)?;
    Ok(transferred)
}
