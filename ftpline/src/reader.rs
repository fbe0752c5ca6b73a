//! # Reader
//!
//! Framing of control channel replies

use std::io::{self, BufRead};

use super::types::{FtpError, FtpResult, Response};

/// Reads one logical reply at a time out of the control channel.
///
/// A reply is a single line, unless the fourth character of its first line is `-`:
/// then every following line belongs to the reply, up to and including the first line
/// starting with the same code followed by a space.
#[derive(Debug)]
pub struct ResponseReader<R>
where
    R: BufRead,
{
    inner: R,
}

impl<R> ResponseReader<R>
where
    R: BufRead,
{
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    /// Returns a reference to the underlying reader
    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    /// Returns a mutable reference to the underlying reader
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.inner
    }

    /// Read the next reply.
    ///
    /// Any I/O error, including the end of the stream, aborts the read and the partial reply is lost.
    pub fn read_response(&mut self) -> FtpResult<Response> {
        let first = self.read_line()?;
        let code = code_from_line(&first)?;
        let multiline = first.as_bytes().get(3) == Some(&b'-');
        // closing line: same code followed by a space
        let mut expected = [b' '; 4];
        expected[..3].copy_from_slice(&first.as_bytes()[..3]);
        let mut lines = vec![first];

        if multiline {
            loop {
                let line = self.read_line()?;
                let last = line.as_bytes().get(..4) == Some(&expected[..]);
                lines.push(line);
                if last {
                    break;
                }
            }
        }

        trace!("Reply {code} ({} lines)", lines.len());
        Ok(Response::new(code, lines))
    }

    /// Read bytes until 0x0A; a missing terminator means the stream ended early
    fn read_line(&mut self) -> FtpResult<String> {
        let mut buf = Vec::new();
        self.inner
            .read_until(0x0A, &mut buf)
            .map_err(FtpError::ConnectionError)?;
        if buf.last() != Some(&0x0A) {
            return Err(FtpError::ConnectionError(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "control connection closed by remote",
            )));
        }
        let line = String::from_utf8_lossy(&buf).into_owned();
        trace!("CC IN: {:?}", line.trim_end());
        Ok(line)
    }
}

/// Get code from the first three characters of a line
fn code_from_line(line: &str) -> FtpResult<u32> {
    match line.as_bytes().get(..3) {
        Some(digits) if digits.iter().all(u8::is_ascii_digit) => Ok(digits
            .iter()
            .fold(0, |code, digit| code * 10 + u32::from(digit - b'0'))),
        _ => Err(FtpError::BadResponse(format!(
            "reply doesn't start with a status code: {:?}",
            line.trim_end()
        ))),
    }
}
