#![allow(dead_code)]

//! Scripted loopback server playing the remote side of a session in tests

use std::io::{BufRead, BufReader, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::thread::{self, JoinHandle};

use rand::distr::Alphanumeric;
use rand::{Rng, rng};

pub const GREETING: &str = "220 mock server ready";

/// A server accepting exactly one control connection and running `script` on it
pub struct MockServer<T> {
    addr: SocketAddr,
    handle: Option<JoinHandle<T>>,
}

impl<T> MockServer<T>
where
    T: Send + 'static,
{
    pub fn start<F>(script: F) -> Self
    where
        F: FnOnce(&mut ServerConn) -> T + Send + 'static,
    {
        Self::start_with_greeting(GREETING, script)
    }

    pub fn start_with_greeting<F>(greeting: &str, script: F) -> Self
    where
        F: FnOnce(&mut ServerConn) -> T + Send + 'static,
    {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind mock server");
        let addr = listener.local_addr().expect("no local address");
        let greeting = greeting.to_string();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().expect("failed to accept control connection");
            let mut conn = ServerConn {
                reader: BufReader::new(stream),
                passive: None,
            };
            conn.reply(&greeting);
            script(&mut conn)
        });
        Self {
            addr,
            handle: Some(handle),
        }
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the script to end; panics raised by the script are propagated
    pub fn join(mut self) -> T {
        match self.handle.take().expect("already joined").join() {
            Ok(value) => value,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }
}

/// Server side of the control connection
pub struct ServerConn {
    reader: BufReader<TcpStream>,
    passive: Option<TcpListener>,
}

impl ServerConn {
    pub fn reply(&mut self, line: &str) {
        self.reader
            .get_mut()
            .write_all(format!("{line}\r\n").as_bytes())
            .expect("failed to write reply");
    }

    /// Next command line, terminator included; empty at end of stream
    pub fn recv_raw(&mut self) -> String {
        let mut line = String::new();
        self.reader
            .read_line(&mut line)
            .expect("failed to read command");
        line
    }

    pub fn recv(&mut self) -> String {
        self.recv_raw().trim_end().to_string()
    }

    pub fn expect(&mut self, command: &str) {
        assert_eq!(self.recv().as_str(), command);
    }

    /// Plays USER test / PASS test
    pub fn login(&mut self) {
        self.expect("USER test");
        self.reply("331 Need password");
        self.expect("PASS test");
        self.reply("230 Logged in");
    }

    /// Plays PASV, opening a listener for the data connection
    pub fn passive(&mut self) -> u16 {
        self.expect("PASV");
        let port = self.listen();
        self.reply(&format!(
            "227 Entering Passive Mode (127,0,0,1,{},{})",
            port / 256,
            port % 256
        ));
        port
    }

    /// Plays EPSV, opening a listener for the data connection
    pub fn extended_passive(&mut self) -> u16 {
        self.expect("EPSV");
        let port = self.listen();
        self.reply(&format!(
            "229 Entering Extended Passive Mode (|||{port}|)"
        ));
        port
    }

    pub fn accept_data(&mut self) -> TcpStream {
        self.passive
            .take()
            .expect("no passive listener")
            .accept()
            .expect("failed to accept data connection")
            .0
    }

    /// Whether the client already sent more bytes than were consumed
    pub fn has_pending_input(&mut self) -> bool {
        if !self.reader.buffer().is_empty() {
            return true;
        }
        let stream = self.reader.get_ref();
        stream.set_nonblocking(true).expect("set_nonblocking");
        let mut buf = [0u8; 1];
        let pending = matches!(stream.peek(&mut buf), Ok(n) if n > 0);
        stream.set_nonblocking(false).expect("set_nonblocking");
        pending
    }

    fn listen(&mut self) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").expect("failed to bind data listener");
        let port = listener.local_addr().expect("no local address").port();
        self.passive = Some(listener);
        port
    }
}

/// Random directory under the system temp dir; created empty
pub fn generate_tempdir() -> std::path::PathBuf {
    let mut rng = rng();
    let name: String = std::iter::repeat(())
        .map(|()| rng.sample(Alphanumeric))
        .map(char::from)
        .take(8)
        .collect();
    let dir = std::env::temp_dir().join(format!("ftpline_{name}"));
    std::fs::create_dir_all(&dir).expect("failed to create temp dir");
    dir
}
