//! # Session
//!
//! The command engine: one procedure per FTP operation, run against the shared control channel.
//!
//! Every procedure checks its preconditions before touching the session, then holds the control
//! channel for its whole exchange, data transfer included.

use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::address::{parse_epsv_address, parse_pasv_address};
use super::command::Command;
use super::config::Config;
use super::control::{lock, ControlChannel, SharedControl};
use super::data_stream::{read_closing_status, DataChannel, Progress, TransferOutcome};
use super::event::SessionEvent;
use super::keepalive::{KeepAlive, KeepAliveState};
use super::regex::{PWD_RE, SIZE_RE};
use super::status::Status;
use super::types::{FtpError, FtpResult, Response};

/// Replies to the USER/PASS exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Login {
    pub user: Response,
    pub pass: Response,
}

/// Reply to PWD
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkingDirectory {
    /// Quoted path of the reply, if the server sent one
    pub path: Option<String>,
    pub response: Response,
}

/// A completed download
#[derive(Debug)]
pub struct Retrieval {
    /// Where the file was written
    pub local_path: PathBuf,
    /// Size announced by SIZE; 0 if unknown
    pub total: u64,
    /// Why the size is unknown, if SIZE failed
    pub size_warning: Option<FtpError>,
    pub outcome: TransferOutcome,
}

/// A completed upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub remote_name: String,
    pub total: u64,
    pub outcome: TransferOutcome,
}

/// An interactive session with one server
#[derive(Debug)]
pub struct Session {
    control: SharedControl,
    config: Config,
    events: Sender<SessionEvent>,
    welcome: Response,
    authenticated: bool,
    data_address: Option<SocketAddr>,
    keepalive: KeepAlive,
    closed: bool,
}

impl Session {
    /// Connect to the configured server. Keep-alive reports will be sent to `events`.
    pub fn connect(config: Config, events: Sender<SessionEvent>) -> FtpResult<Self> {
        let address = config.address();
        info!("Connecting to {address}");
        let (channel, welcome) = ControlChannel::connect(address.as_str(), config.timeouts)?;
        Ok(Self {
            control: Arc::new(Mutex::new(channel)),
            config,
            events,
            welcome,
            authenticated: false,
            data_address: None,
            keepalive: KeepAlive::idle(),
            closed: false,
        })
    }

    /// Welcome reply sent by the server on connect
    pub fn welcome(&self) -> &Response {
        &self.welcome
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    /// Data address negotiated by the last PASV or EPSV, if not consumed yet
    pub fn data_address(&self) -> Option<SocketAddr> {
        self.data_address
    }

    pub fn keepalive_state(&self) -> KeepAliveState {
        self.keepalive.state()
    }

    /// Log in with the configured credentials, then start the keep-alive.
    ///
    /// USER must be answered with 331 and PASS with a positive completion.
    pub fn login(&mut self) -> FtpResult<Login> {
        self.keepalive.stop();
        self.authenticated = false;
        let credentials = self.config.credentials.clone();
        debug!("Signing in as user '{}'", credentials.username);
        let login = {
            let mut channel = lock(&self.control);
            let user = channel.exchange(Command::User(credentials.username))?;
            if user.status != Status::NeedPassword {
                return Err(FtpError::UnexpectedResponse(user));
            }
            debug!("Password is required");
            let pass = channel.exchange(Command::Pass(credentials.password))?;
            if !pass.is_success() {
                return Err(FtpError::UnexpectedResponse(pass));
            }
            Login { user, pass }
        };
        debug!("Login OK");
        self.authenticated = true;
        self.keepalive = KeepAlive::start(
            Arc::clone(&self.control),
            self.config.keepalive,
            self.events.clone(),
        )?;
        Ok(login)
    }

    /// Gets the current directory
    pub fn pwd(&mut self) -> FtpResult<WorkingDirectory> {
        self.require_auth()?;
        debug!("Getting working directory");
        let response = self.simple(Command::Pwd)?;
        let path = PWD_RE
            .captures(response.first_line())
            .map(|caps| caps[1].replace("\"\"", "\""));
        Ok(WorkingDirectory { path, response })
    }

    /// Change the current directory to the path specified.
    pub fn cwd(&mut self, path: &str) -> FtpResult<Response> {
        self.require_auth()?;
        debug!("Changing working directory to {path}");
        self.simple(Command::Cwd(path.to_string()))
    }

    /// Move the current directory to the parent directory.
    pub fn cdup(&mut self) -> FtpResult<Response> {
        self.require_auth()?;
        debug!("Going to parent directory");
        self.simple(Command::Cdup)
    }

    /// Server status, or status of `path`
    pub fn stat(&mut self, path: Option<&str>) -> FtpResult<Response> {
        self.simple(Command::Stat(path.map(str::to_string)))
    }

    /// Help text of the server
    pub fn server_help(&mut self) -> FtpResult<Response> {
        self.simple(Command::Help)
    }

    /// This does nothing. This is usually just used to keep the connection open.
    pub fn noop(&mut self) -> FtpResult<Response> {
        debug!("Pinging server");
        self.simple(Command::Noop)
    }

    /// Enter passive mode; the announced address is kept for the next transfer
    pub fn pasv(&mut self) -> FtpResult<Response> {
        self.require_auth()?;
        self.data_address = None;
        let response = self.simple(Command::Pasv)?;
        // PASV response format : 227 Entering Passive Mode (h1,h2,h3,h4,p1,p2).
        let addr = parse_pasv_address(response.first_line())?;
        debug!("Data address set to {addr}");
        self.data_address = Some(addr);
        Ok(response)
    }

    /// Enter extended passive mode; the port is joined with the control channel peer
    pub fn epsv(&mut self) -> FtpResult<Response> {
        self.require_auth()?;
        self.data_address = None;
        let (response, peer) = {
            let mut channel = lock(&self.control);
            let response = expect_success(channel.exchange(Command::Epsv)?)?;
            (response, channel.peer_addr().ip())
        };
        let addr = parse_epsv_address(response.first_line(), peer)?;
        debug!("Data address set to {addr}");
        self.data_address = Some(addr);
        Ok(response)
    }

    /// Retrieves the size of the file in bytes at `path`
    pub fn size(&mut self, path: &str) -> FtpResult<u64> {
        self.require_auth()?;
        size_on(&mut lock(&self.control), path)
    }

    /// List `path`, or the working directory, handing every line to `on_line`
    pub fn list<F>(&mut self, path: Option<&str>, on_line: F) -> FtpResult<TransferOutcome>
    where
        F: FnMut(&str),
    {
        self.require_auth()?;
        let addr = self.take_data_address()?;
        let timeout = self.config.timeouts.data_connect;
        let mut channel = lock(&self.control);
        run_transfer(
            &mut channel,
            addr,
            timeout,
            Command::List(path.map(str::to_string)),
            |data| data.stream_lines(on_line),
        )
    }

    /// Download `remote` into the download directory, under its final path component.
    ///
    /// The size is probed first; when SIZE fails the transfer goes on with an unknown total.
    pub fn retrieve<P>(&mut self, remote: &str, progress: P) -> FtpResult<Retrieval>
    where
        P: FnMut(Progress),
    {
        self.require_auth()?;
        self.require_data_address()?;
        let file_name = Path::new(remote).file_name().ok_or_else(|| {
            FtpError::InvalidArgument(format!("{remote} doesn't name a file"))
        })?;
        let local_path = self.config.download_dir.join(file_name);
        let timeout = self.config.timeouts.data_connect;

        let control = Arc::clone(&self.control);
        let mut channel = lock(&control);
        let (total, size_warning) = match size_on(&mut channel, remote) {
            Ok(size) => (size, None),
            Err(err) => {
                warn!("could not get file size of {remote}: {err}");
                (0, Some(err))
            }
        };
        let addr = self.take_data_address()?;
        let outcome = run_transfer(
            &mut channel,
            addr,
            timeout,
            Command::Retr(remote.to_string()),
            |data| {
                let mut file = File::create(&local_path).map_err(|source| FtpError::LocalFile {
                    path: local_path.clone(),
                    source,
                })?;
                data.download(&mut file, total, progress)
            },
        )?;
        info!(
            "Downloaded {remote} to {} ({} bytes)",
            local_path.display(),
            outcome.bytes
        );
        Ok(Retrieval {
            local_path,
            total,
            size_warning,
            outcome,
        })
    }

    /// Upload the local file at `local`, as `remote` or under the local file name
    pub fn store<P>(&mut self, local: &Path, remote: Option<&str>, progress: P) -> FtpResult<Upload>
    where
        P: FnMut(Progress),
    {
        self.require_auth()?;
        self.require_data_address()?;
        let remote_name = match remote {
            Some(remote) => remote.to_string(),
            None => local
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .ok_or_else(|| {
                    FtpError::InvalidArgument(format!("{} doesn't name a file", local.display()))
                })?,
        };
        let local_file_error = |source| FtpError::LocalFile {
            path: local.to_path_buf(),
            source,
        };
        let mut file = File::open(local).map_err(local_file_error)?;
        let total = file.metadata().map_err(local_file_error)?.len();

        let addr = self.take_data_address()?;
        let timeout = self.config.timeouts.data_connect;
        let mut channel = lock(&self.control);
        let outcome = run_transfer(
            &mut channel,
            addr,
            timeout,
            Command::Store(remote_name.clone()),
            |data| data.upload(&mut file, total, progress),
        )?;
        info!("Uploaded {} as {remote_name} ({} bytes)", local.display(), outcome.bytes);
        Ok(Upload {
            remote_name,
            total,
            outcome,
        })
    }

    /// Stop the keep-alive, say goodbye and close the control connection.
    ///
    /// The connection is closed even if QUIT fails.
    pub fn quit(&mut self) -> FtpResult<Response> {
        self.keepalive.stop();
        let result = lock(&self.control)
            .exchange(Command::Quit)
            .and_then(expect_success);
        self.close();
        result
    }

    /// Stop the keep-alive and close the control connection. Calling it twice is harmless.
    pub fn close(&mut self) {
        self.keepalive.stop();
        self.authenticated = false;
        self.data_address = None;
        if self.closed {
            return;
        }
        if let Err(err) = lock(&self.control).shutdown() {
            warn!("failed to close control connection: {err}");
        }
        self.closed = true;
    }

    // -- private

    fn require_auth(&self) -> FtpResult<()> {
        if self.authenticated {
            Ok(())
        } else {
            Err(FtpError::NotAuthenticated)
        }
    }

    fn require_data_address(&self) -> FtpResult<SocketAddr> {
        self.data_address.ok_or(FtpError::NoDataAddress)
    }

    fn take_data_address(&mut self) -> FtpResult<SocketAddr> {
        self.data_address.take().ok_or(FtpError::NoDataAddress)
    }

    /// Exchange a command which must be answered with a positive completion
    fn simple(&mut self, command: Command) -> FtpResult<Response> {
        let response = lock(&self.control).exchange(command)?;
        expect_success(response)
    }
}

fn expect_success(response: Response) -> FtpResult<Response> {
    if response.is_success() {
        Ok(response)
    } else {
        Err(FtpError::UnexpectedResponse(response))
    }
}

/// SIZE must be answered with 213 and a number
fn size_on(channel: &mut ControlChannel, path: &str) -> FtpResult<u64> {
    debug!("Getting file size for {path}");
    let response = channel.exchange(Command::Size(path.to_string()))?;
    if response.status != Status::File {
        return Err(FtpError::UnexpectedResponse(response));
    }
    SIZE_RE
        .captures(response.first_line())
        .and_then(|caps| caps[1].parse::<u64>().ok())
        .ok_or_else(|| {
            FtpError::BadResponse(format!("invalid SIZE reply: {}", response.first_line()))
        })
}

/// Run a data transfer: connect to `addr`, send `command`, let `body` move the data,
/// then close the data connection and read the closing status.
///
/// When `body` fails, the closing status is still consumed, so the next reply on the control
/// channel belongs to the next command.
fn run_transfer<F>(
    channel: &mut ControlChannel,
    addr: SocketAddr,
    timeout: Duration,
    command: Command,
    body: F,
) -> FtpResult<TransferOutcome>
where
    F: FnOnce(&mut DataChannel) -> FtpResult<u64>,
{
    let mut data = DataChannel::open(addr, timeout)?;
    let opening = channel.exchange(command)?;
    if !matches!(opening.status, Status::AboutToSend | Status::AlreadyOpen) {
        if let Err(err) = data.close() {
            debug!("failed to close unused data connection: {err}");
        }
        return Err(FtpError::UnexpectedResponse(opening));
    }
    trace!("Transfer started: {opening}");
    let result = body(&mut data);
    if let Err(err) = data.close() {
        warn!("failed to close data connection: {err}");
    }
    match result {
        Ok(bytes) => {
            let completion = read_closing_status(channel)?;
            Ok(TransferOutcome {
                opening,
                bytes,
                completion,
            })
        }
        Err(err) => {
            match read_closing_status(channel) {
                Ok(completion) => warn!(
                    "transfer failed; server closed it with {}",
                    completion.response()
                ),
                Err(closing) => warn!("transfer failed; closing status: {closing}"),
            }
            Err(err)
        }
    }
}
