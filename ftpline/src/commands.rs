//! # Commands
//!
//! The table of interactive commands: a word, its usage, its help text and the handler running it.

use std::collections::BTreeMap;
use std::fmt;
use std::io::Write;
use std::path::Path;

use super::data_stream::{Completion, Progress, TransferOutcome};
use super::session::Session;
use super::types::{FtpError, FtpResult};

/// What the driver does after a command
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue,
    Quit,
}

/// Runs a command with the words following the command word; output goes to the writer
pub type Handler = fn(&mut Session, &[String], &mut dyn Write) -> FtpResult<Flow>;

/// A command of the table
#[derive(Clone)]
pub struct CommandSpec {
    /// Command word, lowercase
    pub name: &'static str,
    /// Name and arguments, as shown by help
    pub usage: &'static str,
    pub description: &'static str,
    pub handler: Handler,
}

impl fmt::Debug for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandSpec")
            .field("name", &self.name)
            .field("usage", &self.usage)
            .finish()
    }
}

/// Commands available at the prompt, sorted by name
#[derive(Debug, Default, Clone)]
pub struct CommandTable {
    commands: BTreeMap<&'static str, CommandSpec>,
}

impl CommandTable {
    /// An empty table
    pub fn new() -> Self {
        Self::default()
    }

    /// The commands of the interactive client
    pub fn standard() -> Self {
        Self::new()
            .with("auth", "auth", "Authenticate with saved username and password.", auth)
            .with("cdup", "cdup", "Change working directory to parent directory.", cdup)
            .with(
                "cwd",
                "cwd <pathname>",
                "Change the working directory with desired directory as argument.",
                cwd,
            )
            .with("epsv", "epsv", "Enter into EPSV mode.", epsv)
            .with(
                "list",
                "list [pathname]",
                "Fetch list from server to the passive DTP.",
                list,
            )
            .with("noop", "noop", "Ping the server.", noop)
            .with(
                "pasv",
                "pasv",
                "Request server-DTP to \"listen\" on a data port (which is not its default data port) and to wait for a connection.",
                pasv,
            )
            .with("pwd", "pwd", "Print working directory.", pwd)
            .with("quit", "quit", "Exit the client.", quit)
            .with(
                "retr",
                "retr <pathname>",
                "Transfer a copy of the file specified in the pathname from server-DTP.",
                retr,
            )
            .with(
                "serverhelp",
                "serverhelp",
                "Display a help message from the server.",
                serverhelp,
            )
            .with("size", "size <pathname>", "Display size of file on server.", size)
            .with(
                "stat",
                "stat [pathname]",
                "Receive status of the server, or of the pathname.",
                stat,
            )
            .with(
                "stor",
                "stor <filename> [remote name]",
                "Upload a file to the server.",
                stor,
            )
    }

    /// Add a command, replacing any command with the same name
    pub fn with(
        mut self,
        name: &'static str,
        usage: &'static str,
        description: &'static str,
        handler: Handler,
    ) -> Self {
        self.register(CommandSpec {
            name,
            usage,
            description,
            handler,
        });
        self
    }

    pub fn register(&mut self, spec: CommandSpec) {
        self.commands.insert(spec.name, spec);
    }

    /// Look up a command by its (lowercase) name
    pub fn get(&self, name: &str) -> Option<&CommandSpec> {
        self.commands.get(name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommandSpec> {
        self.commands.values()
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

/// Write a line of output; a broken terminal is only logged
pub(crate) fn emit(out: &mut dyn Write, line: impl fmt::Display) {
    if let Err(err) = writeln!(out, "{line}").and_then(|_| out.flush()) {
        error!("failed to write output: {err}");
    }
}

fn first<'a>(args: &'a [String], what: &'static str) -> FtpResult<&'a str> {
    args.first()
        .map(String::as_str)
        .ok_or(FtpError::MissingArgument(what))
}

/// Prints progress on a single line, rewritten at every report
struct ProgressPrinter<'a> {
    out: &'a mut dyn Write,
    printed: bool,
}

impl<'a> ProgressPrinter<'a> {
    fn new(out: &'a mut dyn Write) -> Self {
        Self {
            out,
            printed: false,
        }
    }

    fn report(&mut self, progress: Progress) {
        self.printed = true;
        if let Err(err) = write!(self.out, "\r{progress}").and_then(|_| self.out.flush()) {
            error!("failed to write progress: {err}");
        }
    }

    /// Terminate the progress line, if any
    fn finish(self) {
        if self.printed {
            emit(self.out, "");
        }
    }
}

fn print_completion(out: &mut dyn Write, outcome: &TransferOutcome) {
    match &outcome.completion {
        Completion::Clean(response) => emit(out, response.as_string()),
        Completion::Warning(_) => emit(
            out,
            "WARNING - transfer complete, but data connection didn't close gracefully",
        ),
    }
}

// -- handlers

fn auth(session: &mut Session, _args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    let login = session.login()?;
    emit(out, login.user.as_string());
    emit(out, login.pass.as_string());
    Ok(Flow::Continue)
}

fn pwd(session: &mut Session, _args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    emit(out, session.pwd()?.response.as_string());
    Ok(Flow::Continue)
}

fn cwd(session: &mut Session, args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    let path = first(args, "a destination directory")?;
    emit(out, session.cwd(path)?.as_string());
    Ok(Flow::Continue)
}

fn cdup(session: &mut Session, _args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    emit(out, session.cdup()?.as_string());
    Ok(Flow::Continue)
}

fn pasv(session: &mut Session, _args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    emit(out, session.pasv()?.as_string());
    Ok(Flow::Continue)
}

fn epsv(session: &mut Session, _args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    emit(out, session.epsv()?.as_string());
    Ok(Flow::Continue)
}

fn list(session: &mut Session, args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    let path = args.first().map(String::as_str);
    let outcome = session.list(path, |line| emit(&mut *out, line))?;
    print_completion(out, &outcome);
    Ok(Flow::Continue)
}

fn retr(session: &mut Session, args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    let remote = first(args, "the path of the file to retrieve")?;
    let mut printer = ProgressPrinter::new(&mut *out);
    let result = session.retrieve(remote, |progress| printer.report(progress));
    printer.finish();
    let retrieval = result?;
    if let Some(err) = &retrieval.size_warning {
        emit(out, format!("Warning: could not get file size - {err}"));
    }
    emit(
        out,
        format!(
            "Downloaded {} ({} bytes)",
            retrieval.local_path.display(),
            retrieval.outcome.bytes
        ),
    );
    print_completion(out, &retrieval.outcome);
    Ok(Flow::Continue)
}

fn stor(session: &mut Session, args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    let local = first(args, "the file to upload")?;
    let remote = args.get(1).map(String::as_str);
    let mut printer = ProgressPrinter::new(&mut *out);
    let result = session.store(Path::new(local), remote, |progress| printer.report(progress));
    printer.finish();
    let upload = result?;
    emit(
        out,
        format!(
            "Uploaded {local} as {} ({} bytes)",
            upload.remote_name, upload.outcome.bytes
        ),
    );
    print_completion(out, &upload.outcome);
    Ok(Flow::Continue)
}

fn size(session: &mut Session, args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    let path = first(args, "a filename")?;
    emit(out, format!("File size: {} bytes", session.size(path)?));
    Ok(Flow::Continue)
}

fn stat(session: &mut Session, args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    let path = args.first().map(String::as_str);
    emit(out, session.stat(path)?.as_string());
    Ok(Flow::Continue)
}

fn serverhelp(session: &mut Session, _args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    emit(out, session.server_help()?.as_string());
    Ok(Flow::Continue)
}

fn noop(session: &mut Session, _args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    emit(out, session.noop()?.as_string());
    Ok(Flow::Continue)
}

/// The session ends even when QUIT fails
fn quit(session: &mut Session, _args: &[String], out: &mut dyn Write) -> FtpResult<Flow> {
    emit(out, "Goodbye!");
    match session.quit() {
        Ok(response) => emit(out, response.as_string()),
        Err(err) => emit(out, format!("Error: quit: {err}")),
    }
    Ok(Flow::Quit)
}

#[cfg(test)]
mod test {

    use std::sync::mpsc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::Config;
    use crate::test_server::{generate_tempdir, MockServer};

    fn run(
        session: &mut Session,
        table: &CommandTable,
        name: &str,
        args: &[&str],
    ) -> (FtpResult<Flow>, String) {
        let args: Vec<String> = args.iter().map(|x| x.to_string()).collect();
        let mut out = Vec::new();
        let flow = (table.get(name).unwrap().handler)(session, &args, &mut out);
        (flow, String::from_utf8(out).unwrap())
    }

    #[test]
    fn should_build_standard_table() {
        let table = CommandTable::standard();
        let names: Vec<&str> = table.iter().map(|x| x.name).collect();
        assert_eq!(
            names,
            vec![
                "auth",
                "cdup",
                "cwd",
                "epsv",
                "list",
                "noop",
                "pasv",
                "pwd",
                "quit",
                "retr",
                "serverhelp",
                "size",
                "stat",
                "stor"
            ]
        );
        assert_eq!(table.len(), 14);
        assert_eq!(table.get("cwd").unwrap().usage, "cwd <pathname>");
        assert!(table.get("help").is_none());
        assert!(table.get("CWD").is_none());
    }

    #[test]
    fn should_replace_command_with_same_name() {
        fn nothing(_: &mut Session, _: &[String], _: &mut dyn Write) -> FtpResult<Flow> {
            Ok(Flow::Continue)
        }
        let table = CommandTable::new()
            .with("x", "x", "first", nothing)
            .with("x", "x <y>", "second", nothing);
        assert_eq!(table.len(), 1);
        assert_eq!(table.get("x").unwrap().description, "second");
        assert!(CommandTable::new().is_empty());
    }

    #[test]
    fn should_check_arguments_before_talking_to_server() {
        crate::log_init();
        let server = MockServer::start(|conn| conn.recv());
        let (tx, _rx) = mpsc::channel();
        let mut session = Session::connect(
            Config::new("127.0.0.1", "test", "test").with_port(server.addr().port()),
            tx,
        )
        .unwrap();
        let table = CommandTable::standard();
        for (name, what) in [
            ("cwd", "a destination directory"),
            ("retr", "the path of the file to retrieve"),
            ("stor", "the file to upload"),
            ("size", "a filename"),
        ] {
            match run(&mut session, &table, name, &[]) {
                (Err(FtpError::MissingArgument(missing)), output) => {
                    assert_eq!(missing, what);
                    assert!(output.is_empty());
                }
                (other, _) => panic!("expected missing argument, got {other:?}"),
            }
        }
        session.close();
        assert_eq!(server.join().as_str(), "");
    }

    #[test]
    fn should_print_transfer_progress() {
        crate::log_init();
        let server = MockServer::start(|conn| {
            conn.login();
            conn.passive();
            conn.expect("SIZE notes.txt");
            conn.reply("213 5");
            conn.expect("RETR notes.txt");
            let mut data = conn.accept_data();
            conn.reply("150 Opening BINARY mode data connection for notes.txt (5 bytes).");
            data.write_all(b"hello").unwrap();
            drop(data);
            conn.reply("226 Transfer complete.");
            conn.expect("QUIT");
            conn.reply("221 Goodbye.");
        });
        let download_dir = generate_tempdir();
        let (tx, _rx) = mpsc::channel();
        let mut session = Session::connect(
            Config::new("127.0.0.1", "test", "test")
                .with_port(server.addr().port())
                .with_download_dir(&download_dir),
            tx,
        )
        .unwrap();
        let table = CommandTable::standard();
        let (flow, output) = run(&mut session, &table, "auth", &[]);
        assert_eq!(flow.unwrap(), Flow::Continue);
        assert_eq!(output.as_str(), "331 Need password\n230 Logged in\n");
        run(&mut session, &table, "pasv", &[]).0.unwrap();
        let (flow, output) = run(&mut session, &table, "retr", &["notes.txt"]);
        assert_eq!(flow.unwrap(), Flow::Continue);
        let expected = format!(
            "\rProgress: 5/5 bytes (100.0%)\nDownloaded {} (5 bytes)\n226 Transfer complete.\n",
            download_dir.join("notes.txt").display()
        );
        assert_eq!(output, expected);
        let (flow, output) = run(&mut session, &table, "quit", &[]);
        assert_eq!(flow.unwrap(), Flow::Quit);
        assert_eq!(output.as_str(), "Goodbye!\n221 Goodbye.\n");
        server.join();
        std::fs::remove_dir_all(download_dir).unwrap();
    }

    #[test]
    fn should_quit_even_if_server_refuses() {
        crate::log_init();
        let server = MockServer::start(|conn| {
            conn.expect("QUIT");
            conn.reply("500 What?");
        });
        let (tx, _rx) = mpsc::channel();
        let mut session = Session::connect(
            Config::new("127.0.0.1", "test", "test").with_port(server.addr().port()),
            tx,
        )
        .unwrap();
        let (flow, output) = run(&mut session, &CommandTable::standard(), "quit", &[]);
        assert_eq!(flow.unwrap(), Flow::Quit);
        assert!(output.starts_with("Goodbye!\nError: quit: Invalid response: [500]"));
        server.join();
    }
}
