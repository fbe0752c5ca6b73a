//! # Repl
//!
//! The interactive driver: waits for the next session event, runs typed commands through the
//! command table and ends the session on quit, end of input or connection loss.

use std::io::{self, BufRead, Write};
use std::sync::mpsc::{Receiver, Sender};
use std::thread::{self, JoinHandle};

use super::commands::{emit, CommandTable, Flow};
use super::event::SessionEvent;
use super::session::Session;

/// Prompt printed while waiting for input
pub const DEFAULT_PROMPT: &str = "ftpline> ";

/// Why the driver returned
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exit {
    /// The user quit
    Quit,
    /// The input reached its end
    InputClosed,
    /// The server went away
    ConnectionLost,
}

/// Read-dispatch loop over a [`CommandTable`]
pub struct Repl<W>
where
    W: Write,
{
    table: CommandTable,
    out: W,
    prompt: String,
}

impl<W> Repl<W>
where
    W: Write,
{
    pub fn new(table: CommandTable, out: W) -> Self {
        Self {
            table,
            out,
            prompt: DEFAULT_PROMPT.to_string(),
        }
    }

    pub fn with_prompt<S: AsRef<str>>(mut self, prompt: S) -> Self {
        self.prompt = prompt.as_ref().to_string();
        self
    }

    /// Returns a reference to the output
    pub fn get_ref(&self) -> &W {
        &self.out
    }

    /// Print the welcome reply, then process events until the session ends.
    ///
    /// The session is closed on return.
    pub fn run(&mut self, session: &mut Session, events: &Receiver<SessionEvent>) -> Exit {
        emit(&mut self.out, session.welcome().as_string());
        self.print_prompt();
        loop {
            // every sender gone is the same as the end of input
            let event = events.recv().unwrap_or(SessionEvent::InputClosed);
            match event {
                SessionEvent::Input(line) => {
                    if self.dispatch(session, &line) == Flow::Quit {
                        session.close();
                        return Exit::Quit;
                    }
                }
                SessionEvent::InputClosed => {
                    emit(&mut self.out, "\nGoodbye!");
                    session.close();
                    return Exit::InputClosed;
                }
                SessionEvent::KeepAlive(response) => {
                    emit(
                        &mut self.out,
                        format!("\rKeepalive: {}", response.as_string()),
                    );
                }
                SessionEvent::KeepAliveFailed(reason) => {
                    emit(&mut self.out, format!("\nKeepalive failed: {reason}"));
                }
                SessionEvent::ConnectionLost(reason) => {
                    emit(
                        &mut self.out,
                        format!("\n*** Server connection lost: {reason} ***"),
                    );
                    emit(&mut self.out, "*** Shutting down gracefully ***");
                    session.close();
                    return Exit::ConnectionLost;
                }
            }
            self.print_prompt();
        }
    }

    /// Run one input line. The first word, case-insensitive, selects the command.
    pub fn dispatch(&mut self, session: &mut Session, line: &str) -> Flow {
        let mut words = line.split_whitespace();
        let Some(word) = words.next() else {
            return Flow::Continue;
        };
        let args: Vec<String> = words.map(str::to_string).collect();
        let name = word.to_lowercase();
        if name == "help" {
            self.print_help();
            return Flow::Continue;
        }
        let Some(handler) = self.table.get(&name).map(|spec| spec.handler) else {
            emit(&mut self.out, "Unknown command");
            return Flow::Continue;
        };
        debug!("running {name} with {} arguments", args.len());
        match handler(session, &args, &mut self.out) {
            Ok(flow) => flow,
            Err(err) => {
                error!("{name} failed: {err}");
                emit(&mut self.out, format!("Error: {name}: {err}"));
                Flow::Continue
            }
        }
    }

    fn print_help(&mut self) {
        emit(&mut self.out, "Supported commands:");
        for spec in self.table.iter() {
            emit(
                &mut self.out,
                format!(" {} - {}", spec.usage, spec.description),
            );
        }
        emit(&mut self.out, " help - Display a help message.");
        emit(&mut self.out, "");
    }

    fn print_prompt(&mut self) {
        if let Err(err) = write!(self.out, "{}", self.prompt).and_then(|_| self.out.flush()) {
            error!("failed to write prompt: {err}");
        }
    }
}

/// Forward every line of `input` to `events` as [`SessionEvent::Input`] on a dedicated thread.
///
/// [`SessionEvent::InputClosed`] is sent once the input ends or fails.
pub fn spawn_input_reader<R>(input: R, events: Sender<SessionEvent>) -> io::Result<JoinHandle<()>>
where
    R: BufRead + Send + 'static,
{
    thread::Builder::new()
        .name("input".to_string())
        .spawn(move || {
            for line in input.lines() {
                match line {
                    Ok(line) => {
                        if events.send(SessionEvent::Input(line)).is_err() {
                            // driver is gone
                            return;
                        }
                    }
                    Err(err) => {
                        error!("failed to read input: {err}");
                        break;
                    }
                }
            }
            let _ = events.send(SessionEvent::InputClosed);
        })
}
