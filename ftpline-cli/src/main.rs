//! # ftpline Client
//!
//! Interactive FTP client: connects to one server, then reads commands from stdin until `quit`,
//! the end of input or the loss of the connection.
//!

// -- mods
mod args;

use std::io;
use std::process::ExitCode;
use std::sync::mpsc;
use std::time::Duration;

use args::Args;
use env_logger::Builder as LogBuilder;
use ftpline::{
    spawn_input_reader, CommandTable, Config, Exit, KeepAliveConfig, Repl, Session,
};
use log::LevelFilter;

const APP_VERSION: &str = env!("CARGO_PKG_VERSION");
const APP_AUTHORS: &str = env!("CARGO_PKG_AUTHORS");

fn main() -> ExitCode {
    let args: Args = argh::from_env();
    // print version
    if args.version {
        println!("ftpline {APP_VERSION} - developed by {APP_AUTHORS}");
        return ExitCode::SUCCESS;
    }
    // init logger
    LogBuilder::new()
        .filter_level(if args.debug {
            LevelFilter::Trace
        } else if args.verbose {
            LevelFilter::Info
        } else {
            LevelFilter::Off
        })
        .init();

    let Some(host) = args.host.as_deref() else {
        eprintln!("Missing host: run `ftpline --help` for usage");
        return ExitCode::FAILURE;
    };
    let password = match args.password.clone() {
        Some(password) => password,
        None => match rpassword::prompt_password("Password: ") {
            Ok(p) => p,
            Err(err) => {
                eprintln!("Failed to read password: {err}");
                return ExitCode::FAILURE;
            }
        },
    };
    let config = configure(&args, host, &password);

    println!("Attempting to create FTP connection to: {}", config.address());
    let (events_tx, events_rx) = mpsc::channel();
    let mut session = match Session::connect(config, events_tx.clone()) {
        Ok(session) => session,
        Err(err) => {
            eprintln!("Failed to connect to remote: {err}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(err) = spawn_input_reader(io::BufReader::new(io::stdin()), events_tx) {
        eprintln!("Failed to read stdin: {err}");
        session.close();
        return ExitCode::FAILURE;
    }

    let mut repl = Repl::new(CommandTable::standard(), io::stdout());
    match repl.run(&mut session, &events_rx) {
        Exit::Quit | Exit::InputClosed => ExitCode::SUCCESS,
        Exit::ConnectionLost => ExitCode::FAILURE,
    }
}

fn configure(args: &Args, host: &str, password: &str) -> Config {
    let mut config = Config::new(host, args.user.as_str(), password);
    if let Some(port) = args.port {
        config = config.with_port(port);
    }
    if let Some(dir) = &args.download_dir {
        config = config.with_download_dir(dir);
    }
    if let Some(seconds) = args.keepalive {
        config = config.with_keepalive(KeepAliveConfig {
            interval: Duration::from_secs(seconds),
            ..KeepAliveConfig::default()
        });
    }
    config
}
