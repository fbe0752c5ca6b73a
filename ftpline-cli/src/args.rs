use std::path::PathBuf;

use argh::FromArgs;

#[derive(FromArgs)]
#[argh(description = "Interactive FTP client.
Type `help` at the prompt to list the available commands.")]
pub struct Args {
    #[argh(switch, short = 'D', description = "enable TRACE log level")]
    pub debug: bool,
    #[argh(switch, short = 'v', description = "verbose mode")]
    pub verbose: bool,
    #[argh(switch, short = 'V', description = "print version")]
    pub version: bool,
    #[argh(
        option,
        short = 'u',
        default = "String::from(\"anonymous\")",
        description = "username (default: anonymous)"
    )]
    pub user: String,
    #[argh(
        option,
        short = 'p',
        description = "password; prompted for when omitted"
    )]
    pub password: Option<String>,
    #[argh(option, short = 'P', description = "control port (default: 2121)")]
    pub port: Option<u16>,
    #[argh(
        option,
        short = 'd',
        description = "directory where retrieved files are written (default: current directory)"
    )]
    pub download_dir: Option<PathBuf>,
    #[argh(
        option,
        short = 'k',
        description = "keep-alive interval in seconds (default: 30)"
    )]
    pub keepalive: Option<u64>,
    #[argh(positional, description = "host to connect to")]
    pub host: Option<String>,
}
