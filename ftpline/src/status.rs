//! # Status
//!
//! Reply codes the client knows by name, and the reply classes derived from the first digit

use thiserror::Error;

#[derive(Debug, Copy, Clone, Error, PartialEq, Eq, PartialOrd, Ord)]
#[repr(u32)]
/// Reply codes known by name
pub enum Status {
    // 1xx
    #[error("restart marker")]
    RestartMarker = 110,
    #[error("service not ready yet")]
    ReadyMinute = 120,
    #[error("transfer starting on the open data connection")]
    AlreadyOpen = 125,
    #[error("opening data connection")]
    AboutToSend = 150,
    // 2xx
    #[error("ok")]
    CommandOk = 200,
    #[error("command superfluous here")]
    CommandNotImplemented = 202,
    #[error("system status")]
    System = 211,
    #[error("status of a directory")]
    Directory = 212,
    #[error("status of a file")]
    File = 213,
    #[error("help text")]
    Help = 214,
    #[error("system type")]
    Name = 215,
    #[error("ready for a new user")]
    Ready = 220,
    #[error("closing the control connection")]
    Closing = 221,
    #[error("data connection open, no transfer running")]
    DataConnectionOpen = 225,
    #[error("transfer complete, closing data connection")]
    ClosingDataConnection = 226,
    #[error("passive mode entered")]
    PassiveMode = 227,
    #[error("extended passive mode entered")]
    ExtendedPassiveMode = 229,
    #[error("logged in")]
    LoggedIn = 230,
    #[error("file action completed")]
    RequestedFileActionOk = 250,
    #[error("path name reply")]
    PathCreated = 257,
    // 3xx
    #[error("password required")]
    NeedPassword = 331,
    #[error("account required")]
    LoginNeedAccount = 332,
    #[error("file action awaits more information")]
    RequestFilePending = 350,
    // 4xx
    #[error("service unavailable, control connection closing")]
    NotAvailable = 421,
    #[error("data connection could not be opened")]
    CannotOpenDataConnection = 425,
    #[error("data connection closed, transfer aborted")]
    TransferAborted = 426,
    #[error("file action not taken, file busy")]
    RequestFileActionIgnored = 450,
    #[error("action aborted by a local error")]
    ActionAborted = 451,
    // 5xx
    #[error("command not recognized")]
    BadCommand = 500,
    #[error("arguments not recognized")]
    BadArguments = 501,
    #[error("command not implemented")]
    NotImplemented = 502,
    #[error("commands sent in the wrong order")]
    BadSequence = 503,
    #[error("not logged in")]
    NotLoggedIn = 530,
    #[error("file unavailable")]
    FileUnavailable = 550,
    #[error("storage allocation exceeded")]
    ExceededStorage = 552,
    #[error("file name not allowed")]
    BadFilename = 553,
    #[error("unknown status code")]
    Unknown = 0,
}

/// Reply class, given by the first digit of the reply code
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum StatusClass {
    /// 1xx: the action is being started; expect another reply
    PositivePreliminary,
    /// 2xx: the action completed successfully
    PositiveCompletion,
    /// 3xx: the command was accepted but more information is needed
    PositiveIntermediate,
    /// 4xx: the action was not taken, but may succeed if retried
    TransientNegative,
    /// 5xx: the action was not taken
    PermanentNegative,
    /// Anything outside 100..=599
    Unknown,
}

impl Status {
    /// Every named status, in code order
    const KNOWN: [Status; 36] = [
        Status::RestartMarker,
        Status::ReadyMinute,
        Status::AlreadyOpen,
        Status::AboutToSend,
        Status::CommandOk,
        Status::CommandNotImplemented,
        Status::System,
        Status::Directory,
        Status::File,
        Status::Help,
        Status::Name,
        Status::Ready,
        Status::Closing,
        Status::DataConnectionOpen,
        Status::ClosingDataConnection,
        Status::PassiveMode,
        Status::ExtendedPassiveMode,
        Status::LoggedIn,
        Status::RequestedFileActionOk,
        Status::PathCreated,
        Status::NeedPassword,
        Status::LoginNeedAccount,
        Status::RequestFilePending,
        Status::NotAvailable,
        Status::CannotOpenDataConnection,
        Status::TransferAborted,
        Status::RequestFileActionIgnored,
        Status::ActionAborted,
        Status::BadCommand,
        Status::BadArguments,
        Status::NotImplemented,
        Status::BadSequence,
        Status::NotLoggedIn,
        Status::FileUnavailable,
        Status::ExceededStorage,
        Status::BadFilename,
    ];

    /// Numeric reply code
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Human readable description
    pub fn desc(&self) -> String {
        self.to_string()
    }
}

impl StatusClass {
    /// Derive the class of a numeric reply code
    pub fn from_code(code: u32) -> Self {
        match code / 100 {
            1 => Self::PositivePreliminary,
            2 => Self::PositiveCompletion,
            3 => Self::PositiveIntermediate,
            4 => Self::TransientNegative,
            5 => Self::PermanentNegative,
            _ => Self::Unknown,
        }
    }
}

impl From<u32> for Status {
    fn from(code: u32) -> Self {
        Self::KNOWN
            .into_iter()
            .find(|status| status.code() == code)
            .unwrap_or(Self::Unknown)
    }
}
