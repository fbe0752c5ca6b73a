//! # FTP Regex
//!
//! Regular expressions to parse FTP response

use lazy_regex::{Lazy, Regex};

/// This regex extracts file size from SIZE command response.
pub static SIZE_RE: Lazy<Regex> = lazy_regex!(r"^\d{3}\s+(\d+)\s*$");

/// This regex extracts the quoted directory from a PWD response.
pub static PWD_RE: Lazy<Regex> = lazy_regex!(r#""((?:[^"]|"")*)""#);
