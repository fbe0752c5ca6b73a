//! # Address
//!
//! Decoders for the data channel address announced in PASV and EPSV replies

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use super::types::{FtpError, FtpResult};

/// Decode the address of a PASV reply.
///
/// PASV response format: `227 Entering Passive Mode (h1,h2,h3,h4,p1,p2)`.
/// Only the first parenthesized group is considered.
pub fn parse_pasv_address(response: &str) -> FtpResult<SocketAddr> {
    let payload = parenthesized(response)?;
    let fields: Vec<&str> = payload.split(',').map(str::trim).collect();
    if fields.len() != 6 {
        return Err(FtpError::InvalidAddress(format!(
            "expected 6 numbers, got {}",
            fields.len()
        )));
    }
    let mut octets = [0u8; 4];
    for (i, field) in fields[..4].iter().enumerate() {
        octets[i] = field.parse::<u8>().map_err(|_| {
            FtpError::InvalidAddress(format!("invalid IP octet at position {i}: {field}"))
        })?;
    }
    let mut port_bytes = [0u8; 2];
    for (i, field) in fields[4..].iter().enumerate() {
        port_bytes[i] = field.parse::<u8>().map_err(|_| {
            FtpError::InvalidAddress(format!("invalid port byte at position {}: {field}", i + 4))
        })?;
    }
    let port = u16::from(port_bytes[0]) * 256 + u16::from(port_bytes[1]);
    let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::from(octets)), port);
    trace!("Passive address: {addr}");
    Ok(addr)
}

/// Decode the port of an EPSV reply and join it with the control channel peer.
///
/// EPSV response format: `229 Entering Extended Passive Mode (|||port|)`.
/// Only the fourth `|`-delimited field is used; the others are placeholders.
pub fn parse_epsv_address(response: &str, peer: IpAddr) -> FtpResult<SocketAddr> {
    let payload = parenthesized(response)?;
    let fields: Vec<&str> = payload.split('|').collect();
    if fields.len() < 4 {
        return Err(FtpError::InvalidAddress(format!(
            "expected at least 4 '|'-delimited fields, got {}",
            fields.len()
        )));
    }
    let port = fields[3]
        .trim()
        .parse::<u16>()
        .map_err(|_| FtpError::InvalidAddress(format!("invalid port: {}", fields[3])))?;
    let addr = SocketAddr::new(peer, port);
    trace!("Extended passive address: {addr}");
    Ok(addr)
}

/// Interior of the first `(` and the first `)` after it
fn parenthesized(response: &str) -> FtpResult<&str> {
    let (_, after) = response
        .split_once('(')
        .ok_or_else(|| FtpError::InvalidAddress("no opening parenthesis found".to_string()))?;
    let (payload, _) = after
        .split_once(')')
        .ok_or_else(|| FtpError::InvalidAddress("no closing parenthesis found".to_string()))?;
    Ok(payload)
}
