//! Validation helpers for visitor input.
//!
//! Page handlers receive raw strings from the HTTP layer. These functions
//! decide whether such a string is usable, and the `parse_*` variants turn it
//! into a typed value or an [`Error::InvalidInput`] that keeps the raw text for
//! display.
//!
//! # Example
//!
//! ```rust
//! use torstatus_rs::util::{is_valid_fingerprint, is_valid_ipv4_address, parse_port};
//!
//! assert!(is_valid_fingerprint("9695DFC35FFEB861329B9F1AB04C46397020CE31"));
//! assert!(is_valid_ipv4_address("128.31.0.34"));
//! assert_eq!(parse_port("443").unwrap(), 443);
//! assert!(parse_port("0").is_err());
//! ```

use std::net::Ipv4Addr;

use crate::Error;

/// Validates a relay fingerprint: exactly 40 hexadecimal characters.
///
/// ```rust
/// use torstatus_rs::util::is_valid_fingerprint;
///
/// assert!(is_valid_fingerprint("9695dfc35ffeb861329b9f1ab04c46397020ce31"));
/// assert!(!is_valid_fingerprint("$9695DFC35FFEB861329B9F1AB04C46397020CE31"));
/// assert!(!is_valid_fingerprint("9695DFC35FFEB861329B9F1AB04C4639702"));
/// ```
pub fn is_valid_fingerprint(s: &str) -> bool {
    s.len() == 40 && s.chars().all(|c| c.is_ascii_hexdigit())
}

/// Validates a dotted-quad IPv4 address.
///
/// Octets with leading zeros are refused, since they are read as octal by
/// some tools.
///
/// ```rust
/// use torstatus_rs::util::is_valid_ipv4_address;
///
/// assert!(is_valid_ipv4_address("0.0.0.0"));
/// assert!(is_valid_ipv4_address("255.255.255.255"));
///
/// assert!(!is_valid_ipv4_address("256.0.0.1"));
/// assert!(!is_valid_ipv4_address("01.02.03.04"));
/// assert!(!is_valid_ipv4_address("127.0.0"));
/// assert!(!is_valid_ipv4_address(" 127.0.0.1"));
/// ```
pub fn is_valid_ipv4_address(s: &str) -> bool {
    let parts: Vec<&str> = s.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    for part in &parts {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return false;
        }
        if part.len() > 1 && part.starts_with('0') {
            return false;
        }
        if part.parse::<u8>().is_err() {
            return false;
        }
    }
    true
}

/// Parses a dotted-quad IPv4 address.
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] carrying `s` if it is not a valid address.
pub fn parse_ipv4_address(s: &str) -> Result<Ipv4Addr, Error> {
    if !is_valid_ipv4_address(s) {
        return Err(Error::invalid_input(s, "not a valid IPv4 address"));
    }
    s.parse()
        .map_err(|_| Error::invalid_input(s, "not a valid IPv4 address"))
}

/// Parses a destination port string (1-65535).
///
/// ```rust
/// use torstatus_rs::util::parse_port;
///
/// assert_eq!(parse_port("80").unwrap(), 80);
/// assert_eq!(parse_port("65535").unwrap(), 65535);
///
/// assert!(parse_port("0").is_err());
/// assert!(parse_port("65536").is_err());
/// assert!(parse_port("http").is_err());
/// assert!(parse_port("").is_err());
/// ```
///
/// # Errors
///
/// Returns [`Error::InvalidInput`] carrying `s` if it is non-numeric or
/// outside 1-65535.
pub fn parse_port(s: &str) -> Result<u16, Error> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return Err(Error::invalid_input(s, "port must be numeric"));
    }
    match s.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(Error::invalid_input(s, "port must be 1-65535")),
    }
}
