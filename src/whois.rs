//! WHOIS passthrough for relay addresses.
//!
//! The details page links every relay address to a WHOIS lookup. The lookup
//! itself is delegated to a [`WhoisClient`]; [`SystemWhois`] runs the local
//! `whois` executable.
//!
//! The address is validated before any client runs, and the executable is
//! started directly with the address as its only argument. No shell is
//! involved, so visitor input never reaches a command line.
//!
//! # Example
//!
//! ```rust,no_run
//! use torstatus_rs::whois::{lookup, SystemWhois};
//!
//! # async fn example() -> Result<(), torstatus_rs::Error> {
//! let report = lookup(&SystemWhois::default(), "128.31.0.34").await?;
//! println!("{}", report.whois);
//! # Ok(())
//! # }
//! ```

use std::net::Ipv4Addr;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::config::StatusConfig;
use crate::util::parse_ipv4_address;
use crate::Error;

/// Text shown instead of WHOIS output when the address doesn't parse.
pub const UNPARSABLE_ADDRESS: &str = "Unparsable IP address supplied.";

/// Source of WHOIS records.
#[async_trait]
pub trait WhoisClient: Send + Sync {
    /// Returns the WHOIS record of `address` as text.
    async fn query(&self, address: Ipv4Addr) -> Result<String, Error>;
}

/// Runs a local WHOIS executable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemWhois {
    command: String,
}

impl SystemWhois {
    /// Creates a client running `command`.
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    /// Creates a client running the configured executable.
    pub fn from_config(config: &StatusConfig) -> Self {
        Self::new(config.whois_command.clone())
    }

    /// The executable this client runs.
    pub fn command(&self) -> &str {
        &self.command
    }
}

impl Default for SystemWhois {
    fn default() -> Self {
        Self::from_config(&StatusConfig::default())
    }
}

#[async_trait]
impl WhoisClient for SystemWhois {
    async fn query(&self, address: Ipv4Addr) -> Result<String, Error> {
        let output = Command::new(&self.command)
            .arg(address.to_string())
            .output()
            .await?;

        // whois exits non-zero for many registries that still answer
        if !output.status.success() {
            debug!("{} {} exited with {}", self.command, address, output.status);
            if output.stdout.is_empty() {
                let stderr = String::from_utf8_lossy(&output.stderr);
                return Err(Error::Whois(stderr.trim().to_string()));
            }
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// WHOIS page data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WhoisReport {
    /// Address as supplied.
    pub address: String,
    /// Whether `address` parsed as IPv4.
    pub address_valid: bool,
    /// WHOIS record, or [`UNPARSABLE_ADDRESS`].
    pub whois: String,
}

/// Looks up the WHOIS record of `raw_address`.
///
/// An unparsable address produces a report carrying [`UNPARSABLE_ADDRESS`]
/// without contacting `client`.
///
/// # Errors
///
/// Returns the client's error if the lookup itself fails.
pub async fn lookup<W: WhoisClient + ?Sized>(
    client: &W,
    raw_address: &str,
) -> Result<WhoisReport, Error> {
    let Ok(address) = parse_ipv4_address(raw_address) else {
        return Ok(WhoisReport {
            address: raw_address.to_string(),
            address_valid: false,
            whois: UNPARSABLE_ADDRESS.to_string(),
        });
    };

    let whois = client.query(address).await?;
    Ok(WhoisReport {
        address: raw_address.to_string(),
        address_valid: true,
        whois,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingWhois {
        queried: Mutex<Vec<Ipv4Addr>>,
    }

    #[async_trait]
    impl WhoisClient for RecordingWhois {
        async fn query(&self, address: Ipv4Addr) -> Result<String, Error> {
            self.queried.lock().unwrap().push(address);
            Ok(format!("NetRange: {}", address))
        }
    }

    #[tokio::test]
    async fn test_unparsable_address_skips_client() {
        let client = RecordingWhois::default();
        let report = lookup(&client, "1.2.3.4; rm -rf /").await.unwrap();

        assert_eq!(report.whois, UNPARSABLE_ADDRESS);
        assert_eq!(report.address, "1.2.3.4; rm -rf /");
        assert!(!report.address_valid);
        assert!(client.queried.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_valid_address_is_queried() {
        let client = RecordingWhois::default();
        let report = lookup(&client, "192.0.2.1").await.unwrap();

        assert!(report.address_valid);
        assert_eq!(report.whois, "NetRange: 192.0.2.1");
        assert_eq!(
            *client.queried.lock().unwrap(),
            vec![Ipv4Addr::new(192, 0, 2, 1)]
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_system_whois_passes_address_as_argument() {
        let client = SystemWhois::new("echo");
        let output = client.query(Ipv4Addr::new(192, 0, 2, 1)).await.unwrap();
        assert_eq!(output.trim(), "192.0.2.1");
    }

    #[tokio::test]
    async fn test_missing_executable() {
        let client = SystemWhois::new("torstatus-no-such-whois-binary");
        let result = client.query(Ipv4Addr::LOCALHOST).await;
        assert!(matches!(result, Err(Error::Io(_))));
    }

    #[test]
    fn test_from_config() {
        let config = StatusConfig::default().with_whois_command("/usr/local/bin/whois");
        assert_eq!(SystemWhois::from_config(&config).command(), "/usr/local/bin/whois");
        assert_eq!(SystemWhois::default().command(), "whois");
    }
}
