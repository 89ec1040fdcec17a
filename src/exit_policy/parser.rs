//! Exit policy text parsing.
//!
//! Parsing happens in two steps so each can be tested on its own:
//!
//! 1. [`tokenize`] splits one line into its verdict keyword, network part and
//!    port part without interpreting them.
//! 2. [`build_rule`] turns those tokens into an [`ExitPolicyRule`].
//!
//! The accepted grammar is the IPv4 subset of the descriptor exit policy
//! syntax:
//!
//! ```text
//! rule    = ("accept" | "reject") WS network ":" ports
//! network = "*" | "*4" | ipv4 [ "/" ( prefix | ipv4-mask ) ]
//! ports   = "*" | port | port "-" port
//! ```

use std::net::Ipv4Addr;

use super::matcher::mask_to_prefix;
use super::{ExitPolicyRule, PortRange, Subnet, Verdict};
use crate::Error;

/// The raw pieces of a single policy line.
///
/// Produced by [`tokenize`]; nothing has been validated beyond the shape of
/// the line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RuleTokens<'a> {
    /// The whole trimmed line, kept for error reporting.
    pub line: &'a str,
    /// The verdict keyword, e.g. `accept`.
    pub verdict: &'a str,
    /// Everything before the last `:` of the pattern.
    pub network: &'a str,
    /// Everything after the last `:` of the pattern.
    pub ports: &'a str,
}

/// Splits a policy line into its tokens.
///
/// The line is trimmed and must consist of exactly two whitespace separated
/// tokens. The second token is split on its last `:`.
///
/// # Errors
///
/// Returns [`Error::MalformedPolicy`] if the token count is wrong or the
/// pattern has no `:`.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::parser::tokenize;
///
/// let tokens = tokenize("  reject 10.0.0.0/8:6660-6669 ").unwrap();
/// assert_eq!(tokens.verdict, "reject");
/// assert_eq!(tokens.network, "10.0.0.0/8");
/// assert_eq!(tokens.ports, "6660-6669");
///
/// assert!(tokenize("accept weird").is_err());
/// ```
pub fn tokenize(line: &str) -> Result<RuleTokens<'_>, Error> {
    let line = line.trim();
    let mut words = line.split_whitespace();
    let (Some(verdict), Some(pattern), None) = (words.next(), words.next(), words.next()) else {
        return Err(Error::malformed(
            line,
            "expected '<accept|reject> <address>:<port>'",
        ));
    };

    let Some((network, ports)) = pattern.rsplit_once(':') else {
        return Err(Error::malformed(line, "pattern must be address:port"));
    };

    Ok(RuleTokens {
        line,
        verdict,
        network,
        ports,
    })
}

/// Builds a rule from the tokens of one line.
///
/// # Errors
///
/// Returns [`Error::MalformedPolicy`] if the verdict keyword, the network or
/// the port specification is invalid.
pub fn build_rule(tokens: &RuleTokens<'_>) -> Result<ExitPolicyRule, Error> {
    let verdict = tokens
        .verdict
        .parse::<Verdict>()
        .map_err(|_| Error::malformed(tokens.line, "rule must start with accept or reject"))?;
    let subnet = parse_network(tokens.line, tokens.network)?;
    let ports = parse_ports(tokens.line, tokens.ports)?;

    Ok(ExitPolicyRule {
        verdict,
        subnet,
        ports,
    })
}

/// Parses a single policy line.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::parser::parse_rule;
/// use torstatus_rs::exit_policy::Verdict;
///
/// let rule = parse_rule("accept 192.168.0.0/255.255.0.0:80-443").unwrap();
/// assert_eq!(rule.verdict(), Verdict::Accept);
/// assert_eq!(rule.subnet().prefix_len(), 16);
/// assert_eq!(rule.ports().lo(), 80);
/// ```
pub fn parse_rule(line: &str) -> Result<ExitPolicyRule, Error> {
    build_rule(&tokenize(line)?)
}

/// Parses a whole policy, one rule per line.
///
/// Blank lines are ignored. The returned rules are in the same order as the
/// lines they came from.
///
/// # Errors
///
/// Returns [`Error::MalformedPolicy`] for the first line that does not parse.
/// No line is ever dropped silently.
pub fn parse_policy(raw: &str) -> Result<Vec<ExitPolicyRule>, Error> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_rule)
        .collect()
}

fn parse_network(line: &str, network: &str) -> Result<Subnet, Error> {
    if network == "*" || network == "*4" {
        return Ok(Subnet::any());
    }

    let (addr_part, mask_part) = match network.split_once('/') {
        Some((addr, mask)) => (addr, Some(mask)),
        None => (network, None),
    };

    let base: Ipv4Addr = addr_part
        .parse()
        .map_err(|_| Error::malformed(line, format!("invalid IPv4 address {:?}", addr_part)))?;

    let prefix_len = match mask_part {
        None => 32,
        Some(mask) if is_digits(mask) => match mask.parse::<u8>() {
            Ok(bits) if bits <= 32 => bits,
            _ => return Err(Error::malformed(line, "prefix length must be 0-32")),
        },
        Some(mask) => {
            let mask_addr: Ipv4Addr = mask
                .parse()
                .map_err(|_| Error::malformed(line, format!("invalid mask {:?}", mask)))?;
            mask_to_prefix(mask_addr).ok_or_else(|| {
                Error::malformed(line, "mask cannot be represented as a prefix length")
            })?
        }
    };

    Ok(Subnet { base, prefix_len })
}

fn parse_ports(line: &str, ports: &str) -> Result<PortRange, Error> {
    if ports == "*" {
        return Ok(PortRange::all());
    }

    let (lo, hi) = match ports.split_once('-') {
        Some((lo, hi)) => (parse_port(line, lo)?, parse_port(line, hi)?),
        None => {
            let port = parse_port(line, ports)?;
            (port, port)
        }
    };

    if lo > hi {
        return Err(Error::malformed(line, "min port greater than max port"));
    }
    Ok(PortRange { lo, hi })
}

fn parse_port(line: &str, text: &str) -> Result<u16, Error> {
    if !is_digits(text) {
        return Err(Error::malformed(line, format!("invalid port {:?}", text)));
    }
    match text.parse::<u16>() {
        Ok(port) if port > 0 => Ok(port),
        _ => Err(Error::malformed(line, "port must be 1-65535")),
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tokenize_multiple_spaces() {
        let tokens = tokenize("accept    *:80").unwrap();
        assert_eq!(tokens.verdict, "accept");
        assert_eq!(tokens.network, "*");
        assert_eq!(tokens.ports, "80");
    }

    #[test]
    fn test_tokenize_wrong_token_count() {
        assert!(tokenize("accept").is_err());
        assert!(tokenize("accept *:80 extra").is_err());
        assert!(tokenize("").is_err());
    }

    #[test]
    fn test_tokenize_splits_on_last_colon() {
        let tokens = tokenize("accept a:b:80").unwrap();
        assert_eq!(tokens.network, "a:b");
        assert_eq!(tokens.ports, "80");
    }

    #[test]
    fn test_network_forms() {
        let rule = parse_rule("accept *:*").unwrap();
        assert_eq!(rule.subnet().prefix_len(), 0);

        let rule = parse_rule("accept *4:*").unwrap();
        assert_eq!(rule.subnet().prefix_len(), 0);

        let rule = parse_rule("accept 1.2.3.4:*").unwrap();
        assert_eq!(rule.subnet().prefix_len(), 32);
        assert_eq!(rule.subnet().base(), Ipv4Addr::new(1, 2, 3, 4));

        let rule = parse_rule("accept 10.0.0.0/8:*").unwrap();
        assert_eq!(rule.subnet().prefix_len(), 8);

        let rule = parse_rule("accept 172.16.0.0/255.240.0.0:*").unwrap();
        assert_eq!(rule.subnet().prefix_len(), 12);
    }

    #[test]
    fn test_port_forms() {
        let rule = parse_rule("reject *:25").unwrap();
        assert_eq!((rule.ports().lo(), rule.ports().hi()), (25, 25));

        let rule = parse_rule("reject *:135-139").unwrap();
        assert_eq!((rule.ports().lo(), rule.ports().hi()), (135, 139));

        let rule = parse_rule("reject *:*").unwrap();
        assert_eq!((rule.ports().lo(), rule.ports().hi()), (1, 65535));
    }

    #[test]
    fn test_invalid_lines() {
        let lines = [
            "accept weird",
            "allow *:80",
            "accept *",
            "accept *:",
            "accept *:0",
            "accept *:65536",
            "accept *:+80",
            "accept *:443-80",
            "accept *:80-",
            "accept 1.2.3:80",
            "accept 256.0.0.1:80",
            "accept 1.2.3.4/33:80",
            "accept 1.2.3.4/255.0.255.0:80",
            "accept [::1]:80",
            "accept6 *:80",
        ];
        for line in lines {
            assert!(
                matches!(parse_rule(line), Err(Error::MalformedPolicy { .. })),
                "{:?} should be malformed",
                line
            );
        }
    }

    #[test]
    fn test_malformed_line_is_reported() {
        let err = parse_policy("reject *:25\naccept weird\naccept *:*").unwrap_err();
        match err {
            Error::MalformedPolicy { line, .. } => assert_eq!(line, "accept weird"),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_policy_skips_blank_lines_and_keeps_order() {
        let rules = parse_policy("\n  reject *:25\r\n\n  accept *:80  \nreject *:*\n").unwrap();
        let rendered: Vec<String> = rules.iter().map(|r| r.to_string()).collect();
        assert_eq!(rendered, vec!["reject *:25", "accept *:80", "reject *:*"]);
    }

    #[test]
    fn test_unknown_verdict_is_malformed() {
        match parse_rule("allow *:80") {
            Err(Error::MalformedPolicy { line, reason }) => {
                assert_eq!(line, "allow *:80");
                assert_eq!(reason, "rule must start with accept or reject");
            }
            other => panic!("unexpected result: {:?}", other),
        }
    }

    #[test]
    fn test_empty_policy() {
        assert!(parse_policy("").unwrap().is_empty());
        assert!(parse_policy("\n \n").unwrap().is_empty());
    }
}
