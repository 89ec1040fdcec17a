//! Exit policy parsing and evaluation for Tor relays.
//!
//! An exit policy is the ordered list of `accept`/`reject` rules a relay
//! publishes in its descriptor to say which destinations it will connect to
//! on behalf of clients.
//!
//! # Overview
//!
//! The engine has three parts:
//!
//! - [`parser`]: turns raw policy text into an ordered list of [`ExitPolicyRule`]s
//! - [`matcher`]: pure subnet and port range predicates
//! - [`ExitPolicy::evaluate`]: first-match-wins evaluation of a [`Candidate`]
//!
//! # Rule Format
//!
//! ```text
//! accept|reject addrspec:portspec
//! ```
//!
//! Where `addrspec` is `*`, an IPv4 address, or an IPv4 network written as
//! `A.B.C.D/N` or `A.B.C.D/M.M.M.M`, and `portspec` is `*`, a port, or an
//! inclusive range `lo-hi`.
//!
//! # Evaluation
//!
//! Rules are consulted in the order they were declared. The first rule whose
//! network contains the destination address and whose port range contains
//! the destination port decides the [`Verdict`]. When no rule matches,
//! including for an empty policy, the verdict is [`Verdict::Reject`].
//!
//! # Example
//!
//! ```rust
//! use torstatus_rs::exit_policy::{Candidate, ExitPolicy, Verdict};
//! use std::net::Ipv4Addr;
//!
//! let policy = ExitPolicy::parse("reject 1.2.3.0/24:*\naccept 1.2.3.4/32:80").unwrap();
//! let candidate = Candidate::new(Ipv4Addr::new(1, 2, 3, 4), 80).unwrap();
//!
//! // The broader reject comes first, so it wins.
//! assert_eq!(policy.evaluate(&candidate), Verdict::Reject);
//! ```
//!
//! # Thread Safety
//!
//! Everything here is immutable once built. Parsed policies can be shared
//! between threads behind an `Arc` without locking, see
//! [`crate::cache::PolicyCache`].

pub mod matcher;
pub mod parser;

use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::Error;

/// Outcome of evaluating a destination against an exit policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verdict {
    /// The relay will connect to the destination.
    Accept,
    /// The relay refuses to connect to the destination.
    Reject,
}

impl Verdict {
    /// Returns `true` for [`Verdict::Accept`].
    pub fn is_accept(&self) -> bool {
        matches!(self, Verdict::Accept)
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Accept => write!(f, "accept"),
            Verdict::Reject => write!(f, "reject"),
        }
    }
}

impl FromStr for Verdict {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "accept" => Ok(Verdict::Accept),
            "reject" => Ok(Verdict::Reject),
            _ => Err(Error::invalid_input(s, "verdict must be accept or reject")),
        }
    }
}

/// An IPv4 network: a base address and a prefix length between 0 and 32.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::Subnet;
/// use std::net::Ipv4Addr;
///
/// let net = Subnet::new(Ipv4Addr::new(10, 0, 0, 0), 8).unwrap();
/// assert!(net.contains(Ipv4Addr::new(10, 20, 30, 40)));
/// assert!(!net.contains(Ipv4Addr::new(11, 0, 0, 1)));
/// assert_eq!(net.to_string(), "10.0.0.0/8");
///
/// assert!(Subnet::any().contains(Ipv4Addr::new(8, 8, 8, 8)));
/// assert!(Subnet::new(Ipv4Addr::new(10, 0, 0, 0), 33).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Subnet {
    base: Ipv4Addr,
    prefix_len: u8,
}

impl Subnet {
    /// Creates a network from a base address and prefix length.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `prefix_len` is greater than 32.
    pub fn new(base: Ipv4Addr, prefix_len: u8) -> Result<Self, Error> {
        if prefix_len > 32 {
            return Err(Error::invalid_input(
                &prefix_len.to_string(),
                "prefix length must be 0-32",
            ));
        }
        Ok(Self { base, prefix_len })
    }

    /// The network matching a single address.
    pub fn host(addr: Ipv4Addr) -> Self {
        Self {
            base: addr,
            prefix_len: 32,
        }
    }

    /// The network matching every address (`*`).
    pub fn any() -> Self {
        Self {
            base: Ipv4Addr::UNSPECIFIED,
            prefix_len: 0,
        }
    }

    /// The base address as written in the policy.
    pub fn base(&self) -> Ipv4Addr {
        self.base
    }

    /// Number of leading bits that must match.
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    /// Returns `true` if this network matches every address.
    pub fn is_wildcard(&self) -> bool {
        self.prefix_len == 0
    }

    /// Checks if `addr` is inside this network.
    pub fn contains(&self, addr: Ipv4Addr) -> bool {
        matcher::address_in_subnet(addr, self.base, self.prefix_len)
    }
}

impl fmt::Display for Subnet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.prefix_len {
            0 if self.base.is_unspecified() => write!(f, "*"),
            32 => write!(f, "{}", self.base),
            bits => write!(f, "{}/{}", self.base, bits),
        }
    }
}

/// An inclusive range of destination ports.
///
/// # Invariants
///
/// - `1 <= lo <= hi <= 65535`
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::PortRange;
///
/// let web = PortRange::new(80, 443).unwrap();
/// assert!(web.contains(80));
/// assert!(web.contains(443));
/// assert!(!web.contains(22));
///
/// assert!(PortRange::all().is_wildcard());
/// assert_eq!(PortRange::single(22).unwrap().to_string(), "22");
///
/// assert!(PortRange::new(443, 80).is_err());
/// assert!(PortRange::new(0, 80).is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PortRange {
    lo: u16,
    hi: u16,
}

impl PortRange {
    /// Creates a port range from `lo` to `hi` inclusive.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `lo` is zero or greater than `hi`.
    pub fn new(lo: u16, hi: u16) -> Result<Self, Error> {
        if lo == 0 {
            return Err(Error::invalid_input(&lo.to_string(), "port must be 1-65535"));
        }
        if lo > hi {
            return Err(Error::invalid_input(
                &format!("{}-{}", lo, hi),
                "min port greater than max port",
            ));
        }
        Ok(Self { lo, hi })
    }

    /// A range holding a single port.
    pub fn single(port: u16) -> Result<Self, Error> {
        Self::new(port, port)
    }

    /// The range covering every port (`*`).
    pub fn all() -> Self {
        Self { lo: 1, hi: 65535 }
    }

    /// Lowest port in the range.
    pub fn lo(&self) -> u16 {
        self.lo
    }

    /// Highest port in the range.
    pub fn hi(&self) -> u16 {
        self.hi
    }

    /// Checks if `port` is inside the range.
    pub fn contains(&self, port: u16) -> bool {
        matcher::port_in_range(port, self.lo, self.hi)
    }

    /// Returns `true` if the range covers every port.
    pub fn is_wildcard(&self) -> bool {
        self.lo == 1 && self.hi == 65535
    }
}

impl fmt::Display for PortRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_wildcard() {
            write!(f, "*")
        } else if self.lo == self.hi {
            write!(f, "{}", self.lo)
        } else {
            write!(f, "{}-{}", self.lo, self.hi)
        }
    }
}

/// A single rule of an exit policy.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::{ExitPolicyRule, Verdict};
/// use std::net::Ipv4Addr;
///
/// let rule: ExitPolicyRule = "reject 10.0.0.0/8:*".parse().unwrap();
/// assert_eq!(rule.verdict(), Verdict::Reject);
/// assert!(rule.is_match(Ipv4Addr::new(10, 1, 2, 3), 443));
/// assert!(!rule.is_match(Ipv4Addr::new(192, 0, 2, 1), 443));
/// assert_eq!(rule.to_string(), "reject 10.0.0.0/8:*");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExitPolicyRule {
    verdict: Verdict,
    subnet: Subnet,
    ports: PortRange,
}

impl ExitPolicyRule {
    /// Creates a rule from its parts.
    pub fn new(verdict: Verdict, subnet: Subnet, ports: PortRange) -> Self {
        Self {
            verdict,
            subnet,
            ports,
        }
    }

    /// Parses a single policy line. See [`parser::parse_rule`].
    pub fn parse(line: &str) -> Result<Self, Error> {
        parser::parse_rule(line)
    }

    /// What this rule decides when it matches.
    pub fn verdict(&self) -> Verdict {
        self.verdict
    }

    /// The destination network this rule covers.
    pub fn subnet(&self) -> Subnet {
        self.subnet
    }

    /// The destination ports this rule covers.
    pub fn ports(&self) -> PortRange {
        self.ports
    }

    /// Checks if the rule covers `address:port`.
    pub fn is_match(&self, address: Ipv4Addr, port: u16) -> bool {
        self.subnet.contains(address) && self.ports.contains(port)
    }
}

impl fmt::Display for ExitPolicyRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}:{}", self.verdict, self.subnet, self.ports)
    }
}

impl FromStr for ExitPolicyRule {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// A destination to evaluate a policy against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Candidate {
    address: Ipv4Addr,
    port: u16,
}

impl Candidate {
    /// Creates a candidate destination.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `port` is zero.
    pub fn new(address: Ipv4Addr, port: u16) -> Result<Self, Error> {
        if port == 0 {
            return Err(Error::invalid_input("0", "port must be 1-65535"));
        }
        Ok(Self { address, port })
    }

    /// Destination address.
    pub fn address(&self) -> Ipv4Addr {
        self.address
    }

    /// Destination port.
    pub fn port(&self) -> u16 {
        self.port
    }
}

/// Evaluates `candidate` against `rules` in order.
///
/// Returns the verdict of the first matching rule, or [`Verdict::Reject`]
/// if none matches.
pub fn evaluate(rules: &[ExitPolicyRule], candidate: &Candidate) -> Verdict {
    rules
        .iter()
        .find(|rule| rule.is_match(candidate.address, candidate.port))
        .map(ExitPolicyRule::verdict)
        .unwrap_or(Verdict::Reject)
}

/// A complete exit policy: an ordered list of rules.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::ExitPolicy;
/// use std::net::Ipv4Addr;
///
/// let policy = ExitPolicy::parse("accept *:80\naccept *:443\nreject *:*").unwrap();
/// let addr = Ipv4Addr::new(192, 0, 2, 1);
///
/// assert!(policy.can_exit_to(addr, 80));
/// assert!(policy.can_exit_to(addr, 443));
/// assert!(!policy.can_exit_to(addr, 22));
/// assert_eq!(policy.len(), 3);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExitPolicy {
    rules: Vec<ExitPolicyRule>,
}

impl ExitPolicy {
    /// Creates a policy from rules, keeping their order.
    pub fn new(rules: Vec<ExitPolicyRule>) -> Self {
        Self { rules }
    }

    /// Parses a policy with one rule per line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPolicy`] if any line is malformed.
    pub fn parse(raw: &str) -> Result<Self, Error> {
        parser::parse_policy(raw).map(Self::new)
    }

    /// Evaluates a destination. First match wins; no match rejects.
    pub fn evaluate(&self, candidate: &Candidate) -> Verdict {
        evaluate(&self.rules, candidate)
    }

    /// Evaluates `address:port`.
    ///
    /// Port zero is never a valid destination and is rejected.
    pub fn verdict_for(&self, address: Ipv4Addr, port: u16) -> Verdict {
        match Candidate::new(address, port) {
            Ok(candidate) => self.evaluate(&candidate),
            Err(_) => Verdict::Reject,
        }
    }

    /// Checks if traffic may exit to `address:port`.
    pub fn can_exit_to(&self, address: Ipv4Addr, port: u16) -> bool {
        self.verdict_for(address, port).is_accept()
    }

    /// Returns an iterator over the rules in declared order.
    pub fn iter(&self) -> impl Iterator<Item = &ExitPolicyRule> {
        self.rules.iter()
    }

    /// The rules in declared order.
    pub fn rules(&self) -> &[ExitPolicyRule] {
        &self.rules
    }

    /// Number of rules.
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    /// Returns `true` if the policy has no rules.
    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

impl fmt::Display for ExitPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rules: Vec<String> = self.rules.iter().map(|r| r.to_string()).collect();
        write!(f, "{}", rules.join("\n"))
    }
}

impl FromStr for ExitPolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
