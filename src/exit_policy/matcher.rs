//! Address and port predicates used by exit policy evaluation.
//!
//! Both predicates are total over well-formed input: the parser and
//! [`Candidate`](super::Candidate) construction guarantee that prefix lengths
//! are at most 32 and that ports are non-zero, so there is no error path here.

use std::net::Ipv4Addr;

/// Returns the network mask for an IPv4 prefix length.
///
/// Prefix lengths above 32 are treated as 32.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::matcher::prefix_mask;
///
/// assert_eq!(prefix_mask(0), 0);
/// assert_eq!(prefix_mask(8), 0xff00_0000);
/// assert_eq!(prefix_mask(32), u32::MAX);
/// ```
pub fn prefix_mask(prefix_len: u8) -> u32 {
    match prefix_len {
        0 => 0,
        1..=31 => !((1u32 << (32 - prefix_len)) - 1),
        _ => u32::MAX,
    }
}

/// Converts a dotted-quad subnet mask (`255.255.0.0`) into a prefix length.
///
/// Returns `None` when the mask is not a contiguous run of one bits followed
/// by zero bits, e.g. `255.0.255.0`.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::matcher::mask_to_prefix;
/// use std::net::Ipv4Addr;
///
/// assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 255, 0, 0)), Some(16));
/// assert_eq!(mask_to_prefix(Ipv4Addr::new(0, 0, 0, 0)), Some(0));
/// assert_eq!(mask_to_prefix(Ipv4Addr::new(255, 0, 255, 0)), None);
/// ```
pub fn mask_to_prefix(mask: Ipv4Addr) -> Option<u8> {
    let bits = u32::from(mask);
    let prefix_len = bits.leading_ones() as u8;
    if bits == prefix_mask(prefix_len) {
        Some(prefix_len)
    } else {
        None
    }
}

/// Checks whether `addr` lies inside the network `base/prefix_len`.
///
/// True iff the top `prefix_len` bits of both addresses are equal. A prefix
/// length of zero matches every address, which is how `*` rules are stored.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::matcher::address_in_subnet;
/// use std::net::Ipv4Addr;
///
/// let base = Ipv4Addr::new(1, 2, 3, 0);
/// assert!(address_in_subnet(Ipv4Addr::new(1, 2, 3, 5), base, 24));
/// assert!(!address_in_subnet(Ipv4Addr::new(1, 2, 4, 5), base, 24));
/// assert!(address_in_subnet(Ipv4Addr::new(9, 9, 9, 9), base, 0));
/// ```
pub fn address_in_subnet(addr: Ipv4Addr, base: Ipv4Addr, prefix_len: u8) -> bool {
    let mask = prefix_mask(prefix_len);
    (u32::from(addr) & mask) == (u32::from(base) & mask)
}

/// Checks whether `port` lies in the inclusive range `lo..=hi`.
///
/// # Example
///
/// ```rust
/// use torstatus_rs::exit_policy::matcher::port_in_range;
///
/// assert!(port_in_range(80, 80, 80));
/// assert!(!port_in_range(81, 80, 80));
/// assert!(port_in_range(79, 1, 65535));
/// ```
pub fn port_in_range(port: u16, lo: u16, hi: u16) -> bool {
    lo <= port && port <= hi
}
