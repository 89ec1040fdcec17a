//! Exit policy extraction from raw server descriptors.
//!
//! Stored descriptors keep their full text. The exit policy of a relay is the
//! sequence of `accept` and `reject` keyword lines of that text, in order:
//!
//! ```text
//! router caerSidi 71.35.133.197 9001 0 0
//! platform Tor 0.2.1.30 on Linux x86_64
//! ...
//! reject 0.0.0.0/8:*
//! accept *:80
//! reject *:*
//! router-signature
//! ```
//!
//! Lines inside `-----BEGIN`/`-----END` blocks are never treated as policy
//! lines. Legacy `opt ` prefixes are stripped.
//!
//! # Example
//!
//! ```rust
//! use torstatus_rs::descriptor::exit_policy_text;
//! use torstatus_rs::exit_policy::ExitPolicy;
//!
//! let raw = "router relay 192.0.2.1 9001 0 0\ncontact nobody\nreject *:25\naccept *:*\n";
//! let policy = ExitPolicy::parse(&exit_policy_text(raw)).unwrap();
//! assert_eq!(policy.len(), 2);
//! ```

const BLOCK_BEGIN: &str = "-----BEGIN";
const BLOCK_END: &str = "-----END";

/// Returns the exit policy lines of a raw server descriptor, in order.
///
/// Each returned line is trimmed and starts with `accept` or `reject`.
pub fn exit_policy_lines(raw_descriptor: &str) -> Vec<&str> {
    let mut lines = Vec::new();
    let mut in_block = false;

    for line in raw_descriptor.lines() {
        let line = line.trim();
        if in_block {
            if line.starts_with(BLOCK_END) {
                in_block = false;
            }
            continue;
        }
        if line.starts_with(BLOCK_BEGIN) {
            in_block = true;
            continue;
        }

        let line = line.strip_prefix("opt ").unwrap_or(line);
        let keyword = line.split_whitespace().next().unwrap_or("");
        if keyword == "accept" || keyword == "reject" {
            lines.push(line);
        }
    }

    lines
}

/// Returns the exit policy of a raw server descriptor as parser input, one
/// rule per line.
pub fn exit_policy_text(raw_descriptor: &str) -> String {
    exit_policy_lines(raw_descriptor).join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    const EXAMPLE_DESCRIPTOR: &str = r#"@type server-descriptor 1.0
router caerSidi 71.35.133.197 9001 0 0
platform Tor 0.2.1.30 on Linux x86_64
published 2012-03-01 17:15:27
opt fingerprint A756 9A83 B570 6AB1 B1A9 CB52 EFF7 D2D3 2E45 53EB
uptime 588217
bandwidth 153600 256000 104590
onion-key
-----BEGIN RSA PUBLIC KEY-----
MIGJAoGBAJv5IIWQ+WDWYUdyA/0L8qbIkEVH/cwryZWoIaPAzINfrw1WfNZGtBmg
accept *:1 this line is inside a key block
-----END RSA PUBLIC KEY-----
contact www.atagar.com/contact
reject 0.0.0.0/8:*
opt accept *:80
accept *:443
reject *:*
ipv6-policy accept 80,443
router-signature
-----BEGIN SIGNATURE-----
dskLSPz8beUW7bzwDjR6EVNGpyoZde83Ejvau+5F2c6cGnlu91fiZN3suE88iE6e
-----END SIGNATURE-----
"#;

    #[test]
    fn test_exit_policy_lines() {
        assert_eq!(
            exit_policy_lines(EXAMPLE_DESCRIPTOR),
            vec!["reject 0.0.0.0/8:*", "accept *:80", "accept *:443", "reject *:*"]
        );
    }

    #[test]
    fn test_exit_policy_text() {
        assert_eq!(
            exit_policy_text(EXAMPLE_DESCRIPTOR),
            "reject 0.0.0.0/8:*\naccept *:80\naccept *:443\nreject *:*"
        );
    }

    #[test]
    fn test_descriptor_without_policy() {
        assert!(exit_policy_lines("router relay 192.0.2.1 9001 0 0\n").is_empty());
        assert_eq!(exit_policy_text(""), "");
    }

    #[test]
    fn test_malformed_policy_lines_are_kept() {
        // the parser, not the extractor, decides what is malformed
        assert_eq!(exit_policy_lines("accept weird\n"), vec!["accept weird"]);
    }
}
