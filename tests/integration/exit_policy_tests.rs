//! Integration tests for the exit policy engine.

use torstatus_rs::descriptor::exit_policy_text;
use torstatus_rs::exit_policy::{ExitPolicy, Verdict};
use torstatus_rs::Error;

use crate::address;

#[test]
fn test_exit_policy_evaluation() {
    let policy = ExitPolicy::parse("reject *:25\naccept *:*").expect("Failed to parse policy");

    assert_eq!(
        policy.verdict_for(address("8.8.8.8"), 25),
        Verdict::Reject,
        "Port 25 should be rejected"
    );
    assert_eq!(
        policy.verdict_for(address("8.8.8.8"), 443),
        Verdict::Accept,
        "Port 443 should be accepted"
    );
}

#[test]
fn test_rule_order_decides() {
    let reject_first = ExitPolicy::parse("reject *:80\naccept *:80").unwrap();
    let accept_first = ExitPolicy::parse("accept *:80\nreject *:80").unwrap();

    assert_eq!(reject_first.verdict_for(address("192.0.2.7"), 80), Verdict::Reject);
    assert_eq!(accept_first.verdict_for(address("192.0.2.7"), 80), Verdict::Accept);
}

#[test]
fn test_no_match_rejects() {
    let empty = ExitPolicy::parse("").unwrap();
    assert_eq!(empty.verdict_for(address("192.0.2.7"), 80), Verdict::Reject);

    let narrow = ExitPolicy::parse("accept 10.0.0.0/8:443").unwrap();
    assert_eq!(narrow.verdict_for(address("192.0.2.7"), 443), Verdict::Reject);
    assert_eq!(narrow.verdict_for(address("10.0.0.1"), 80), Verdict::Reject);
}

#[test]
fn test_exit_policy_cidr_boundaries() {
    let policy = ExitPolicy::parse("accept 192.168.0.0/16:*").unwrap();

    assert!(policy.can_exit_to(address("192.168.0.0"), 80));
    assert!(policy.can_exit_to(address("192.168.255.255"), 80));
    assert!(!policy.can_exit_to(address("192.169.0.0"), 80));
    assert!(!policy.can_exit_to(address("192.167.255.255"), 80));
}

#[test]
fn test_dotted_mask_equals_prefix() {
    let dotted = ExitPolicy::parse("accept 10.0.0.0/255.0.0.0:*").unwrap();
    let prefix = ExitPolicy::parse("accept 10.0.0.0/8:*").unwrap();
    assert_eq!(dotted, prefix);
}

#[test]
fn test_exit_policy_port_range() {
    let policy = ExitPolicy::parse("accept *:80-443").unwrap();

    assert!(policy.can_exit_to(address("192.168.1.1"), 80), "Port 80 should be accepted");
    assert!(policy.can_exit_to(address("192.168.1.1"), 443), "Port 443 should be accepted");
    assert!(policy.can_exit_to(address("192.168.1.1"), 200), "Port 200 should be accepted");
    assert!(!policy.can_exit_to(address("192.168.1.1"), 79), "Port 79 should be rejected");
    assert!(!policy.can_exit_to(address("192.168.1.1"), 444), "Port 444 should be rejected");
}

#[test]
fn test_parse_is_deterministic() {
    let raw = "reject 0.0.0.0/8:*\nreject 169.254.0.0/16:*\naccept *:20-23\nreject *:*";
    assert_eq!(ExitPolicy::parse(raw).unwrap(), ExitPolicy::parse(raw).unwrap());
    assert_eq!(ExitPolicy::parse(raw).unwrap().to_string(), raw);
}

#[test]
fn test_malformed_policy_rejected() {
    match ExitPolicy::parse("accept *:80\naccept weird\nreject *:*") {
        Err(Error::MalformedPolicy { line, .. }) => assert_eq!(line, "accept weird"),
        other => panic!("expected a malformed policy error, got {:?}", other),
    }
}

#[test]
fn test_ipv6_rules_rejected() {
    assert!(ExitPolicy::parse("accept6 [::]:80").is_err());
    assert!(ExitPolicy::parse("accept [::1]:80").is_err());
}

#[test]
fn test_parse_exit_policy_from_descriptor() {
    let descriptor = "router relay 192.0.2.1 9001 0 0\n\
                      platform Tor 0.4.8.9 on Linux\n\
                      reject 10.0.0.0/8:*\n\
                      accept *:443\n\
                      reject *:*\n\
                      router-signature\n";
    let policy = ExitPolicy::parse(&exit_policy_text(descriptor)).unwrap();

    assert_eq!(policy.len(), 3);
    assert!(policy.can_exit_to(address("8.8.8.8"), 443));
    assert!(!policy.can_exit_to(address("10.1.2.3"), 443));
}
