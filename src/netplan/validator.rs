//! Proposal validation
//!
//! Rules run in a fixed order and stop at the first failure:
//! 1. static mode: `ip` and `gateway` are IPv4 addresses, `cidr` is 1..=32
//! 2. `dns1` / `dns2`, when present, are IPv4 addresses
//! 3. `hostname`, when present, is an RFC 1123 label
//! 4. an interface is supplied or the default-route interface is known
//!
//! Any IPv4 address with a prefix in 1..=32 is a valid host assignment (host
//! bits are permitted), so rule 1 needs no separate network check.

use std::net::Ipv4Addr;

use crate::netplan::{NetworkMode, ProposedNetworkConfig, ValidatedConfig, ValidationError};

const MAX_HOSTNAME_LEN: usize = 63;
const MAX_INTERFACE_LEN: usize = 15;

/// Validate a proposal against the rules above
///
/// `current_interface` is the interface holding the default route, used when
/// the proposal does not name one.
pub fn validate(
    proposed: &ProposedNetworkConfig,
    current_interface: Option<&str>,
) -> Result<ValidatedConfig, ValidationError> {
    let static_parts = if proposed.dhcp {
        None
    } else {
        let address = parse_ipv4("ip", &proposed.ip)?;
        let gateway = parse_ipv4("gateway", &proposed.gateway)?;
        let prefix = parse_cidr(&proposed.cidr)?;
        Some((address, prefix, gateway))
    };

    let nameservers: Vec<Ipv4Addr> = [("dns1", &proposed.dns1), ("dns2", &proposed.dns2)]
        .into_iter()
        .map(|(field, value)| parse_optional_ipv4(field, value))
        .collect::<Result<Vec<_>, _>>()?
        .into_iter()
        .flatten()
        .collect();

    let hostname = match proposed.hostname.trim() {
        "" => None,
        name => {
            validate_hostname(name)?;
            Some(name.to_string())
        }
    };

    let interface = resolve_interface(proposed.interface.as_deref(), current_interface)?;

    let mode = match static_parts {
        None => NetworkMode::Dhcp,
        Some((address, prefix, gateway)) => NetworkMode::Static {
            address,
            prefix,
            gateway,
            nameservers,
        },
    };

    Ok(ValidatedConfig {
        interface,
        mode,
        hostname,
    })
}

/// Check that `name` is a single RFC 1123 hostname label
pub fn validate_hostname(name: &str) -> Result<(), ValidationError> {
    let bytes = name.as_bytes();
    let invalid = || ValidationError::InvalidHostname(name.to_string());

    if bytes.is_empty() || bytes.len() > MAX_HOSTNAME_LEN {
        return Err(invalid());
    }

    let first = bytes[0];
    let last = bytes[bytes.len() - 1];
    if !first.is_ascii_alphanumeric() || !last.is_ascii_alphanumeric() {
        return Err(invalid());
    }

    if !bytes.iter().all(|b| b.is_ascii_alphanumeric() || *b == b'-') {
        return Err(invalid());
    }

    Ok(())
}

fn parse_ipv4(field: &'static str, value: &str) -> Result<Ipv4Addr, ValidationError> {
    value
        .parse::<Ipv4Addr>()
        .map_err(|_| ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        })
}

fn parse_optional_ipv4(field: &'static str, value: &str) -> Result<Option<Ipv4Addr>, ValidationError> {
    if value.is_empty() {
        return Ok(None);
    }
    parse_ipv4(field, value).map(Some)
}

fn parse_cidr(value: &str) -> Result<u8, ValidationError> {
    match value.trim().parse::<u8>() {
        Ok(prefix) if (1..=32).contains(&prefix) => Ok(prefix),
        _ => Err(ValidationError::InvalidCidr(value.to_string())),
    }
}

fn resolve_interface(
    explicit: Option<&str>,
    current: Option<&str>,
) -> Result<String, ValidationError> {
    let name = explicit
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .or_else(|| current.map(str::trim).filter(|s| !s.is_empty()))
        .ok_or(ValidationError::NoInterface)?;

    // The name becomes a YAML mapping key in the rendered document.
    let valid = name.len() <= MAX_INTERFACE_LEN
        && name
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'));
    if !valid {
        return Err(ValidationError::InvalidInterface(name.to_string()));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn static_proposal() -> ProposedNetworkConfig {
        ProposedNetworkConfig {
            dhcp: false,
            ip: "192.168.1.50".to_string(),
            cidr: "24".to_string(),
            gateway: "192.168.1.1".to_string(),
            dns1: "8.8.8.8".to_string(),
            dns2: String::new(),
            hostname: "edge-01".to_string(),
            interface: None,
        }
    }

    #[test]
    fn test_valid_static_proposal() {
        let validated = validate(&static_proposal(), Some("eth0")).unwrap();

        assert_eq!(validated.interface, "eth0");
        assert_eq!(validated.hostname.as_deref(), Some("edge-01"));
        assert_eq!(
            validated.mode,
            NetworkMode::Static {
                address: Ipv4Addr::new(192, 168, 1, 50),
                prefix: 24,
                gateway: Ipv4Addr::new(192, 168, 1, 1),
                nameservers: vec![Ipv4Addr::new(8, 8, 8, 8)],
            }
        );
    }

    #[test]
    fn test_cidr_range() {
        for cidr in 1..=32 {
            let proposal = ProposedNetworkConfig {
                cidr: cidr.to_string(),
                ..static_proposal()
            };
            assert!(validate(&proposal, Some("eth0")).is_ok(), "cidr {} should pass", cidr);
        }

        for cidr in ["0", "33", "-1", "255", "256", "24.5", "abc", ""] {
            let proposal = ProposedNetworkConfig {
                cidr: cidr.to_string(),
                ..static_proposal()
            };
            assert_eq!(
                validate(&proposal, Some("eth0")),
                Err(ValidationError::InvalidCidr(cidr.to_string())),
                "cidr {:?} should fail",
                cidr
            );
        }
    }

    #[test]
    fn test_host_bits_permitted() {
        let proposal = ProposedNetworkConfig {
            ip: "10.1.2.3".to_string(),
            cidr: "8".to_string(),
            ..static_proposal()
        };
        assert!(validate(&proposal, Some("eth0")).is_ok());
    }

    #[test]
    fn test_malformed_addresses_name_the_field() {
        let bad = [
            "",
            "300.1.1.1",
            "1.2.3",
            "1.2.3.4.5",
            "a.b.c.d",
            "::1",
            "192.168.001.1",
            " 192.168.1.50 ",
            "192.168.1.50\n",
        ];

        for value in bad {
            let proposal = ProposedNetworkConfig { ip: value.to_string(), ..static_proposal() };
            assert!(matches!(
                validate(&proposal, Some("eth0")),
                Err(ValidationError::InvalidAddress { field: "ip", .. })
            ));

            let proposal = ProposedNetworkConfig { gateway: value.to_string(), ..static_proposal() };
            assert!(matches!(
                validate(&proposal, Some("eth0")),
                Err(ValidationError::InvalidAddress { field: "gateway", .. })
            ));
        }

        for value in &bad[1..] {
            let proposal = ProposedNetworkConfig { dns1: value.to_string(), ..static_proposal() };
            assert!(matches!(
                validate(&proposal, Some("eth0")),
                Err(ValidationError::InvalidAddress { field: "dns1", .. })
            ));

            let proposal = ProposedNetworkConfig { dns2: value.to_string(), ..static_proposal() };
            assert!(matches!(
                validate(&proposal, Some("eth0")),
                Err(ValidationError::InvalidAddress { field: "dns2", .. })
            ));
        }
    }

    #[test]
    fn test_dhcp_skips_static_fields_but_checks_dns() {
        let proposal = ProposedNetworkConfig {
            dhcp: true,
            ip: "garbage".to_string(),
            cidr: "99".to_string(),
            gateway: String::new(),
            ..static_proposal()
        };
        let validated = validate(&proposal, Some("eth0")).unwrap();
        assert_eq!(validated.mode, NetworkMode::Dhcp);

        let proposal = ProposedNetworkConfig {
            dhcp: true,
            dns2: "not-an-ip".to_string(),
            ..static_proposal()
        };
        assert!(matches!(
            validate(&proposal, Some("eth0")),
            Err(ValidationError::InvalidAddress { field: "dns2", .. })
        ));
    }

    #[test]
    fn test_hostname_rules() {
        let max = "h".repeat(63);
        let ok: [&str; 5] = ["a", "edge-01", "EDGE1", "x1-y2-z3", max.as_str()];
        for name in ok {
            assert!(validate_hostname(name).is_ok(), "{} should be valid", name);
        }

        let long = "h".repeat(64);
        let bad: [&str; 9] = ["", "-edge", "edge-", "edge_01", "edge.local", "ed ge", "edge\n", "édge", long.as_str()];
        for name in bad {
            assert!(validate_hostname(name).is_err(), "{:?} should be invalid", name);
        }
    }

    #[test]
    fn test_empty_hostname_is_optional() {
        let proposal = ProposedNetworkConfig { hostname: "  ".to_string(), ..static_proposal() };
        assert_eq!(validate(&proposal, Some("eth0")).unwrap().hostname, None);
    }

    #[test]
    fn test_interface_resolution() {
        let explicit = ProposedNetworkConfig {
            interface: Some("enp2s0".to_string()),
            ..static_proposal()
        };
        assert_eq!(validate(&explicit, Some("eth0")).unwrap().interface, "enp2s0");

        assert_eq!(
            validate(&static_proposal(), None),
            Err(ValidationError::NoInterface)
        );
        assert_eq!(
            validate(&static_proposal(), Some("")),
            Err(ValidationError::NoInterface)
        );

        let injected = ProposedNetworkConfig {
            interface: Some("eth0:\n  evil".to_string()),
            ..static_proposal()
        };
        assert!(matches!(
            validate(&injected, Some("eth0")),
            Err(ValidationError::InvalidInterface(_))
        ));
    }

    #[test]
    fn test_validation_order() {
        // Address errors are reported before CIDR and hostname errors.
        let proposal = ProposedNetworkConfig {
            ip: "bad".to_string(),
            cidr: "0".to_string(),
            hostname: "-bad-".to_string(),
            ..static_proposal()
        };
        assert!(matches!(
            validate(&proposal, None),
            Err(ValidationError::InvalidAddress { field: "ip", .. })
        ));

        let proposal = ProposedNetworkConfig {
            hostname: "-bad-".to_string(),
            ..static_proposal()
        };
        assert!(matches!(
            validate(&proposal, None),
            Err(ValidationError::InvalidHostname(_))
        ));
    }
}
