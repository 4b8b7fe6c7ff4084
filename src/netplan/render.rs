//! Netplan v2 rendering

use std::fmt::Write;
use std::net::Ipv4Addr;

use chrono::{DateTime, Utc};

use crate::netplan::{NetworkMode, RenderedArtifact, ValidatedConfig};

/// Resolvers used when a static configuration supplies no nameserver
pub const DEFAULT_NAMESERVERS: [Ipv4Addr; 2] = [Ipv4Addr::new(8, 8, 8, 8), Ipv4Addr::new(1, 1, 1, 1)];

const HEADER: &str = "# SafeSchool Edge network configuration (managed by edge-netadmin)";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Render a validated configuration as a netplan document
///
/// The output depends only on `config` and `generated_at`.
pub fn render(config: &ValidatedConfig, generated_at: DateTime<Utc>) -> RenderedArtifact {
    let mut doc = String::with_capacity(384);

    // Writing into a String cannot fail.
    let _ = writeln!(doc, "{}", HEADER);
    let _ = writeln!(doc, "# Last modified: {}", generated_at.format(TIMESTAMP_FORMAT));
    doc.push_str("network:\n  version: 2\n  ethernets:\n");
    let _ = writeln!(doc, "    {}:", config.interface);

    match &config.mode {
        NetworkMode::Dhcp => {
            doc.push_str("      dhcp4: true\n");
            doc.push_str("      dhcp6: false\n");
        }
        NetworkMode::Static {
            address,
            prefix,
            gateway,
            nameservers,
        } => {
            let nameservers: &[Ipv4Addr] = if nameservers.is_empty() {
                &DEFAULT_NAMESERVERS
            } else {
                nameservers
            };
            let dns = nameservers
                .iter()
                .map(Ipv4Addr::to_string)
                .collect::<Vec<_>>()
                .join(", ");

            doc.push_str("      dhcp4: false\n");
            doc.push_str("      dhcp6: false\n");
            doc.push_str("      addresses:\n");
            let _ = writeln!(doc, "        - {}/{}", address, prefix);
            doc.push_str("      routes:\n");
            doc.push_str("        - to: default\n");
            let _ = writeln!(doc, "          via: {}", gateway);
            doc.push_str("      nameservers:\n");
            let _ = writeln!(doc, "        addresses: [{}]", dns);
        }
    }

    RenderedArtifact {
        interface: config.interface.clone(),
        content: doc,
    }
}
