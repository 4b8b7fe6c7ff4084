//! Live network state
//!
//! Read-only queries of the current interface, address, route, resolver and
//! DHCP-vs-static mode. Every query degrades to an empty field on failure.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use log::debug;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::system::command::{CommandRunner, CommandSpec};

const KERNEL_HOSTNAME: &str = "/proc/sys/kernel/hostname";

/// Snapshot of the current network state
///
/// Every field is best-effort: `None` (or empty) means the value could not
/// be determined.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentNetworkInfo {
    pub interface: Option<String>,
    pub ip: Option<String>,
    pub cidr: Option<u8>,
    pub gateway: Option<String>,
    pub dns: Vec<String>,
    pub mac: Option<String>,
    pub hostname: Option<String>,
    pub dhcp: bool,
}

/// Entry of `ip -j route show default`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteEntry {
    #[serde(default)]
    pub dev: Option<String>,
    #[serde(default)]
    pub gateway: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LinkEntry {
    #[serde(default)]
    ifname: Option<String>,
    #[serde(default)]
    operstate: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AddrEntry {
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    addr_info: Vec<AddrInfo>,
}

#[derive(Debug, Deserialize)]
struct AddrInfo {
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    local: Option<String>,
    #[serde(default)]
    prefixlen: Option<u8>,
}

/// Reads interface, address, route and resolver state
pub struct NetworkInspector {
    runner: Arc<dyn CommandRunner>,
    netplan_dir: PathBuf,
    resolv_conf: PathBuf,
    timeout: Duration,
}

impl NetworkInspector {
    pub fn new(
        runner: Arc<dyn CommandRunner>,
        netplan_dir: PathBuf,
        resolv_conf: PathBuf,
        timeout: Duration,
    ) -> Self {
        Self {
            runner,
            netplan_dir,
            resolv_conf,
            timeout,
        }
    }

    /// Run `ip -j <args>` and decode its JSON array
    async fn ip_json<T: DeserializeOwned>(&self, args: &[&str]) -> Option<Vec<T>> {
        let mut full_args = vec!["-j"];
        full_args.extend_from_slice(args);
        let spec = CommandSpec::new("ip", &full_args, self.timeout);

        let output = match self.runner.run(spec).await {
            Ok(output) => output,
            Err(e) => {
                debug!("ip {} failed: {}", args.join(" "), e);
                return None;
            }
        };

        match serde_json::from_str(&output.stdout) {
            Ok(entries) => Some(entries),
            Err(e) => {
                debug!("Unparsable output from ip {}: {}", args.join(" "), e);
                None
            }
        }
    }

    /// First default route, if any
    pub async fn default_route(&self) -> Option<RouteEntry> {
        self.ip_json::<RouteEntry>(&["route", "show", "default"])
            .await
            .and_then(|routes| routes.into_iter().next())
    }

    /// First non-loopback link that is up
    async fn first_up_link(&self) -> Option<String> {
        let links = self.ip_json::<LinkEntry>(&["link", "show"]).await?;
        links
            .into_iter()
            .filter(|link| link.operstate.as_deref() == Some("UP"))
            .filter_map(|link| link.ifname)
            .find(|name| name != "lo")
    }

    /// Whether `name` is a link known to the kernel
    ///
    /// An unreadable link table counts as "not present".
    pub async fn interface_exists(&self, name: &str) -> bool {
        self.ip_json::<LinkEntry>(&["link", "show"])
            .await
            .unwrap_or_default()
            .into_iter()
            .any(|link| link.ifname.as_deref() == Some(name))
    }

    /// The interface holding the default route, falling back to the first
    /// non-loopback link that is up
    pub async fn default_interface(&self) -> Option<String> {
        let from_route = self
            .default_route()
            .await
            .and_then(|route| route.dev)
            .filter(|dev| !dev.is_empty());

        match from_route {
            Some(dev) => Some(dev),
            None => self.first_up_link().await,
        }
    }

    /// Assemble a fresh snapshot of the current network state
    pub async fn current_network_info(&self) -> CurrentNetworkInfo {
        let mut info = CurrentNetworkInfo {
            hostname: read_hostname(self.runner.as_ref(), self.timeout).await,
            ..CurrentNetworkInfo::default()
        };

        let route = self.default_route().await.unwrap_or_default();
        let interface = match route.dev.clone().filter(|d| !d.is_empty()) {
            Some(dev) => Some(dev),
            None => self.first_up_link().await,
        };

        let Some(interface) = interface else {
            return info;
        };

        if let Some(entries) = self.ip_json::<AddrEntry>(&["addr", "show", interface.as_str()]).await {
            if let Some(entry) = entries.into_iter().next() {
                if let Some(addr) = entry
                    .addr_info
                    .iter()
                    .find(|a| a.family.as_deref() == Some("inet"))
                {
                    info.ip = addr.local.clone();
                    info.cidr = addr.prefixlen;
                }
                info.mac = entry.address;
            }
        }

        info.gateway = route.gateway;
        info.dns = read_nameservers(&self.resolv_conf);
        info.dhcp = netplan_uses_dhcp(&self.netplan_dir);
        info.interface = Some(interface);

        info
    }
}

/// Kernel hostname, falling back to the `hostname` command
pub(crate) async fn read_hostname(runner: &dyn CommandRunner, timeout: Duration) -> Option<String> {
    if let Ok(name) = tokio::fs::read_to_string(KERNEL_HOSTNAME).await {
        let name = name.trim();
        if !name.is_empty() {
            return Some(name.to_string());
        }
    }

    runner
        .run(CommandSpec::new("hostname", &[], timeout))
        .await
        .ok()
        .map(|output| output.stdout.trim().to_string())
        .filter(|name| !name.is_empty())
}

/// Nameservers listed in a resolver configuration file
pub fn read_nameservers(path: &Path) -> Vec<String> {
    fs::read_to_string(path)
        .map(|content| parse_nameservers(&content))
        .unwrap_or_default()
}

fn parse_nameservers(content: &str) -> Vec<String> {
    content
        .lines()
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            match (fields.next(), fields.next()) {
                (Some("nameserver"), Some(server)) => Some(server.to_string()),
                _ => None,
            }
        })
        .collect()
}

/// Whether any netplan document in `dir` enables DHCPv4
pub fn netplan_uses_dhcp(dir: &Path) -> bool {
    let Ok(entries) = fs::read_dir(dir) else {
        return false;
    };

    let mut files: Vec<PathBuf> = entries
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| is_netplan_file(path))
        .collect();
    files.sort();

    files.iter().any(|path| {
        fs::read_to_string(path)
            .map(|content| content.contains("dhcp4: true") || content.contains("dhcp4: yes"))
            .unwrap_or(false)
    })
}

/// `.yaml` / `.yml` files are netplan documents
pub fn is_netplan_file(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("yaml") | Some("yml")
    )
}
