//! Logical Wi-Fi networks and their on-disk layout.
//!
//! The primary network keeps its files directly in the config directory; the
//! guest network lives in a `guest/` subdirectory:
//!
//! ```text
//! <config_dir>/enabled     present => network is up
//! <config_dir>/password    WPA passphrase, open network when absent
//! <config_dir>/ssid        optional SSID override
//! <config_dir>/interface   optional pinned interface name
//! <config_dir>/channel     radio channel shared by all networks
//! <config_dir>/guest/...   same files for the public network
//! ```

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use ipnet::Ipv4Net;
use serde::Serialize;

use crate::addressing::allocate_subnet_into;
use crate::error::Result;
use crate::fs::{read_flag, read_value};
use crate::interface::{allocate_interface_into, InterfaceId};
use crate::psk::derive_optional_psk;

pub const PRIVATE: &str = "private";
pub const PUBLIC: &str = "public";
/// Every network the configuration tree can describe, primary first.
pub const NETWORK_NAMES: [&str; 2] = [PRIVATE, PUBLIC];
const PUBLIC_SUBDIR: &str = "guest";

/// Longest SSID 802.11 allows, in bytes.
pub const MAX_SSID_LEN: usize = 32;

/// One logical network for the duration of a provisioning run.
///
/// Subnet and interface start unassigned and are fixed by the first
/// allocation; later calls return the same value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Network {
    pub name: String,
    pub ssid: String,
    #[serde(skip)]
    passphrase: Option<String>,
    pub enabled: bool,
    subnet: Option<Ipv4Net>,
    interface: Option<InterfaceId>,
}

impl Network {
    /// A disabled, open network. The SSID is clamped to [`MAX_SSID_LEN`].
    pub fn new(name: impl Into<String>, ssid: &str) -> Self {
        Self {
            name: name.into(),
            ssid: clamp_ssid(ssid).to_string(),
            passphrase: None,
            enabled: false,
            subnet: None,
            interface: None,
        }
    }

    #[must_use]
    pub fn with_passphrase(mut self, passphrase: impl Into<String>) -> Self {
        self.passphrase = Some(passphrase.into());
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Pin the network to an interface that already exists on the system.
    #[must_use]
    pub fn with_interface(mut self, interface: InterfaceId) -> Self {
        self.interface = Some(interface);
        self
    }

    /// Drop a pinned interface before allocation.
    pub(crate) fn release_pin(&mut self) -> Option<InterfaceId> {
        self.interface.take()
    }

    pub fn is_primary(&self) -> bool {
        self.name == PRIVATE
    }

    pub fn subnet(&self) -> Option<Ipv4Net> {
        self.subnet
    }

    pub fn interface(&self) -> Option<&InterfaceId> {
        self.interface.as_ref()
    }

    pub fn has_passphrase(&self) -> bool {
        self.passphrase.is_some()
    }

    /// Hex WPA PSK, `None` for an open network.
    pub fn psk(&self) -> Option<String> {
        derive_optional_psk(&self.ssid, self.passphrase.as_deref())
    }

    /// The assigned subnet, allocating from `base` on first use.
    pub fn assign_subnet(&mut self, base: Ipv4Net, taken: &mut BTreeSet<Ipv4Net>) -> Result<Ipv4Net> {
        if let Some(subnet) = self.subnet {
            return Ok(subnet);
        }
        let subnet = allocate_subnet_into(base, taken)?;
        tracing::debug!("Network {} assigned subnet {}", self.name, subnet);
        self.subnet = Some(subnet);
        Ok(subnet)
    }

    /// The assigned interface, allocating from `base` on first use.
    pub fn assign_interface(
        &mut self,
        base: &InterfaceId,
        taken: &mut BTreeSet<InterfaceId>,
    ) -> Result<InterfaceId> {
        if let Some(interface) = &self.interface {
            return Ok(interface.clone());
        }
        let interface = allocate_interface_into(base, taken)?;
        tracing::debug!("Network {} assigned interface {}", self.name, interface);
        self.interface = Some(interface.clone());
        Ok(interface)
    }
}

/// Truncate to at most [`MAX_SSID_LEN`] bytes on a character boundary.
pub fn clamp_ssid(ssid: &str) -> &str {
    let ssid = ssid.trim();
    if ssid.len() <= MAX_SSID_LEN {
        return ssid;
    }
    let mut end = MAX_SSID_LEN;
    while !ssid.is_char_boundary(end) {
        end -= 1;
    }
    &ssid[..end]
}

/// Directory holding a network's files.
pub fn network_dir(config_dir: &Path, name: &str) -> PathBuf {
    if name == PRIVATE {
        config_dir.to_path_buf()
    } else {
        config_dir.join(PUBLIC_SUBDIR)
    }
}

fn default_ssid(name: &str, display_name: &str) -> String {
    if name == PRIVATE {
        display_name.to_string()
    } else {
        format!("{display_name} ({name})")
    }
}

/// Load one network from `dir`.
pub fn load_network(dir: &Path, name: &str, display_name: &str) -> Network {
    let ssid = read_value(&dir.join("ssid")).unwrap_or_else(|| default_ssid(name, display_name));
    let mut network = Network::new(name, &ssid).enabled(read_flag(&dir.join("enabled")));

    if let Some(passphrase) = read_value(&dir.join("password")) {
        network = network.with_passphrase(passphrase);
    }

    if let Some(raw) = read_value(&dir.join("interface")) {
        match raw.parse::<InterfaceId>() {
            Ok(interface) => network = network.with_interface(interface),
            Err(err) => tracing::warn!("Ignoring pinned interface for {name}: {err}"),
        }
    }

    network
}

/// All configured networks, primary first.
pub fn load_networks(config_dir: &Path, display_name: &str) -> Vec<Network> {
    NETWORK_NAMES
        .iter()
        .map(|name| load_network(&network_dir(config_dir, name), name, display_name))
        .collect()
}

/// Enabled networks from `config_dir`, primary first.
pub fn enabled_networks(config_dir: &Path, display_name: &str) -> Vec<Network> {
    load_networks(config_dir, display_name)
        .into_iter()
        .filter(|network| network.enabled)
        .collect()
}
