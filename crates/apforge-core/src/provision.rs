//! A single provisioning run: load networks, allocate, probe, synthesize,
//! write.

use std::collections::BTreeSet;
use std::path::PathBuf;

use serde::Serialize;

use crate::bssid::MacAddress;
use crate::capabilities::first_phy_name;
use crate::config::ProvisionConfig;
use crate::error::Result;
use crate::fs::{read_channel, read_value, remove_if_exists, write_all_atomic};
use crate::interface::InterfaceId;
use crate::network::{enabled_networks, Network, NETWORK_NAMES};
use crate::probe::RadioProbe;
use crate::synth::{ConfigSynthesizer, Documents, RadioInfo};

/// Display name used when neither the nodename file nor the host name is
/// available.
pub const FALLBACK_NODENAME: &str = "apforge";

#[derive(Debug, Clone, Serialize)]
pub struct ProvisionOutcome {
    pub networks: Vec<Network>,
    pub documents: Option<Documents>,
    /// Files replaced on disk; empty for dry runs and when nothing is enabled.
    pub written: Vec<PathBuf>,
    /// dnsmasq documents of disabled networks that were deleted.
    pub removed: Vec<PathBuf>,
}

pub struct Provisioner<'a, P: RadioProbe> {
    cfg: &'a ProvisionConfig,
    probe: &'a P,
}

impl<'a, P: RadioProbe> Provisioner<'a, P> {
    pub fn new(cfg: &'a ProvisionConfig, probe: &'a P) -> Self {
        Self { cfg, probe }
    }

    /// Node name from the override file, else the short host name.
    pub fn display_name(&self) -> String {
        if let Some(name) = read_value(&self.cfg.nodename_file) {
            return name;
        }
        match self.probe.hostname() {
            Ok(name) => name,
            Err(err) => {
                tracing::warn!("Using '{FALLBACK_NODENAME}' as node name: {err}");
                FALLBACK_NODENAME.to_string()
            }
        }
    }

    pub fn phy_name(&self) -> String {
        match self.probe.phy_list() {
            Ok(list) => first_phy_name(&list).unwrap_or_else(|| {
                tracing::warn!("No wiphy in 'iw list', using {}", self.cfg.radio.phy);
                self.cfg.radio.phy.clone()
            }),
            Err(err) => {
                tracing::warn!("Using {}: {err}", self.cfg.radio.phy);
                self.cfg.radio.phy.clone()
            }
        }
    }

    /// First wireless interface on the system, else the configured default.
    pub fn base_interface(&self) -> InterfaceId {
        let discovered = match self.probe.wireless_interfaces() {
            Ok(names) => names.into_iter().find_map(|name| name.parse().ok()),
            Err(err) => {
                tracing::warn!("Wireless interface discovery failed: {err}");
                None
            }
        };
        discovered.unwrap_or_else(|| self.cfg.network.base_interface.clone())
    }

    fn radio_info(&self, primary: &InterfaceId) -> RadioInfo {
        let phy = self.phy_name();
        let report = self
            .probe
            .phy_info(&phy)
            .map_err(|err| tracing::warn!("No capability report for {phy}: {err}"))
            .ok();
        let primary_mac: Option<MacAddress> = self
            .probe
            .mac_address(primary.as_str())
            .map_err(|err| tracing::warn!("No MAC for {primary}, using placeholder: {err}"))
            .ok();

        RadioInfo {
            report,
            channel: read_channel(&self.cfg.channel_file(), self.cfg.radio.channel),
            primary_mac,
        }
    }

    /// Everything except writing: the enabled networks with their
    /// assignments and the rendered documents.
    pub fn plan(&self) -> Result<ProvisionOutcome> {
        let display_name = self.display_name();
        let mut networks = enabled_networks(&self.cfg.config_dir, &display_name);
        tracing::info!(
            "Enabled networks: {:?}",
            networks.iter().map(|n| n.name.as_str()).collect::<Vec<_>>()
        );
        if networks.is_empty() {
            return Ok(ProvisionOutcome {
                networks,
                documents: None,
                written: Vec::new(),
                removed: Vec::new(),
            });
        }

        // The physical radio always carries the primary SSID.
        let base_interface = self.base_interface();
        for network in networks.iter_mut().skip(1) {
            if network.interface() == Some(&base_interface) {
                tracing::warn!(
                    "Ignoring {} pin to {}: the radio interface belongs to the primary network",
                    network.name,
                    base_interface
                );
                network.release_pin();
            }
        }

        let mut interfaces: BTreeSet<InterfaceId> =
            networks.iter().filter_map(|n| n.interface().cloned()).collect();
        let mut subnets = BTreeSet::new();
        for network in &mut networks {
            network.assign_subnet(self.cfg.network.base_subnet, &mut subnets)?;
            network.assign_interface(&base_interface, &mut interfaces)?;
        }

        let info = match networks.first().and_then(|n| n.interface()) {
            Some(primary) => self.radio_info(primary),
            None => RadioInfo::default(),
        };
        let synth = ConfigSynthesizer::new(&self.cfg.radio, &self.cfg.network, &display_name);
        let documents = synth.build(&networks, &info)?;

        Ok(ProvisionOutcome {
            networks,
            documents,
            written: Vec::new(),
            removed: Vec::new(),
        })
    }

    /// Plan, then replace the documents on disk unless `dry_run`.
    ///
    /// All documents are staged before any of them replaces its target, so a
    /// failed write leaves the previous configuration in place. Once they are
    /// in place, the dnsmasq documents of disabled networks are deleted.
    /// Nothing is written or deleted when no network is enabled.
    pub fn provision(&self, dry_run: bool) -> Result<ProvisionOutcome> {
        let mut outcome = self.plan()?;
        let Some(documents) = &outcome.documents else {
            tracing::info!("No enabled networks, leaving existing configuration untouched");
            return Ok(outcome);
        };
        if dry_run {
            return Ok(outcome);
        }

        let mut targets = vec![(self.cfg.hostapd_conf.clone(), documents.hostapd.as_str())];
        targets.extend(documents.dnsmasq.iter().map(|doc| {
            (self.cfg.dnsmasq_conf(&doc.network), doc.contents.as_str())
        }));
        let written = write_all_atomic(targets)?;
        for path in &written {
            tracing::info!("Wrote {}", path.display());
        }

        let mut removed = Vec::new();
        for name in NETWORK_NAMES {
            if documents.dnsmasq.iter().any(|doc| doc.network == name) {
                continue;
            }
            let stale = self.cfg.dnsmasq_conf(name);
            if remove_if_exists(&stale)? {
                tracing::info!("Removed {} of disabled network {}", stale.display(), name);
                removed.push(stale);
            }
        }

        outcome.written = written;
        outcome.removed = removed;
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::probe::tests::MockProbe;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    fn config(root: &Path) -> ProvisionConfig {
        ProvisionConfig {
            config_dir: root.join("wifi"),
            hostapd_conf: root.join("hostapd").join("hostapd.conf"),
            dnsmasq_dir: root.join("dnsmasq.d"),
            nodename_file: root.join("nodename"),
            state_root: root.join("state"),
            ..ProvisionConfig::default()
        }
    }

    #[test]
    fn test_display_name_precedence() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        let mut probe = MockProbe::default();

        assert_eq!(Provisioner::new(&cfg, &probe).display_name(), FALLBACK_NODENAME);

        probe.hostname = Some("raspberrypi".to_string());
        assert_eq!(Provisioner::new(&cfg, &probe).display_name(), "raspberrypi");

        fs::write(&cfg.nodename_file, "kitchen.example.org\n").unwrap();
        assert_eq!(
            Provisioner::new(&cfg, &probe).display_name(),
            "kitchen.example.org"
        );
    }

    #[test]
    fn test_phy_and_interface_fallbacks() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        let mut probe = MockProbe::default();

        let prov = Provisioner::new(&cfg, &probe);
        assert_eq!(prov.phy_name(), "phy0");
        assert_eq!(prov.base_interface().as_str(), "wlan0");

        probe.phy_list = Some("Wiphy phy3\n".to_string());
        probe.interfaces = vec!["wlp2s0".to_string()];
        let prov = Provisioner::new(&cfg, &probe);
        assert_eq!(prov.phy_name(), "phy3");
        assert_eq!(prov.base_interface().as_str(), "wlp2s0");
    }

    #[test]
    fn test_nothing_enabled_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        fs::create_dir_all(cfg.hostapd_conf.parent().unwrap()).unwrap();
        fs::write(&cfg.hostapd_conf, "stale\n").unwrap();
        let probe = MockProbe::default();

        let outcome = Provisioner::new(&cfg, &probe).provision(false).unwrap();
        assert!(outcome.networks.is_empty());
        assert!(outcome.documents.is_none());
        assert!(outcome.written.is_empty());
        assert_eq!(fs::read_to_string(&cfg.hostapd_conf).unwrap(), "stale\n");
    }

    fn enable_both(cfg: &ProvisionConfig, guest_pin: Option<&str>) {
        let guest = cfg.config_dir.join("guest");
        fs::create_dir_all(&guest).unwrap();
        fs::write(cfg.config_dir.join("enabled"), "").unwrap();
        fs::write(guest.join("enabled"), "").unwrap();
        if let Some(pin) = guest_pin {
            fs::write(guest.join("interface"), pin).unwrap();
        }
    }

    fn interface_names(outcome: &ProvisionOutcome) -> Vec<&str> {
        outcome
            .networks
            .iter()
            .map(|n| n.interface().unwrap().as_str())
            .collect()
    }

    #[test]
    fn test_pinned_interface_is_skipped_by_allocation() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        enable_both(&cfg, Some("wlan1"));
        let probe = MockProbe::default();

        let outcome = Provisioner::new(&cfg, &probe).plan().unwrap();
        assert_eq!(interface_names(&outcome), vec!["wlan0", "wlan1"]);

        fs::write(cfg.config_dir.join("guest").join("interface"), "wlan3").unwrap();
        let outcome = Provisioner::new(&cfg, &probe).plan().unwrap();
        assert_eq!(interface_names(&outcome), vec!["wlan0", "wlan3"]);
    }

    #[test]
    fn test_guest_pin_on_radio_interface_is_ignored() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        enable_both(&cfg, Some("wlan0"));
        let mut probe = MockProbe::default();
        probe.interfaces = vec!["wlan0".to_string()];
        probe
            .macs
            .insert("wlan0".to_string(), "00:0e:8e:64:2a:00".parse().unwrap());

        let outcome = Provisioner::new(&cfg, &probe).plan().unwrap();
        assert_eq!(interface_names(&outcome), vec!["wlan0", "wlan1"]);

        let hostapd = outcome.documents.unwrap().hostapd;
        assert!(hostapd.contains("interface=wlan0\n"));
        assert!(hostapd.contains("bssid=02:0e:8e:64:2a:01\n"));
    }

    #[test]
    fn test_failed_dnsmasq_write_keeps_old_hostapd() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        enable_both(&cfg, None);
        fs::create_dir_all(cfg.hostapd_conf.parent().unwrap()).unwrap();
        fs::write(&cfg.hostapd_conf, "OLD\n").unwrap();
        // dnsmasq_dir is a regular file, so no document can be placed in it
        fs::write(&cfg.dnsmasq_dir, "").unwrap();
        let probe = MockProbe::default();

        assert!(Provisioner::new(&cfg, &probe).provision(false).is_err());
        assert_eq!(fs::read_to_string(&cfg.hostapd_conf).unwrap(), "OLD\n");
        let leftovers: Vec<_> = fs::read_dir(cfg.hostapd_conf.parent().unwrap())
            .unwrap()
            .map(|entry| entry.unwrap().file_name())
            .collect();
        assert_eq!(leftovers, vec![std::ffi::OsString::from("hostapd.conf")]);
    }

    #[test]
    fn test_disabling_guest_removes_its_dnsmasq_document() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        enable_both(&cfg, None);
        let probe = MockProbe::default();

        let outcome = Provisioner::new(&cfg, &probe).provision(false).unwrap();
        assert_eq!(outcome.written.len(), 3);
        assert!(cfg.dnsmasq_conf("public").exists());

        fs::remove_file(cfg.config_dir.join("guest").join("enabled")).unwrap();
        let outcome = Provisioner::new(&cfg, &probe).provision(false).unwrap();
        assert_eq!(outcome.removed, vec![cfg.dnsmasq_conf("public")]);
        assert!(!cfg.dnsmasq_conf("public").exists());
        assert!(cfg.dnsmasq_conf("private").exists());
        assert!(!fs::read_to_string(&cfg.hostapd_conf).unwrap().contains("bss="));
    }

    #[test]
    fn test_dry_run_removes_nothing() {
        let tmp = TempDir::new().unwrap();
        let cfg = config(tmp.path());
        fs::create_dir_all(&cfg.config_dir).unwrap();
        fs::write(cfg.config_dir.join("enabled"), "").unwrap();
        fs::create_dir_all(&cfg.dnsmasq_dir).unwrap();
        fs::write(cfg.dnsmasq_conf("public"), "interface=wlan1\n").unwrap();
        let probe = MockProbe::default();

        let outcome = Provisioner::new(&cfg, &probe).provision(true).unwrap();
        assert!(outcome.removed.is_empty());
        assert!(cfg.dnsmasq_conf("public").exists());
    }
}
