//! Turns the enabled networks into hostapd and dnsmasq documents.

use serde::Serialize;

use crate::addressing::SubnetPlan;
use crate::bssid::{BssidSequencer, MacAddress};
use crate::capabilities::{capability_bitmask_or_empty, supports_ieee80211n};
use crate::config::{NetworkDefaults, RadioDefaults};
use crate::dnsmasq::{gateway_names, render_dnsmasq, DhcpSection};
use crate::error::{ProvisionError, Result};
use crate::hostapd::{render_hostapd, BssSection, RadioSection};
use crate::interface::InterfaceId;
use crate::network::Network;

/// What was learned about the radio for this run.
#[derive(Debug, Clone, Default)]
pub struct RadioInfo {
    /// `iw phy <phy> info` output, `None` when the probe failed.
    pub report: Option<String>,
    pub channel: u16,
    /// Hardware MAC of the primary interface.
    pub primary_mac: Option<MacAddress>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DnsmasqDocument {
    pub network: String,
    pub interface: InterfaceId,
    pub contents: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Documents {
    pub hostapd: String,
    /// In network order.
    pub dnsmasq: Vec<DnsmasqDocument>,
}

pub struct ConfigSynthesizer<'a> {
    radio: &'a RadioDefaults,
    network: &'a NetworkDefaults,
    gateway_names: Vec<String>,
}

impl<'a> ConfigSynthesizer<'a> {
    pub fn new(radio: &'a RadioDefaults, network: &'a NetworkDefaults, display_name: &str) -> Self {
        Self {
            radio,
            network,
            gateway_names: gateway_names(display_name, &network.dns_aliases),
        }
    }

    /// Render documents for `networks`, which must be enabled, in order with
    /// the primary first, and already have subnet and interface assigned.
    ///
    /// Returns `None` when `networks` is empty. Secondary networks take
    /// BSSIDs from a sequencer seeded with the primary MAC, falling back to
    /// the placeholder MAC.
    pub fn build(&self, networks: &[Network], info: &RadioInfo) -> Result<Option<Documents>> {
        let Some(primary) = networks.first() else {
            return Ok(None);
        };
        let primary_interface = assigned_interface(primary)?;

        let (ieee80211n, ht_capab) = match info.report.as_deref() {
            Some(report) => (
                supports_ieee80211n(report),
                capability_bitmask_or_empty(report, info.channel),
            ),
            None => (self.radio.ieee80211n, String::new()),
        };

        let psks: Vec<Option<String>> = networks.iter().map(Network::psk).collect();
        let mut sequencer = BssidSequencer::from_probe(info.primary_mac);
        let mut bsses = Vec::with_capacity(networks.len());
        for (idx, (network, psk)) in networks.iter().zip(&psks).enumerate() {
            let bss = if idx == 0 {
                None
            } else {
                Some((assigned_interface(network)?, sequencer.next_bssid()?))
            };
            bsses.push(BssSection {
                bss,
                ssid: &network.ssid,
                psk: psk.as_deref(),
            });
        }

        let hostapd = render_hostapd(
            &RadioSection {
                defaults: self.radio,
                ieee80211n,
                channel: info.channel,
                ht_capab: &ht_capab,
                interface: primary_interface,
            },
            &bsses,
        );

        let dnsmasq = networks
            .iter()
            .map(|network| self.dnsmasq_document(network))
            .collect::<Result<Vec<_>>>()?;

        Ok(Some(Documents { hostapd, dnsmasq }))
    }

    fn dnsmasq_document(&self, network: &Network) -> Result<DnsmasqDocument> {
        let interface = assigned_interface(network)?;
        let subnet = network.subnet().ok_or_else(|| ProvisionError::Unassigned {
            network: network.name.clone(),
            what: "subnet".to_string(),
        })?;
        let plan = SubnetPlan::carve(subnet, self.network.reserved_head, self.network.reserved_tail)?;

        let contents = render_dnsmasq(&DhcpSection {
            interface,
            plan: &plan,
            names: &self.gateway_names,
            lease_time: &self.network.lease_time,
        });
        Ok(DnsmasqDocument {
            network: network.name.clone(),
            interface: interface.clone(),
            contents,
        })
    }
}

fn assigned_interface(network: &Network) -> Result<&InterfaceId> {
    network.interface().ok_or_else(|| ProvisionError::Unassigned {
        network: network.name.clone(),
        what: "interface".to_string(),
    })
}
