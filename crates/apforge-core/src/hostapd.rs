//! hostapd configuration document.

use crate::bssid::MacAddress;
use crate::config::RadioDefaults;
use crate::interface::InterfaceId;

/// Radio-wide directives, emitted once at the top of the document.
#[derive(Debug, Clone)]
pub struct RadioSection<'a> {
    pub defaults: &'a RadioDefaults,
    /// Probed 802.11n support, or the configured default.
    pub ieee80211n: bool,
    pub channel: u16,
    pub ht_capab: &'a str,
    /// Interface of the primary network.
    pub interface: &'a InterfaceId,
}

/// One SSID. `bss` is set for every network after the primary one.
#[derive(Debug, Clone)]
pub struct BssSection<'a> {
    pub bss: Option<(&'a InterfaceId, MacAddress)>,
    pub ssid: &'a str,
    /// Hex PSK; the WPA block is omitted when `None`.
    pub psk: Option<&'a str>,
}

fn flag(value: bool) -> &'static str {
    if value {
        "1"
    } else {
        "0"
    }
}

/// Render the full document: radio section, primary SSID, then secondaries
/// in order. One directive per line, no blank lines, trailing newline.
pub fn render_hostapd(radio: &RadioSection<'_>, bsses: &[BssSection<'_>]) -> String {
    let d = radio.defaults;
    let mut lines = vec![
        format!("ctrl_interface={}", d.ctrl_interface),
        format!("driver={}", d.driver),
        format!("hw_mode={}", d.hw_mode),
        format!("ieee80211n={}", flag(radio.ieee80211n)),
        format!("ieee80211d={}", flag(d.ieee80211d)),
        format!("country_code={}", d.country_code),
        format!("wme_enabled={}", flag(d.wme_enabled)),
        format!("wmm_enabled={}", flag(d.wmm_enabled)),
        format!("channel={}", radio.channel),
        format!("ht_capab={}", radio.ht_capab),
        format!("interface={}", radio.interface),
    ];

    for section in bsses {
        if let Some((interface, bssid)) = &section.bss {
            lines.push(format!("bss={interface}"));
            lines.push(format!("bssid={bssid}"));
        }
        lines.push(format!("ssid={}", section.ssid));
        if let Some(psk) = section.psk {
            push_wpa_block(&mut lines, psk);
        }
    }

    let mut out = lines.join("\n");
    out.push('\n');
    out
}

/// WPA2-PSK with CCMP, open authentication, visible SSID.
fn push_wpa_block(lines: &mut Vec<String>, psk: &str) {
    lines.extend(
        [
            "macaddr_acl=0",
            "auth_algs=1",
            "ignore_broadcast_ssid=0",
            "wpa=2",
            "wpa_key_mgmt=WPA-PSK",
            "rsn_pairwise=CCMP",
        ]
        .iter()
        .map(|line| line.to_string()),
    );
    lines.push(format!("wpa_psk={psk}"));
}
