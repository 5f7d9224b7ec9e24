//! Radio capability probing.
//!
//! Turns the `iw phy <phy> info` report (or the raw nl80211 HT capability
//! word) into the `ht_capab=` bitmask hostapd expects.

use std::sync::OnceLock;

use regex::Regex;

use crate::error::{ProvisionError, Result};

/// Channels below this bond upward (`HT40+`), the rest downward (`HT40-`).
const HT40_PLUS_BELOW_CHANNEL: u16 = 8;

fn band_one_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)band\s+1:").expect("static regex"))
}

fn capabilities_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?is)capabilities:(?P<caps>.*?)frequencies:").expect("static regex")
    })
}

fn ht_mode_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)HT[248]0").expect("static regex"))
}

fn wiphy_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?m)^Wiphy\s+([A-Za-z0-9_-]+)").expect("static regex"))
}

/// HT capabilities relevant to `ht_capab=`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HtCapabilities {
    pub ht20: bool,
    pub ht40: bool,
    pub short_gi_20: bool,
    pub short_gi_40: bool,
    pub dsss_cck_40: bool,
    pub max_amsdu_3839: bool,
    pub tx_stbc: bool,
    pub rx_stbc1: bool,
}

impl HtCapabilities {
    /// Parse the capabilities section of an `iw phy info` report.
    ///
    /// The section runs from `capabilities:` to the next `frequencies:`,
    /// taken from the `Band 1:` block when there is one. Section markers are
    /// matched case-insensitively; the feature strings are not.
    pub fn from_report(raw: &str) -> Result<Self> {
        let scoped = match band_one_re().find(raw) {
            Some(band) => &raw[band.start()..],
            None => raw,
        };
        let caps = capabilities_re()
            .captures(scoped)
            .and_then(|c| c.name("caps"))
            .map(|m| m.as_str())
            .ok_or_else(|| ProvisionError::CapabilityParse {
                reason: "no 'capabilities:' ... 'frequencies:' section".to_string(),
            })?;

        Ok(Self {
            ht20: caps.contains("HT20"),
            ht40: caps.contains("HT40"),
            short_gi_20: caps.contains("HT20 SGI"),
            short_gi_40: caps.contains("HT40 SGI"),
            dsss_cck_40: caps.contains("DSSS/CCK HT40"),
            max_amsdu_3839: caps.contains("MAX AMSDU LENGTH: 3839"),
            tx_stbc: caps.contains("TX STBC"),
            rx_stbc1: caps.contains("RX STBC 1"),
        })
    }

    /// Decode an `NL80211_BAND_ATTR_HT_CAPA` word (802.11n HT Capability
    /// Info field).
    pub fn from_ht_capa(capa: u16) -> Self {
        Self {
            ht20: capa & 0x0002 == 0,
            ht40: capa & 0x0002 != 0,
            short_gi_20: capa & 0x0020 != 0,
            short_gi_40: capa & 0x0040 != 0,
            dsss_cck_40: capa & 0x1000 != 0,
            max_amsdu_3839: capa & 0x0800 == 0,
            tx_stbc: capa & 0x0080 != 0,
            rx_stbc1: (capa >> 8) & 0x3 == 1,
        }
    }

    /// Render the bracketed tokens, in fixed order, with no separators.
    pub fn to_bitmask(&self, channel: u16) -> String {
        let ht40 = if channel < HT40_PLUS_BELOW_CHANNEL {
            "[HT40+]"
        } else {
            "[HT40-]"
        };
        let tokens: [(bool, &str); 8] = [
            (self.ht20, "[HT20]"),
            (self.ht40, ht40),
            (self.short_gi_20, "[SHORT-GI-20]"),
            (self.short_gi_40, "[SHORT-GI-40]"),
            (self.dsss_cck_40, "[DSSS_CCK-40]"),
            (self.max_amsdu_3839, "[MAX-AMSDU-3839]"),
            (self.tx_stbc, "[TX-STBC]"),
            (self.rx_stbc1, "[RX-STBC1]"),
        ];
        tokens
            .iter()
            .filter(|(present, _)| *present)
            .map(|(_, token)| *token)
            .collect()
    }
}

/// Capability bitmask for `raw_report` on `channel`.
pub fn parse_capabilities(raw_report: &str, channel: u16) -> Result<String> {
    Ok(HtCapabilities::from_report(raw_report)?.to_bitmask(channel))
}

/// Like [`parse_capabilities`], degrading to an empty bitmask.
pub fn capability_bitmask_or_empty(raw_report: &str, channel: u16) -> String {
    match parse_capabilities(raw_report, channel) {
        Ok(mask) => mask,
        Err(err) => {
            tracing::warn!("Using empty ht_capab: {err}");
            String::new()
        }
    }
}

/// Whether the radio report advertises any HT (802.11n) mode.
pub fn supports_ieee80211n(raw_report: &str) -> bool {
    ht_mode_re().is_match(raw_report)
}

/// Name of the first physical radio in `iw list` output.
pub fn first_phy_name(iw_list: &str) -> Option<String> {
    wiphy_re()
        .captures(iw_list)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
