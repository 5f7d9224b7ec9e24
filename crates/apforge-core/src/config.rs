use std::env;
use std::fs;
use std::net::Ipv4Addr;
use std::path::{Path, PathBuf};

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};
use crate::interface::InterfaceId;

pub const DEFAULT_CONFIG_DIR: &str = "/etc/apforge/wifi";
pub const DEFAULT_HOSTAPD_CONF: &str = "/etc/hostapd/hostapd.conf";
pub const DEFAULT_DNSMASQ_DIR: &str = "/etc/dnsmasq.d";
pub const DEFAULT_NODENAME_FILE: &str = "/etc/apforge/nodename";
pub const DEFAULT_STATE_ROOT: &str = "/var/lib/apforge";
pub const OVERRIDE_FILENAME: &str = "apforge.json";

/// Radio-level hostapd settings shared by every network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RadioDefaults {
    pub ctrl_interface: String,
    pub driver: String,
    pub hw_mode: String,
    /// Used only when the radio report cannot be read.
    pub ieee80211n: bool,
    pub ieee80211d: bool,
    pub country_code: String,
    pub wme_enabled: bool,
    pub wmm_enabled: bool,
    pub channel: u16,
    /// Physical radio queried when `iw list` names none.
    pub phy: String,
}

impl Default for RadioDefaults {
    fn default() -> Self {
        Self {
            ctrl_interface: "/var/run/hostapd".to_string(),
            driver: "nl80211".to_string(),
            hw_mode: "g".to_string(),
            ieee80211n: false,
            ieee80211d: true,
            country_code: "US".to_string(),
            wme_enabled: true,
            wmm_enabled: true,
            channel: 1,
            phy: "phy0".to_string(),
        }
    }
}

/// Allocation and DHCP settings applied to each network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkDefaults {
    /// First candidate subnet; its prefix length is the allocation unit.
    pub base_subnet: Ipv4Net,
    /// Interface name used when no wireless interface is discovered.
    pub base_interface: InterfaceId,
    /// Extra names resolving to each network's gateway.
    pub dns_aliases: Vec<String>,
    pub lease_time: String,
    pub reserved_head: u32,
    pub reserved_tail: u32,
}

impl Default for NetworkDefaults {
    fn default() -> Self {
        Self {
            base_subnet: Ipv4Net::new(Ipv4Addr::new(10, 42, 0, 0), 16)
                .expect("prefix 16 is within 0..=32"),
            base_interface: InterfaceId::default_radio(),
            dns_aliases: Vec::new(),
            lease_time: "24h".to_string(),
            reserved_head: 8,
            reserved_tail: 5,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProvisionConfig {
    pub config_dir: PathBuf,
    pub hostapd_conf: PathBuf,
    /// One `<network>.conf` per network is written here.
    pub dnsmasq_dir: PathBuf,
    pub nodename_file: PathBuf,
    /// Logs and logging config.
    pub state_root: PathBuf,
    pub radio: RadioDefaults,
    pub network: NetworkDefaults,
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            config_dir: PathBuf::from(DEFAULT_CONFIG_DIR),
            hostapd_conf: PathBuf::from(DEFAULT_HOSTAPD_CONF),
            dnsmasq_dir: PathBuf::from(DEFAULT_DNSMASQ_DIR),
            nodename_file: PathBuf::from(DEFAULT_NODENAME_FILE),
            state_root: PathBuf::from(DEFAULT_STATE_ROOT),
            radio: RadioDefaults::default(),
            network: NetworkDefaults::default(),
        }
    }
}

impl ProvisionConfig {
    /// Resolve the configuration once for this run.
    ///
    /// Precedence, lowest first: compiled defaults, `<config_dir>/apforge.json`,
    /// `APFORGE_*` environment variables, then `config_dir_flag`. The config
    /// directory itself comes from the flag, `APFORGE_CONFIG_DIR` or the
    /// default, in that order.
    pub fn load(config_dir_flag: Option<PathBuf>) -> Result<Self> {
        let config_dir = config_dir_flag
            .clone()
            .or_else(|| env::var("APFORGE_CONFIG_DIR").ok().map(PathBuf::from))
            .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_DIR));

        let mut cfg = Self::from_override_file(&config_dir.join(OVERRIDE_FILENAME))?
            .unwrap_or_default();
        cfg.config_dir = config_dir;
        cfg.apply_env()?;
        if let Some(dir) = config_dir_flag {
            cfg.config_dir = dir;
        }
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reject merged radio settings that hostapd would refuse.
    pub fn validate(&self) -> Result<()> {
        let code = &self.radio.country_code;
        if code.len() != 2 || !code.chars().all(|c| c.is_ascii_uppercase()) {
            return Err(ProvisionError::invalid_config(
                "radio.country_code",
                code,
                "expected a two-letter ISO 3166 code",
            ));
        }
        if self.radio.channel == 0 {
            return Err(ProvisionError::invalid_config(
                "radio.channel",
                "0",
                "expected a positive channel number",
            ));
        }
        Ok(())
    }

    /// Parse an override file; missing keys keep their defaults.
    pub fn from_override_file(path: &Path) -> Result<Option<Self>> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(ProvisionError::io_error(
                    format!("reading {}", path.display()),
                    err,
                ))
            }
        };
        serde_json::from_str(&text)
            .map(Some)
            .map_err(|source| ProvisionError::Json {
                what: path.display().to_string(),
                source,
            })
    }

    fn apply_env(&mut self) -> Result<()> {
        if let Some(path) = env_path("APFORGE_HOSTAPD_CONF") {
            self.hostapd_conf = path;
        }
        if let Some(path) = env_path("APFORGE_DNSMASQ_DIR") {
            self.dnsmasq_dir = path;
        }
        if let Some(path) = env_path("APFORGE_NODENAME_FILE") {
            self.nodename_file = path;
        }
        if let Some(path) = env_path("APFORGE_STATE_ROOT") {
            self.state_root = path;
        }

        if let Ok(value) = env::var("APFORGE_BASE_SUBNET") {
            self.network.base_subnet = value.trim().parse().map_err(|_| {
                ProvisionError::invalid_config("APFORGE_BASE_SUBNET", &value, "not an IPv4 CIDR")
            })?;
        }
        if let Ok(value) = env::var("APFORGE_BASE_INTERFACE") {
            self.network.base_interface = value.parse()?;
        }
        if let Some(aliases) = env_list("APFORGE_DNS_ALIASES") {
            self.network.dns_aliases = aliases;
        }
        if let Ok(value) = env::var("APFORGE_COUNTRY_CODE") {
            let code = value.trim().to_ascii_uppercase();
            if code.len() != 2 || !code.chars().all(|c| c.is_ascii_alphabetic()) {
                return Err(ProvisionError::invalid_config(
                    "APFORGE_COUNTRY_CODE",
                    &value,
                    "expected a two-letter ISO 3166 code",
                ));
            }
            self.radio.country_code = code;
        }
        if let Ok(value) = env::var("APFORGE_CHANNEL") {
            self.radio.channel = match value.trim().parse::<u16>() {
                Ok(channel) if channel > 0 => channel,
                _ => {
                    return Err(ProvisionError::invalid_config(
                        "APFORGE_CHANNEL",
                        &value,
                        "expected a positive channel number",
                    ))
                }
            };
        }
        self.radio.ieee80211n = env_bool("APFORGE_IEEE80211N", self.radio.ieee80211n);
        Ok(())
    }

    /// Channel file shared by all networks.
    pub fn channel_file(&self) -> PathBuf {
        self.config_dir.join("channel")
    }

    pub fn dnsmasq_conf(&self, network: &str) -> PathBuf {
        self.dnsmasq_dir.join(format!("{network}.conf"))
    }
}

fn env_path(key: &str) -> Option<PathBuf> {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(PathBuf::from)
}

fn env_bool(key: &str, default: bool) -> bool {
    env::var(key)
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true") || v.eq_ignore_ascii_case("yes"))
        .unwrap_or(default)
}

fn env_list(key: &str) -> Option<Vec<String>> {
    env::var(key).ok().map(|s| {
        s.split(',')
            .map(|x| x.trim().to_string())
            .filter(|x| !x.is_empty())
            .collect()
    })
}
