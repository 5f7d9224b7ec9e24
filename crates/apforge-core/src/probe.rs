//! Hardware and host discovery.
//!
//! Everything the provisioning run learns from the running system goes
//! through [`RadioProbe`], so tests can substitute fixture outputs.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::bssid::MacAddress;
use crate::error::{ProvisionError, Result};

pub trait RadioProbe {
    /// Raw `iw list` output.
    fn phy_list(&self) -> Result<String>;
    /// Raw `iw phy <phy> info` output.
    fn phy_info(&self, phy: &str) -> Result<String>;
    /// Wireless interfaces currently present, sorted by name.
    fn wireless_interfaces(&self) -> Result<Vec<String>>;
    fn mac_address(&self, interface: &str) -> Result<MacAddress>;
    /// Short host name.
    fn hostname(&self) -> Result<String>;
}

/// Probe backed by `iw`, `hostname` and `/sys/class/net`.
#[derive(Debug, Clone)]
pub struct SystemProbe {
    sys_class_net: PathBuf,
}

impl Default for SystemProbe {
    fn default() -> Self {
        Self {
            sys_class_net: PathBuf::from("/sys/class/net"),
        }
    }
}

impl SystemProbe {
    pub fn new() -> Self {
        Self::default()
    }

    /// Probe a different sysfs net directory.
    pub fn with_sys_class_net(path: impl Into<PathBuf>) -> Self {
        Self {
            sys_class_net: path.into(),
        }
    }
}

fn run_cmd(program: &str, args: &[&str]) -> Result<String> {
    let cmdline = std::iter::once(program)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ");
    tracing::debug!("Running {cmdline}");

    let output = Command::new(program)
        .args(args)
        .output()
        .map_err(|e| ProvisionError::probe(&cmdline, e.to_string()))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(ProvisionError::probe(
            &cmdline,
            format!("exited with {}: {}", output.status, stderr.trim()),
        ));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

impl RadioProbe for SystemProbe {
    fn phy_list(&self) -> Result<String> {
        run_cmd("iw", &["list"])
    }

    fn phy_info(&self, phy: &str) -> Result<String> {
        run_cmd("iw", &["phy", phy, "info"])
    }

    fn wireless_interfaces(&self) -> Result<Vec<String>> {
        list_wireless_interfaces(&self.sys_class_net)
    }

    fn mac_address(&self, interface: &str) -> Result<MacAddress> {
        let path = self.sys_class_net.join(interface).join("address");
        let raw = fs::read_to_string(&path)
            .map_err(|e| ProvisionError::io_error(format!("reading {}", path.display()), e))?;
        MacAddress::parse(&raw)
    }

    fn hostname(&self) -> Result<String> {
        let name = run_cmd("hostname", &["-s"])?;
        let name = name.trim();
        if name.is_empty() {
            return Err(ProvisionError::probe("hostname -s", "empty output"));
        }
        Ok(name.to_string())
    }
}

/// Interfaces under `root` that expose a `wireless` or `phy80211` entry.
fn list_wireless_interfaces(root: &Path) -> Result<Vec<String>> {
    let entries = fs::read_dir(root)
        .map_err(|e| ProvisionError::io_error(format!("listing {}", root.display()), e))?;

    let mut names = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| ProvisionError::io_error(format!("listing {}", root.display()), e))?;
        let path = entry.path();
        if path.join("wireless").exists() || path.join("phy80211").exists() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}
