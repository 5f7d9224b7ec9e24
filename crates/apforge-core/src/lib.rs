#![deny(unsafe_op_in_unsafe_fn)]
//! Access-point network provisioning.
//!
//! Allocates subnets, interface names and BSSIDs for the private and guest
//! Wi-Fi networks, derives their WPA keys, and renders the hostapd and
//! dnsmasq configuration that serves them.

pub mod addressing;
pub mod bssid;
pub mod capabilities;
pub mod cli;
pub mod config;
pub mod dnsmasq;
pub mod error;
pub mod fs;
pub mod hostapd;
pub mod interface;
pub mod network;
pub mod probe;
pub mod provision;
pub mod psk;
pub mod synth;

pub use addressing::{allocate_subnet, SubnetPlan};
pub use bssid::{BssidSequencer, MacAddress, PLACEHOLDER_MAC};
pub use capabilities::{parse_capabilities, HtCapabilities};
pub use cli::{dispatch_command, Cli, Commands, OutputFormat};
pub use config::{NetworkDefaults, ProvisionConfig, RadioDefaults};
pub use error::{ProvisionError, Result};
pub use interface::{allocate_interface, InterfaceId};
pub use network::Network;
pub use probe::{RadioProbe, SystemProbe};
pub use provision::{ProvisionOutcome, Provisioner};
pub use psk::derive_psk;
pub use synth::{ConfigSynthesizer, Documents, DnsmasqDocument, RadioInfo};
