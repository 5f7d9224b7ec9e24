use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde_json::{json, Value};

use crate::capabilities::{parse_capabilities, supports_ieee80211n};
use crate::config::ProvisionConfig;
use crate::fs::read_channel;
use crate::probe::RadioProbe;
use crate::provision::{ProvisionOutcome, Provisioner};
use crate::psk::derive_psk;

#[derive(Parser, Debug)]
#[command(
    name = "apforge",
    author,
    version,
    about = "Provision hostapd and dnsmasq for private and guest Wi-Fi networks"
)]
pub struct Cli {
    /// Directory holding the network flag files (defaults to /etc/apforge/wifi)
    #[arg(long, global = true)]
    pub config_dir: Option<PathBuf>,

    /// Output format for command responses
    #[arg(
        long = "output",
        value_enum,
        default_value_t = OutputFormat::Json,
        global = true
    )]
    pub output_format: OutputFormat,

    /// Force debug logging regardless of logging.json and RUST_LOG
    #[arg(long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Json,
    Text,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Allocate, render and write hostapd and dnsmasq configuration
    Provision(ProvisionArgs),
    /// Print the documents a provisioning run would write
    Render,
    /// Derive the WPA PSK for an SSID and passphrase
    Psk(PskArgs),
    /// Show the ht_capab bitmask for the radio
    Caps(CapsArgs),
}

#[derive(Args, Debug)]
pub struct ProvisionArgs {
    /// Render and report without touching any file
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct PskArgs {
    #[arg(long)]
    pub ssid: String,
    #[arg(long)]
    pub passphrase: String,
}

#[derive(Args, Debug)]
pub struct CapsArgs {
    /// Channel to evaluate HT40 direction for (defaults to the configured channel)
    #[arg(long)]
    pub channel: Option<u16>,

    /// Read the `iw phy info` report from a file instead of probing
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Run one command; returns the response message and data.
pub fn dispatch_command<P: RadioProbe>(
    cfg: &ProvisionConfig,
    probe: &P,
    command: Commands,
) -> Result<(String, Value)> {
    match command {
        Commands::Provision(args) => {
            let outcome = Provisioner::new(cfg, probe)
                .provision(args.dry_run)
                .context("provisioning access-point networks")?;
            let message = match (&outcome.documents, args.dry_run) {
                (None, _) => "No enabled networks; configuration left untouched".to_string(),
                (Some(_), true) => "Dry run; nothing written".to_string(),
                (Some(_), false) => format!(
                    "Wrote {} file(s), removed {}",
                    outcome.written.len(),
                    outcome.removed.len()
                ),
            };
            Ok((message, outcome_data(&outcome)?))
        }
        Commands::Render => {
            let outcome = Provisioner::new(cfg, probe)
                .plan()
                .context("rendering configuration")?;
            Ok((render_text(cfg, &outcome), outcome_data(&outcome)?))
        }
        Commands::Psk(args) => {
            let psk = derive_psk(&args.ssid, &args.passphrase);
            let message = match &psk {
                Some(psk) => psk.clone(),
                None => "SSID or passphrase is blank; network would be open".to_string(),
            };
            Ok((message, json!({ "ssid": args.ssid, "psk": psk })))
        }
        Commands::Caps(args) => {
            let channel = args
                .channel
                .unwrap_or_else(|| read_channel(&cfg.channel_file(), cfg.radio.channel));
            let report = match &args.report {
                Some(path) => fs::read_to_string(path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let phy = Provisioner::new(cfg, probe).phy_name();
                    probe
                        .phy_info(&phy)
                        .with_context(|| format!("probing {phy}"))?
                }
            };
            let ht_capab = parse_capabilities(&report, channel)?;
            let ieee80211n = supports_ieee80211n(&report);
            Ok((
                format!("ht_capab={ht_capab}"),
                json!({
                    "channel": channel,
                    "ht_capab": ht_capab,
                    "ieee80211n": ieee80211n,
                }),
            ))
        }
    }
}

fn outcome_data(outcome: &ProvisionOutcome) -> Result<Value> {
    serde_json::to_value(outcome).context("serializing provisioning outcome")
}

fn render_text(cfg: &ProvisionConfig, outcome: &ProvisionOutcome) -> String {
    let Some(documents) = &outcome.documents else {
        return "No enabled networks".to_string();
    };
    let mut out = format!("# {}\n{}", cfg.hostapd_conf.display(), documents.hostapd);
    for doc in &documents.dnsmasq {
        out.push_str(&format!(
            "\n# {}\n{}",
            cfg.dnsmasq_conf(&doc.network).display(),
            doc.contents
        ));
    }
    out.trim_end().to_string()
}
