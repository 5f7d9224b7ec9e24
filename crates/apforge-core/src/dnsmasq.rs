//! dnsmasq configuration document, one per network.

use crate::addressing::SubnetPlan;
use crate::interface::InterfaceId;
use crate::provision::FALLBACK_NODENAME;

#[derive(Debug, Clone)]
pub struct DhcpSection<'a> {
    pub interface: &'a InterfaceId,
    pub plan: &'a SubnetPlan,
    /// Host names answered with the gateway address.
    pub names: &'a [String],
    pub lease_time: &'a str,
}

/// Names resolving to the gateway: the first DNS label of the node name,
/// then the configured aliases, without duplicates. An empty first label
/// falls back to the default node name so the gateway always has a name.
pub fn gateway_names(display_name: &str, aliases: &[String]) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let label = match display_name.split('.').next().unwrap_or_default().trim() {
        "" => FALLBACK_NODENAME,
        label => label,
    };
    let candidates = std::iter::once(label).chain(aliases.iter().map(|a| a.trim()));
    for name in candidates {
        if !name.is_empty() && !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

/// Serve DHCP and DNS on one interface only. The gateway is router and DNS
/// server; forwarding, source routing and NetBIOS options are disabled.
pub fn render_dnsmasq(section: &DhcpSection<'_>) -> String {
    let gateway = section.plan.gateway;
    let interface = section.interface;

    let mut lines = vec![format!("interface={interface}")];
    lines.extend(
        section
            .names
            .iter()
            .map(|name| format!("address=/{name}/{gateway}")),
    );
    lines.push(format!(
        "dhcp-range={interface},{},{},{}",
        section.plan.range_start, section.plan.range_end, section.lease_time
    ));
    lines.push(format!("dhcp-option=3,{gateway}"));
    lines.push(format!("dhcp-option=6,{gateway}"));
    lines.extend(
        [
            "dhcp-option=19,0",
            "dhcp-option=20,0",
            "dhcp-option=44,0.0.0.0",
            "dhcp-option=45,0.0.0.0",
            "dhcp-option=46,8",
            "dhcp-option=47",
            "dhcp-authoritative",
            "bind-interfaces",
            "except-interface=lo",
        ]
        .iter()
        .map(|line| line.to_string()),
    );

    let mut out = lines.join("\n");
    out.push('\n');
    out
}
