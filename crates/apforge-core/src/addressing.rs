//! Subnet allocation and carving.
//!
//! Every enabled network gets its own block of the configured size, starting
//! at the base block and walking forward in block-sized steps. Address
//! arithmetic is done on `u32` so there is no string round-tripping.

use std::collections::BTreeSet;
use std::net::Ipv4Addr;

use ipnet::Ipv4Net;

use crate::error::{ProvisionError, Result};

/// Number of addresses in `net`, as `u64` so a `/0` fits.
fn block_size(net: &Ipv4Net) -> u64 {
    1u64 << (32 - u32::from(net.prefix_len()))
}

/// The block immediately after `net` with the same prefix length, or `None`
/// once the IPv4 space is exhausted.
pub fn next_subnet(net: &Ipv4Net) -> Option<Ipv4Net> {
    let start = u64::from(u32::from(net.network()));
    let next = start + block_size(net);
    if next > u64::from(u32::MAX) {
        return None;
    }
    Ipv4Net::new(Ipv4Addr::from(next as u32), net.prefix_len()).ok()
}

pub fn overlaps(a: &Ipv4Net, b: &Ipv4Net) -> bool {
    a.contains(&b.network()) || b.contains(&a.network())
}

/// Pick the first block at or after `base` that overlaps nothing in `taken`.
///
/// `base` is normalized to its network address first. Walking off the end of
/// the address space is fatal.
pub fn allocate_subnet(base: Ipv4Net, taken: &BTreeSet<Ipv4Net>) -> Result<Ipv4Net> {
    let base = base.trunc();
    let mut candidate = base;
    loop {
        if !taken.iter().any(|used| overlaps(used, &candidate)) {
            tracing::debug!(subnet = %candidate, "allocated subnet");
            return Ok(candidate);
        }
        candidate = next_subnet(&candidate).ok_or_else(|| {
            ProvisionError::AddressSpaceExhausted {
                base: base.to_string(),
                last: candidate.to_string(),
            }
        })?;
    }
}

/// Allocate and record the result in `taken` so the next caller skips it.
pub fn allocate_subnet_into(base: Ipv4Net, taken: &mut BTreeSet<Ipv4Net>) -> Result<Ipv4Net> {
    let subnet = allocate_subnet(base, taken)?;
    taken.insert(subnet);
    Ok(subnet)
}

/// How one network's subnet is split for the DHCP server.
///
/// The first address is the network address and the second the gateway. The
/// next `reserved_head` addresses and the last `reserved_tail` addresses of
/// the block are kept out of the dynamic pool for statically configured
/// devices; everything in between is leased.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetPlan {
    pub subnet: Ipv4Net,
    pub gateway: Ipv4Addr,
    pub range_start: Ipv4Addr,
    pub range_end: Ipv4Addr,
    reserved_head: u32,
    reserved_tail: u32,
}

impl SubnetPlan {
    pub fn carve(subnet: Ipv4Net, reserved_head: u32, reserved_tail: u32) -> Result<Self> {
        let subnet = subnet.trunc();
        let size = block_size(&subnet);
        // network + gateway + reserved blocks + at least one leasable address
        let needed = 2 + u64::from(reserved_head) + u64::from(reserved_tail) + 1;
        if size < needed {
            return Err(ProvisionError::invalid_config(
                "subnet",
                subnet.to_string(),
                format!(
                    "block of {} addresses cannot hold gateway, {} + {} reserved and a lease pool",
                    size, reserved_head, reserved_tail
                ),
            ));
        }

        let first = u32::from(subnet.network());
        let last = u32::from(subnet.broadcast());
        Ok(Self {
            subnet,
            gateway: Ipv4Addr::from(first + 1),
            range_start: Ipv4Addr::from(first + 2 + reserved_head),
            range_end: Ipv4Addr::from(last - reserved_tail),
            reserved_head,
            reserved_tail,
        })
    }

    pub fn network(&self) -> Ipv4Addr {
        self.subnet.network()
    }

    pub fn netmask(&self) -> Ipv4Addr {
        self.subnet.netmask()
    }

    /// Addresses held back from the lease pool, in ascending order.
    pub fn reserved(&self) -> Vec<Ipv4Addr> {
        let first = u32::from(self.subnet.network()) + 2;
        let last = u32::from(self.subnet.broadcast());
        (first..first + self.reserved_head)
            .chain((0..self.reserved_tail).rev().map(|back| last - back))
            .map(Ipv4Addr::from)
            .collect()
    }

    pub fn lease_count(&self) -> u32 {
        u32::from(self.range_end) - u32::from(self.range_start) + 1
    }
}
