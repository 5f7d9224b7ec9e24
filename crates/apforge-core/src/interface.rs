//! Interface naming for access-point networks.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

/// Linux `IFNAMSIZ` minus the trailing NUL.
pub const MAX_INTERFACE_NAME_LEN: usize = 15;

/// A validated network interface name such as `wlan0`.
///
/// Ordering is lexicographic on the name.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InterfaceId(String);

impl InterfaceId {
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        validate_name(&name)?;
        Ok(Self(name))
    }

    /// `wlan0`, the first radio on most systems.
    pub(crate) fn default_radio() -> Self {
        Self("wlan0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The next name in sequence: the trailing counter is incremented,
    /// keeping its zero padding (`wlan0` -> `wlan1`, `ap09` -> `ap10`). A name
    /// without a counter gets `1` appended.
    pub fn successor(&self) -> Result<Self> {
        let digits_at = self
            .0
            .rfind(|c: char| !c.is_ascii_digit())
            .map(|idx| idx + 1)
            .unwrap_or(0);
        let (stem, digits) = self.0.split_at(digits_at);

        let next = if digits.is_empty() {
            format!("{stem}1")
        } else {
            let counter: u64 = digits.parse().map_err(|_| ProvisionError::InvalidInterface {
                name: self.0.clone(),
                reason: "trailing counter does not fit in 64 bits".to_string(),
            })?;
            let bumped = counter.checked_add(1).ok_or_else(|| ProvisionError::InvalidInterface {
                name: self.0.clone(),
                reason: "trailing counter overflow".to_string(),
            })?;
            format!("{stem}{bumped:0width$}", width = digits.len())
        };

        Self::new(next)
    }
}

fn validate_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| ProvisionError::InvalidInterface {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    if name.is_empty() {
        return Err(invalid("name is empty"));
    }
    if name.len() > MAX_INTERFACE_NAME_LEN {
        return Err(invalid("longer than 15 bytes"));
    }
    if name == "." || name == ".." {
        return Err(invalid("reserved name"));
    }
    if name
        .chars()
        .any(|c| c == '/' || c == ':' || c.is_whitespace() || c.is_control())
    {
        return Err(invalid("contains '/', ':' or whitespace"));
    }
    Ok(())
}

impl fmt::Display for InterfaceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for InterfaceId {
    type Err = ProvisionError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s.trim())
    }
}

impl TryFrom<String> for InterfaceId {
    type Error = ProvisionError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<InterfaceId> for String {
    fn from(value: InterfaceId) -> Self {
        value.0
    }
}

/// First name at or after `base` that is not in `taken`.
///
/// Running past the interface name length limit is fatal.
pub fn allocate_interface(base: &InterfaceId, taken: &BTreeSet<InterfaceId>) -> Result<InterfaceId> {
    let mut candidate = base.clone();
    while taken.contains(&candidate) {
        candidate = candidate
            .successor()
            .map_err(|_| ProvisionError::InterfaceSpaceExhausted {
                base: base.to_string(),
                last: candidate.to_string(),
            })?;
    }
    tracing::debug!(interface = %candidate, "allocated interface");
    Ok(candidate)
}

pub fn allocate_interface_into(
    base: &InterfaceId,
    taken: &mut BTreeSet<InterfaceId>,
) -> Result<InterfaceId> {
    let interface = allocate_interface(base, taken)?;
    taken.insert(interface.clone());
    Ok(interface)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(name: &str) -> InterfaceId {
        InterfaceId::new(name).unwrap()
    }

    #[test]
    fn test_successor_increments_trailing_counter() {
        assert_eq!(iface("wlan0").successor().unwrap(), iface("wlan1"));
        assert_eq!(iface("wlan9").successor().unwrap(), iface("wlan10"));
        assert_eq!(iface("ap09").successor().unwrap(), iface("ap10"));
        assert_eq!(iface("wlp2s0").successor().unwrap(), iface("wlp2s1"));
        assert_eq!(iface("public").successor().unwrap(), iface("public1"));
    }

    #[test]
    fn test_successor_respects_length_limit() {
        assert!(iface("abcdefghijklmn9").successor().is_err());
        assert_eq!(
            iface("abcdefghijklm9").successor().unwrap(),
            iface("abcdefghijklm10")
        );
    }

    #[test]
    fn test_rejects_invalid_names() {
        assert!(InterfaceId::new("").is_err());
        assert!(InterfaceId::new("wlan 0").is_err());
        assert!(InterfaceId::new("a/b").is_err());
        assert!(InterfaceId::new("wlan0:1").is_err());
        assert!(InterfaceId::new("sixteen-chars-xx").is_err());
        assert!(" wlan0\n".parse::<InterfaceId>().is_ok());
    }

    #[test]
    fn test_ordering_is_lexicographic() {
        assert!(iface("wlan0") < iface("wlan1"));
        assert!(iface("wlan10") < iface("wlan2"));
    }

    #[test]
    fn test_allocate_skips_taken_names() {
        let mut taken = BTreeSet::new();
        let base = iface("wlan0");
        let first = allocate_interface_into(&base, &mut taken).unwrap();
        let second = allocate_interface_into(&base, &mut taken).unwrap();

        assert_eq!(first, iface("wlan0"));
        assert_eq!(second, iface("wlan1"));
        assert_ne!(first, second);
        assert!(!taken.contains(&allocate_interface(&base, &taken).unwrap()));
    }

    #[test]
    fn test_allocate_around_pinned_name() {
        let mut taken = BTreeSet::new();
        taken.insert(iface("wlan1"));
        taken.insert(iface("wlan0"));
        assert_eq!(allocate_interface(&iface("wlan0"), &taken).unwrap(), iface("wlan2"));
    }

    #[test]
    fn test_allocate_exhaustion_is_an_error() {
        let mut taken = BTreeSet::new();
        taken.insert(iface("abcdefghijklmn9"));
        let err = allocate_interface(&iface("abcdefghijklmn9"), &taken).unwrap_err();
        assert!(matches!(err, ProvisionError::InterfaceSpaceExhausted { .. }));
    }

    #[test]
    fn test_serde_round_trip_validates() {
        let parsed: InterfaceId = serde_json::from_str("\"wlan3\"").unwrap();
        assert_eq!(parsed, iface("wlan3"));
        assert!(serde_json::from_str::<InterfaceId>("\"\"").is_err());
    }
}
