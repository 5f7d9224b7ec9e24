//! MAC addresses and BSSID assignment for secondary virtual APs.
//!
//! The primary network broadcasts with the radio's real MAC. Every further
//! network needs its own BSSID on the same radio; those are derived from the
//! primary MAC with the locally administered bit set and the last octet used
//! as a counter.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ProvisionError, Result};

const LOCALLY_ADMINISTERED: u8 = 0x02;

/// A 48-bit MAC address. Displays as lowercase colon-separated hex.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MacAddress {
    bytes: [u8; 6],
}

/// Substitute when the radio MAC cannot be read. Passed through
/// [`BssidSequencer::new`] it yields `02:00:b0:0b:00:xx`.
pub const PLACEHOLDER_MAC: MacAddress = MacAddress::new([0x00, 0x00, 0xb0, 0x0b, 0x00, 0x00]);

impl MacAddress {
    #[must_use]
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self { bytes }
    }

    pub fn parse(s: &str) -> Result<Self> {
        s.parse()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8; 6] {
        &self.bytes
    }

    #[must_use]
    pub fn is_local(&self) -> bool {
        self.bytes[0] & LOCALLY_ADMINISTERED != 0
    }

    #[must_use]
    pub fn is_unicast(&self) -> bool {
        self.bytes[0] & 0x01 == 0
    }
}

impl fmt::Display for MacAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.bytes[0],
            self.bytes[1],
            self.bytes[2],
            self.bytes[3],
            self.bytes[4],
            self.bytes[5]
        )
    }
}

impl FromStr for MacAddress {
    type Err = ProvisionError;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff` and `aabbccddeeff`,
    /// in either case.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let invalid = |reason: String| ProvisionError::InvalidMac {
            value: s.to_string(),
            reason,
        };

        let parts: Vec<&str> = if s.contains(':') {
            s.split(':').collect()
        } else if s.contains('-') {
            s.split('-').collect()
        } else if s.len() == 12 && s.is_ascii() {
            (0..6).map(|i| &s[i * 2..i * 2 + 2]).collect()
        } else {
            return Err(invalid("unrecognized format".to_string()));
        };

        if parts.len() != 6 {
            return Err(invalid(format!("expected 6 octets, got {}", parts.len())));
        }

        let mut bytes = [0u8; 6];
        for (i, part) in parts.iter().enumerate() {
            if part.len() != 2 {
                return Err(invalid(format!("octet '{}' is not two hex digits", part)));
            }
            bytes[i] = u8::from_str_radix(part, 16)
                .map_err(|_| invalid(format!("invalid hex octet '{}'", part)))?;
        }
        Ok(Self { bytes })
    }
}

/// Hands out BSSIDs for secondary networks, in order.
///
/// The base copies the primary MAC, sets the locally administered bit and
/// zeroes the last octet; each call to [`next_bssid`](Self::next_bssid) bumps
/// the last octet by one. 255 secondary networks is the hard ceiling.
#[derive(Debug, Clone)]
pub struct BssidSequencer {
    base: [u8; 6],
}

impl BssidSequencer {
    pub fn new(primary: MacAddress) -> Self {
        let mut base = primary.bytes;
        base[0] |= LOCALLY_ADMINISTERED;
        base[5] = 0;
        Self { base }
    }

    /// Seed from a probed MAC, falling back to [`PLACEHOLDER_MAC`].
    pub fn from_probe(primary: Option<MacAddress>) -> Self {
        Self::new(primary.unwrap_or(PLACEHOLDER_MAC))
    }

    pub fn next_bssid(&mut self) -> Result<MacAddress> {
        let counter = self.base[5].checked_add(1).ok_or_else(|| {
            ProvisionError::BssidSpaceExhausted {
                base: MacAddress::new(self.base).to_string(),
            }
        })?;
        self.base[5] = counter;
        Ok(MacAddress::new(self.base))
    }

    /// The most recently issued BSSID, or the zeroed base before any call.
    pub fn current(&self) -> MacAddress {
        MacAddress::new(self.base)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_secondary_bssid() {
        let primary = MacAddress::parse("00:0e:8e:64:2a:00").unwrap();
        let mut seq = BssidSequencer::new(primary);
        assert_eq!(seq.next_bssid().unwrap().to_string(), "02:0e:8e:64:2a:01");
        assert_eq!(seq.next_bssid().unwrap().to_string(), "02:0e:8e:64:2a:02");
    }

    #[test]
    fn test_last_octet_is_reset_before_counting() {
        let primary = MacAddress::parse("B8:27:EB:12:34:9F").unwrap();
        let mut seq = BssidSequencer::new(primary);
        assert_eq!(seq.current().to_string(), "ba:27:eb:12:34:00");
        let bssid = seq.next_bssid().unwrap();
        assert_eq!(bssid.to_string(), "ba:27:eb:12:34:01");
        assert!(bssid.is_local());
        assert!(bssid.is_unicast());
    }

    #[test]
    fn test_placeholder_when_probe_failed() {
        let mut seq = BssidSequencer::from_probe(None);
        assert_eq!(seq.next_bssid().unwrap().to_string(), "02:00:b0:0b:00:01");
    }

    #[test]
    fn test_counter_does_not_wrap() {
        let mut seq = BssidSequencer::new(MacAddress::new([0, 1, 2, 3, 4, 5]));
        for _ in 0..255 {
            seq.next_bssid().unwrap();
        }
        assert_eq!(seq.current().as_bytes()[5], 255);
        let err = seq.next_bssid().unwrap_err();
        assert!(matches!(err, ProvisionError::BssidSpaceExhausted { .. }));
    }

    #[test]
    fn test_parse_formats() {
        let expected = MacAddress::new([0xaa, 0xbb, 0xcc, 0x00, 0x11, 0x22]);
        assert_eq!(MacAddress::parse("aa:bb:cc:00:11:22").unwrap(), expected);
        assert_eq!(MacAddress::parse("AA-BB-CC-00-11-22").unwrap(), expected);
        assert_eq!(MacAddress::parse("aabbcc001122\n").unwrap(), expected);
        assert!(MacAddress::parse("aa:bb:cc:00:11").is_err());
        assert!(MacAddress::parse("aa:bb:cc:00:11:zz").is_err());
        assert!(MacAddress::parse("a:bb:cc:00:11:22").is_err());
    }
}
