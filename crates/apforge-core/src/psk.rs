//! WPA pre-shared key derivation.

use pbkdf2::pbkdf2_hmac;
use sha1::Sha1;

/// IEEE 802.11i PSK mapping: PBKDF2-HMAC-SHA1, 4096 rounds, 256-bit output.
pub const PSK_ITERATIONS: u32 = 4096;
pub const PSK_LEN: usize = 32;

/// Derive the 64-character lowercase hex PSK for `ssid` / `passphrase`.
///
/// Returns `None` when either value is blank, which makes the network open.
/// The inputs are used as given; trimming only decides blankness.
pub fn derive_psk(ssid: &str, passphrase: &str) -> Option<String> {
    if ssid.trim().is_empty() || passphrase.trim().is_empty() {
        return None;
    }

    let mut key = [0u8; PSK_LEN];
    pbkdf2_hmac::<Sha1>(passphrase.as_bytes(), ssid.as_bytes(), PSK_ITERATIONS, &mut key);
    Some(hex::encode(key))
}

/// Like [`derive_psk`] but tolerant of a missing passphrase.
pub fn derive_optional_psk(ssid: &str, passphrase: Option<&str>) -> Option<String> {
    passphrase.and_then(|pass| derive_psk(ssid, pass))
}
