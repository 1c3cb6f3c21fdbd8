//! Key material and key-usage constants (RFC 4121 §2), plus the
//! session-key / subkey selection rule used by the message-token codec.

/// A (key-type-id, byte-string) pair. The key-type-id selects an entry in
/// the external encryption-type registry (`crate::etype::EncryptionSuite`)
/// that determines checksum length, cipher block size and confounder size.
#[derive(Clone)]
pub struct EncryptionKey {
    pub etype: i32,
    pub key: Vec<u8>,
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("etype", &self.etype)
            .field("key", &"<redacted>")
            .finish()
    }
}

impl EncryptionKey {
    pub fn new(etype: i32, key: impl Into<Vec<u8>>) -> Self {
        EncryptionKey {
            etype,
            key: key.into(),
        }
    }
}

/// GSSAPI key-usage numbers. Wrap tokens always use the Seal usage
/// regardless of sign-vs-seal; MIC tokens always use the Sign usage.
pub mod key_usage {
    pub const INITIATOR_SEAL: i32 = 22;
    pub const ACCEPTOR_SEAL: i32 = 23;
    pub const INITIATOR_SIGN: i32 = 25;
    pub const ACCEPTOR_SIGN: i32 = 26;

    /// Core Kerberos key usages this engine needs when talking to the
    /// adapter (RFC 4120 §7.5.1); not GSSAPI-specific but used by the
    /// context-establishment step that builds/decrypts AP-REP.
    pub const AP_REP_ENCPART: i32 = 12;
}

/// MIT-compatible security-strength-factor values, keyed by encryption
/// type. The adapter owns any extension types not listed here (§9).
pub fn mit_ssf(etype: i32) -> Option<u32> {
    use crate::etype::etypes;
    match etype as usize {
        etypes::DES3_CBC_SHA1_KD => Some(112),
        etypes::RC4_HMAC => Some(64),
        etypes::AES128_CTS_HMAC_SHA1_96 => Some(128),
        etypes::AES256_CTS_HMAC_SHA1_96 => Some(256),
        _ => None,
    }
}

/// Which key a Wrap/MIC operation should use, per §4.3.9: an inbound
/// `AcceptorSubkey` flag selects the acceptor subkey (if present); absent
/// that, the initiator subkey (if present); otherwise the session key.
pub fn select_key<'a>(
    session_key: &'a EncryptionKey,
    initiator_subkey: Option<&'a EncryptionKey>,
    acceptor_subkey: Option<&'a EncryptionKey>,
    inbound_acceptor_subkey_flag: bool,
) -> &'a EncryptionKey {
    if inbound_acceptor_subkey_flag {
        if let Some(k) = acceptor_subkey {
            return k;
        }
    }
    if let Some(k) = initiator_subkey {
        return k;
    }
    session_key
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(tag: u8) -> EncryptionKey {
        EncryptionKey::new(18, vec![tag; 32])
    }

    #[test]
    fn prefers_acceptor_subkey_when_flagged_and_present() {
        let session = key(1);
        let init_sub = key(2);
        let acc_sub = key(3);
        let chosen = select_key(&session, Some(&init_sub), Some(&acc_sub), true);
        assert_eq!(chosen.key, acc_sub.key);
    }

    #[test]
    fn falls_back_to_initiator_subkey_when_acceptor_subkey_missing() {
        let session = key(1);
        let init_sub = key(2);
        let chosen = select_key(&session, Some(&init_sub), None, true);
        assert_eq!(chosen.key, init_sub.key);
    }

    #[test]
    fn falls_back_to_session_key_when_no_subkeys() {
        let session = key(1);
        let chosen = select_key(&session, None, None, false);
        assert_eq!(chosen.key, session.key);
    }
}
