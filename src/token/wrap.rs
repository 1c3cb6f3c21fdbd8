//! Wrap token construction and verification (RFC 4121 §4.2.6.2 and the
//! Sign/Seal/Marshal/Unmarshal/Verify-and-decode procedures of §4.3.2-4.3.6,
//! §4.3.8-4.3.9).

use super::header::{TokenFlags, WrapHeader};
use crate::error::{ErrorKind, GssError, Result};
use crate::etype::EncryptionSuite;
use crate::keys::{key_usage, EncryptionKey};
use binrw::prelude::*;
use std::io::Cursor;

/// A Wrap token, either freshly built (payload set, not yet signed/sealed)
/// or parsed off the wire (payload set, `signed_or_sealed` true).
#[derive(Debug, Clone)]
pub struct WrapToken {
    pub flags: TokenFlags,
    pub ec: u16,
    pub rrc: u16,
    pub sequence_number: u64,
    pub payload: Vec<u8>,
    signed_or_sealed: bool,
}

impl WrapToken {
    /// A new, unsigned token wrapping `payload`, ready for `sign` or `seal`.
    pub fn new(flags: TokenFlags, sequence_number: u64, payload: Vec<u8>) -> Self {
        WrapToken {
            flags,
            ec: 0,
            rrc: 0,
            sequence_number,
            payload,
            signed_or_sealed: false,
        }
    }

    fn header_with(&self, ec: u16, rrc: u16) -> WrapHeader {
        WrapHeader::new(self.flags, ec, rrc, self.sequence_number)
    }

    fn header_bytes(header: &WrapHeader) -> Result<Vec<u8>> {
        let mut cursor = Cursor::new(Vec::with_capacity(WrapHeader::SIZE));
        header.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// §4.3.2 Sign: integrity-only Wrap. Appends an HMAC over
    /// payload||header(EC=0,RRC=0) computed under the Seal key-usage.
    pub fn sign(
        &mut self,
        suite: &dyn EncryptionSuite,
        key: &EncryptionKey,
        initiator: bool,
    ) -> Result<()> {
        if self.signed_or_sealed {
            return Err(GssError::new(ErrorKind::Failure(
                "token already signed or sealed".into(),
            )));
        }
        let usage = if initiator {
            key_usage::INITIATOR_SEAL
        } else {
            key_usage::ACCEPTOR_SEAL
        };
        let header = Self::header_bytes(&self.header_with(0, 0))?;
        let mut input = self.payload.clone();
        input.extend_from_slice(&header);
        let checksum = suite.checksum(key.etype, &key.key, usage, &input)?;
        self.ec = checksum.len() as u16;
        self.rrc = 0;
        self.payload.extend_from_slice(&checksum);
        self.signed_or_sealed = true;
        Ok(())
    }

    /// §4.3.3 Seal: confidentiality Wrap. Encrypts payload||header(EC=0,
    /// RRC=0) under the Seal key-usage.
    pub fn seal(
        &mut self,
        suite: &dyn EncryptionSuite,
        key: &EncryptionKey,
        initiator: bool,
    ) -> Result<()> {
        if self.signed_or_sealed {
            return Err(GssError::new(ErrorKind::Failure(
                "token already signed or sealed".into(),
            )));
        }
        let usage = if initiator {
            key_usage::INITIATOR_SEAL
        } else {
            key_usage::ACCEPTOR_SEAL
        };
        let header = Self::header_bytes(&self.header_with(0, 0))?;
        let mut plaintext = self.payload.clone();
        plaintext.extend_from_slice(&header);
        let ciphertext = suite.encrypt(key.etype, &key.key, usage, &plaintext)?;
        self.payload = ciphertext;
        self.ec = 0;
        self.rrc = 0;
        self.signed_or_sealed = true;
        Ok(())
    }

    /// §4.3.4 Marshal: header followed by payload. Outbound tokens always
    /// set RRC=0.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        if !self.signed_or_sealed {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "token not signed or sealed".into(),
            )));
        }
        let mut out = Self::header_bytes(&self.header_with(self.ec, self.rrc))?;
        out.extend_from_slice(&self.payload);
        Ok(out)
    }

    /// §4.3.5 Unmarshal: parse a Wrap token off the wire, tolerating
    /// nonzero RRC (rotated away during `verify_and_decode`, §4.3.8).
    pub fn unmarshal(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < WrapHeader::SIZE {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "token shorter than header".into(),
            )));
        }
        if bytes[0] == 0x60 {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "GSS-API v1 tokens are not supported".into(),
            )));
        }
        let mut cursor = Cursor::new(bytes);
        let header = WrapHeader::read(&mut cursor)?;
        if header.tok_id != super::header::WRAP_TOK_ID {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "unexpected token id for Wrap token".into(),
            )));
        }
        if header.filler != super::header::WRAP_FILLER {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "bad filler byte in Wrap token".into(),
            )));
        }
        Ok(WrapToken {
            flags: header.flags,
            ec: header.ec,
            rrc: header.rrc,
            sequence_number: header.sequence_number,
            payload: bytes[WrapHeader::SIZE..].to_vec(),
            signed_or_sealed: true,
        })
    }

    /// Rotate the payload left by `rrc` bytes, mod payload length (§4.3.8).
    fn derotate(payload: &[u8], rrc: u16) -> Vec<u8> {
        if payload.is_empty() {
            return payload.to_vec();
        }
        let shift = (rrc as usize) % payload.len();
        let mut rotated = Vec::with_capacity(payload.len());
        rotated.extend_from_slice(&payload[shift..]);
        rotated.extend_from_slice(&payload[..shift]);
        rotated
    }

    /// §4.3.6 Verify-and-decode. Returns `(plaintext, is_sealed)`.
    pub fn verify_and_decode(
        &self,
        suite: &dyn EncryptionSuite,
        key: &EncryptionKey,
        expected_from_acceptor: bool,
    ) -> Result<(Vec<u8>, bool)> {
        if self.flags.sent_by_acceptor() != expected_from_acceptor {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "SentByAcceptor flag does not match expected direction".into(),
            )));
        }
        let rotated = Self::derotate(&self.payload, self.rrc);

        if self.flags.sealed() {
            let usage = if expected_from_acceptor {
                key_usage::ACCEPTOR_SEAL
            } else {
                key_usage::INITIATOR_SEAL
            };
            let plaintext = suite.decrypt(key.etype, &key.key, usage, &rotated)?;
            let ec = self.ec as usize;
            if plaintext.len() < ec + WrapHeader::SIZE {
                return Err(GssError::new(ErrorKind::DefectiveToken(
                    "decrypted Wrap token shorter than EC + header".into(),
                )));
            }
            let header_start = plaintext.len() - WrapHeader::SIZE;
            let recovered_bytes = &plaintext[header_start..];
            let mut cursor = Cursor::new(recovered_bytes);
            let recovered: WrapHeader = BinRead::read(&mut cursor)?;
            if recovered.flags != self.flags
                || recovered.ec != self.ec
                || recovered.sequence_number != self.sequence_number
            {
                return Err(GssError::new(ErrorKind::DefectiveToken(
                    "recovered header does not match outer header".into(),
                )));
            }
            let payload = plaintext[..header_start - ec].to_vec();
            Ok((payload, true))
        } else {
            let expected_ec = suite.checksum_length(key.etype);
            if self.ec as usize != expected_ec || rotated.len() < self.ec as usize {
                return Err(GssError::new(ErrorKind::BadMic));
            }
            let split = rotated.len() - self.ec as usize;
            let payload = &rotated[..split];
            let checksum = &rotated[split..];
            let usage = if expected_from_acceptor {
                key_usage::ACCEPTOR_SEAL
            } else {
                key_usage::INITIATOR_SEAL
            };
            let header = Self::header_bytes(&WrapHeader::new(
                self.flags,
                0,
                0,
                self.sequence_number,
            ))?;
            let mut input = payload.to_vec();
            input.extend_from_slice(&header);
            let expected = suite.checksum(key.etype, &key.key, usage, &input)?;
            if !constant_time_eq(&expected, checksum) {
                return Err(GssError::new(ErrorKind::BadMic));
            }
            Ok((payload.to_vec(), false))
        }
    }
}

pub(crate) fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ReferenceSuite;

    fn key() -> EncryptionKey {
        EncryptionKey::new(crate::etype::etypes::AES128_CTS_HMAC_SHA1_96 as i32, vec![7u8; 16])
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let suite = ReferenceSuite;
        let k = key();
        let flags = TokenFlags::build(false, false, false);
        let mut token = WrapToken::new(flags, 1, b"hello".to_vec());
        token.sign(&suite, &k, true).unwrap();
        let marshaled = token.marshal().unwrap();
        let parsed = WrapToken::unmarshal(&marshaled).unwrap();
        let (payload, sealed) = parsed.verify_and_decode(&suite, &k, false).unwrap();
        assert_eq!(payload, b"hello");
        assert!(!sealed);
    }

    #[test]
    fn seal_then_verify_round_trips() {
        let suite = ReferenceSuite;
        let k = key();
        let flags = TokenFlags::build(false, true, false);
        let mut token = WrapToken::new(flags, 1, b"secret payload".to_vec());
        token.seal(&suite, &k, true).unwrap();
        let marshaled = token.marshal().unwrap();
        let parsed = WrapToken::unmarshal(&marshaled).unwrap();
        let (payload, sealed) = parsed.verify_and_decode(&suite, &k, false).unwrap();
        assert_eq!(payload, b"secret payload");
        assert!(sealed);
    }

    #[test]
    fn tampered_sealed_payload_fails_verify() {
        let suite = ReferenceSuite;
        let k = key();
        let flags = TokenFlags::build(false, true, false);
        let mut token = WrapToken::new(flags, 1, b"payload".to_vec());
        token.seal(&suite, &k, true).unwrap();
        let mut marshaled = token.marshal().unwrap();
        let last = marshaled.len() - 1;
        marshaled[last] ^= 0xff;
        let parsed = WrapToken::unmarshal(&marshaled).unwrap();
        assert!(parsed.verify_and_decode(&suite, &k, false).is_err());
    }

    #[test]
    fn tampered_signed_token_fails_with_bad_mic() {
        let suite = ReferenceSuite;
        let k = key();
        let flags = TokenFlags::build(false, false, false);
        let mut token = WrapToken::new(flags, 1, b"payload".to_vec());
        token.sign(&suite, &k, true).unwrap();
        let mut marshaled = token.marshal().unwrap();
        let last = marshaled.len() - 1;
        marshaled[last] ^= 0xff;
        let parsed = WrapToken::unmarshal(&marshaled).unwrap();
        let err = parsed.verify_and_decode(&suite, &k, false).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadMic);
    }

    #[test]
    fn rejects_gssapi_v1_token() {
        let mut buf = vec![0x60u8];
        buf.extend_from_slice(&[0u8; 20]);
        let err = WrapToken::unmarshal(&buf).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::DefectiveToken(_)));
    }

    #[test]
    fn rrc_rotation_is_undone_before_verify() {
        let suite = ReferenceSuite;
        let k = key();
        let flags = TokenFlags::build(false, false, false);
        let mut token = WrapToken::new(flags, 1, b"hello world".to_vec());
        token.sign(&suite, &k, true).unwrap();
        // Simulate an SSPI-originated token with a nonzero RRC by rotating
        // the payload right by 3 and setting RRC=3 (derotate must shift
        // left by the same amount to undo it).
        let rrc = 3u16;
        let shift = token.payload.len() - (rrc as usize % token.payload.len());
        let mut rotated_payload = token.payload[shift..].to_vec();
        rotated_payload.extend_from_slice(&token.payload[..shift]);
        token.payload = rotated_payload;
        token.rrc = rrc;
        let marshaled = token.marshal().unwrap();
        let parsed = WrapToken::unmarshal(&marshaled).unwrap();
        let (payload, _) = parsed.verify_and_decode(&suite, &k, false).unwrap();
        assert_eq!(payload, b"hello world");
    }
}
