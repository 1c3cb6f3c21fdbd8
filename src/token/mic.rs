//! MIC token construction and verification (RFC 4121 §4.2.6.1, §4.3.7).

use super::header::{MicHeader, TokenFlags};
use super::wrap::constant_time_eq;
use crate::error::{ErrorKind, GssError, Result};
use crate::etype::EncryptionSuite;
use crate::keys::{key_usage, EncryptionKey};
use binrw::prelude::*;
use std::io::Cursor;

/// A MIC token: checksum over application-payload || header, sent
/// separately from the payload it protects.
#[derive(Debug, Clone)]
pub struct MicToken {
    pub flags: TokenFlags,
    pub sequence_number: u64,
    pub checksum: Vec<u8>,
}

impl MicToken {
    fn header_bytes(flags: TokenFlags, sequence_number: u64) -> Result<Vec<u8>> {
        let header = MicHeader::new(flags, sequence_number);
        let mut cursor = Cursor::new(Vec::with_capacity(MicHeader::SIZE));
        header.write(&mut cursor)?;
        Ok(cursor.into_inner())
    }

    /// Sign `payload`, producing a MIC token ready to be marshaled.
    pub fn sign(
        suite: &dyn EncryptionSuite,
        key: &EncryptionKey,
        flags: TokenFlags,
        sequence_number: u64,
        payload: &[u8],
        initiator: bool,
    ) -> Result<Self> {
        let usage = if initiator {
            key_usage::INITIATOR_SIGN
        } else {
            key_usage::ACCEPTOR_SIGN
        };
        let header = Self::header_bytes(flags, sequence_number)?;
        let mut input = payload.to_vec();
        input.extend_from_slice(&header);
        let checksum = suite.checksum(key.etype, &key.key, usage, &input)?;
        Ok(MicToken {
            flags,
            sequence_number,
            checksum,
        })
    }

    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = Self::header_bytes(self.flags, self.sequence_number)?;
        out.extend_from_slice(&self.checksum);
        Ok(out)
    }

    pub fn unmarshal(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < MicHeader::SIZE {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "MIC token shorter than header".into(),
            )));
        }
        let mut cursor = Cursor::new(bytes);
        let header = MicHeader::read(&mut cursor)?;
        if header.tok_id != super::header::MIC_TOK_ID {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "unexpected token id for MIC token".into(),
            )));
        }
        if header.filler != super::header::MIC_FILLER {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "bad filler bytes in MIC token".into(),
            )));
        }
        Ok(MicToken {
            flags: header.flags,
            sequence_number: header.sequence_number,
            checksum: bytes[MicHeader::SIZE..].to_vec(),
        })
    }

    /// Re-sign `payload` and byte-compare against `self.checksum`.
    pub fn verify(
        &self,
        suite: &dyn EncryptionSuite,
        key: &EncryptionKey,
        payload: &[u8],
        expected_from_acceptor: bool,
    ) -> Result<()> {
        if self.flags.sent_by_acceptor() != expected_from_acceptor {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "SentByAcceptor flag does not match expected direction".into(),
            )));
        }
        let usage = if expected_from_acceptor {
            key_usage::ACCEPTOR_SIGN
        } else {
            key_usage::INITIATOR_SIGN
        };
        let header = Self::header_bytes(self.flags, self.sequence_number)?;
        let mut input = payload.to_vec();
        input.extend_from_slice(&header);
        let expected = suite.checksum(key.etype, &key.key, usage, &input)?;
        if !constant_time_eq(&expected, &self.checksum) {
            return Err(GssError::new(ErrorKind::BadMic));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ReferenceSuite;

    fn key() -> EncryptionKey {
        EncryptionKey::new(crate::etype::etypes::AES128_CTS_HMAC_SHA1_96 as i32, vec![9u8; 16])
    }

    #[test]
    fn mic_round_trips() {
        let suite = ReferenceSuite;
        let k = key();
        let flags = TokenFlags::build(false, false, false);
        let mic = MicToken::sign(&suite, &k, flags, 1, b"payload", true).unwrap();
        let marshaled = mic.marshal().unwrap();
        let parsed = MicToken::unmarshal(&marshaled).unwrap();
        parsed.verify(&suite, &k, b"payload", false).unwrap();
    }

    #[test]
    fn mic_fails_for_different_payload() {
        let suite = ReferenceSuite;
        let k = key();
        let flags = TokenFlags::build(false, false, false);
        let mic = MicToken::sign(&suite, &k, flags, 1, b"payload", true).unwrap();
        let marshaled = mic.marshal().unwrap();
        let parsed = MicToken::unmarshal(&marshaled).unwrap();
        let err = parsed
            .verify(&suite, &k, b"different payload", false)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadMic);
    }
}
