//! Per-message protection operations (§4.6.5): Wrap, Unwrap, GetMIC,
//! VerifyMIC, layered on top of the C3 token codec and C6 context state.

use super::{ContextState, Role, SecurityContext};
use crate::error::{ErrorKind, GssError, Result};
use crate::etype::EncryptionSuite;
use crate::flags::ContextFlag;
use crate::token::header::TokenFlags;
use crate::token::{MicToken, WrapToken};

impl SecurityContext {
    fn is_initiator(&self) -> bool {
        self.role == Role::Initiator
    }

    /// §4.6.5 Wrap: seal if confidentiality was negotiated, sign otherwise.
    /// Per §3/§5, `our_sequence_number` advances only once the underlying
    /// crypto primitive has actually succeeded -- a failed sign/seal must
    /// leave it untouched so a retry does not skip a sequence number.
    pub fn wrap(&mut self, suite: &dyn EncryptionSuite, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.ensure_established()?;
        let confidential = self.session_flags.contains(ContextFlag::CONF);
        let key = self.outbound_key()?.clone();
        let acceptor_subkey = self.acceptor_subkey.is_some();
        let seq = self.our_sequence_number;

        let flags = TokenFlags::build(!self.is_initiator(), confidential, acceptor_subkey);
        let mut token = WrapToken::new(flags, seq, plaintext.to_vec());
        if confidential {
            token.seal(suite, &key, self.is_initiator())?;
        } else {
            token.sign(suite, &key, self.is_initiator())?;
        }
        let marshaled = token.marshal()?;
        self.our_sequence_number = self.our_sequence_number.wrapping_add(1);
        Ok(marshaled)
    }

    /// §4.6.5 Unwrap: inverse of `wrap`, enforcing the Replay/Sequence
    /// flags this context negotiated.
    pub fn unwrap(&mut self, suite: &dyn EncryptionSuite, token_bytes: &[u8]) -> Result<Vec<u8>> {
        self.ensure_established()?;
        let token = WrapToken::unmarshal(token_bytes)?;
        self.check_sequence(token.sequence_number)?;
        let key = self.inbound_key(token.flags.acceptor_subkey())?.clone();
        let (payload, _sealed) = token.verify_and_decode(suite, &key, self.is_initiator())?;
        self.advance_inbound_sequence(token.sequence_number);
        Ok(payload)
    }

    /// §4.6.5 GetMIC. Same no-advance-on-failure discipline as `wrap`.
    pub fn get_mic(&mut self, suite: &dyn EncryptionSuite, message: &[u8]) -> Result<Vec<u8>> {
        self.ensure_established()?;
        let key = self.outbound_key()?.clone();
        let acceptor_subkey = self.acceptor_subkey.is_some();
        let seq = self.our_sequence_number;
        let flags = TokenFlags::build(!self.is_initiator(), false, acceptor_subkey);
        let mic = MicToken::sign(suite, &key, flags, seq, message, self.is_initiator())?;
        let marshaled = mic.marshal()?;
        self.our_sequence_number = self.our_sequence_number.wrapping_add(1);
        Ok(marshaled)
    }

    /// §4.6.5 VerifyMIC.
    pub fn verify_mic(
        &mut self,
        suite: &dyn EncryptionSuite,
        message: &[u8],
        mic_bytes: &[u8],
    ) -> Result<()> {
        self.ensure_established()?;
        let mic = MicToken::unmarshal(mic_bytes)?;
        self.check_sequence(mic.sequence_number)?;
        let key = self.inbound_key(mic.flags.acceptor_subkey())?.clone();
        mic.verify(suite, &key, message, self.is_initiator())?;
        self.advance_inbound_sequence(mic.sequence_number);
        Ok(())
    }

    fn ensure_established(&self) -> Result<()> {
        if self.state != ContextState::Established {
            return Err(GssError::new(ErrorKind::NoContext));
        }
        Ok(())
    }

    /// With Replay or Sequence negotiated, a token's sequence number must
    /// equal exactly what is expected (§8 "Sequence discipline"): lower
    /// is a duplicate/old token, higher is a gap, either way the token is
    /// rejected and `their_sequence_number` is left untouched by the
    /// caller (this function only classifies; it never mutates state).
    /// Without either flag, any sequence number is accepted.
    fn check_sequence(&self, seq: u64) -> Result<()> {
        if !self
            .session_flags
            .intersects(ContextFlag::REPLAY | ContextFlag::SEQUENCE)
        {
            return Ok(());
        }
        use std::cmp::Ordering;
        match seq.cmp(&self.their_sequence_number) {
            Ordering::Equal => Ok(()),
            Ordering::Less => Err(GssError::new(ErrorKind::BadMic)
                .with_info(crate::error::InfoFlags::OLD_TOKEN | crate::error::InfoFlags::DUPLICATE_TOKEN)),
            Ordering::Greater => Err(GssError::new(ErrorKind::BadMic)
                .with_info(crate::error::InfoFlags::GAP_TOKEN)),
        }
    }

    fn advance_inbound_sequence(&mut self, seq: u64) {
        self.their_sequence_number = seq.wrapping_add(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{EngineConfig, Role};
    use crate::keys::EncryptionKey;
    use crate::oid::MechanismId;
    use crate::testing::ReferenceSuite;

    fn established_pair() -> (SecurityContext, SecurityContext) {
        let key = EncryptionKey::new(crate::etype::etypes::AES128_CTS_HMAC_SHA1_96 as i32, vec![4u8; 16]);
        let mut initiator = SecurityContext::new(Role::Initiator, MechanismId::Krb5, EngineConfig::default());
        initiator.session_key = Some(key.clone());
        initiator.session_flags = ContextFlag::CONF | ContextFlag::INTEG | ContextFlag::SEQUENCE;
        initiator.state = ContextState::Established;

        let mut acceptor = SecurityContext::new(Role::Acceptor, MechanismId::Krb5, EngineConfig::default());
        acceptor.session_key = Some(key);
        acceptor.session_flags = initiator.session_flags;
        acceptor.state = ContextState::Established;

        (initiator, acceptor)
    }

    #[test]
    fn wrap_then_unwrap_round_trips_and_advances_sequence() {
        let suite = ReferenceSuite;
        let (mut initiator, mut acceptor) = established_pair();
        let token = initiator.wrap(&suite, b"top secret").unwrap();
        let plaintext = acceptor.unwrap(&suite, &token).unwrap();
        assert_eq!(plaintext, b"top secret");
        assert_eq!(acceptor.their_sequence_number, 1);
    }

    #[test]
    fn get_mic_then_verify_mic_round_trips() {
        let suite = ReferenceSuite;
        let (mut initiator, mut acceptor) = established_pair();
        let mic = initiator.get_mic(&suite, b"signed message").unwrap();
        acceptor.verify_mic(&suite, b"signed message", &mic).unwrap();
    }

    #[test]
    fn replayed_sequence_number_is_rejected() {
        let suite = ReferenceSuite;
        let (mut initiator, mut acceptor) = established_pair();
        let token = initiator.wrap(&suite, b"one").unwrap();
        acceptor.unwrap(&suite, &token).unwrap();

        // Force the initiator to reuse sequence number 0.
        initiator.our_sequence_number = 0;
        let replay = initiator.wrap(&suite, b"two").unwrap();
        assert!(acceptor.unwrap(&suite, &replay).is_err());
    }

    #[test]
    fn gap_sequence_number_is_rejected_and_counter_unchanged() {
        let suite = ReferenceSuite;
        let (mut initiator, mut acceptor) = established_pair();
        // Skip ahead to sequence 5 without the intervening tokens ever
        // reaching the acceptor.
        initiator.our_sequence_number = 5;
        let token = initiator.wrap(&suite, b"skipped ahead").unwrap();
        let before = acceptor.their_sequence_number;
        assert!(acceptor.unwrap(&suite, &token).is_err());
        assert_eq!(acceptor.their_sequence_number, before);
    }

    #[test]
    fn sequence_mismatch_is_accepted_without_replay_or_sequence_flags() {
        let suite = ReferenceSuite;
        let (mut initiator, mut acceptor) = established_pair();
        initiator.session_flags.remove(ContextFlag::SEQUENCE);
        acceptor.session_flags.remove(ContextFlag::SEQUENCE);

        initiator.our_sequence_number = 7;
        let token = initiator.wrap(&suite, b"out of order").unwrap();
        let plaintext = acceptor.unwrap(&suite, &token).unwrap();
        assert_eq!(plaintext, b"out of order");
    }
}
