//! The context-establishment state machine (component C6, §4.6).

use super::{ContextState, EngineConfig, Role, SecurityContext};
use crate::adapter::{Authenticator, EncApRepPart, KerberosAdapter};
use crate::checksum::{build_authenticator_checksum, parse_requested_flags, ChannelBinding};
use crate::error::{Continuation, ErrorKind, GssError, Result};
use crate::flags::ContextFlag;
use crate::framing::{self, TOKEN_ID_AP_REP, TOKEN_ID_AP_REQ, TOKEN_ID_KRB_ERROR};
use crate::keys::EncryptionKey;
use crate::oid::MechanismId;

/// A fresh random sequence number, masked to 30 bits for MIT interop
/// (§4.6.2 step 2, §9).
fn fresh_sequence_number() -> u64 {
    (rand::random::<u32>() & 0x3fff_ffff) as u64
}

/// §4.6.2: the initiator's first (and possibly only) call. Acquires a
/// service ticket, builds an authenticator carrying the GSSAPI checksum
/// extension, and returns the outer AP-REQ token to send.
pub fn initiate(
    adapter: &mut dyn KerberosAdapter,
    target_principal: &str,
    requested_flags: ContextFlag,
    channel_binding: Option<&ChannelBinding>,
    config: EngineConfig,
) -> Result<(SecurityContext, Vec<u8>)> {
    let acquired = adapter.acquire_service_ticket(target_principal)?;

    let mutual_required = requested_flags.contains(ContextFlag::MUTUAL);
    let sequence_number = fresh_sequence_number();

    let checksum_buf = build_authenticator_checksum(channel_binding, requested_flags);
    let now = time::OffsetDateTime::now_utc();
    let ctime = now.unix_timestamp();
    let cusec = now.microsecond() as i32;

    let authenticator = Authenticator {
        ctime,
        cusec,
        sequence_number: Some(sequence_number as u32),
        checksum: Some(checksum_buf),
        subkey: None,
        cname: None,
        crealm: None,
    };

    let ap_req_body = adapter.build_ap_req(
        &acquired.ticket,
        &acquired.session_key,
        &authenticator,
        mutual_required,
    )?;
    let outbound = framing::marshal(MechanismId::Krb5, TOKEN_ID_AP_REQ, &ap_req_body)?;

    let mut ctx = SecurityContext::new(Role::Initiator, MechanismId::Krb5, config);
    ctx.requested_flags = requested_flags;
    ctx.session_flags = requested_flags;
    ctx.session_key = Some(acquired.session_key);
    ctx.our_sequence_number = sequence_number;
    ctx.their_sequence_number = match config.acceptor_isn_policy {
        super::AcceptorIsnPolicy::CopyFromInitiator => sequence_number,
        super::AcceptorIsnPolicy::Zero => 0,
    };
    ctx.client_ctime = Some(ctime);
    ctx.client_cusec = Some(cusec);
    ctx.peer_name = Some(acquired.peer_name);
    ctx.state = if mutual_required {
        ContextState::AwaitingContinue
    } else {
        ContextState::Established
    };

    Ok((ctx, outbound))
}

/// §4.6.3: the initiator's second call, processing an AP-REP when mutual
/// authentication was requested.
pub fn initiate_continue(
    ctx: &mut SecurityContext,
    adapter: &dyn KerberosAdapter,
    inbound: &[u8],
) -> Result<()> {
    if ctx.state != ContextState::AwaitingContinue {
        return Err(GssError::new(ErrorKind::Failure(
            "initiate_continue called outside AwaitingContinue".into(),
        )));
    }
    let outer = framing::unmarshal(inbound, MechanismId::Krb5)?;
    if outer.token_id == TOKEN_ID_KRB_ERROR {
        let krb_err = adapter.parse_krb_error(&outer.body)?;
        return Err(GssError::new(ErrorKind::DefectiveCredential).with_minor(
            crate::error::MechMinorError {
                code: krb_err.error_code,
                description: krb_err.error_text,
            },
        ));
    }
    if outer.token_id != TOKEN_ID_AP_REP {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "expected AP-REP or KRB-ERROR token id".into(),
        )));
    }

    let session_key = ctx
        .session_key
        .as_ref()
        .ok_or_else(|| GssError::new(ErrorKind::NoContext))?;
    let ap_rep = adapter.parse_ap_rep(&outer.body)?;
    let enc_part = adapter.decrypt_ap_rep_encpart(&ap_rep, session_key)?;

    let (ctime, cusec) = (ctx.client_ctime, ctx.client_cusec);
    if enc_part.ctime != ctime.unwrap_or_default() || enc_part.cusec != cusec.unwrap_or_default() {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "AP-REP ctime/cusec do not match the authenticator we sent".into(),
        )));
    }

    if let Some((subkey_etype, subkey_bytes)) = enc_part.subkey {
        ctx.acceptor_subkey = Some(EncryptionKey::new(subkey_etype, subkey_bytes));
    }
    if let Some(seq) = enc_part.sequence_number {
        ctx.their_sequence_number = seq as u64;
    }
    ctx.state = ContextState::Established;
    Ok(())
}

/// §4.6.4: the acceptor's single call. Verifies the inbound AP-REQ
/// (including its clock-skew window) and, if mutual authentication was
/// requested, returns an outer AP-REP token to send back.
pub fn accept(
    adapter: &mut dyn KerberosAdapter,
    acceptor_principal: &str,
    acceptor_realm: &str,
    inbound: &[u8],
    channel_binding: Option<&ChannelBinding>,
    config: EngineConfig,
) -> Result<(SecurityContext, Option<Vec<u8>>)> {
    let outer = framing::unmarshal(inbound, MechanismId::Krb5)?;
    if outer.token_id != TOKEN_ID_AP_REQ {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "expected AP-REQ token id".into(),
        )));
    }

    let ap_req = adapter.parse_ap_req(&outer.body)?;

    let decrypted = match adapter.decrypt_ticket(&ap_req.ticket, acceptor_principal) {
        Ok(d) => d,
        Err(_) => {
            let token = build_error_token(
                adapter,
                acceptor_principal,
                acceptor_realm,
                krb_error_codes::NOKEY,
                "ticket decryption failed",
            )?;
            return Err(GssError::new(ErrorKind::Failure(
                "ticket decryption failed".into(),
            ))
            .with_krb_error_token(token));
        }
    };

    let authenticator = match adapter.decrypt_authenticator(&ap_req, &decrypted.session_key) {
        Ok(a) => a,
        Err(_) => {
            let token = build_error_token(
                adapter,
                acceptor_principal,
                acceptor_realm,
                krb_error_codes::BAD_INTEGRITY,
                "authenticator decryption failed",
            )?;
            return Err(GssError::new(ErrorKind::BadMic).with_krb_error_token(token));
        }
    };

    if authenticator.cname.as_ref() != Some(&decrypted.cname) {
        let token = build_error_token(
            adapter,
            acceptor_principal,
            acceptor_realm,
            krb_error_codes::BADMATCH,
            "authenticator cname does not match ticket cname",
        )?;
        return Err(GssError::new(ErrorKind::Failure(
            "authenticator cname does not match ticket cname".into(),
        ))
        .with_krb_error_token(token));
    }

    let now = time::OffsetDateTime::now_utc();
    let authenticator_time =
        time::OffsetDateTime::from_unix_timestamp(authenticator.ctime).unwrap_or(now);
    let skew = if now > authenticator_time {
        now - authenticator_time
    } else {
        authenticator_time - now
    };
    if skew > config.clock_skew {
        let token = build_error_token(
            adapter,
            acceptor_principal,
            acceptor_realm,
            krb_error_codes::SKEW,
            "clock skew too large",
        )?;
        return Err(
            GssError::new(ErrorKind::Failure("clock skew too large".into()))
                .with_krb_error_token(token),
        );
    }

    let requested_flags = authenticator
        .checksum
        .as_deref()
        .map(parse_requested_flags)
        .transpose()?
        .unwrap_or_else(ContextFlag::empty);

    if requested_flags.contains(ContextFlag::CHANNEL_BOUND) {
        let expected = channel_binding.map(|cb| cb.digest());
        let got = authenticator.checksum.as_deref().and_then(|c| {
            if c.len() >= 20 {
                let mut d = [0u8; 16];
                d.copy_from_slice(&c[4..20]);
                Some(d)
            } else {
                None
            }
        });
        if expected != got {
            return Err(GssError::new(ErrorKind::BadBindings));
        }
    }

    let mutual_required = ap_req.mutual_required;
    let sequence_number = authenticator.sequence_number.unwrap_or(0) as u64;

    let mut ctx = SecurityContext::new(Role::Acceptor, MechanismId::Krb5, config);
    ctx.requested_flags = requested_flags;
    ctx.session_flags = requested_flags;
    ctx.session_key = Some(decrypted.session_key.clone());
    ctx.their_sequence_number = sequence_number;
    ctx.our_sequence_number = if mutual_required {
        // §4.6.4 step 11: the AP-REP's sequence number is a fresh random
        // value, independent of the acceptor-ISN policy, which applies
        // only to the non-mutual step-12 case below.
        fresh_sequence_number()
    } else {
        match config.acceptor_isn_policy {
            super::AcceptorIsnPolicy::CopyFromInitiator => sequence_number,
            super::AcceptorIsnPolicy::Zero => 0,
        }
    };
    ctx.peer_name = Some(format!(
        "{}@{}",
        decrypted.cname.display(),
        decrypted.crealm
    ));
    ctx.client_ctime = Some(authenticator.ctime);
    ctx.client_cusec = Some(authenticator.cusec);
    if let Some((subkey_etype, subkey_bytes)) = authenticator.subkey.clone() {
        ctx.initiator_subkey = Some(EncryptionKey::new(subkey_etype, subkey_bytes));
    }
    ctx.state = ContextState::Established;

    if !mutual_required {
        return Ok((ctx, None));
    }

    let enc_part = EncApRepPart {
        ctime: authenticator.ctime,
        cusec: authenticator.cusec,
        sequence_number: Some(ctx.our_sequence_number as u32),
        subkey: None,
    };
    let ap_rep_body = adapter.build_ap_rep(&decrypted.session_key, &enc_part)?;
    let outbound = framing::marshal(MechanismId::Krb5, TOKEN_ID_AP_REP, &ap_rep_body)?;
    Ok((ctx, Some(outbound)))
}

fn build_error_token(
    adapter: &mut dyn KerberosAdapter,
    acceptor_principal: &str,
    acceptor_realm: &str,
    code: u32,
    text: &str,
) -> Result<Vec<u8>> {
    let body = adapter.build_krb_error(acceptor_principal, acceptor_realm, code, text)?;
    framing::marshal(MechanismId::Krb5, TOKEN_ID_KRB_ERROR, &body)
}

/// A minimal subset of RFC 4120 §7.5.9 error codes this engine emits.
pub mod krb_error_codes {
    pub const BAD_INTEGRITY: u32 = 31;
    pub const SKEW: u32 = 37;
    pub const NOKEY: u32 = 29;
    pub const MSG_TYPE: u32 = 35;
    pub const BADMATCH: u32 = 36;
}

/// Wraps `Continuation` for callers driving the loop generically.
pub fn continuation_of(ctx: &SecurityContext, outbound: Vec<u8>) -> Continuation<Vec<u8>> {
    Continuation {
        value: outbound,
        continue_needed: ctx.state == ContextState::AwaitingContinue,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::EncryptionKey;
    use crate::testing::InMemoryAdapter;

    fn adapter_pair(key: EncryptionKey) -> InMemoryAdapter {
        let mut adapter = InMemoryAdapter::new();
        adapter.register_service("host/db.example.com", "EXAMPLE.COM", key);
        adapter
    }

    #[test]
    fn initiate_without_mutual_establishes_immediately() {
        let key = EncryptionKey::new(crate::etype::etypes::AES128_CTS_HMAC_SHA1_96 as i32, vec![1u8; 16]);
        let mut adapter = adapter_pair(key);
        let (ctx, token) = initiate(
            &mut adapter,
            "host/db.example.com",
            ContextFlag::CONF | ContextFlag::INTEG,
            None,
            EngineConfig::default(),
        )
        .unwrap();
        assert!(ctx.is_established());
        assert!(!token.is_empty());
    }

    #[test]
    fn acceptor_establishes_from_initiator_token() {
        let key = EncryptionKey::new(crate::etype::etypes::AES128_CTS_HMAC_SHA1_96 as i32, vec![2u8; 16]);
        let mut adapter = adapter_pair(key);
        let (_initiator_ctx, token) = initiate(
            &mut adapter,
            "host/db.example.com",
            ContextFlag::INTEG,
            None,
            EngineConfig::default(),
        )
        .unwrap();

        let (acceptor_ctx, reply) = accept(
            &mut adapter,
            "host/db.example.com",
            "EXAMPLE.COM",
            &token,
            None,
            EngineConfig::default(),
        )
        .unwrap();
        assert!(acceptor_ctx.is_established());
        assert!(reply.is_none());
        assert_eq!(acceptor_ctx.peer_name.as_deref(), Some("testuser@EXAMPLE.COM"));
    }

    #[test]
    fn mutual_auth_uses_fresh_sequence_number_independent_of_isn_policy() {
        let key = EncryptionKey::new(crate::etype::etypes::AES128_CTS_HMAC_SHA1_96 as i32, vec![6u8; 16]);
        let mut adapter = adapter_pair(key);
        let (initiator_ctx, token) = initiate(
            &mut adapter,
            "host/db.example.com",
            ContextFlag::MUTUAL | ContextFlag::INTEG,
            None,
            EngineConfig::default(),
        )
        .unwrap();

        let (acceptor_ctx, reply) = accept(
            &mut adapter,
            "host/db.example.com",
            "EXAMPLE.COM",
            &token,
            None,
            EngineConfig::default(),
        )
        .unwrap();
        assert!(reply.is_some());
        // The ISN policy (CopyFromInitiator by default) must not leak into
        // the mutual-auth acceptor's own outbound sequence number.
        assert_ne!(acceptor_ctx.our_sequence_number, initiator_ctx.our_sequence_number);
    }

    #[test]
    fn acceptor_rejects_authenticator_outside_clock_skew() {
        let key = EncryptionKey::new(crate::etype::etypes::AES128_CTS_HMAC_SHA1_96 as i32, vec![5u8; 16]);
        let mut adapter = adapter_pair(key);
        let acquired = adapter.acquire_service_ticket("host/db.example.com").unwrap();

        let stale = time::OffsetDateTime::now_utc() - time::Duration::seconds(30);
        let checksum_buf = build_authenticator_checksum(None, ContextFlag::INTEG);
        let authenticator = Authenticator {
            ctime: stale.unix_timestamp(),
            cusec: stale.microsecond() as i32,
            sequence_number: Some(1),
            checksum: Some(checksum_buf),
            subkey: None,
            cname: None,
            crealm: None,
        };
        let ap_req_body = adapter
            .build_ap_req(&acquired.ticket, &acquired.session_key, &authenticator, false)
            .unwrap();
        let token = framing::marshal(MechanismId::Krb5, TOKEN_ID_AP_REQ, &ap_req_body).unwrap();

        let config = EngineConfig {
            clock_skew: time::Duration::seconds(10),
            ..EngineConfig::default()
        };
        let result = accept(&mut adapter, "host/db.example.com", "EXAMPLE.COM", &token, None, config);
        let err = result.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Failure("clock skew too large".into()));
        assert!(err.krb_error_token.is_some());
    }
}
