//! The context state machine (component C6, §4.6) and the
//! `SecurityContext` entity that carries its state (§3).

pub mod establish;
pub mod message_ops;

use crate::error::{ErrorKind, GssError, Result};
use crate::flags::ContextFlag;
use crate::keys::EncryptionKey;
use crate::oid::MechanismId;
use crate::adapter::Ticket;

/// Which side of the exchange this context plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Initiator,
    Acceptor,
}

/// §4.6.1 states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextState {
    NotStarted,
    AwaitingContinue,
    Established,
    Deleted,
}

/// The acceptor's initial-sequence-number policy used when no mutual-auth
/// exchange reveals one (§4.6.2 step 6, §9).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcceptorIsnPolicy {
    /// MIT/Microsoft-compatible: the acceptor's initial sequence number
    /// equals the initiator's.
    CopyFromInitiator,
    /// Heimdal-compatible: the acceptor's initial sequence number is zero.
    Zero,
}

impl Default for AcceptorIsnPolicy {
    fn default() -> Self {
        AcceptorIsnPolicy::CopyFromInitiator
    }
}

/// Engine-level configuration (§6.4): everything else is either caller
/// input per-call or owned by the Kerberos adapter.
#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub clock_skew: time::Duration,
    pub acceptor_isn_policy: AcceptorIsnPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            clock_skew: time::Duration::seconds(10),
            acceptor_isn_policy: AcceptorIsnPolicy::default(),
        }
    }
}

/// The central, long-lived security context (§3).
pub struct SecurityContext {
    pub role: Role,
    pub state: ContextState,
    pub mechanism: MechanismId,
    pub config: EngineConfig,

    pub service_ticket: Option<Ticket>,
    pub session_key: Option<EncryptionKey>,

    pub requested_flags: ContextFlag,
    pub session_flags: ContextFlag,

    pub our_sequence_number: u64,
    pub their_sequence_number: u64,

    pub initiator_subkey: Option<EncryptionKey>,
    pub acceptor_subkey: Option<EncryptionKey>,

    /// Seconds and microseconds of the authenticator timestamp the
    /// initiator sent; retained so the initiator can check the AP-REP's
    /// mirrored CTime/Cusec, and so the acceptor can check clock skew.
    pub client_ctime: Option<i64>,
    pub client_cusec: Option<i32>,

    pub peer_name: Option<String>,
}

impl SecurityContext {
    pub(crate) fn new(role: Role, mechanism: MechanismId, config: EngineConfig) -> Self {
        SecurityContext {
            role,
            state: ContextState::NotStarted,
            mechanism,
            config,
            service_ticket: None,
            session_key: None,
            requested_flags: ContextFlag::empty(),
            session_flags: ContextFlag::empty(),
            our_sequence_number: 0,
            their_sequence_number: 0,
            initiator_subkey: None,
            acceptor_subkey: None,
            client_ctime: None,
            client_cusec: None,
            peer_name: None,
        }
    }

    pub fn is_established(&self) -> bool {
        self.state == ContextState::Established
    }

    fn ensure_not_deleted(&self) -> Result<()> {
        if self.state == ContextState::Deleted {
            return Err(GssError::new(ErrorKind::NoContext));
        }
        Ok(())
    }

    fn ensure_established(&self) -> Result<()> {
        self.ensure_not_deleted()?;
        if self.state != ContextState::Established {
            return Err(GssError::new(ErrorKind::NoContext));
        }
        Ok(())
    }

    /// §4.6.6 Delete: idempotent, callable in any state, releases adapter
    /// handles (represented here simply as dropping owned key material).
    pub fn delete(&mut self) {
        self.state = ContextState::Deleted;
        self.session_key = None;
        self.initiator_subkey = None;
        self.acceptor_subkey = None;
    }

    /// §4.7 Inquire: a snapshot of the negotiated state.
    pub fn inquire(&self) -> Result<ContextSnapshot> {
        self.ensure_not_deleted()?;
        Ok(ContextSnapshot {
            peer_name: self.peer_name.clone(),
            mechanism: self.mechanism,
            session_flags: self.session_flags,
            locally_initiated: self.role == Role::Initiator,
            fully_established: self.is_established(),
        })
    }

    /// The key this side uses for outbound Wrap/MIC: acceptor subkey if
    /// we are the acceptor and hold one, else initiator subkey if held,
    /// else the session key (§4.3.9, outbound direction).
    pub(crate) fn outbound_key(&self) -> Result<&EncryptionKey> {
        self.ensure_established()?;
        if self.role == Role::Acceptor {
            if let Some(k) = &self.acceptor_subkey {
                return Ok(k);
            }
        }
        if let Some(k) = &self.initiator_subkey {
            return Ok(k);
        }
        self.session_key
            .as_ref()
            .ok_or_else(|| GssError::new(ErrorKind::NoContext))
    }

    /// The key to use to verify an inbound token, selected by the
    /// AcceptorSubkey flag carried on that token (§4.3.9, inbound
    /// direction).
    pub(crate) fn inbound_key(&self, acceptor_subkey_flag: bool) -> Result<&EncryptionKey> {
        self.ensure_established()?;
        let session = self
            .session_key
            .as_ref()
            .ok_or_else(|| GssError::new(ErrorKind::NoContext))?;
        Ok(crate::keys::select_key(
            session,
            self.initiator_subkey.as_ref(),
            self.acceptor_subkey.as_ref(),
            acceptor_subkey_flag,
        ))
    }

    /// `GSS_Export_sec_context` (§4.7): flatten the fields of an
    /// established context that must survive a process boundary into this
    /// crate's own internal byte encoding. There is no mandated upstream
    /// wire format for this (it is mechanism-private per RFC 2743 §3.2),
    /// so the layout below is private to `import`/`export` and is not
    /// meant to be read by any other implementation.
    pub fn export(&self) -> Result<Vec<u8>> {
        self.ensure_established()?;
        let session_key = self
            .session_key
            .as_ref()
            .ok_or_else(|| GssError::new(ErrorKind::NoContext))?;

        let mut out = Vec::new();
        out.push(match self.role {
            Role::Initiator => 0u8,
            Role::Acceptor => 1u8,
        });
        out.extend_from_slice(&self.session_flags.bits().to_le_bytes());
        out.extend_from_slice(&self.our_sequence_number.to_le_bytes());
        out.extend_from_slice(&self.their_sequence_number.to_le_bytes());
        write_key(&mut out, Some(session_key));
        write_key(&mut out, self.initiator_subkey.as_ref());
        write_key(&mut out, self.acceptor_subkey.as_ref());
        write_opt_i64(&mut out, self.client_ctime);
        write_opt_i32(&mut out, self.client_cusec);
        write_opt_string(&mut out, self.peer_name.as_deref());
        Ok(out)
    }

    /// `GSS_Import_sec_context`: the inverse of `export`. The caller
    /// supplies the mechanism and engine configuration since those are not
    /// themselves part of the exported byte stream.
    pub fn import(bytes: &[u8], mechanism: MechanismId, config: EngineConfig) -> Result<Self> {
        let mut cur = Cursor::new(bytes);
        let role = match cur.take_u8()? {
            0 => Role::Initiator,
            1 => Role::Acceptor,
            _ => return Err(GssError::new(ErrorKind::DefectiveCredential)),
        };
        let session_flags = ContextFlag::from_bits_truncate(cur.take_u32()?);
        let our_sequence_number = cur.take_u64()?;
        let their_sequence_number = cur.take_u64()?;
        let session_key = read_key(&mut cur)?
            .ok_or_else(|| GssError::new(ErrorKind::DefectiveCredential))?;
        let initiator_subkey = read_key(&mut cur)?;
        let acceptor_subkey = read_key(&mut cur)?;
        let client_ctime = read_opt_i64(&mut cur)?;
        let client_cusec = read_opt_i32(&mut cur)?;
        let peer_name = read_opt_string(&mut cur)?;

        let mut ctx = SecurityContext::new(role, mechanism, config);
        ctx.state = ContextState::Established;
        ctx.session_flags = session_flags;
        ctx.requested_flags = session_flags;
        ctx.our_sequence_number = our_sequence_number;
        ctx.their_sequence_number = their_sequence_number;
        ctx.session_key = Some(session_key);
        ctx.initiator_subkey = initiator_subkey;
        ctx.acceptor_subkey = acceptor_subkey;
        ctx.client_ctime = client_ctime;
        ctx.client_cusec = client_cusec;
        ctx.peer_name = peer_name;
        Ok(ctx)
    }
}

use std::io::Cursor;

fn write_key(out: &mut Vec<u8>, key: Option<&EncryptionKey>) {
    match key {
        Some(k) => {
            out.push(1);
            out.extend_from_slice(&k.etype.to_le_bytes());
            out.extend_from_slice(&(k.key.len() as u32).to_le_bytes());
            out.extend_from_slice(&k.key);
        }
        None => out.push(0),
    }
}

fn write_opt_i64(out: &mut Vec<u8>, v: Option<i64>) {
    match v {
        Some(v) => {
            out.push(1);
            out.extend_from_slice(&v.to_le_bytes());
        }
        None => out.push(0),
    }
}

fn write_opt_i32(out: &mut Vec<u8>, v: Option<i32>) {
    match v {
        Some(v) => {
            out.push(1);
            out.extend_from_slice(&v.to_le_bytes());
        }
        None => out.push(0),
    }
}

fn write_opt_string(out: &mut Vec<u8>, v: Option<&str>) {
    match v {
        Some(s) => {
            out.push(1);
            out.extend_from_slice(&(s.len() as u32).to_le_bytes());
            out.extend_from_slice(s.as_bytes());
        }
        None => out.push(0),
    }
}

trait TakeExact {
    fn take_u8(&mut self) -> Result<u8>;
    fn take_u32(&mut self) -> Result<u32>;
    fn take_u64(&mut self) -> Result<u64>;
    fn take_bytes(&mut self, n: usize) -> Result<Vec<u8>>;
}

fn truncated() -> GssError {
    GssError::new(ErrorKind::DefectiveCredential)
}

impl TakeExact for Cursor<&[u8]> {
    fn take_u8(&mut self) -> Result<u8> {
        Ok(*self.take_bytes(1)?.first().ok_or_else(truncated)?)
    }

    fn take_u32(&mut self) -> Result<u32> {
        let b = self.take_bytes(4)?;
        Ok(u32::from_le_bytes(b.try_into().map_err(|_| truncated())?))
    }

    fn take_u64(&mut self) -> Result<u64> {
        let b = self.take_bytes(8)?;
        Ok(u64::from_le_bytes(b.try_into().map_err(|_| truncated())?))
    }

    fn take_bytes(&mut self, n: usize) -> Result<Vec<u8>> {
        use std::io::Read;
        let mut buf = vec![0u8; n];
        self.read_exact(&mut buf).map_err(|_| truncated())?;
        Ok(buf)
    }
}

fn read_key(cur: &mut Cursor<&[u8]>) -> Result<Option<EncryptionKey>> {
    if cur.take_u8()? == 0 {
        return Ok(None);
    }
    let etype = cur.take_u32()? as i32;
    let len = cur.take_u32()? as usize;
    let key = cur.take_bytes(len)?;
    Ok(Some(EncryptionKey::new(etype, key)))
}

fn read_opt_i64(cur: &mut Cursor<&[u8]>) -> Result<Option<i64>> {
    if cur.take_u8()? == 0 {
        return Ok(None);
    }
    let b = cur.take_bytes(8)?;
    Ok(Some(i64::from_le_bytes(b.try_into().map_err(|_| truncated())?)))
}

fn read_opt_i32(cur: &mut Cursor<&[u8]>) -> Result<Option<i32>> {
    if cur.take_u8()? == 0 {
        return Ok(None);
    }
    let b = cur.take_bytes(4)?;
    Ok(Some(i32::from_le_bytes(b.try_into().map_err(|_| truncated())?)))
}

fn read_opt_string(cur: &mut Cursor<&[u8]>) -> Result<Option<String>> {
    if cur.take_u8()? == 0 {
        return Ok(None);
    }
    let len = cur.take_u32()? as usize;
    let bytes = cur.take_bytes(len)?;
    String::from_utf8(bytes).map(Some).map_err(|_| truncated())
}

/// Returned by `Inquire` (§4.7).
#[derive(Debug, Clone)]
pub struct ContextSnapshot {
    pub peer_name: Option<String>,
    pub mechanism: MechanismId,
    pub session_flags: ContextFlag,
    pub locally_initiated: bool,
    pub fully_established: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::EncryptionKey;

    fn sample_context() -> SecurityContext {
        let mut ctx = SecurityContext::new(Role::Initiator, MechanismId::Krb5, EngineConfig::default());
        ctx.state = ContextState::Established;
        ctx.session_flags = ContextFlag::CONF | ContextFlag::INTEG | ContextFlag::SEQUENCE;
        ctx.session_key = Some(EncryptionKey::new(18, vec![0x11u8; 32]));
        ctx.acceptor_subkey = Some(EncryptionKey::new(18, vec![0x22u8; 32]));
        ctx.our_sequence_number = 41;
        ctx.their_sequence_number = 7;
        ctx.client_ctime = Some(1_700_000_000);
        ctx.client_cusec = Some(123);
        ctx.peer_name = Some("host/db.example.com@EXAMPLE.COM".to_string());
        ctx
    }

    #[test]
    fn export_then_import_round_trips_established_state() {
        let ctx = sample_context();
        let bytes = ctx.export().unwrap();
        let restored = SecurityContext::import(&bytes, MechanismId::Krb5, EngineConfig::default()).unwrap();

        assert_eq!(restored.role, ctx.role);
        assert!(restored.is_established());
        assert_eq!(restored.session_flags, ctx.session_flags);
        assert_eq!(restored.our_sequence_number, ctx.our_sequence_number);
        assert_eq!(restored.their_sequence_number, ctx.their_sequence_number);
        assert_eq!(restored.session_key.unwrap().key, vec![0x11u8; 32]);
        assert_eq!(restored.acceptor_subkey.unwrap().key, vec![0x22u8; 32]);
        assert!(restored.initiator_subkey.is_none());
        assert_eq!(restored.client_ctime, ctx.client_ctime);
        assert_eq!(restored.client_cusec, ctx.client_cusec);
        assert_eq!(restored.peer_name, ctx.peer_name);
    }

    #[test]
    fn export_requires_an_established_context() {
        let ctx = SecurityContext::new(Role::Initiator, MechanismId::Krb5, EngineConfig::default());
        assert!(ctx.export().is_err());
    }

    #[test]
    fn import_rejects_truncated_bytes() {
        let ctx = sample_context();
        let mut bytes = ctx.export().unwrap();
        bytes.truncate(3);
        assert!(SecurityContext::import(&bytes, MechanismId::Krb5, EngineConfig::default()).is_err());
    }
}
