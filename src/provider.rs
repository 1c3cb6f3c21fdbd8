//! The Provider Façade (component C7, §4.7): the entry points a caller
//! drives instead of touching `context`/`adapter` directly.

use crate::adapter::KerberosAdapter;
use crate::checksum::ChannelBinding;
use crate::context::{ContextSnapshot, EngineConfig, SecurityContext};
use crate::error::{Continuation, Result};
use crate::flags::ContextFlag;
use crate::name::{Credential, CredentialUsage, GssName};
use crate::oid::{MechanismId, NameType};

/// `GSS_Export_sec_context`.
pub fn export_sec_context(ctx: &SecurityContext) -> Result<Vec<u8>> {
    ctx.export()
}

/// `GSS_Import_sec_context`.
pub fn import_sec_context(
    bytes: &[u8],
    mechanism: MechanismId,
    config: EngineConfig,
) -> Result<SecurityContext> {
    SecurityContext::import(bytes, mechanism, config)
}

/// `GSS_Import_name`.
pub fn import_name(text: &str, name_type: NameType) -> Result<GssName> {
    GssName::import(text, name_type)
}

/// `GSS_Acquire_cred`: this engine only ever negotiates `Krb5`, so the
/// returned credential's mechanism list is always a singleton.
pub fn acquire_credential(name: Option<GssName>, usage: CredentialUsage) -> Credential {
    Credential {
        name,
        usage,
        mechanisms: vec![MechanismId::Krb5],
        initiator_expiry: None,
        acceptor_expiry: None,
    }
}

/// `GSS_Init_sec_context`: the initiator's entry point. A single call
/// suffices unless `requested_flags` includes `MUTUAL`, in which case the
/// caller must feed the peer's reply back through `continue_init`.
pub fn init_sec_context(
    adapter: &mut dyn KerberosAdapter,
    credential: &Credential,
    target_name: &GssName,
    requested_flags: ContextFlag,
    channel_binding: Option<&ChannelBinding>,
    config: EngineConfig,
) -> Result<(SecurityContext, Continuation<Vec<u8>>)> {
    if !credential.can_initiate() {
        return Err(crate::error::ErrorKind::NoCred.into());
    }
    let (text, _name_type) = target_name.display();
    let (ctx, token) = crate::context::establish::initiate(
        adapter,
        text,
        requested_flags,
        channel_binding,
        config,
    )?;
    let continuation = crate::context::establish::continuation_of(&ctx, token);
    Ok((ctx, continuation))
}

/// Feed an AP-REP (or KRB-ERROR) back into an initiator context that is
/// `AwaitingContinue`.
pub fn continue_init_sec_context(
    ctx: &mut SecurityContext,
    adapter: &dyn KerberosAdapter,
    inbound: &[u8],
) -> Result<()> {
    crate::context::establish::initiate_continue(ctx, adapter, inbound)
}

/// `GSS_Accept_sec_context`: the acceptor's entry point. Returns the
/// established context and, when mutual authentication was requested, the
/// AP-REP token to send back.
pub fn accept_sec_context(
    adapter: &mut dyn KerberosAdapter,
    credential: &Credential,
    acceptor_realm: &str,
    inbound: &[u8],
    channel_binding: Option<&ChannelBinding>,
    config: EngineConfig,
) -> Result<(SecurityContext, Option<Vec<u8>>)> {
    if !credential.can_accept() {
        return Err(crate::error::ErrorKind::NoCred.into());
    }
    let principal = credential
        .name
        .as_ref()
        .ok_or(crate::error::ErrorKind::NoCred)?
        .display()
        .0
        .to_string();
    crate::context::establish::accept(
        adapter,
        &principal,
        acceptor_realm,
        inbound,
        channel_binding,
        config,
    )
}

/// `GSS_Inquire_context`.
pub fn inquire_context(ctx: &SecurityContext) -> Result<ContextSnapshot> {
    ctx.inquire()
}

/// `GSS_Delete_sec_context`.
pub fn delete_sec_context(ctx: &mut SecurityContext) {
    ctx.delete()
}
