//! Message-protection and lifecycle properties (§8): tamper detection,
//! sequence discipline, and idempotent delete.

use gss_krb5::context::{ContextState, EngineConfig};
use gss_krb5::flags::ContextFlag;
use gss_krb5::keys::EncryptionKey;
use gss_krb5::name::{CredentialUsage, GssName};
use gss_krb5::oid::NameType;
use gss_krb5::provider;
use gss_krb5::testing::{InMemoryAdapter, ReferenceSuite};

fn established_pair() -> (gss_krb5::context::SecurityContext, gss_krb5::context::SecurityContext) {
    let mut adapter = InMemoryAdapter::new();
    let key = EncryptionKey::new(
        gss_krb5::etype::etypes::AES128_CTS_HMAC_SHA1_96 as i32,
        vec![0x11u8; 16],
    );
    adapter.register_service("host/db.example.com", "EXAMPLE.COM", key);

    let initiator_cred = provider::acquire_credential(None, CredentialUsage::InitiateOnly);
    let target = GssName::import("host/db.example.com", NameType::HostBasedService).unwrap();
    let (initiator_ctx, continuation) = provider::init_sec_context(
        &mut adapter,
        &initiator_cred,
        &target,
        ContextFlag::INTEG | ContextFlag::CONF | ContextFlag::SEQUENCE,
        None,
        EngineConfig::default(),
    )
    .unwrap();

    let acceptor_name = GssName::import("host/db.example.com", NameType::HostBasedService).unwrap();
    let acceptor_cred = provider::acquire_credential(Some(acceptor_name), CredentialUsage::AcceptOnly);
    let (acceptor_ctx, _reply) = provider::accept_sec_context(
        &mut adapter,
        &acceptor_cred,
        "EXAMPLE.COM",
        &continuation.value,
        None,
        EngineConfig::default(),
    )
    .unwrap();

    (initiator_ctx, acceptor_ctx)
}

#[test]
fn tampered_sealed_wrap_token_fails_and_sequence_does_not_advance() {
    let (mut initiator_ctx, mut acceptor_ctx) = established_pair();
    let suite = ReferenceSuite;

    let mut token = initiator_ctx.wrap(&suite, b"payload").unwrap();
    let before = acceptor_ctx.their_sequence_number;
    let tamper_offset = 16;
    token[tamper_offset] ^= 0xff;
    assert!(acceptor_ctx.unwrap(&suite, &token).is_err());
    assert_eq!(acceptor_ctx.their_sequence_number, before);

    let good = initiator_ctx.wrap(&suite, b"ok").unwrap();
    let plaintext = acceptor_ctx.unwrap(&suite, &good).unwrap();
    assert_eq!(plaintext, b"ok");
}

#[test]
fn delete_is_idempotent_and_blocks_further_message_ops() {
    let (_initiator_ctx, mut acceptor_ctx) = established_pair();
    provider::delete_sec_context(&mut acceptor_ctx);
    provider::delete_sec_context(&mut acceptor_ctx);
    assert_eq!(acceptor_ctx.state, ContextState::Deleted);

    let suite = ReferenceSuite;
    assert!(acceptor_ctx.wrap(&suite, b"x").is_err());
}
