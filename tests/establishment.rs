//! End-to-end context-establishment scenarios (initiator + acceptor driven
//! through the provider façade, over the in-memory reference adapter).

use gss_krb5::checksum::ChannelBinding;
use gss_krb5::context::EngineConfig;
use gss_krb5::flags::ContextFlag;
use gss_krb5::keys::EncryptionKey;
use gss_krb5::name::{CredentialUsage, GssName};
use gss_krb5::oid::NameType;
use gss_krb5::provider;
use gss_krb5::testing::{InMemoryAdapter, ReferenceSuite};

fn adapter_with_service(principal: &str, realm: &str) -> InMemoryAdapter {
    let mut adapter = InMemoryAdapter::new();
    let key = EncryptionKey::new(
        gss_krb5::etype::etypes::AES256_CTS_HMAC_SHA1_96 as i32,
        vec![0x42u8; 32],
    );
    adapter.register_service(principal, realm, key);
    adapter
}

#[test]
fn no_mutual_round_trip_establishes_both_sides_immediately() {
    let mut adapter = adapter_with_service("host/db.example.com", "EXAMPLE.COM");
    let initiator_cred = provider::acquire_credential(None, CredentialUsage::InitiateOnly);
    let target = GssName::import("host/db.example.com", NameType::HostBasedService).unwrap();

    let (initiator_ctx, continuation) = provider::init_sec_context(
        &mut adapter,
        &initiator_cred,
        &target,
        ContextFlag::INTEG,
        None,
        EngineConfig::default(),
    )
    .unwrap();
    assert!(!continuation.continue_needed);
    assert!(initiator_ctx.is_established());

    let acceptor_name = GssName::import("host/db.example.com", NameType::HostBasedService).unwrap();
    let acceptor_cred = provider::acquire_credential(Some(acceptor_name), CredentialUsage::AcceptOnly);
    let (acceptor_ctx, reply) = provider::accept_sec_context(
        &mut adapter,
        &acceptor_cred,
        "EXAMPLE.COM",
        &continuation.value,
        None,
        EngineConfig::default(),
    )
    .unwrap();

    assert!(acceptor_ctx.is_established());
    assert!(reply.is_none());
    assert_eq!(
        provider::inquire_context(&acceptor_ctx).unwrap().session_flags,
        provider::inquire_context(&initiator_ctx).unwrap().session_flags
    );
}

#[test]
fn mutual_auth_establishes_and_protects_a_message() {
    let mut adapter = adapter_with_service("host/db.example.com", "EXAMPLE.COM");
    let initiator_cred = provider::acquire_credential(None, CredentialUsage::InitiateOnly);
    let target = GssName::import("host/db.example.com", NameType::HostBasedService).unwrap();

    let (mut initiator_ctx, continuation) = provider::init_sec_context(
        &mut adapter,
        &initiator_cred,
        &target,
        ContextFlag::INTEG | ContextFlag::CONF | ContextFlag::MUTUAL,
        None,
        EngineConfig::default(),
    )
    .unwrap();
    assert!(continuation.continue_needed);

    let acceptor_name = GssName::import("host/db.example.com", NameType::HostBasedService).unwrap();
    let acceptor_cred = provider::acquire_credential(Some(acceptor_name), CredentialUsage::AcceptOnly);
    let (mut acceptor_ctx, reply) = provider::accept_sec_context(
        &mut adapter,
        &acceptor_cred,
        "EXAMPLE.COM",
        &continuation.value,
        None,
        EngineConfig::default(),
    )
    .unwrap();
    let reply = reply.expect("mutual auth requires an AP-REP reply");

    provider::continue_init_sec_context(&mut initiator_ctx, &adapter, &reply).unwrap();
    assert!(initiator_ctx.is_established());
    assert!(initiator_ctx.session_flags.contains(ContextFlag::MUTUAL));

    let suite = ReferenceSuite;
    let token = initiator_ctx.wrap(&suite, b"hello").unwrap();
    let plaintext = acceptor_ctx.unwrap(&suite, &token).unwrap();
    assert_eq!(plaintext, b"hello");
}

#[test]
fn channel_bound_request_is_verified_by_the_acceptor() {
    let mut adapter = adapter_with_service("host/db.example.com", "EXAMPLE.COM");
    let initiator_cred = provider::acquire_credential(None, CredentialUsage::InitiateOnly);
    let target = GssName::import("host/db.example.com", NameType::HostBasedService).unwrap();

    let cb = ChannelBinding {
        initiator_address: None,
        acceptor_address: None,
        application_data: b"tls-exporter-value".to_vec(),
    };

    let (_initiator_ctx, continuation) = provider::init_sec_context(
        &mut adapter,
        &initiator_cred,
        &target,
        ContextFlag::INTEG | ContextFlag::CHANNEL_BOUND,
        Some(&cb),
        EngineConfig::default(),
    )
    .unwrap();

    let acceptor_name = GssName::import("host/db.example.com", NameType::HostBasedService).unwrap();
    let acceptor_cred = provider::acquire_credential(Some(acceptor_name), CredentialUsage::AcceptOnly);

    // Wrong channel binding on the acceptor side must be rejected.
    let wrong_cb = ChannelBinding {
        initiator_address: None,
        acceptor_address: None,
        application_data: b"different-value".to_vec(),
    };
    let rejected = provider::accept_sec_context(
        &mut adapter,
        &acceptor_cred,
        "EXAMPLE.COM",
        &continuation.value,
        Some(&wrong_cb),
        EngineConfig::default(),
    );
    assert!(rejected.is_err());

    let accepted = provider::accept_sec_context(
        &mut adapter,
        &acceptor_cred,
        "EXAMPLE.COM",
        &continuation.value,
        Some(&cb),
        EngineConfig::default(),
    );
    assert!(accepted.is_ok());
}

#[test]
fn established_context_can_be_exported_and_imported_across_a_process_boundary() {
    let mut adapter = adapter_with_service("host/db.example.com", "EXAMPLE.COM");
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

    let exported = provider::export_sec_context(&acceptor_ctx).unwrap();
    let mut restored = provider::import_sec_context(
        &exported,
        gss_krb5::oid::MechanismId::Krb5,
        EngineConfig::default(),
    )
    .unwrap();
    assert!(restored.is_established());
    assert_eq!(
        provider::inquire_context(&restored).unwrap().session_flags,
        provider::inquire_context(&acceptor_ctx).unwrap().session_flags
    );

    let suite = ReferenceSuite;
    let mut initiator_ctx = initiator_ctx;
    let token = initiator_ctx.wrap(&suite, b"after a round trip").unwrap();
    let plaintext = restored.unwrap(&suite, &token).unwrap();
    assert_eq!(plaintext, b"after a round trip");
}
