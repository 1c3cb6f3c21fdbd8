//! The external Kerberos adapter boundary (component C8).
//!
//! Ticket acquisition, keytab/credential-cache parsing and Kerberos ASN.1
//! are explicitly out of scope (§1): this module defines plain, engine-owned
//! typed records for the handful of Kerberos messages the engine has to
//! reason about (AP-REQ, AP-REP, their enc-parts, KRB-ERROR) and the trait
//! the context-establishment state machine drives against them. The adapter
//! implementation owns all ASN.1 (de)serialization and ticket/keytab
//! handling; the engine never touches wire bytes for these messages itself,
//! only the fields it needs.

use crate::error::Result;

/// A Kerberos principal name (RFC 4120 §5.2.2): a name-type plus its
/// ordered components (e.g. `["host", "db.example.com"]`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalName {
    pub name_type: i32,
    pub components: Vec<String>,
}

impl PrincipalName {
    pub fn new(name_type: i32, components: Vec<String>) -> Self {
        PrincipalName {
            name_type,
            components,
        }
    }

    /// The `component/component/...` form used inside a realm-qualified
    /// principal string; callers append `@realm` themselves.
    pub fn display(&self) -> String {
        self.components.join("/")
    }
}

/// An opaque service ticket (RFC 4120 §5.3). The engine never parses a
/// ticket's contents -- it is acquired, carried and handed to the adapter
/// for decryption, nothing else (§1).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket(pub Vec<u8>);

/// The fields of a Kerberos authenticator (RFC 4120 §5.5.1) the engine
/// needs, either to build one (initiator) or after decrypting one off the
/// wire (acceptor).
#[derive(Debug, Clone)]
pub struct Authenticator {
    pub ctime: i64,
    pub cusec: i32,
    pub sequence_number: Option<u32>,
    /// The GSSAPI checksum extension (RFC 4121 §4.1.1), opaque bytes here.
    pub checksum: Option<Vec<u8>>,
    /// `(etype, key-bytes)` subkey, if the authenticator carries one.
    pub subkey: Option<(i32, Vec<u8>)>,
    /// Present once decrypted off the wire (acceptor side); absent while
    /// the initiator is still building the authenticator it will send,
    /// since the adapter fills in `cname`/`crealm` from its own credential.
    pub cname: Option<PrincipalName>,
    pub crealm: Option<String>,
}

/// The fields of an AP-REP enc-part (RFC 4120 §5.5.2) the engine needs.
#[derive(Debug, Clone)]
pub struct EncApRepPart {
    pub ctime: i64,
    pub cusec: i32,
    pub sequence_number: Option<u32>,
    pub subkey: Option<(i32, Vec<u8>)>,
}

/// An AP-REQ message (RFC 4120 §5.5.1): a ticket plus an authenticator
/// still encrypted under the ticket's session key, and the `mutual-required`
/// bit out of `ap-options` (readable without decryption).
#[derive(Debug, Clone)]
pub struct ApReq {
    pub ticket: Ticket,
    pub authenticator_cipher: Vec<u8>,
    pub mutual_required: bool,
}

/// An AP-REP message (RFC 4120 §5.5.2): just the encrypted enc-part.
#[derive(Debug, Clone)]
pub struct ApRep {
    pub enc_part_cipher: Vec<u8>,
}

/// A KRB-ERROR message (RFC 4120 §5.9.1), reduced to the fields this engine
/// surfaces to its caller.
#[derive(Debug, Clone)]
pub struct KrbError {
    pub error_code: u32,
    pub error_text: String,
}

/// A service ticket plus the session key negotiated for it, and the
/// display name of the principal the ticket names.
pub struct AcquiredTicket {
    pub ticket: Ticket,
    pub session_key: crate::keys::EncryptionKey,
    pub peer_name: String,
}

/// A ticket that has been decrypted against a keytab entry, ready to have
/// its authenticator checked.
pub struct DecryptedTicket {
    pub ticket: Ticket,
    pub session_key: crate::keys::EncryptionKey,
    pub server_principal: PrincipalName,
    pub server_realm: String,
    /// The client name bound into the ticket's encrypted part (EncTicketPart
    /// `cname`, RFC 4120 §5.3), checked against the authenticator's own
    /// `cname` by the acceptor (§4.6.4 step 6).
    pub cname: PrincipalName,
    pub crealm: String,
}

/// The typed boundary the context-establishment state machine (C6) drives.
/// A production implementation wraps a credential cache, a keytab and an
/// encryption-type registry, and owns all Kerberos ASN.1 encoding/decoding
/// behind these methods; this crate ships only a reference implementation
/// for its own tests (`crate::testing`).
pub trait KerberosAdapter: crate::etype::EncryptionSuite {
    /// Acquire a service ticket and session key for `principal`, using
    /// whatever ambient credential cache / KDC configuration the adapter
    /// is set up with. The only operation in this engine allowed to
    /// perform network or disk I/O (§5).
    fn acquire_service_ticket(&mut self, principal: &str) -> Result<AcquiredTicket>;

    /// Decrypt `ticket` against the keytab entry for `server_principal`.
    fn decrypt_ticket(&self, ticket: &Ticket, server_principal: &str) -> Result<DecryptedTicket>;

    /// Decrypt the authenticator embedded in an AP-REQ using the ticket's
    /// session key.
    fn decrypt_authenticator(
        &self,
        ap_req: &ApReq,
        session_key: &crate::keys::EncryptionKey,
    ) -> Result<Authenticator>;

    /// Build the AP-REQ message bytes (mechanism-specific body, no outer
    /// GSS framing) from a ticket, session key and authenticator.
    fn build_ap_req(
        &self,
        ticket: &Ticket,
        session_key: &crate::keys::EncryptionKey,
        authenticator: &Authenticator,
        mutual_required: bool,
    ) -> Result<Vec<u8>>;

    /// Parse AP-REQ message bytes (inverse of `build_ap_req`).
    fn parse_ap_req(&self, bytes: &[u8]) -> Result<ApReq>;

    /// Build the AP-REP message bytes from a ticket's session key and the
    /// enc-part contents (ctime, cusec, sequence number, optional subkey).
    fn build_ap_rep(
        &self,
        session_key: &crate::keys::EncryptionKey,
        enc_part: &EncApRepPart,
    ) -> Result<Vec<u8>>;

    /// Parse AP-REP message bytes (inverse of `build_ap_rep`).
    fn parse_ap_rep(&self, bytes: &[u8]) -> Result<ApRep>;

    /// Decrypt an AP-REP's enc-part under the session key.
    fn decrypt_ap_rep_encpart(
        &self,
        ap_rep: &ApRep,
        session_key: &crate::keys::EncryptionKey,
    ) -> Result<EncApRepPart>;

    /// Parse a KRB-ERROR message.
    fn parse_krb_error(&self, bytes: &[u8]) -> Result<KrbError>;

    /// Build a KRB-ERROR message for the acceptor to send back when AP-REQ
    /// verification fails.
    fn build_krb_error(
        &self,
        server_principal: &str,
        server_realm: &str,
        code: u32,
        text: &str,
    ) -> Result<Vec<u8>>;
}
