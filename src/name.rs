//! `GssName` and `Credential` (data model, §3).

use crate::error::{ErrorKind, Result};
use crate::oid::{MechanismId, NameType};

/// An imported name, either a plain internal name or a mechanism name
/// (MN) produced by `canonicalize`. Released by dropping the handle; there
/// is no separate `release` call needed in a Rust binding since ownership
/// tracks lifetime directly.
#[derive(Debug, Clone)]
pub struct GssName {
    display_form: String,
    name_type: NameType,
    mechanism: Option<MechanismId>,
}

impl GssName {
    /// `ImportName`: parse `text` as a name of the given type. This engine
    /// does not itself resolve hostnames or DNS-canonicalize
    /// host-based-service names; that belongs to the adapter.
    pub fn import(text: &str, name_type: NameType) -> Result<Self> {
        if text.is_empty() {
            return Err(ErrorKind::BadName.into());
        }
        Ok(GssName {
            display_form: text.to_string(),
            name_type,
            mechanism: None,
        })
    }

    /// `Canonicalize`: bind a name to a specific mechanism, yielding a
    /// mechanism name (MN).
    pub fn canonicalize(&self, mech: MechanismId) -> GssName {
        GssName {
            display_form: self.display_form.clone(),
            name_type: self.name_type,
            mechanism: Some(mech),
        }
    }

    pub fn is_mechanism_name(&self) -> bool {
        self.mechanism.is_some()
    }

    /// `Display`: the printable form plus its name type.
    pub fn display(&self) -> (&str, NameType) {
        (&self.display_form, self.name_type)
    }

    pub fn name_type(&self) -> NameType {
        self.name_type
    }

    /// `Export`: a flat, re-importable byte form (RFC 2743 §3.2's
    /// exported-name-object, restricted to what this engine needs --
    /// name-type OID length-prefixed, followed by the display text).
    pub fn export(&self) -> Result<Vec<u8>> {
        if !self.is_mechanism_name() {
            return Err(ErrorKind::NameNotMn.into());
        }
        let oid = self.name_type.oid();
        let oid_bytes = oid.as_bytes();
        let mut out = Vec::with_capacity(4 + oid_bytes.len() + self.display_form.len());
        out.extend_from_slice(&(oid_bytes.len() as u32).to_be_bytes());
        out.extend_from_slice(oid_bytes);
        out.extend_from_slice(self.display_form.as_bytes());
        Ok(out)
    }
}

impl PartialEq for GssName {
    fn eq(&self, other: &Self) -> bool {
        self.display_form == other.display_form && self.name_type == other.name_type
    }
}

/// Whether a credential may be used to initiate contexts, accept them, or
/// both.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialUsage {
    InitiateOnly,
    AcceptOnly,
    Both,
}

/// An acquired credential handle. `AcquireCredential` returns one of these;
/// it is released by dropping it.
#[derive(Debug, Clone)]
pub struct Credential {
    pub name: Option<GssName>,
    pub usage: CredentialUsage,
    pub mechanisms: Vec<MechanismId>,
    pub initiator_expiry: Option<time::OffsetDateTime>,
    pub acceptor_expiry: Option<time::OffsetDateTime>,
}

impl Credential {
    pub fn can_initiate(&self) -> bool {
        matches!(
            self.usage,
            CredentialUsage::InitiateOnly | CredentialUsage::Both
        )
    }

    pub fn can_accept(&self) -> bool {
        matches!(self.usage, CredentialUsage::AcceptOnly | CredentialUsage::Both)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn import_then_display_round_trips_text_and_type() {
        let name = GssName::import("host/db.example.com", NameType::HostBasedService).unwrap();
        let (text, nt) = name.display();
        assert_eq!(text, "host/db.example.com");
        assert_eq!(nt, NameType::HostBasedService);
    }

    #[test]
    fn export_requires_mechanism_name() {
        let name = GssName::import("alice@EXAMPLE.COM", NameType::KrbPrincipal).unwrap();
        assert!(name.export().is_err());
        let mn = name.canonicalize(MechanismId::Krb5);
        assert!(mn.export().is_ok());
    }

    #[test]
    fn empty_text_is_bad_name() {
        assert!(GssName::import("", NameType::UserName).is_err());
    }
}
