//! OID & Mechanism Registry (component C1).
//!
//! `Oid` is an immutable DER-body byte sequence. The mechanism, name-type
//! and mechanism-attribute tables below are static, generated-at-compile-time
//! lookups over a small closed set: no mutation after process start, no
//! dynamic registration.

use crate::error::{ErrorKind, GssError, Result};
use std::fmt;

/// The DER body of an object identifier (tag 0x06 and length stripped).
/// Two OIDs are equal iff their byte sequences match. The empty OID is a
/// distinct, valid value meaning "no OID".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Oid(Vec<u8>);

impl Oid {
    pub const NONE: Oid = Oid(Vec::new());

    pub fn from_der_body(bytes: impl Into<Vec<u8>>) -> Self {
        Oid(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_none(&self) -> bool {
        self.0.is_empty()
    }

    /// Parse a dotted-decimal string ("1.2.840.113554.1.2.2") into its DER
    /// body. Used by callers and test fixtures; wire comparisons never go
    /// through this path.
    pub fn from_dotted(s: &str) -> Result<Self> {
        let oid: der::asn1::ObjectIdentifier = s
            .parse()
            .map_err(|_| GssError::new(ErrorKind::BadMech))?;
        // `ObjectIdentifier::as_bytes()` is already the bare DER body
        // (arcs only, no tag/length octets).
        Ok(Oid(oid.as_bytes().to_vec()))
    }

    pub fn to_dotted_string(&self) -> Result<String> {
        let oid = der::asn1::ObjectIdentifier::from_bytes(&self.0).map_err(GssError::from)?;
        Ok(oid.to_string())
    }
}

impl fmt::Display for Oid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.to_dotted_string() {
            Ok(s) => write!(f, "{s}"),
            Err(_) => write!(f, "<invalid-oid>"),
        }
    }
}

/// The closed set of security mechanisms this engine recognizes at the
/// outer-token level. Only `Krb5` is actually driven by the state machine;
/// the others are recognized for OID lookups only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MechanismId {
    Krb5,
    IaKerb,
    Spnego,
    Spkm1,
    Spkm2,
    Spkm3,
}

struct MechEntry {
    id: MechanismId,
    canonical: &'static str,
    alternates: &'static [&'static str],
}

/// Canonical Kerberos V5 mechanism OID, plus alternates recognized for
/// backward-compatibility only (legacy IETF draft OID, and the
/// Microsoft-assigned arc used by some older AD-integrated stacks).
const MECH_TABLE: &[MechEntry] = &[
    MechEntry {
        id: MechanismId::Krb5,
        canonical: "1.2.840.113554.1.2.2",
        alternates: &["1.3.6.1.5.2", "1.2.840.48018.1.2.2"],
    },
    MechEntry {
        id: MechanismId::IaKerb,
        canonical: "1.3.6.1.5.2.5",
        alternates: &[],
    },
    MechEntry {
        id: MechanismId::Spnego,
        canonical: "1.3.6.1.5.5.2",
        alternates: &[],
    },
    MechEntry {
        id: MechanismId::Spkm1,
        canonical: "1.3.6.1.5.5.1.1",
        alternates: &[],
    },
    MechEntry {
        id: MechanismId::Spkm2,
        canonical: "1.3.6.1.5.5.1.2",
        alternates: &[],
    },
    MechEntry {
        id: MechanismId::Spkm3,
        canonical: "1.3.6.1.5.5.1.3",
        alternates: &[],
    },
];

impl MechanismId {
    /// The mechanism's canonical OID.
    pub fn oid(self) -> Oid {
        let entry = MECH_TABLE.iter().find(|e| e.id == self).expect("closed set");
        Oid::from_dotted(entry.canonical).expect("static table is valid")
    }

    /// Look up a mechanism by any OID it is known under (canonical or
    /// alternate). Fails with `BadMech` for anything not in the table.
    pub fn from_oid(oid: &Oid) -> Result<MechanismId> {
        for entry in MECH_TABLE {
            let canonical = Oid::from_dotted(entry.canonical).expect("static table is valid");
            if &canonical == oid {
                return Ok(entry.id);
            }
            for alt in entry.alternates {
                let alt_oid = Oid::from_dotted(alt).expect("static table is valid");
                if &alt_oid == oid {
                    return Ok(entry.id);
                }
            }
        }
        Err(ErrorKind::BadMech.into())
    }
}

/// Closed set of GSSAPI name types (RFC 2743 §4, plus Kerberos-specific
/// forms). Values outside this set cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NameType {
    HostBasedService,
    UserName,
    MachineUid,
    StringUid,
    Anonymous,
    NoOid,
    ExportName,
    NoName,
    CompositeExport,
    KrbPrincipal,
    KrbEnterprise,
    X509,
}

struct NameTypeEntry {
    id: NameType,
    canonical: &'static str,
    alternates: &'static [&'static str],
}

const NAME_TYPE_TABLE: &[NameTypeEntry] = &[
    NameTypeEntry {
        id: NameType::HostBasedService,
        canonical: "1.2.840.113554.1.2.1.4",
        alternates: &["1.3.6.1.5.6.2"],
    },
    NameTypeEntry {
        id: NameType::UserName,
        canonical: "1.2.840.113554.1.2.1.1",
        alternates: &[],
    },
    NameTypeEntry {
        id: NameType::MachineUid,
        canonical: "1.2.840.113554.1.2.1.2",
        alternates: &[],
    },
    NameTypeEntry {
        id: NameType::StringUid,
        canonical: "1.2.840.113554.1.2.1.3",
        alternates: &[],
    },
    NameTypeEntry {
        id: NameType::Anonymous,
        canonical: "1.3.6.1.5.6.3",
        alternates: &[],
    },
    NameTypeEntry {
        id: NameType::NoOid,
        canonical: "1.3.6.1.5.6.1",
        alternates: &[],
    },
    NameTypeEntry {
        id: NameType::ExportName,
        canonical: "1.3.6.1.5.6.4",
        alternates: &[],
    },
    NameTypeEntry {
        id: NameType::NoName,
        canonical: "1.3.6.1.5.6.5",
        alternates: &[],
    },
    NameTypeEntry {
        id: NameType::CompositeExport,
        canonical: "1.3.6.1.5.6.6",
        alternates: &[],
    },
    NameTypeEntry {
        id: NameType::KrbPrincipal,
        canonical: "1.2.840.113554.1.2.2.1",
        alternates: &["1.2.840.48018.1.2.2"],
    },
    NameTypeEntry {
        id: NameType::KrbEnterprise,
        canonical: "1.2.840.113554.1.2.2.6",
        alternates: &[],
    },
    NameTypeEntry {
        id: NameType::X509,
        canonical: "1.3.6.1.5.6.10",
        alternates: &[],
    },
];

impl NameType {
    pub fn oid(self) -> Oid {
        let entry = NAME_TYPE_TABLE
            .iter()
            .find(|e| e.id == self)
            .expect("closed set");
        Oid::from_dotted(entry.canonical).expect("static table is valid")
    }

    pub fn from_oid(oid: &Oid) -> Result<NameType> {
        for entry in NAME_TYPE_TABLE {
            let canonical = Oid::from_dotted(entry.canonical).expect("static table is valid");
            if &canonical == oid {
                return Ok(entry.id);
            }
            for alt in entry.alternates {
                let alt_oid = Oid::from_dotted(alt).expect("static table is valid");
                if &alt_oid == oid {
                    return Ok(entry.id);
                }
            }
        }
        Err(ErrorKind::BadNameType.into())
    }
}

/// RFC 5587 mechanism-attribute OIDs, `1.3.6.1.5.5.13.{1..28}`, each mapped
/// to a short and long description. Closed set, generated from a range
/// rather than hand-enumerated since the arc is sequential.
pub struct MechAttrEntry {
    pub oid: Oid,
    pub short: &'static str,
    pub long: &'static str,
}

const MECH_ATTR_DESCRIPTIONS: &[(&str, &str)] = &[
    ("GSS_C_MA_MECH_CONCRETE", "Mechanism is neither a pseudo-mechanism nor a composite mechanism"),
    ("GSS_C_MA_MECH_PSEUDO", "Mechanism is a pseudo-mechanism"),
    ("GSS_C_MA_MECH_COMPOSITE", "Mechanism is a composite of other mechanisms"),
    ("GSS_C_MA_MECH_NEGO", "Mechanism is a negotiation mechanism"),
    ("GSS_C_MA_MECH_GLUE", "Mechanism is a glue mechanism"),
    ("GSS_C_MA_NOT_MECH", "Not a mechanism attribute"),
    ("GSS_C_MA_DEPRECATED", "Mechanism is deprecated"),
    ("GSS_C_MA_NOT_DFLT_MECH", "Not selected unless explicitly requested"),
    ("GSS_C_MA_ITOK_FRAMED", "Initial context token is correctly framed"),
    ("GSS_C_MA_AUTH_INIT", "Supports authentication of initiator"),
    ("GSS_C_MA_AUTH_TARG", "Supports authentication of target"),
    ("GSS_C_MA_AUTH_INIT_INIT", "Initiator auth can be initiated by initiator"),
    ("GSS_C_MA_AUTH_TARG_INIT", "Target auth can be initiated by initiator"),
    ("GSS_C_MA_AUTH_INIT_ANON", "Supports anonymous initiator auth"),
    ("GSS_C_MA_AUTH_TARG_ANON", "Supports anonymous target auth"),
    ("GSS_C_MA_DELEG_CRED", "Supports credential delegation"),
    ("GSS_C_MA_INTEG_PROT", "Supports per-message integrity"),
    ("GSS_C_MA_CONF_PROT", "Supports per-message confidentiality"),
    ("GSS_C_MA_MIC", "Supports GSS_GetMIC/GSS_VerifyMIC"),
    ("GSS_C_MA_WRAP", "Supports GSS_Wrap/GSS_Unwrap"),
    ("GSS_C_MA_PROT_READY", "Per-message ops usable before full establishment"),
    ("GSS_C_MA_REPLAY_DET", "Supports replay detection"),
    ("GSS_C_MA_OOS_DET", "Supports out-of-sequence detection"),
    ("GSS_C_MA_CBINDINGS", "Supports channel bindings"),
    ("GSS_C_MA_PFS", "Supports perfect forward secrecy"),
    ("GSS_C_MA_COMPRESS", "Supports compression of tokens"),
    ("GSS_C_MA_CTX_TRANS", "Supports GSS_Export/Import_sec_context"),
    ("GSS_C_MA_NEGOEX_AND_SPNEGO", "Negotiable via NegoEx and SPNEGO"),
];

pub fn mechanism_attribute_table() -> Vec<MechAttrEntry> {
    MECH_ATTR_DESCRIPTIONS
        .iter()
        .enumerate()
        .map(|(i, (short, long))| {
            let arc = format!("1.3.6.1.5.5.13.{}", i + 1);
            MechAttrEntry {
                oid: Oid::from_dotted(&arc).expect("static table is valid"),
                short,
                long,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_krb5_oid_round_trips() {
        let oid = MechanismId::Krb5.oid();
        assert_eq!(MechanismId::from_oid(&oid).unwrap(), MechanismId::Krb5);
    }

    #[test]
    fn alternate_krb5_oid_resolves_to_krb5() {
        let legacy = Oid::from_dotted("1.3.6.1.5.2").unwrap();
        assert_eq!(MechanismId::from_oid(&legacy).unwrap(), MechanismId::Krb5);
        let ms = Oid::from_dotted("1.2.840.48018.1.2.2").unwrap();
        assert_eq!(MechanismId::from_oid(&ms).unwrap(), MechanismId::Krb5);
    }

    #[test]
    fn unknown_oid_is_bad_mech() {
        let unknown = Oid::from_dotted("1.2.3.4.5").unwrap();
        let err = MechanismId::from_oid(&unknown).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadMech);
    }

    #[test]
    fn name_type_round_trips() {
        let oid = NameType::HostBasedService.oid();
        assert_eq!(NameType::from_oid(&oid).unwrap(), NameType::HostBasedService);
        let alt = Oid::from_dotted("1.3.6.1.5.6.2").unwrap();
        assert_eq!(NameType::from_oid(&alt).unwrap(), NameType::HostBasedService);
    }

    #[test]
    fn mech_attr_table_has_28_entries() {
        assert_eq!(mechanism_attribute_table().len(), 28);
    }
}
