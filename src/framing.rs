//! GSSAPI outer-token framing (component C4, RFC 2743 §3.1):
//!
//! ```text
//! APPLICATION-TAG-0 [ DER-encoded-OID || 2-byte-TokenID || mechanism-specific-body ]
//! ```
//!
//! This is a single, fixed wrapping convention, not a general ASN.1
//! message -- it is hand-rolled here the same way reference GSSAPI
//! implementations hand-roll it (e.g. MIT krb5's `util_token.c`), rather
//! than routed through a general-purpose ASN.1 codec.

use crate::error::{ErrorKind, GssError, Result};
use crate::oid::{MechanismId, Oid};
use der::Encode;

pub const TOKEN_ID_AP_REQ: [u8; 2] = [0x01, 0x00];
pub const TOKEN_ID_AP_REP: [u8; 2] = [0x02, 0x00];
pub const TOKEN_ID_KRB_ERROR: [u8; 2] = [0x03, 0x00];

const APPLICATION_TAG_0: u8 = 0x60;

/// A parsed outer token: the two-byte token-id tag plus the remaining
/// mechanism-specific body.
pub struct OuterToken {
    pub token_id: [u8; 2],
    pub body: Vec<u8>,
}

fn encode_ber_length(len: usize, out: &mut Vec<u8>) {
    if len < 0x80 {
        out.push(len as u8);
    } else {
        let mut len_bytes = Vec::new();
        let mut remaining = len;
        while remaining > 0 {
            len_bytes.insert(0, (remaining & 0xff) as u8);
            remaining >>= 8;
        }
        out.push(0x80 | len_bytes.len() as u8);
        out.extend_from_slice(&len_bytes);
    }
}

/// Returns `(length, bytes_consumed_by_the_length_field)`.
fn decode_ber_length(bytes: &[u8]) -> Result<(usize, usize)> {
    if bytes.is_empty() {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "truncated length octet".into(),
        )));
    }
    let first = bytes[0];
    if first & 0x80 == 0 {
        Ok((first as usize, 1))
    } else {
        let n = (first & 0x7f) as usize;
        if n == 0 || bytes.len() < 1 + n {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "truncated long-form length".into(),
            )));
        }
        let mut len = 0usize;
        for &b in &bytes[1..1 + n] {
            len = (len << 8) | b as usize;
        }
        Ok((len, 1 + n))
    }
}

/// Marshal a context-establishment token: the mechanism's OID, the
/// two-byte token-id, and the mechanism-specific body, wrapped in an
/// ASN.1 APPLICATION-0 constructed tag.
pub fn marshal(mech: MechanismId, token_id: [u8; 2], body: &[u8]) -> Result<Vec<u8>> {
    let oid = mech.oid();
    let der_oid = der::asn1::ObjectIdentifier::from_bytes(oid.as_bytes())
        .map_err(GssError::from)?;
    let oid_tlv = der_oid.to_der().map_err(GssError::from)?;

    let mut content = oid_tlv;
    content.extend_from_slice(&token_id);
    content.extend_from_slice(body);

    let mut out = vec![APPLICATION_TAG_0];
    encode_ber_length(content.len(), &mut out);
    out.extend_from_slice(&content);
    Ok(out)
}

/// Unmarshal a context-establishment token, verifying the outer OID
/// equals `expected_mech`'s OID (any recognized alternate is accepted,
/// since lookup goes through `MechanismId::from_oid`).
pub fn unmarshal(bytes: &[u8], expected_mech: MechanismId) -> Result<OuterToken> {
    if bytes.len() < 2 || bytes[0] != APPLICATION_TAG_0 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "missing APPLICATION-0 outer tag".into(),
        )));
    }
    let (content_len, len_size) = decode_ber_length(&bytes[1..])?;
    let content_start = 1 + len_size;
    let content_end = content_start + content_len;
    if bytes.len() < content_end {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "outer token shorter than declared length".into(),
        )));
    }
    let content = &bytes[content_start..content_end];

    // The OID is a DER TLV immediately followed by the 2-byte token-id and
    // the mechanism-specific body; `ObjectIdentifier::from_der` rejects any
    // trailing bytes, so the OID's own tag+length must be read first and
    // only that sub-slice handed to it.
    if content.len() < 2 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "token content shorter than an OID tag+length".into(),
        )));
    }
    let (oid_body_len, oid_len_size) = decode_ber_length(&content[1..])?;
    let oid_tlv_len = 1 + oid_len_size + oid_body_len;
    if content.len() < oid_tlv_len {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "OID TLV longer than its enclosing token".into(),
        )));
    }
    let oid_tlv = &content[..oid_tlv_len];
    let der_oid = der::asn1::ObjectIdentifier::from_der(oid_tlv).map_err(GssError::from)?;
    let oid = Oid::from_der_body(der_oid.as_bytes().to_vec());
    let found_mech = MechanismId::from_oid(&oid)?;
    if found_mech != expected_mech {
        return Err(GssError::new(ErrorKind::BadMech));
    }

    let rest = &content[oid_tlv_len..];
    if rest.len() < 2 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "token shorter than 2 bytes after OID".into(),
        )));
    }
    let token_id = [rest[0], rest[1]];
    Ok(OuterToken {
        token_id,
        body: rest[2..].to_vec(),
    })
}

use der::Decode;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn marshal_unmarshal_round_trips() {
        let body = b"ap-req-body";
        let bytes = marshal(MechanismId::Krb5, TOKEN_ID_AP_REQ, body).unwrap();
        let parsed = unmarshal(&bytes, MechanismId::Krb5).unwrap();
        assert_eq!(parsed.token_id, TOKEN_ID_AP_REQ);
        assert_eq!(parsed.body, body);
    }

    #[test]
    fn unmarshal_rejects_mismatched_mechanism() {
        let bytes = marshal(MechanismId::Krb5, TOKEN_ID_AP_REQ, b"x").unwrap();
        let err = unmarshal(&bytes, MechanismId::Spnego).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadMech);
    }

    #[test]
    fn unmarshal_accepts_alternate_oid() {
        // Build the same structure but with the legacy alternate OID; it
        // must still be recognized as Krb5 by MechanismId::from_oid.
        let oid = Oid::from_dotted("1.3.6.1.5.2").unwrap();
        let der_oid = der::asn1::ObjectIdentifier::from_bytes(oid.as_bytes()).unwrap();
        let oid_tlv = der_oid.to_der().unwrap();
        let mut content = oid_tlv;
        content.extend_from_slice(&TOKEN_ID_AP_REQ);
        content.extend_from_slice(b"body");
        let mut bytes = vec![APPLICATION_TAG_0];
        encode_ber_length(content.len(), &mut bytes);
        bytes.extend_from_slice(&content);

        let parsed = unmarshal(&bytes, MechanismId::Krb5).unwrap();
        assert_eq!(parsed.body, b"body");
    }
}
