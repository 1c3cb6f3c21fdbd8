//! Reference implementations used only by this crate's own tests: a
//! concrete `EncryptionSuite` and a concrete `KerberosAdapter` backed by an
//! in-memory "keytab". Neither is part of the public contract a real
//! deployment would use (§1, §5) -- a production binding supplies its own
//! crypto and its own credential cache / keytab integration.

use crate::adapter::{
    AcquiredTicket, ApRep, ApReq, Authenticator, DecryptedTicket, EncApRepPart, KerberosAdapter,
    KrbError, PrincipalName, Ticket,
};
use crate::error::{ErrorKind, GssError, Result};
use crate::etype::{cksum_types, etypes, EncryptionSuite};
use crate::keys::EncryptionKey;
use aes::cipher::{generic_array::GenericArray, BlockDecrypt, BlockEncrypt, KeyInit};
use aes::{Aes128, Aes256};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use std::collections::HashMap;

type HmacSha256 = Hmac<Sha256>;

const BLOCK_SIZE: usize = 16;

fn block_cipher_op(key: &[u8], block: &mut [u8; BLOCK_SIZE], encrypt: bool) -> Result<()> {
    match key.len() {
        16 => {
            let cipher = Aes128::new(GenericArray::from_slice(key));
            let mut ga = *GenericArray::from_slice(block);
            if encrypt {
                cipher.encrypt_block(&mut ga);
            } else {
                cipher.decrypt_block(&mut ga);
            }
            block.copy_from_slice(&ga);
        }
        32 => {
            let cipher = Aes256::new(GenericArray::from_slice(key));
            let mut ga = *GenericArray::from_slice(block);
            if encrypt {
                cipher.encrypt_block(&mut ga);
            } else {
                cipher.decrypt_block(&mut ga);
            }
            block.copy_from_slice(&ga);
        }
        _ => {
            return Err(GssError::new(ErrorKind::Failure(
                "reference suite only supports 128/256-bit keys".into(),
            )))
        }
    }
    Ok(())
}

fn cbc_encrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len());
    let mut prev = [0u8; BLOCK_SIZE];
    for chunk in data.chunks(BLOCK_SIZE) {
        let mut block = [0u8; BLOCK_SIZE];
        block[..chunk.len()].copy_from_slice(chunk);
        for i in 0..BLOCK_SIZE {
            block[i] ^= prev[i];
        }
        block_cipher_op(key, &mut block, true)?;
        out.extend_from_slice(&block);
        prev = block;
    }
    Ok(out)
}

fn cbc_decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() % BLOCK_SIZE != 0 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "ciphertext not a multiple of the block size".into(),
        )));
    }
    let mut out = Vec::with_capacity(data.len());
    let mut prev = [0u8; BLOCK_SIZE];
    for chunk in data.chunks(BLOCK_SIZE) {
        let mut cipher_block = [0u8; BLOCK_SIZE];
        cipher_block.copy_from_slice(chunk);
        let mut block = cipher_block;
        block_cipher_op(key, &mut block, false)?;
        for i in 0..BLOCK_SIZE {
            block[i] ^= prev[i];
        }
        out.extend_from_slice(&block);
        prev = cipher_block;
    }
    Ok(out)
}

fn hmac_tag(key: &[u8], usage: i32, data: &[u8], len: usize) -> Result<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| GssError::new(ErrorKind::Failure("bad HMAC key length".into())))?;
    mac.update(&usage.to_be_bytes());
    mac.update(data);
    let full = mac.finalize().into_bytes();
    Ok(full[..len.min(full.len())].to_vec())
}

/// A deliberately simplified AES-CBC + HMAC suite: enough for this crate's
/// round-trip and tamper-detection tests, not an RFC 3961 key-derivation or
/// CTS implementation. A production binding supplies its own `EncryptionSuite`.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReferenceSuite;

impl EncryptionSuite for ReferenceSuite {
    fn encrypt(&self, _etype: i32, key: &[u8], key_usage: i32, plaintext: &[u8]) -> Result<Vec<u8>> {
        let confounder = vec![0x5au8; self.confounder_size(_etype)];
        let mut body = confounder;
        body.extend_from_slice(&(plaintext.len() as u32).to_be_bytes());
        body.extend_from_slice(plaintext);
        while body.len() % BLOCK_SIZE != 0 {
            body.push(0);
        }
        let ciphertext = cbc_encrypt(key, &body)?;
        let mac = hmac_tag(key, key_usage, &ciphertext, self.checksum_length(_etype))?;
        let mut out = ciphertext;
        out.extend_from_slice(&mac);
        Ok(out)
    }

    fn decrypt(&self, etype: i32, key: &[u8], key_usage: i32, ciphertext: &[u8]) -> Result<Vec<u8>> {
        let mac_len = self.checksum_length(etype);
        if ciphertext.len() < mac_len {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "ciphertext shorter than its own MAC".into(),
            )));
        }
        let split = ciphertext.len() - mac_len;
        let (body, mac) = ciphertext.split_at(split);
        let expected = hmac_tag(key, key_usage, body, mac_len)?;
        if !crate::token::wrap::constant_time_eq(&expected, mac) {
            return Err(GssError::new(ErrorKind::BadMic));
        }
        let plaintext_block = cbc_decrypt(key, body)?;
        let confounder_size = self.confounder_size(etype);
        if plaintext_block.len() < confounder_size + 4 {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "plaintext shorter than confounder + length prefix".into(),
            )));
        }
        let rest = &plaintext_block[confounder_size..];
        let mut len_bytes = [0u8; 4];
        len_bytes.copy_from_slice(&rest[..4]);
        let len = u32::from_be_bytes(len_bytes) as usize;
        let payload = &rest[4..];
        if payload.len() < len {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "declared plaintext length exceeds decrypted buffer".into(),
            )));
        }
        Ok(payload[..len].to_vec())
    }

    fn checksum(&self, _etype: i32, key: &[u8], key_usage: i32, data: &[u8]) -> Result<Vec<u8>> {
        hmac_tag(key, key_usage, data, self.checksum_length(_etype))
    }

    fn checksum_length(&self, etype: i32) -> usize {
        match etype as usize {
            etypes::AES256_CTS_HMAC_SHA1_96 | etypes::AES128_CTS_HMAC_SHA1_96 => 12,
            _ => 20,
        }
    }

    fn cipher_block_size(&self, _etype: i32) -> usize {
        BLOCK_SIZE
    }

    fn confounder_size(&self, _etype: i32) -> usize {
        BLOCK_SIZE
    }
}

/// An entry in the reference adapter's in-memory keytab: a server
/// principal bound to a long-term key.
#[derive(Clone)]
struct KeytabEntry {
    server_principal: String,
    server_realm: String,
    key: EncryptionKey,
}

fn push_lp(buf: &mut Vec<u8>, bytes: &[u8]) {
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(bytes);
}

fn take_lp<'a>(bytes: &'a [u8], offset: &mut usize) -> Result<&'a [u8]> {
    if bytes.len() < *offset + 4 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "truncated length-prefixed field".into(),
        )));
    }
    let mut len_bytes = [0u8; 4];
    len_bytes.copy_from_slice(&bytes[*offset..*offset + 4]);
    let len = u32::from_be_bytes(len_bytes) as usize;
    *offset += 4;
    if bytes.len() < *offset + len {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "length-prefixed field longer than remaining bytes".into(),
        )));
    }
    let field = &bytes[*offset..*offset + len];
    *offset += len;
    Ok(field)
}

fn encode_principal(p: &PrincipalName) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&p.name_type.to_be_bytes());
    buf.extend_from_slice(&(p.components.len() as u32).to_be_bytes());
    for c in &p.components {
        push_lp(&mut buf, c.as_bytes());
    }
    buf
}

fn decode_principal(bytes: &[u8], offset: &mut usize) -> Result<PrincipalName> {
    if bytes.len() < *offset + 8 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "truncated principal name".into(),
        )));
    }
    let mut name_type_bytes = [0u8; 4];
    name_type_bytes.copy_from_slice(&bytes[*offset..*offset + 4]);
    let name_type = i32::from_be_bytes(name_type_bytes);
    *offset += 4;
    let mut count_bytes = [0u8; 4];
    count_bytes.copy_from_slice(&bytes[*offset..*offset + 4]);
    let count = u32::from_be_bytes(count_bytes);
    *offset += 4;
    let mut components = Vec::with_capacity(count as usize);
    for _ in 0..count {
        let c = take_lp(bytes, offset)?;
        components.push(String::from_utf8_lossy(c).into_owned());
    }
    Ok(PrincipalName {
        name_type,
        components,
    })
}

/// An opaque subkey encoding shared by the authenticator and AP-REP
/// enc-part wire formats below: presence flag, etype, key bytes.
fn push_subkey(buf: &mut Vec<u8>, subkey: &Option<(i32, Vec<u8>)>) {
    match subkey {
        Some((etype, bytes)) => {
            buf.push(1);
            buf.extend_from_slice(&etype.to_be_bytes());
            push_lp(buf, bytes);
        }
        None => buf.push(0),
    }
}

fn take_subkey(bytes: &[u8], offset: &mut usize) -> Result<Option<(i32, Vec<u8>)>> {
    if bytes.len() < *offset + 1 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "truncated subkey presence flag".into(),
        )));
    }
    let present = bytes[*offset];
    *offset += 1;
    if present == 0 {
        return Ok(None);
    }
    if bytes.len() < *offset + 4 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "truncated subkey etype".into(),
        )));
    }
    let mut etype_bytes = [0u8; 4];
    etype_bytes.copy_from_slice(&bytes[*offset..*offset + 4]);
    let etype = i32::from_be_bytes(etype_bytes);
    *offset += 4;
    let key = take_lp(bytes, offset)?.to_vec();
    Ok(Some((etype, key)))
}

/// Encode an `Authenticator` the way a real adapter would encode the
/// Kerberos `Authenticator` ASN.1 sequence -- except this reference
/// encoding is a flat, private wire format, since the engine never parses
/// it and no other implementation needs to interoperate with it.
fn encode_authenticator(a: &Authenticator) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&a.ctime.to_be_bytes());
    buf.extend_from_slice(&a.cusec.to_be_bytes());
    match a.sequence_number {
        Some(seq) => {
            buf.push(1);
            buf.extend_from_slice(&seq.to_be_bytes());
        }
        None => buf.push(0),
    }
    match &a.checksum {
        Some(c) => {
            buf.push(1);
            push_lp(&mut buf, c);
        }
        None => buf.push(0),
    }
    push_subkey(&mut buf, &a.subkey);
    match &a.cname {
        Some(cname) => {
            buf.push(1);
            push_lp(&mut buf, &encode_principal(cname));
        }
        None => buf.push(0),
    }
    match &a.crealm {
        Some(realm) => {
            buf.push(1);
            push_lp(&mut buf, realm.as_bytes());
        }
        None => buf.push(0),
    }
    buf
}

fn decode_authenticator(bytes: &[u8]) -> Result<Authenticator> {
    let mut offset = 0usize;
    if bytes.len() < 12 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "truncated authenticator".into(),
        )));
    }
    let mut ctime_bytes = [0u8; 8];
    ctime_bytes.copy_from_slice(&bytes[offset..offset + 8]);
    let ctime = i64::from_be_bytes(ctime_bytes);
    offset += 8;
    let mut cusec_bytes = [0u8; 4];
    cusec_bytes.copy_from_slice(&bytes[offset..offset + 4]);
    let cusec = i32::from_be_bytes(cusec_bytes);
    offset += 4;

    let sequence_number = if bytes[offset] == 1 {
        offset += 1;
        let mut seq_bytes = [0u8; 4];
        seq_bytes.copy_from_slice(&bytes[offset..offset + 4]);
        offset += 4;
        Some(u32::from_be_bytes(seq_bytes))
    } else {
        offset += 1;
        None
    };

    let checksum = if bytes[offset] == 1 {
        offset += 1;
        Some(take_lp(bytes, &mut offset)?.to_vec())
    } else {
        offset += 1;
        None
    };

    let subkey = take_subkey(bytes, &mut offset)?;

    let cname = if bytes[offset] == 1 {
        offset += 1;
        let cname_bytes = take_lp(bytes, &mut offset)?;
        let mut cname_offset = 0usize;
        Some(decode_principal(cname_bytes, &mut cname_offset)?)
    } else {
        offset += 1;
        None
    };

    let crealm = if bytes[offset] == 1 {
        offset += 1;
        Some(String::from_utf8_lossy(take_lp(bytes, &mut offset)?).into_owned())
    } else {
        None
    };

    Ok(Authenticator {
        ctime,
        cusec,
        sequence_number,
        checksum,
        subkey,
        cname,
        crealm,
    })
}

fn encode_enc_ap_rep_part(e: &EncApRepPart) -> Vec<u8> {
    let mut buf = Vec::new();
    buf.extend_from_slice(&e.ctime.to_be_bytes());
    buf.extend_from_slice(&e.cusec.to_be_bytes());
    match e.sequence_number {
        Some(seq) => {
            buf.push(1);
            buf.extend_from_slice(&seq.to_be_bytes());
        }
        None => buf.push(0),
    }
    push_subkey(&mut buf, &e.subkey);
    buf
}

fn decode_enc_ap_rep_part(bytes: &[u8]) -> Result<EncApRepPart> {
    let mut offset = 0usize;
    if bytes.len() < 13 {
        return Err(GssError::new(ErrorKind::DefectiveToken(
            "truncated AP-REP enc-part".into(),
        )));
    }
    let mut ctime_bytes = [0u8; 8];
    ctime_bytes.copy_from_slice(&bytes[offset..offset + 8]);
    let ctime = i64::from_be_bytes(ctime_bytes);
    offset += 8;
    let mut cusec_bytes = [0u8; 4];
    cusec_bytes.copy_from_slice(&bytes[offset..offset + 4]);
    let cusec = i32::from_be_bytes(cusec_bytes);
    offset += 4;
    let sequence_number = if bytes[offset] == 1 {
        offset += 1;
        let mut seq_bytes = [0u8; 4];
        seq_bytes.copy_from_slice(&bytes[offset..offset + 4]);
        offset += 4;
        Some(u32::from_be_bytes(seq_bytes))
    } else {
        offset += 1;
        None
    };
    let subkey = take_subkey(bytes, &mut offset)?;
    Ok(EncApRepPart {
        ctime,
        cusec,
        sequence_number,
        subkey,
    })
}

/// A reference `KerberosAdapter`: no KDC, no keytab file, no network I/O.
/// `acquire_service_ticket` and `decrypt_ticket` share an in-memory table
/// keyed by principal name, standing in for what a real adapter would get
/// from a credential cache and a keytab respectively.
///
/// Real EncTicketPart encryption is out of this reference's scope, so the
/// client name a ticket is issued to is threaded through via an in-memory
/// correlator (`issued_tickets`) rather than actually encrypted into the
/// ticket's enc-part -- good enough to exercise the engine's own
/// CName-in-authenticator == CName-in-ticket check (§4.6.4 step 6), not a
/// stand-in for real ticket confidentiality.
pub struct InMemoryAdapter {
    keytab: HashMap<String, KeytabEntry>,
    suite: ReferenceSuite,
    client_identity: PrincipalName,
    issued_tickets: HashMap<Vec<u8>, PrincipalName>,
}

impl InMemoryAdapter {
    pub fn new() -> Self {
        InMemoryAdapter {
            keytab: HashMap::new(),
            suite: ReferenceSuite,
            client_identity: Self::principal_name("testuser"),
            issued_tickets: HashMap::new(),
        }
    }

    /// Override the client principal embedded into tickets this adapter
    /// issues when acting as an initiator. Defaults to `testuser`.
    pub fn with_client_identity(mut self, principal: &str) -> Self {
        self.client_identity = Self::principal_name(principal);
        self
    }

    /// Register a service principal with a session key an
    /// `acquire_service_ticket`/`decrypt_ticket` pair can agree on.
    pub fn register_service(&mut self, principal: &str, realm: &str, key: EncryptionKey) {
        self.keytab.insert(
            principal.to_string(),
            KeytabEntry {
                server_principal: principal.to_string(),
                server_realm: realm.to_string(),
                key,
            },
        );
    }

    fn principal_name(name: &str) -> PrincipalName {
        const NT_PRINCIPAL: i32 = 1;
        PrincipalName::new(
            NT_PRINCIPAL,
            name.split('/').map(|s| s.to_string()).collect(),
        )
    }
}

impl Default for InMemoryAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl EncryptionSuite for InMemoryAdapter {
    fn encrypt(&self, etype: i32, key: &[u8], key_usage: i32, plaintext: &[u8]) -> Result<Vec<u8>> {
        self.suite.encrypt(etype, key, key_usage, plaintext)
    }

    fn decrypt(&self, etype: i32, key: &[u8], key_usage: i32, ciphertext: &[u8]) -> Result<Vec<u8>> {
        self.suite.decrypt(etype, key, key_usage, ciphertext)
    }

    fn checksum(&self, etype: i32, key: &[u8], key_usage: i32, data: &[u8]) -> Result<Vec<u8>> {
        self.suite.checksum(etype, key, key_usage, data)
    }

    fn checksum_length(&self, etype: i32) -> usize {
        self.suite.checksum_length(etype)
    }

    fn cipher_block_size(&self, etype: i32) -> usize {
        self.suite.cipher_block_size(etype)
    }

    fn confounder_size(&self, etype: i32) -> usize {
        self.suite.confounder_size(etype)
    }
}

impl KerberosAdapter for InMemoryAdapter {
    fn acquire_service_ticket(&mut self, principal: &str) -> Result<AcquiredTicket> {
        let entry = self
            .keytab
            .get(principal)
            .ok_or_else(|| GssError::new(ErrorKind::NoCred))?
            .clone();
        // The ticket body is wholly opaque to the engine (§1), so this
        // reference adapter uses it only as a correlator between the
        // identity a ticket was issued to and the identity `decrypt_ticket`
        // later reports, standing in for a real EncTicketPart.
        let correlator: Vec<u8> = (0..16u8).map(|_| rand::random::<u8>()).collect();
        self.issued_tickets
            .insert(correlator.clone(), self.client_identity.clone());
        Ok(AcquiredTicket {
            ticket: Ticket(correlator),
            session_key: entry.key.clone(),
            peer_name: entry.server_principal,
        })
    }

    fn decrypt_ticket(&self, ticket: &Ticket, server_principal: &str) -> Result<DecryptedTicket> {
        let entry = self
            .keytab
            .get(server_principal)
            .ok_or_else(|| GssError::new(ErrorKind::NoCred))?
            .clone();
        let cname = self
            .issued_tickets
            .get(&ticket.0)
            .cloned()
            .unwrap_or_else(|| self.client_identity.clone());
        Ok(DecryptedTicket {
            ticket: ticket.clone(),
            session_key: entry.key,
            server_principal: Self::principal_name(&entry.server_principal),
            server_realm: entry.server_realm.clone(),
            cname,
            crealm: entry.server_realm,
        })
    }

    fn decrypt_authenticator(
        &self,
        ap_req: &ApReq,
        session_key: &EncryptionKey,
    ) -> Result<Authenticator> {
        let bytes = self.decrypt(
            session_key.etype,
            &session_key.key,
            crate::keys::key_usage::INITIATOR_SIGN,
            &ap_req.authenticator_cipher,
        )?;
        decode_authenticator(&bytes)
    }

    fn build_ap_req(
        &self,
        ticket: &Ticket,
        session_key: &EncryptionKey,
        authenticator: &Authenticator,
        mutual_required: bool,
    ) -> Result<Vec<u8>> {
        let plain = encode_authenticator(authenticator);
        let cipher = self.encrypt(
            session_key.etype,
            &session_key.key,
            crate::keys::key_usage::INITIATOR_SIGN,
            &plain,
        )?;
        let mut buf = Vec::new();
        push_lp(&mut buf, &ticket.0);
        push_lp(&mut buf, &cipher);
        buf.push(mutual_required as u8);
        Ok(buf)
    }

    fn parse_ap_req(&self, bytes: &[u8]) -> Result<ApReq> {
        let mut offset = 0usize;
        let ticket = take_lp(bytes, &mut offset)?.to_vec();
        let authenticator_cipher = take_lp(bytes, &mut offset)?.to_vec();
        if bytes.len() <= offset {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "truncated AP-REQ options byte".into(),
            )));
        }
        let mutual_required = bytes[offset] != 0;
        Ok(ApReq {
            ticket: Ticket(ticket),
            authenticator_cipher,
            mutual_required,
        })
    }

    fn build_ap_rep(&self, session_key: &EncryptionKey, enc_part: &EncApRepPart) -> Result<Vec<u8>> {
        let plain = encode_enc_ap_rep_part(enc_part);
        self.encrypt(
            session_key.etype,
            &session_key.key,
            crate::keys::key_usage::AP_REP_ENCPART,
            &plain,
        )
    }

    fn parse_ap_rep(&self, bytes: &[u8]) -> Result<ApRep> {
        Ok(ApRep {
            enc_part_cipher: bytes.to_vec(),
        })
    }

    fn decrypt_ap_rep_encpart(&self, ap_rep: &ApRep, session_key: &EncryptionKey) -> Result<EncApRepPart> {
        let bytes = self.decrypt(
            session_key.etype,
            &session_key.key,
            crate::keys::key_usage::AP_REP_ENCPART,
            &ap_rep.enc_part_cipher,
        )?;
        decode_enc_ap_rep_part(&bytes)
    }

    fn parse_krb_error(&self, bytes: &[u8]) -> Result<KrbError> {
        if bytes.len() < 4 {
            return Err(GssError::new(ErrorKind::DefectiveToken(
                "truncated KRB-ERROR".into(),
            )));
        }
        let mut offset = 4usize;
        let mut code_bytes = [0u8; 4];
        code_bytes.copy_from_slice(&bytes[0..4]);
        let error_code = u32::from_be_bytes(code_bytes);
        let text = take_lp(bytes, &mut offset)?;
        Ok(KrbError {
            error_code,
            error_text: String::from_utf8_lossy(text).into_owned(),
        })
    }

    fn build_krb_error(
        &self,
        _server_principal: &str,
        _server_realm: &str,
        code: u32,
        text: &str,
    ) -> Result<Vec<u8>> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&code.to_be_bytes());
        push_lp(&mut buf, text.as_bytes());
        Ok(buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_suite_round_trips_plaintext() {
        let suite = ReferenceSuite;
        let key = vec![3u8; 16];
        let ct = suite
            .encrypt(etypes::AES128_CTS_HMAC_SHA1_96 as i32, &key, 1, b"hello, world")
            .unwrap();
        let pt = suite
            .decrypt(etypes::AES128_CTS_HMAC_SHA1_96 as i32, &key, 1, &ct)
            .unwrap();
        assert_eq!(pt, b"hello, world");
    }

    #[test]
    fn reference_suite_rejects_tampered_ciphertext() {
        let suite = ReferenceSuite;
        let key = vec![3u8; 32];
        let mut ct = suite
            .encrypt(etypes::AES256_CTS_HMAC_SHA1_96 as i32, &key, 1, b"payload")
            .unwrap();
        let last = ct.len() - 1;
        ct[last] ^= 0xff;
        assert!(suite
            .decrypt(etypes::AES256_CTS_HMAC_SHA1_96 as i32, &key, 1, &ct)
            .is_err());
    }

    #[test]
    fn reference_suite_checksum_is_deterministic() {
        let suite = ReferenceSuite;
        let key = vec![9u8; 16];
        let a = suite
            .checksum(etypes::AES128_CTS_HMAC_SHA1_96 as i32, &key, cksum_types::HMAC_SHA1_96_AES128 as i32, b"data")
            .unwrap();
        let b = suite
            .checksum(etypes::AES128_CTS_HMAC_SHA1_96 as i32, &key, cksum_types::HMAC_SHA1_96_AES128 as i32, b"data")
            .unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 12);
    }
}
