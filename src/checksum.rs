//! The GSSAPI-checksum authenticator extension (component C5, RFC 4121
//! §4.1.1) and channel-binding hashing.

use crate::error::Result;
use crate::flags::ContextFlag;

/// An address tagged by GSSAPI address-family (RFC 2744's address-family
/// enumeration, restricted to the two families this engine hashes).
#[derive(Debug, Clone)]
pub enum ChannelAddress {
    Inet(Vec<u8>),
    Local(Vec<u8>),
}

impl ChannelAddress {
    fn family_tag(&self) -> u32 {
        match self {
            ChannelAddress::Inet(_) => 2,
            ChannelAddress::Local(_) => 1,
        }
    }

    fn bytes(&self) -> &[u8] {
        match self {
            ChannelAddress::Inet(b) | ChannelAddress::Local(b) => b,
        }
    }
}

/// Channel bindings: initiator/acceptor addresses plus opaque
/// application data, hashed into a 16-byte digest for the authenticator
/// checksum.
#[derive(Debug, Clone, Default)]
pub struct ChannelBinding {
    pub initiator_address: Option<ChannelAddress>,
    pub acceptor_address: Option<ChannelAddress>,
    pub application_data: Vec<u8>,
}

fn push_address(buf: &mut Vec<u8>, address: &Option<ChannelAddress>) {
    match address {
        Some(addr) => {
            buf.extend_from_slice(&addr.family_tag().to_le_bytes());
            buf.extend_from_slice(&(addr.bytes().len() as u32).to_le_bytes());
            buf.extend_from_slice(addr.bytes());
        }
        None => {
            buf.extend_from_slice(&0u32.to_le_bytes());
            buf.extend_from_slice(&0u32.to_le_bytes());
        }
    }
}

impl ChannelBinding {
    /// Build the structured buffer RFC 2744 §3.11.4 describes and hash it
    /// with MD5 to produce the 16-byte digest embedded in the checksum.
    pub fn digest(&self) -> [u8; 16] {
        let mut buf = Vec::new();
        push_address(&mut buf, &self.initiator_address);
        push_address(&mut buf, &self.acceptor_address);
        buf.extend_from_slice(&(self.application_data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.application_data);
        md5(&buf)
    }
}

/// Build the ≥24-byte GSSAPI-checksum buffer embedded in a Kerberos
/// authenticator (§4.5): channel-binding length, channel-binding MD5 (or
/// zeros if unbound), and the requested context-establishment flags.
pub fn build_authenticator_checksum(
    channel_binding: Option<&ChannelBinding>,
    requested_flags: ContextFlag,
) -> Vec<u8> {
    let mut out = Vec::with_capacity(24);
    out.extend_from_slice(&16u32.to_le_bytes());
    match channel_binding {
        Some(cb) => out.extend_from_slice(&cb.digest()),
        None => out.extend_from_slice(&[0u8; 16]),
    }
    out.extend_from_slice(&requested_flags.bits().to_le_bytes());
    out
}

/// Parse the requested-flags field (offset 20..24) out of an
/// authenticator checksum buffer built by `build_authenticator_checksum`.
pub fn parse_requested_flags(checksum: &[u8]) -> Result<ContextFlag> {
    if checksum.len() < 24 {
        return Err(crate::error::GssError::new(
            crate::error::ErrorKind::DefectiveToken("authenticator checksum shorter than 24 bytes".into()),
        ));
    }
    let mut bytes = [0u8; 4];
    bytes.copy_from_slice(&checksum[20..24]);
    Ok(ContextFlag::from_bits_truncate(u32::from_le_bytes(bytes)))
}

/// A small, self-contained MD5 implementation (RFC 1321). Channel-binding
/// hashing is fixed to MD5 regardless of the negotiated Kerberos encryption
/// type (RFC 4121 §4.1.1.2), so it is not routed through `EncryptionSuite`.
fn md5(input: &[u8]) -> [u8; 16] {
    const S: [u32; 64] = [
        7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 7, 12, 17, 22, 5, 9, 14, 20, 5, 9, 14, 20, 5,
        9, 14, 20, 5, 9, 14, 20, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 4, 11, 16, 23, 6,
        10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21, 6, 10, 15, 21,
    ];
    const K: [u32; 64] = [
        0xd76aa478, 0xe8c7b756, 0x242070db, 0xc1bdceee, 0xf57c0faf, 0x4787c62a, 0xa8304613,
        0xfd469501, 0x698098d8, 0x8b44f7af, 0xffff5bb1, 0x895cd7be, 0x6b901122, 0xfd987193,
        0xa679438e, 0x49b40821, 0xf61e2562, 0xc040b340, 0x265e5a51, 0xe9b6c7aa, 0xd62f105d,
        0x02441453, 0xd8a1e681, 0xe7d3fbc8, 0x21e1cde6, 0xc33707d6, 0xf4d50d87, 0x455a14ed,
        0xa9e3e905, 0xfcefa3f8, 0x676f02d9, 0x8d2a4c8a, 0xfffa3942, 0x8771f681, 0x6d9d6122,
        0xfde5380c, 0xa4beea44, 0x4bdecfa9, 0xf6bb4b60, 0xbebfbc70, 0x289b7ec6, 0xeaa127fa,
        0xd4ef3085, 0x04881d05, 0xd9d4d039, 0xe6db99e5, 0x1fa27cf8, 0xc4ac5665, 0xf4292244,
        0x432aff97, 0xab9423a7, 0xfc93a039, 0x655b59c3, 0x8f0ccc92, 0xffeff47d, 0x85845dd1,
        0x6fa87e4f, 0xfe2ce6e0, 0xa3014314, 0x4e0811a1, 0xf7537e82, 0xbd3af235, 0x2ad7d2bb,
        0xeb86d391,
    ];

    let mut a0: u32 = 0x67452301;
    let mut b0: u32 = 0xefcdab89;
    let mut c0: u32 = 0x98badcfe;
    let mut d0: u32 = 0x10325476;

    let mut msg = input.to_vec();
    let bit_len = (input.len() as u64).wrapping_mul(8);
    msg.push(0x80);
    while msg.len() % 64 != 56 {
        msg.push(0);
    }
    msg.extend_from_slice(&bit_len.to_le_bytes());

    for chunk in msg.chunks(64) {
        let mut m = [0u32; 16];
        for (i, word) in chunk.chunks(4).enumerate() {
            m[i] = u32::from_le_bytes([word[0], word[1], word[2], word[3]]);
        }

        let (mut a, mut b, mut c, mut d) = (a0, b0, c0, d0);
        for i in 0..64 {
            let (f, g) = if i < 16 {
                ((b & c) | (!b & d), i)
            } else if i < 32 {
                ((d & b) | (!d & c), (5 * i + 1) % 16)
            } else if i < 48 {
                (b ^ c ^ d, (3 * i + 5) % 16)
            } else {
                (c ^ (b | !d), (7 * i) % 16)
            };
            let f = f
                .wrapping_add(a)
                .wrapping_add(K[i])
                .wrapping_add(m[g]);
            a = d;
            d = c;
            c = b;
            b = b.wrapping_add(f.rotate_left(S[i]));
        }

        a0 = a0.wrapping_add(a);
        b0 = b0.wrapping_add(b);
        c0 = c0.wrapping_add(c);
        d0 = d0.wrapping_add(d);
    }

    let mut out = [0u8; 16];
    out[0..4].copy_from_slice(&a0.to_le_bytes());
    out[4..8].copy_from_slice(&b0.to_le_bytes());
    out[8..12].copy_from_slice(&c0.to_le_bytes());
    out[12..16].copy_from_slice(&d0.to_le_bytes());
    out
}
