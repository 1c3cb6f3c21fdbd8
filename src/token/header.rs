//! The 16-byte header shared by Wrap and MIC tokens (RFC 4121 §4.2.6.1/2).

use binrw::prelude::*;
use modular_bitfield::prelude::*;

pub const WRAP_TOK_ID: [u8; 2] = [0x05, 0x04];
pub const MIC_TOK_ID: [u8; 2] = [0x04, 0x04];
pub const WRAP_FILLER: u8 = 0xff;
pub const MIC_FILLER: [u8; 5] = [0xff; 5];

/// Flags byte at offset 2 of both Wrap and MIC headers.
#[bitfield]
#[derive(BinWrite, BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[bw(map = |&x| Self::into_bytes(x))]
#[br(map = Self::from_bytes)]
pub struct TokenFlags {
    pub sent_by_acceptor: bool,
    pub sealed: bool,
    pub acceptor_subkey: bool,
    #[skip]
    __: B5,
}

impl TokenFlags {
    pub fn build(sent_by_acceptor: bool, sealed: bool, acceptor_subkey: bool) -> Self {
        TokenFlags::new()
            .with_sent_by_acceptor(sent_by_acceptor)
            .with_sealed(sealed)
            .with_acceptor_subkey(acceptor_subkey)
    }
}

/// Wrap token header: TOK_ID, flags, filler, EC, RRC, sequence number.
#[derive(BinWrite, BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(big)]
pub struct WrapHeader {
    pub tok_id: [u8; 2],
    pub flags: TokenFlags,
    pub filler: u8,
    pub ec: u16,
    pub rrc: u16,
    pub sequence_number: u64,
}

impl WrapHeader {
    pub const SIZE: usize = 16;

    pub fn new(flags: TokenFlags, ec: u16, rrc: u16, sequence_number: u64) -> Self {
        WrapHeader {
            tok_id: WRAP_TOK_ID,
            flags,
            filler: WRAP_FILLER,
            ec,
            rrc,
            sequence_number,
        }
    }
}

/// MIC token header: TOK_ID, flags, 5 filler bytes, sequence number.
#[derive(BinWrite, BinRead, Debug, Clone, Copy, PartialEq, Eq)]
#[brw(big)]
pub struct MicHeader {
    pub tok_id: [u8; 2],
    pub flags: TokenFlags,
    pub filler: [u8; 5],
    pub sequence_number: u64,
}

impl MicHeader {
    pub const SIZE: usize = 16;

    pub fn new(flags: TokenFlags, sequence_number: u64) -> Self {
        MicHeader {
            tok_id: MIC_TOK_ID,
            flags,
            filler: MIC_FILLER,
            sequence_number,
        }
    }
}
