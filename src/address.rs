//! Address decomposition: `| tag | set index | block offset |`.

use crate::config::Geometry;

/// The three bit-fields of an address under a given geometry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodedAddress {
    pub block_offset: u64,
    pub set_index: u64,
    pub tag: u64,
}

/// Low `bits` bits set. Total for `bits` up to 64.
fn mask(bits: u32) -> u64 {
    1u64.checked_shl(bits).map_or(u64::MAX, |bit| bit - 1)
}

/// Split `address` into block offset, set index and tag.
pub fn decode(address: u64, geometry: &Geometry) -> DecodedAddress {
    let b = geometry.block_offset_bits();
    let s = geometry.set_index_bits();
    DecodedAddress {
        block_offset: address & mask(b),
        set_index: address.checked_shr(b).unwrap_or(0) & mask(s),
        tag: address.checked_shr(b + s).unwrap_or(0),
    }
}
