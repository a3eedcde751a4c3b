//! Cache geometry.
//!
//! A geometry is fixed for the lifetime of a simulation: `s` set-index bits,
//! `E` lines per set and `b` block-offset bits. Everything else (number of sets,
//! block size, tag width) is derived from those three numbers.

use std::fmt;

use crate::error::ConfigError;

/// Width of a simulated address in bits.
pub const ADDRESS_BITS: u32 = u64::BITS;

/// Validated `(s, E, b)` triple.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Geometry {
    set_index_bits: u32,
    associativity: usize,
    block_offset_bits: u32,
}

impl Geometry {
    pub fn new(
        set_index_bits: u32,
        associativity: usize,
        block_offset_bits: u32,
    ) -> Result<Geometry, ConfigError> {
        if associativity == 0 {
            return Err(ConfigError::ZeroAssociativity);
        }
        match set_index_bits.checked_add(block_offset_bits) {
            Some(width) if width <= ADDRESS_BITS => Ok(Geometry {
                set_index_bits,
                associativity,
                block_offset_bits,
            }),
            _ => Err(ConfigError::AddressTooNarrow {
                set_index_bits,
                block_offset_bits,
            }),
        }
    }

    pub fn set_index_bits(&self) -> u32 {
        self.set_index_bits
    }

    pub fn associativity(&self) -> usize {
        self.associativity
    }

    pub fn block_offset_bits(&self) -> u32 {
        self.block_offset_bits
    }

    /// Number of sets, `2^s`. `None` when it does not fit in `usize`.
    pub fn num_sets(&self) -> Option<usize> {
        1usize.checked_shl(self.set_index_bits)
    }

    /// Block size in bytes, `2^b`. Saturates for `b == 64`.
    pub fn block_size(&self) -> u64 {
        1u64.checked_shl(self.block_offset_bits).unwrap_or(u64::MAX)
    }

    /// Bits left for the tag once set index and block offset are taken.
    pub fn tag_bits(&self) -> u32 {
        ADDRESS_BITS - self.set_index_bits - self.block_offset_bits
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "s={} E={} b={} (block size {} B, tag {} bits)",
            self.set_index_bits,
            self.associativity,
            self.block_offset_bits,
            self.block_size(),
            self.tag_bits()
        )
    }
}
