//! Single-bit operations on 16-bit register words
//!
//! Bit positions are numbered from the least significant bit (0) to the most
//! significant bit (15) of the logical, big-endian word.

use crate::error::{RegisterError, Result};

/// Highest addressable bit position in a register word
pub const MAX_BIT_POSITION: u16 = 15;

/// Validated bit position within a 16-bit register (0-15)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BitSelector(u8);

impl BitSelector {
    pub fn new(position: u16) -> Result<Self> {
        if position > MAX_BIT_POSITION {
            return Err(RegisterError::BitPositionOutOfRange(format!(
                "position {} (valid range 0-{})",
                position, MAX_BIT_POSITION
            )));
        }
        Ok(Self(position as u8))
    }

    pub fn position(&self) -> u16 {
        u16::from(self.0)
    }
}

impl TryFrom<u16> for BitSelector {
    type Error = RegisterError;

    fn try_from(position: u16) -> Result<Self> {
        Self::new(position)
    }
}

/// Read bit `position` of `word`, returning 0 or 1
#[inline]
pub fn extract_bit(word: u16, position: u16) -> Result<u16> {
    let bit = BitSelector::new(position)?;
    Ok((word >> bit.position()) & 1)
}

/// Return `word` with bit `position` forced to `value`
///
/// `value` must be 0 or 1. All other bits are left untouched.
#[inline]
pub fn set_bit(word: u16, position: u16, value: u16) -> Result<u16> {
    let bit = BitSelector::new(position)?;
    let mask = 1u16 << bit.position();
    match value {
        0 => Ok(word & !mask),
        1 => Ok(word | mask),
        other => Err(RegisterError::BitPositionOutOfRange(format!(
            "bit value {} (expected 0 or 1)",
            other
        ))),
    }
}
