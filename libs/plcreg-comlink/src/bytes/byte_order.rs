//! Byte order conventions for PLC register buffers
//!
//! Provides a type-safe enum for the byte/word ordering tokens carried by
//! register requests, and the permutations that map a raw transport buffer
//! onto a big-endian buffer (and back).

use std::fmt;
use std::str::FromStr;

use crate::error::{RegisterError, Result};

/// Byte/word order token for 16-bit and 32-bit register values
///
/// # Naming Convention
/// Uses ABCD notation where:
/// - A = Most significant byte (MSB)
/// - B = Second byte
/// - C = Third byte
/// - D = Least significant byte (LSB)
///
/// # 16-bit polarity
/// `BA` is the passthrough order and `AB` swaps the two bytes of the register.
/// The same polarity applies to every call path (Modbus and S7 alike).
///
/// For the raw 32-bit buffer `[0x12, 0x34, 0x56, 0x78]`:
/// - `ABCD`: [0x12, 0x34, 0x56, 0x78] (passthrough)
/// - `CDAB`: [0x56, 0x78, 0x12, 0x34] (word swap, Modbus common)
/// - `BADC`: [0x34, 0x12, 0x78, 0x56] (byte swap within each word)
/// - `DCBA`: [0x78, 0x56, 0x34, 0x12] (full reversal)
#[allow(clippy::upper_case_acronyms)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ByteOrder {
    /// 16-bit byte swap: [b0, b1] → [b1, b0]
    AB,

    /// 16-bit passthrough
    BA,

    /// 32-bit passthrough (big-endian)
    ABCD,

    /// 32-bit word swap: [b0, b1, b2, b3] → [b2, b3, b0, b1]
    CDAB,

    /// 32-bit byte swap within each word: [b0, b1, b2, b3] → [b1, b0, b3, b2]
    BADC,

    /// 32-bit full reversal (little-endian): [b0, b1, b2, b3] → [b3, b2, b1, b0]
    DCBA,
}

impl ByteOrder {
    /// All supported orders, 16-bit first
    pub const ALL: [ByteOrder; 6] = [
        ByteOrder::AB,
        ByteOrder::BA,
        ByteOrder::ABCD,
        ByteOrder::CDAB,
        ByteOrder::BADC,
        ByteOrder::DCBA,
    ];

    /// Parse a request token
    ///
    /// Case-insensitive; dashes are ignored so `"AB-CD"` parses as `ABCD`.
    pub fn parse(token: &str) -> Result<Self> {
        let normalized = token.trim().to_uppercase().replace('-', "");
        match normalized.as_str() {
            "AB" => Ok(Self::AB),
            "BA" => Ok(Self::BA),
            "ABCD" => Ok(Self::ABCD),
            "CDAB" => Ok(Self::CDAB),
            "BADC" => Ok(Self::BADC),
            "DCBA" => Ok(Self::DCBA),
            _ => Err(RegisterError::UnsupportedByteOrder(token.to_string())),
        }
    }

    /// Request token for this order
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AB => "AB",
            Self::BA => "BA",
            Self::ABCD => "ABCD",
            Self::CDAB => "CDAB",
            Self::BADC => "BADC",
            Self::DCBA => "DCBA",
        }
    }

    /// Width in bytes of the values this order applies to (2 or 4)
    pub fn width(&self) -> usize {
        if self.is_16bit_only() {
            2
        } else {
            4
        }
    }

    /// Check if this is a 16-bit only byte order
    pub fn is_16bit_only(&self) -> bool {
        matches!(self, Self::AB | Self::BA)
    }

    /// Passthrough order for a value of `width` bytes
    ///
    /// Used when a request carries no order token (S7 requests, byte tags).
    pub fn passthrough(width: usize) -> Self {
        if width == 2 {
            Self::BA
        } else {
            Self::ABCD
        }
    }

    /// Reject an order whose width differs from the value width
    pub fn ensure_width(&self, width: usize) -> Result<()> {
        if self.width() == width {
            Ok(())
        } else {
            Err(RegisterError::ByteOrderWidthMismatch {
                order: self.as_str(),
                width,
            })
        }
    }
}

impl FromStr for ByteOrder {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for ByteOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Permute a 2-byte register buffer
///
/// `BA` leaves the buffer untouched, `AB` swaps the two bytes. The swap is an
/// involution, so the same call maps raw → logical and logical → raw.
pub fn permute2(buf: &[u8], order: ByteOrder) -> Result<[u8; 2]> {
    let bytes: [u8; 2] = buf
        .try_into()
        .map_err(|_| RegisterError::invalid_length("2-byte permutation", 2, buf.len()))?;

    match order {
        ByteOrder::BA => Ok(bytes),
        ByteOrder::AB => Ok([bytes[1], bytes[0]]),
        other => Err(RegisterError::UnsupportedByteOrder(format!(
            "{} (not a 16-bit order)",
            other
        ))),
    }
}

/// Permute a 4-byte register buffer
///
/// 16-bit tokens are accepted here as passthrough. All four 32-bit
/// permutations are involutions.
pub fn permute4(buf: &[u8], order: ByteOrder) -> Result<[u8; 4]> {
    let [b0, b1, b2, b3]: [u8; 4] = buf
        .try_into()
        .map_err(|_| RegisterError::invalid_length("4-byte permutation", 4, buf.len()))?;

    Ok(match order {
        ByteOrder::ABCD | ByteOrder::AB | ByteOrder::BA => [b0, b1, b2, b3],
        ByteOrder::CDAB => [b2, b3, b0, b1],
        ByteOrder::BADC => [b1, b0, b3, b2],
        ByteOrder::DCBA => [b3, b2, b1, b0],
    })
}
