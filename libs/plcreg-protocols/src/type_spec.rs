//! Register type tags
//!
//! A tag names both where a value lives and how it is laid out:
//! Modbus tags are `<area digit>x<kind>` (`4xfloat`, `3xint`, `0xbit`),
//! S7 tags are `<area letter><width letter>` (`VW`, `MD`, `QB`).

use std::fmt;
use std::str::FromStr;

use plcreg_comlink::{ByteOrder, RegisterArea, RegisterError, Result, ValueKind};

/// Parsed register type tag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegisterTypeSpec {
    pub area: RegisterArea,
    /// 16-bit words spanned by the value
    pub word_count: u8,
    pub kind: ValueKind,
}

/// Modbus suffix table: (suffix, word count, kind)
const MODBUS_SUFFIXES: [(&str, u8, ValueKind); 6] = [
    ("bit", 1, ValueKind::Bit),
    ("byte", 1, ValueKind::Byte),
    ("int", 1, ValueKind::Int16),
    ("uint", 1, ValueKind::UInt16),
    ("dint", 2, ValueKind::Int32),
    ("float", 2, ValueKind::Float32),
];

impl RegisterTypeSpec {
    pub const fn new(area: RegisterArea, word_count: u8, kind: ValueKind) -> Self {
        Self {
            area,
            word_count,
            kind,
        }
    }

    /// Parse a type tag
    pub fn parse(tag: &str) -> Result<Self> {
        let unknown = || RegisterError::UnknownRegisterType(tag.to_string());
        let trimmed = tag.trim();

        if let Some((digit, suffix)) = trimmed.split_once(['x', 'X']) {
            let area = match digit {
                "0" => RegisterArea::Coil,
                "1" => RegisterArea::DiscreteInput,
                "3" => RegisterArea::InputRegister,
                "4" => RegisterArea::HoldingRegister,
                _ => return Err(unknown()),
            };
            let suffix = suffix.to_ascii_lowercase();
            let (_, word_count, kind) = MODBUS_SUFFIXES
                .iter()
                .find(|(name, _, _)| *name == suffix)
                .copied()
                .ok_or_else(unknown)?;
            return Ok(Self::new(area, word_count, kind));
        }

        let upper = trimmed.to_ascii_uppercase();
        let mut chars = upper.chars();
        let (Some(area_letter), Some(width_letter), None) =
            (chars.next(), chars.next(), chars.next())
        else {
            return Err(unknown());
        };

        let area = match area_letter {
            'V' => RegisterArea::S7V,
            'M' => RegisterArea::S7M,
            'I' => RegisterArea::S7I,
            'Q' => RegisterArea::S7Q,
            _ => return Err(unknown()),
        };
        let (word_count, kind) = match width_letter {
            'B' => (1, ValueKind::Byte),
            'W' => (1, ValueKind::UInt16),
            'D' => (2, ValueKind::UInt32),
            'F' => (2, ValueKind::Float32),
            _ => return Err(unknown()),
        };

        // I and Q areas are only addressed bytewise
        if matches!(area, RegisterArea::S7I | RegisterArea::S7Q) && kind != ValueKind::Byte {
            return Err(unknown());
        }

        Ok(Self::new(area, word_count, kind))
    }

    /// Exact byte length of the raw buffer for this tag
    pub fn raw_len(&self) -> usize {
        match self.area {
            RegisterArea::Coil | RegisterArea::DiscreteInput => 1,
            RegisterArea::InputRegister | RegisterArea::HoldingRegister => {
                2 * usize::from(self.word_count)
            },
            _ => match self.kind {
                ValueKind::Bit | ValueKind::Byte => 1,
                ValueKind::Int16 | ValueKind::UInt16 => 2,
                ValueKind::Int32 | ValueKind::UInt32 | ValueKind::Float32 => 4,
            },
        }
    }

    /// Item count for the Modbus read call (coils or registers)
    pub fn read_count(&self) -> u16 {
        if self.is_coil_bit() {
            1
        } else {
            u16::from(self.word_count)
        }
    }

    /// Bit addressed inside a 16-bit register
    pub fn is_register_bit(&self) -> bool {
        self.kind == ValueKind::Bit
            && matches!(
                self.area,
                RegisterArea::InputRegister | RegisterArea::HoldingRegister
            )
    }

    /// Single coil or discrete input
    pub fn is_coil_bit(&self) -> bool {
        self.kind == ValueKind::Bit
            && matches!(self.area, RegisterArea::Coil | RegisterArea::DiscreteInput)
    }

    /// Whether a byte order token affects this tag
    pub fn uses_byte_order(&self) -> bool {
        !self.is_coil_bit() && self.kind != ValueKind::Byte
    }

    /// Width in bytes the byte order applies to
    pub fn value_width(&self) -> usize {
        match self.kind {
            ValueKind::Int32 | ValueKind::UInt32 | ValueKind::Float32 => 4,
            ValueKind::Byte => 1,
            ValueKind::Bit | ValueKind::Int16 | ValueKind::UInt16 => 2,
        }
    }

    /// Validate an explicit order against this tag, or pick the passthrough order
    pub fn resolve_order(&self, order: Option<ByteOrder>) -> Result<ByteOrder> {
        if !self.uses_byte_order() {
            return Ok(ByteOrder::passthrough(2));
        }
        match order {
            Some(order) => {
                order.ensure_width(self.value_width())?;
                Ok(order)
            },
            None => Ok(ByteOrder::passthrough(self.value_width())),
        }
    }

    /// Reject area and kind combinations that have no read call
    ///
    /// The digit picks the area on its own, so `0xfloat` parses; coils and
    /// discrete inputs still only carry single bits.
    pub fn ensure_readable(&self) -> Result<()> {
        if matches!(self.area, RegisterArea::Coil | RegisterArea::DiscreteInput)
            && self.kind != ValueKind::Bit
        {
            return Err(RegisterError::unsupported(format!(
                "{} values in {}",
                self.kind, self.area
            )));
        }
        Ok(())
    }

    /// Reject tags that cannot be written
    pub fn ensure_writable(&self) -> Result<()> {
        self.ensure_readable()?;
        if !self.area.is_writable() {
            return Err(RegisterError::unsupported(format!(
                "{} is read-only ({})",
                self, self.area
            )));
        }

        let supported = match self.area {
            RegisterArea::Coil => self.kind == ValueKind::Bit,
            RegisterArea::HoldingRegister => matches!(
                self.kind,
                ValueKind::Bit | ValueKind::Int16 | ValueKind::UInt16 | ValueKind::Int32
                    | ValueKind::Float32
            ),
            RegisterArea::S7V | RegisterArea::S7M => matches!(
                self.kind,
                ValueKind::Byte | ValueKind::UInt16 | ValueKind::UInt32 | ValueKind::Float32
            ),
            RegisterArea::S7Q => self.kind == ValueKind::Byte,
            _ => false,
        };

        if supported {
            Ok(())
        } else {
            Err(RegisterError::unsupported(format!("write of {}", self)))
        }
    }
}

impl FromStr for RegisterTypeSpec {
    type Err = RegisterError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// Canonical tag text
impl fmt::Display for RegisterTypeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let digit = match self.area {
            RegisterArea::Coil => '0',
            RegisterArea::DiscreteInput => '1',
            RegisterArea::InputRegister => '3',
            RegisterArea::HoldingRegister => '4',
            RegisterArea::S7V => 'V',
            RegisterArea::S7M => 'M',
            RegisterArea::S7I => 'I',
            RegisterArea::S7Q => 'Q',
        };

        if self.area.is_modbus() {
            let suffix = match self.kind {
                ValueKind::Bit => "bit",
                ValueKind::Byte => "byte",
                ValueKind::Int16 => "int",
                ValueKind::UInt16 => "uint",
                ValueKind::Int32 => "Dint",
                ValueKind::UInt32 => "Dword",
                ValueKind::Float32 => "float",
            };
            write!(f, "{}x{}", digit, suffix)
        } else {
            let width = match self.kind {
                ValueKind::Bit | ValueKind::Byte => 'B',
                ValueKind::Int16 | ValueKind::UInt16 => 'W',
                ValueKind::Int32 | ValueKind::UInt32 => 'D',
                ValueKind::Float32 => 'F',
            };
            write!(f, "{}{}", digit, width)
        }
    }
}
