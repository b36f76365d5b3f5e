//! Register areas, addresses and typed values

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::traits::S7MemoryArea;

/// Register area addressed by an operation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegisterArea {
    /// Modbus 0x, read/write single bits
    Coil,
    /// Modbus 1x, read-only single bits
    DiscreteInput,
    /// Modbus 3x, read-only 16-bit registers
    InputRegister,
    /// Modbus 4x, read/write 16-bit registers
    HoldingRegister,
    /// S7 data block (V memory)
    S7V,
    /// S7 flag memory
    S7M,
    /// S7 process inputs
    S7I,
    /// S7 process outputs
    S7Q,
}

impl RegisterArea {
    pub fn is_modbus(&self) -> bool {
        matches!(
            self,
            Self::Coil | Self::DiscreteInput | Self::InputRegister | Self::HoldingRegister
        )
    }

    pub fn is_s7(&self) -> bool {
        !self.is_modbus()
    }

    /// Whether writes are accepted at all for this area
    pub fn is_writable(&self) -> bool {
        !matches!(self, Self::DiscreteInput | Self::InputRegister | Self::S7I)
    }

    /// S7 memory area for the non-DB areas
    pub fn s7_memory_area(&self) -> Option<S7MemoryArea> {
        match self {
            Self::S7M => Some(S7MemoryArea::Merkers),
            Self::S7I => Some(S7MemoryArea::Inputs),
            Self::S7Q => Some(S7MemoryArea::Outputs),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Coil => "coil",
            Self::DiscreteInput => "discrete_input",
            Self::InputRegister => "input_register",
            Self::HoldingRegister => "holding_register",
            Self::S7V => "s7_v",
            Self::S7M => "s7_m",
            Self::S7I => "s7_i",
            Self::S7Q => "s7_q",
        }
    }
}

impl fmt::Display for RegisterArea {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Location of one register operation
///
/// `slave_id` is only meaningful for Modbus areas, `db_number` only for `S7V`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterAddress {
    pub area: RegisterArea,
    pub start: u16,
    pub slave_id: u8,
    pub db_number: u16,
}

impl RegisterAddress {
    pub fn modbus(area: RegisterArea, slave_id: u8, start: u16) -> Self {
        Self {
            area,
            start,
            slave_id,
            db_number: 0,
        }
    }

    pub fn s7(area: RegisterArea, db_number: u16, start: u16) -> Self {
        Self {
            area,
            start,
            slave_id: 0,
            db_number,
        }
    }
}

impl fmt::Display for RegisterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.area.is_modbus() {
            write!(f, "{}@{}:{}", self.area, self.slave_id, self.start)
        } else if self.area == RegisterArea::S7V {
            write!(f, "{}@DB{}:{}", self.area, self.db_number, self.start)
        } else {
            write!(f, "{}:{}", self.area, self.start)
        }
    }
}

/// Logical value kind
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ValueKind {
    Bit,
    Byte,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Float32,
}

impl ValueKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ValueKind::Bit => "bit",
            ValueKind::Byte => "byte",
            ValueKind::Int16 => "int16",
            ValueKind::UInt16 => "uint16",
            ValueKind::Int32 => "int32",
            ValueKind::UInt32 => "uint32",
            ValueKind::Float32 => "float32",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded register value
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum RegisterValue {
    /// Single bit, always 0 or 1
    Bit(u16),
    Byte(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Float32(f32),
}

impl RegisterValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            RegisterValue::Bit(_) => ValueKind::Bit,
            RegisterValue::Byte(_) => ValueKind::Byte,
            RegisterValue::Int16(_) => ValueKind::Int16,
            RegisterValue::UInt16(_) => ValueKind::UInt16,
            RegisterValue::Int32(_) => ValueKind::Int32,
            RegisterValue::UInt32(_) => ValueKind::UInt32,
            RegisterValue::Float32(_) => ValueKind::Float32,
        }
    }

    /// Lossless widening for integer kinds, f64 for floats
    pub fn as_f64(&self) -> f64 {
        match *self {
            RegisterValue::Bit(v) => f64::from(v),
            RegisterValue::Byte(v) => f64::from(v),
            RegisterValue::Int16(v) => f64::from(v),
            RegisterValue::UInt16(v) => f64::from(v),
            RegisterValue::Int32(v) => f64::from(v),
            RegisterValue::UInt32(v) => f64::from(v),
            RegisterValue::Float32(v) => f64::from(v),
        }
    }
}

/// Integers print as decimal; floats are rounded to 3 decimal places
impl fmt::Display for RegisterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            RegisterValue::Bit(v) => write!(f, "{}", v),
            RegisterValue::Byte(v) => write!(f, "{}", v),
            RegisterValue::Int16(v) => write!(f, "{}", v),
            RegisterValue::UInt16(v) => write!(f, "{}", v),
            RegisterValue::Int32(v) => write!(f, "{}", v),
            RegisterValue::UInt32(v) => write!(f, "{}", v),
            RegisterValue::Float32(v) => {
                let rounded = (f64::from(v) * 1000.0).round() / 1000.0;
                // No "-0" for values that round to zero
                let rounded = if rounded == 0.0 { 0.0 } else { rounded };
                write!(f, "{}", rounded)
            },
        }
    }
}
