//! Register codec
//!
//! Converts between raw register buffers and typed values. Multi-byte values
//! are permuted into big-endian order first, then read with `from_be_bytes`.

use std::num::IntErrorKind;

use tracing::trace;

use plcreg_comlink::bytes::{extract_bit, permute2, permute4, set_bit};
use plcreg_comlink::{BitSelector, ByteOrder, RegisterError, RegisterValue, Result, ValueKind};

use crate::type_spec::RegisterTypeSpec;

/// Checks shared by decode and encode that need no buffer
fn check_layout(spec: &RegisterTypeSpec, order: ByteOrder) -> Result<()> {
    if spec.uses_byte_order() {
        order.ensure_width(spec.value_width())?;
    }
    Ok(())
}

fn require_bit(spec: &RegisterTypeSpec, bit: Option<BitSelector>) -> Result<BitSelector> {
    bit.ok_or_else(|| RegisterError::MissingBitSelector(spec.to_string()))
}

/// Decode a raw buffer into a typed value
///
/// `buf` must be exactly `spec.raw_len()` bytes. `bit` is required for bits
/// inside a register and ignored otherwise.
pub fn decode(
    buf: &[u8],
    spec: &RegisterTypeSpec,
    order: ByteOrder,
    bit: Option<BitSelector>,
) -> Result<RegisterValue> {
    if buf.len() != spec.raw_len() {
        return Err(RegisterError::invalid_length(
            spec.to_string(),
            spec.raw_len(),
            buf.len(),
        ));
    }
    check_layout(spec, order)?;

    let value = match spec.kind {
        ValueKind::Bit if spec.is_coil_bit() => RegisterValue::Bit(u16::from(buf[0] & 0x01)),
        ValueKind::Bit => {
            let bit = require_bit(spec, bit)?;
            let word = u16::from_be_bytes(permute2(buf, order)?);
            RegisterValue::Bit(extract_bit(word, bit.position())?)
        },
        ValueKind::Byte => RegisterValue::Byte(buf[0]),
        ValueKind::Int16 => RegisterValue::Int16(i16::from_be_bytes(permute2(buf, order)?)),
        ValueKind::UInt16 => RegisterValue::UInt16(u16::from_be_bytes(permute2(buf, order)?)),
        ValueKind::Int32 => RegisterValue::Int32(i32::from_be_bytes(permute4(buf, order)?)),
        ValueKind::UInt32 => RegisterValue::UInt32(u32::from_be_bytes(permute4(buf, order)?)),
        ValueKind::Float32 => RegisterValue::Float32(f32::from_be_bytes(permute4(buf, order)?)),
    };

    trace!(
        "Decoded {} [{}]: {:02X?} -> {:?}",
        spec,
        order,
        buf,
        value
    );
    Ok(value)
}

/// Encode a typed value into a raw buffer
///
/// Bits inside a register are a read-modify-write: `current_word` is the
/// logical register word obtained by a prior read (see [`current_word`]).
pub fn encode(
    value: RegisterValue,
    spec: &RegisterTypeSpec,
    order: ByteOrder,
    bit: Option<BitSelector>,
    current_word: Option<u16>,
) -> Result<Vec<u8>> {
    if value.kind() != spec.kind {
        return Err(RegisterError::unsupported(format!(
            "{} value for {}",
            value.kind(),
            spec
        )));
    }
    check_layout(spec, order)?;

    let raw = match value {
        RegisterValue::Bit(v) if v > 1 => {
            return Err(RegisterError::out_of_range(spec.to_string(), v));
        },
        RegisterValue::Bit(v) if spec.is_coil_bit() => vec![v as u8],
        RegisterValue::Bit(v) => {
            let bit = require_bit(spec, bit)?;
            let word = current_word
                .ok_or_else(|| RegisterError::MissingCurrentWord(spec.to_string()))?;
            let updated = set_bit(word, bit.position(), v)?;
            permute2(&updated.to_be_bytes(), order)?.to_vec()
        },
        // Register bytes occupy the high byte of the word
        RegisterValue::Byte(b) if spec.area.is_modbus() => vec![b, 0],
        RegisterValue::Byte(b) => vec![b],
        RegisterValue::Int16(v) => permute2(&v.to_be_bytes(), order)?.to_vec(),
        RegisterValue::UInt16(v) => permute2(&v.to_be_bytes(), order)?.to_vec(),
        RegisterValue::Int32(v) => permute4(&v.to_be_bytes(), order)?.to_vec(),
        RegisterValue::UInt32(v) => permute4(&v.to_be_bytes(), order)?.to_vec(),
        RegisterValue::Float32(v) => permute4(&v.to_be_bytes(), order)?.to_vec(),
    };

    trace!(
        "Encoded {} [{}]: {:?} -> {:02X?}",
        spec,
        order,
        value,
        raw
    );
    Ok(raw)
}

/// Logical word of a single-register buffer, for read-modify-write
pub fn current_word(buf: &[u8], order: ByteOrder) -> Result<u16> {
    Ok(u16::from_be_bytes(permute2(buf, order)?))
}

/// Parse request text into a value of `kind`
pub fn parse_value(kind: ValueKind, text: &str) -> Result<RegisterValue> {
    match kind {
        ValueKind::Float32 => parse_float(text),
        ValueKind::Bit => match parse_integer(kind, text)? {
            0 => Ok(RegisterValue::Bit(0)),
            1 => Ok(RegisterValue::Bit(1)),
            _ => Err(RegisterError::out_of_range(kind.as_str(), text)),
        },
        ValueKind::Byte => narrow(kind, text, RegisterValue::Byte),
        ValueKind::Int16 => narrow(kind, text, RegisterValue::Int16),
        ValueKind::UInt16 => narrow(kind, text, RegisterValue::UInt16),
        ValueKind::Int32 => narrow(kind, text, RegisterValue::Int32),
        ValueKind::UInt32 => narrow(kind, text, RegisterValue::UInt32),
    }
}

fn parse_integer(kind: ValueKind, text: &str) -> Result<i64> {
    text.trim()
        .parse::<i64>()
        .map_err(|e| match e.kind() {
            IntErrorKind::PosOverflow | IntErrorKind::NegOverflow => {
                RegisterError::out_of_range(kind.as_str(), text)
            },
            _ => RegisterError::invalid_value(kind.as_str(), text),
        })
}

fn narrow<T>(kind: ValueKind, text: &str, wrap: fn(T) -> RegisterValue) -> Result<RegisterValue>
where
    T: TryFrom<i64>,
{
    let parsed = parse_integer(kind, text)?;
    T::try_from(parsed)
        .map(wrap)
        .map_err(|_| RegisterError::out_of_range(kind.as_str(), text))
}

fn parse_float(text: &str) -> Result<RegisterValue> {
    let target = ValueKind::Float32.as_str();
    let trimmed = text.trim();
    let parsed: f32 = trimmed
        .parse()
        .map_err(|_| RegisterError::invalid_value(target, text))?;
    if parsed.is_finite() {
        return Ok(RegisterValue::Float32(parsed));
    }

    // Finite text that lands on infinity overflowed f32
    let literal = trimmed.trim_start_matches(['+', '-']).to_ascii_lowercase();
    if matches!(literal.as_str(), "nan" | "inf" | "infinity") {
        Err(RegisterError::invalid_value(target, text))
    } else {
        Err(RegisterError::out_of_range(target, text))
    }
}

/// Text form of a value as returned to callers
pub fn format_value(value: &RegisterValue) -> String {
    value.to_string()
}
