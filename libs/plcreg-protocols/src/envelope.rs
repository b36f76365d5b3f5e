//! JSON request and result envelopes
//!
//! Requests arrive as flat JSON objects whose fields may be strings or
//! numbers (`{"ip": "10.0.0.5", "slaveid": "1", "types": "4xfloat", ...}`).
//! Results go back as `{"value": ...}` or `{"error": ..., "value": ...}`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use plcreg_comlink::{BitSelector, ByteOrder, RegisterAddress, RegisterError, Result};

use crate::dispatch::OperationPlan;
use crate::type_spec::RegisterTypeSpec;

// ============================================================================
// Field helpers
// ============================================================================

fn parse_object(body: &str) -> Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(body) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(RegisterError::invalid_field("body", "expected a JSON object")),
        Err(e) => Err(RegisterError::invalid_field("body", e.to_string())),
    }
}

/// Field as text; numbers are accepted and rendered as written
fn text_field(map: &Map<String, Value>, name: &str) -> Result<Option<String>> {
    match map.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) if s.trim().is_empty() => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.trim().to_string())),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(Value::Bool(b)) => Ok(Some(if *b { "1" } else { "0" }.to_string())),
        Some(_) => Err(RegisterError::invalid_field(
            name,
            "expected a string or number",
        )),
    }
}

fn required_text(map: &Map<String, Value>, name: &str) -> Result<String> {
    text_field(map, name)?.ok_or_else(|| RegisterError::MissingField(name.to_string()))
}

fn integer_field<T>(map: &Map<String, Value>, name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
{
    match text_field(map, name)? {
        None => Ok(None),
        Some(text) => text.parse::<T>().map(Some).map_err(|_| {
            RegisterError::invalid_field(
                name,
                format!(
                    "'{}' is not a valid {}",
                    text,
                    std::any::type_name::<T>()
                ),
            )
        }),
    }
}

fn required_integer<T>(map: &Map<String, Value>, name: &str) -> Result<T>
where
    T: std::str::FromStr,
{
    integer_field(map, name)?.ok_or_else(|| RegisterError::MissingField(name.to_string()))
}

fn parse_order(order: Option<&str>) -> Result<Option<ByteOrder>> {
    order.map(ByteOrder::parse).transpose()
}

// ============================================================================
// Modbus request
// ============================================================================

/// Modbus read or write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModbusRequest {
    pub host: String,
    pub port: Option<u16>,
    pub slave_id: u8,
    /// Type tag, e.g. `4xfloat`
    pub tag: String,
    pub start: u16,
    pub order: Option<String>,
    pub value: Option<String>,
    /// Bit position for register bit tags
    pub extract: Option<u16>,
}

impl ModbusRequest {
    /// Parse from the JSON request body
    ///
    /// Fields: `ip`, `port`, `slaveid`, `types`, `start`, `order`, `value`, `extract`.
    pub fn from_json(body: &str) -> Result<Self> {
        let map = parse_object(body)?;
        Ok(Self {
            host: required_text(&map, "ip")?,
            port: integer_field(&map, "port")?,
            slave_id: required_integer(&map, "slaveid")?,
            tag: required_text(&map, "types")?,
            start: required_integer(&map, "start")?,
            order: text_field(&map, "order")?,
            value: text_field(&map, "value")?,
            extract: integer_field(&map, "extract")?,
        })
    }

    /// Resolve the request into a dispatcher plan
    pub fn plan(&self) -> Result<OperationPlan> {
        let spec = RegisterTypeSpec::parse(&self.tag)?;
        if !spec.area.is_modbus() {
            return Err(RegisterError::UnknownRegisterType(self.tag.clone()));
        }
        let order = spec.resolve_order(parse_order(self.order.as_deref())?)?;
        let bit = if spec.is_register_bit() {
            self.extract.map(BitSelector::new).transpose()?
        } else {
            None
        };

        Ok(OperationPlan {
            address: RegisterAddress::modbus(spec.area, self.slave_id, self.start),
            spec,
            order,
            bit,
        })
    }

    /// Value text for a write
    pub fn write_value(&self) -> Result<&str> {
        self.value
            .as_deref()
            .ok_or_else(|| RegisterError::MissingField("value".to_string()))
    }
}

// ============================================================================
// S7 request
// ============================================================================

/// S7 read or write request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct S7Request {
    pub host: String,
    pub tag: String,
    pub start: u16,
    /// Requested byte count; must cover the tag's natural width when given
    pub count: Option<u16>,
    pub value: Option<String>,
    pub order: Option<String>,
    /// Data block for `V` tags; configured default when absent
    pub db_number: Option<u16>,
}

impl S7Request {
    /// Parse from the JSON request body
    ///
    /// Fields: `ip`, `types`, `start`, `count`, `value`, `order`, `db`.
    pub fn from_json(body: &str) -> Result<Self> {
        let map = parse_object(body)?;
        Ok(Self {
            host: required_text(&map, "ip")?,
            tag: required_text(&map, "types")?,
            start: required_integer(&map, "start")?,
            count: integer_field(&map, "count")?,
            value: text_field(&map, "value")?,
            order: text_field(&map, "order")?,
            db_number: integer_field(&map, "db")?,
        })
    }

    /// Resolve the request into a dispatcher plan
    pub fn plan(&self, default_db: u16) -> Result<OperationPlan> {
        let spec = RegisterTypeSpec::parse(&self.tag)?;
        if !spec.area.is_s7() {
            return Err(RegisterError::UnknownRegisterType(self.tag.clone()));
        }
        if let Some(count) = self.count {
            if usize::from(count) < spec.raw_len() {
                return Err(RegisterError::invalid_field(
                    "count",
                    format!("{} needs {} bytes, got {}", spec, spec.raw_len(), count),
                ));
            }
        }
        let order = spec.resolve_order(parse_order(self.order.as_deref())?)?;

        Ok(OperationPlan {
            address: RegisterAddress::s7(
                spec.area,
                self.db_number.unwrap_or(default_db),
                self.start,
            ),
            spec,
            order,
            bit: None,
        })
    }

    pub fn write_value(&self) -> Result<&str> {
        self.value
            .as_deref()
            .ok_or_else(|| RegisterError::MissingField("value".to_string()))
    }
}

// ============================================================================
// Result envelope
// ============================================================================

/// Outbound result
///
/// Success carries only `value`; failure carries `error` and the best-effort
/// partial value (or `null`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultEnvelope {
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub error: Option<String>,
    pub value: Option<String>,
}

impl ResultEnvelope {
    pub fn success(value: impl Into<String>) -> Self {
        Self {
            error: None,
            value: Some(value.into()),
        }
    }

    pub fn failure(error: &RegisterError, partial: Option<String>) -> Self {
        Self {
            error: Some(error.to_string()),
            value: partial,
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            format!(
                "{{\"error\":\"result serialization failed: {}\",\"value\":null}}",
                e.to_string().replace('"', "'")
            )
        })
    }
}
