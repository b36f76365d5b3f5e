//! PLC Register Link Library
//!
//! Core register primitives shared by the Modbus and S7 gateways.
//!
//! # Architecture
//!
//! This library provides:
//! - **Bytes Utilities**: Byte order permutation and single-bit operations on 16-bit words
//! - **Register Types**: Register areas, addresses and the typed `RegisterValue` union
//! - **Error Taxonomy**: `RegisterError` classified as validation, transport or codec failures
//! - **Transport Traits**: `ModbusTransport`, `S7Transport` and their connectors, implemented
//!   by external clients that own the wire framing

pub mod bytes;
pub mod error;
pub mod traits;
pub mod types;

// Re-export core types
pub use bytes::{BitSelector, ByteOrder};
pub use error::{ErrorClass, RegisterError, Result, TransportError, TransportResult};
pub use traits::{
    ModbusConnector, ModbusEndpoint, ModbusTransport, S7Connector, S7Endpoint, S7MemoryArea,
    S7Transport,
};
pub use types::{RegisterAddress, RegisterArea, RegisterValue, ValueKind};
