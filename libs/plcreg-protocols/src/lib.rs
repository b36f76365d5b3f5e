//! PLC Register Protocols
//!
//! Turns string-typed register requests into typed reads and writes against
//! Modbus and S7 transports.
//!
//! # Architecture
//!
//! - `type_spec` - closed table of register type tags
//! - `codec` - raw bytes to `RegisterValue` and back
//! - `modbus` / `s7` - one-operation dispatchers over an owned transport
//! - `gateway` - connect, dispatch, close for each request
//! - `envelope` - JSON request parsing and result envelopes

pub mod codec;
pub mod dispatch;
pub mod envelope;
pub mod gateway;
pub mod modbus;
pub mod s7;
pub mod type_spec;

#[cfg(test)]
pub(crate) mod testing;

pub use codec::{decode, encode, format_value, parse_value};
pub use dispatch::{OperationPlan, OperationStage};
pub use envelope::{ModbusRequest, ResultEnvelope, S7Request};
pub use gateway::Gateway;
pub use modbus::ModbusDispatcher;
pub use s7::S7Dispatcher;
pub use type_spec::RegisterTypeSpec;

// Re-export core types for convenience
pub use plcreg_comlink::{
    BitSelector, ByteOrder, ErrorClass, RegisterAddress, RegisterArea, RegisterError,
    RegisterValue, Result, TransportError, ValueKind,
};
