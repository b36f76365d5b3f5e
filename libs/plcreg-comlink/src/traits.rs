//! Transport Collaborator Traits
//!
//! The wire protocols (Modbus TCP framing, S7 ISO-on-TCP) are owned by
//! external clients. This module defines the narrow surface the register
//! dispatchers need from them. Buffers in and out are raw register bytes in
//! device order; no byte reordering happens on this side of the seam.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::TransportResult;

// ============================================================================
// Endpoints
// ============================================================================

/// Modbus TCP endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModbusEndpoint {
    pub host: String,
    pub port: u16,
}

impl ModbusEndpoint {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl std::fmt::Display for ModbusEndpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// S7 endpoint with CPU placement and negotiated PDU size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct S7Endpoint {
    pub host: String,
    pub rack: u16,
    pub slot: u16,
    pub pdu_length: u16,
}

impl std::fmt::Display for S7Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (rack {}, slot {})", self.host, self.rack, self.slot)
    }
}

/// S7 memory areas addressed without a DB number
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum S7MemoryArea {
    /// M (flags)
    Merkers,
    /// I (process inputs)
    Inputs,
    /// Q (process outputs)
    Outputs,
}

// ============================================================================
// Modbus
// ============================================================================

/// One open Modbus connection
///
/// Bit reads return the packed status bytes as received (LSB = first coil).
/// Register reads return `2 * count` bytes, high byte first per register as
/// the device sent them.
///
/// Implementations must release the underlying connection when dropped, so an
/// abandoned operation never leaks a socket.
#[async_trait]
pub trait ModbusTransport: Send {
    async fn read_coils(&mut self, slave_id: u8, start: u16, count: u16)
        -> TransportResult<Vec<u8>>;

    async fn read_discrete_inputs(
        &mut self,
        slave_id: u8,
        start: u16,
        count: u16,
    ) -> TransportResult<Vec<u8>>;

    async fn read_input_registers(
        &mut self,
        slave_id: u8,
        start: u16,
        count: u16,
    ) -> TransportResult<Vec<u8>>;

    async fn read_holding_registers(
        &mut self,
        slave_id: u8,
        start: u16,
        count: u16,
    ) -> TransportResult<Vec<u8>>;

    /// Write `count` registers starting at `start` (function code 16)
    async fn write_registers(
        &mut self,
        slave_id: u8,
        start: u16,
        count: u16,
        data: &[u8],
    ) -> TransportResult<()>;

    /// Write one coil (function code 5)
    async fn write_single_coil(&mut self, slave_id: u8, start: u16, value: bool)
        -> TransportResult<()>;

    /// Close the connection
    async fn close(&mut self) -> TransportResult<()>;
}

/// Opens Modbus connections
#[async_trait]
pub trait ModbusConnector: Send + Sync {
    type Transport: ModbusTransport;

    /// Connect to `endpoint`, giving up after `timeout`
    async fn connect(
        &self,
        endpoint: &ModbusEndpoint,
        timeout: Duration,
    ) -> TransportResult<Self::Transport>;
}

// ============================================================================
// S7
// ============================================================================

/// One open S7 connection
///
/// Implementations must release the underlying connection when dropped.
#[async_trait]
pub trait S7Transport: Send {
    /// Read `len` bytes of data block `db_number` starting at byte `start`
    async fn read_db(&mut self, db_number: u16, start: u16, len: u16)
        -> TransportResult<Vec<u8>>;

    async fn write_db(&mut self, db_number: u16, start: u16, data: &[u8]) -> TransportResult<()>;

    /// Read `len` bytes of a non-DB memory area starting at byte `start`
    async fn read_area(
        &mut self,
        area: S7MemoryArea,
        start: u16,
        len: u16,
    ) -> TransportResult<Vec<u8>>;

    async fn write_area(
        &mut self,
        area: S7MemoryArea,
        start: u16,
        data: &[u8],
    ) -> TransportResult<()>;

    /// Close the connection
    async fn close(&mut self) -> TransportResult<()>;
}

/// Opens S7 connections
#[async_trait]
pub trait S7Connector: Send + Sync {
    type Transport: S7Transport;

    async fn connect(
        &self,
        endpoint: &S7Endpoint,
        timeout: Duration,
    ) -> TransportResult<Self::Transport>;
}
