//! Binary data processing utilities
//!
//! Provides byte order handling and bit extraction for PLC register buffers.
//!
//! # Design Principles
//!
//! - **Protocol-agnostic**: Same permutation rules for Modbus and S7 buffers
//! - **Type-safe**: `ByteOrder` enum prevents string typos, `BitSelector` carries its range check
//! - **Zero-copy**: Fixed-size arrays in, fixed-size arrays out

pub mod bit_ops;
pub mod byte_order;

pub use bit_ops::*;
pub use byte_order::{permute2, permute4, ByteOrder};
