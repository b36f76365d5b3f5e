//! PLC Register Gateway Common Library
//!
//! Configuration loading and logging bootstrap shared by the gateway crates.

pub mod config;
pub mod error;
pub mod logging;

// Re-exports for convenience
pub use config::{GatewayConfig, ModbusSettings, S7Settings};
pub use error::{Error, Result};
pub use logging::{init_logging, LoggingConfig};
