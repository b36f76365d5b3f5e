//! Pieces shared by the Modbus and S7 dispatchers

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tracing::{debug, warn};

use plcreg_comlink::{
    BitSelector, ByteOrder, RegisterAddress, RegisterError, Result, TransportError,
    TransportResult,
};

use crate::type_spec::RegisterTypeSpec;

/// Progress of one read or write
///
/// `Parsed → Validated → TransportInvoked → Decoded/Encoded → Completed`,
/// with `Failed` reachable from any stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperationStage {
    Parsed,
    Validated,
    TransportInvoked,
    Decoded,
    Encoded,
    Completed,
    Failed,
}

impl fmt::Display for OperationStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OperationStage::Parsed => "parsed",
            OperationStage::Validated => "validated",
            OperationStage::TransportInvoked => "transport_invoked",
            OperationStage::Decoded => "decoded",
            OperationStage::Encoded => "encoded",
            OperationStage::Completed => "completed",
            OperationStage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything a dispatcher needs for one operation, built from a request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OperationPlan {
    pub address: RegisterAddress,
    pub spec: RegisterTypeSpec,
    pub order: ByteOrder,
    pub bit: Option<BitSelector>,
}

/// Validation done before any transport call
pub(crate) fn precheck(
    spec: &RegisterTypeSpec,
    order: ByteOrder,
    bit: Option<BitSelector>,
) -> Result<()> {
    if spec.uses_byte_order() {
        order.ensure_width(spec.value_width())?;
    }
    if spec.is_register_bit() && bit.is_none() {
        return Err(RegisterError::MissingBitSelector(spec.to_string()));
    }
    Ok(())
}

/// Run a transport call under `limit`; expiry becomes a transport timeout
pub(crate) async fn timed<R, F>(limit: Duration, operation: &str, call: F) -> Result<R>
where
    F: Future<Output = TransportResult<R>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result.map_err(RegisterError::from),
        Err(_) => Err(TransportError::timeout(format!(
            "{} exceeded {}ms",
            operation,
            limit.as_millis()
        ))
        .into()),
    }
}

/// Trim a transport response to the expected length
///
/// Fewer bytes is a short read. Extra bytes (padding in packed coil
/// responses, oversize replies) are dropped with a warning.
pub(crate) fn take_exact(mut raw: Vec<u8>, expected: usize, operation: &str) -> Result<Vec<u8>> {
    if raw.len() < expected {
        return Err(TransportError::ShortRead {
            expected,
            actual: raw.len(),
        }
        .into());
    }
    if raw.len() > expected {
        warn!(
            "{} returned {} bytes, expected {} - using leading bytes",
            operation,
            raw.len(),
            expected
        );
        raw.truncate(expected);
    }
    Ok(raw)
}

/// Log the terminal stage of one operation
pub(crate) fn log_outcome<V>(
    family: &str,
    operation: &str,
    spec: &RegisterTypeSpec,
    address: &RegisterAddress,
    result: &Result<V>,
) {
    match result {
        Ok(_) => debug!(
            "{} {} {} at {}: {}",
            family,
            operation,
            spec,
            address,
            OperationStage::Completed
        ),
        Err(e) => debug!(
            "{} {} {} at {}: {} ({}) {}",
            family,
            operation,
            spec,
            address,
            OperationStage::Failed,
            e.class(),
            e
        ),
    }
}
