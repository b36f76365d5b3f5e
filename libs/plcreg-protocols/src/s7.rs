//! S7 register operations
//!
//! `V` addresses map to a data block; `M`, `I` and `Q` go through the area
//! calls. All S7 values are read at their natural width.

use std::time::Duration;

use tracing::{debug, trace};

use plcreg_comlink::{
    BitSelector, ByteOrder, RegisterAddress, RegisterArea, RegisterError, RegisterValue, Result,
    S7Transport,
};

use crate::codec;
use crate::dispatch::{log_outcome, precheck, take_exact, timed, OperationStage};
use crate::type_spec::RegisterTypeSpec;

/// Executes register operations over one S7 connection
pub struct S7Dispatcher<T> {
    transport: T,
    request_timeout: Duration,
}

impl<T: S7Transport> S7Dispatcher<T> {
    pub fn new(transport: T, request_timeout: Duration) -> Self {
        Self {
            transport,
            request_timeout,
        }
    }

    pub fn into_inner(self) -> T {
        self.transport
    }

    pub fn validate_read(address: &RegisterAddress, spec: &RegisterTypeSpec) -> Result<()> {
        if !spec.area.is_s7() {
            return Err(RegisterError::unsupported(format!(
                "{} is not an S7 register type",
                spec
            )));
        }
        if address.area != spec.area {
            return Err(RegisterError::unsupported(format!(
                "{} does not address {}",
                spec, address.area
            )));
        }
        spec.ensure_readable()
    }

    pub fn validate_write(
        address: &RegisterAddress,
        spec: &RegisterTypeSpec,
        value: &RegisterValue,
    ) -> Result<()> {
        Self::validate_read(address, spec)?;
        spec.ensure_writable()?;
        if value.kind() != spec.kind {
            return Err(RegisterError::unsupported(format!(
                "{} value for {}",
                value.kind(),
                spec
            )));
        }
        Ok(())
    }

    /// Read and decode one value
    pub async fn execute_read(
        &mut self,
        address: &RegisterAddress,
        spec: &RegisterTypeSpec,
        order: ByteOrder,
        bit: Option<BitSelector>,
    ) -> Result<RegisterValue> {
        debug!("S7 read {} at {}: {}", spec, address, OperationStage::Parsed);
        let result = self.read_value(address, spec, order, bit).await;
        log_outcome("S7", "read", spec, address, &result);
        result
    }

    /// Encode and write one value
    pub async fn execute_write(
        &mut self,
        address: &RegisterAddress,
        spec: &RegisterTypeSpec,
        order: ByteOrder,
        value: RegisterValue,
        bit: Option<BitSelector>,
    ) -> Result<()> {
        debug!("S7 write {} at {}: {}", spec, address, OperationStage::Parsed);
        let result = self.write_value(address, spec, order, value, bit).await;
        log_outcome("S7", "write", spec, address, &result);
        result
    }

    async fn read_value(
        &mut self,
        address: &RegisterAddress,
        spec: &RegisterTypeSpec,
        order: ByteOrder,
        bit: Option<BitSelector>,
    ) -> Result<RegisterValue> {
        Self::validate_read(address, spec)?;
        precheck(spec, order, bit)?;
        debug!("S7 read {} at {}: {}", spec, address, OperationStage::Validated);

        let len = spec.raw_len();
        let limit = self.request_timeout;
        debug!(
            "S7 read {} at {}: {} len={}",
            spec,
            address,
            OperationStage::TransportInvoked,
            len
        );

        let raw = match address.area.s7_memory_area() {
            None => {
                timed(
                    limit,
                    "read_db",
                    self.transport
                        .read_db(address.db_number, address.start, len as u16),
                )
                .await?
            },
            Some(area) => {
                timed(
                    limit,
                    "read_area",
                    self.transport.read_area(area, address.start, len as u16),
                )
                .await?
            },
        };
        trace!("S7 {} <- {:02X?}", address, raw);

        let raw = take_exact(raw, len, "S7 read")?;
        let value = codec::decode(&raw, spec, order, bit)?;
        debug!(
            "S7 read {} at {}: {} {}",
            spec,
            address,
            OperationStage::Decoded,
            value
        );
        Ok(value)
    }

    async fn write_value(
        &mut self,
        address: &RegisterAddress,
        spec: &RegisterTypeSpec,
        order: ByteOrder,
        value: RegisterValue,
        bit: Option<BitSelector>,
    ) -> Result<()> {
        Self::validate_write(address, spec, &value)?;
        precheck(spec, order, bit)?;
        debug!("S7 write {} at {}: {}", spec, address, OperationStage::Validated);

        let raw = codec::encode(value, spec, order, bit, None)?;
        let limit = self.request_timeout;
        debug!(
            "S7 write {} at {}: {} {:02X?}",
            spec,
            address,
            OperationStage::Encoded,
            raw
        );

        match address.area {
            RegisterArea::S7V => {
                timed(
                    limit,
                    "write_db",
                    self.transport
                        .write_db(address.db_number, address.start, &raw),
                )
                .await?
            },
            other => {
                let area = other.s7_memory_area().ok_or_else(|| {
                    RegisterError::unsupported(format!("{} is not an S7 area", other))
                })?;
                timed(
                    limit,
                    "write_area",
                    self.transport.write_area(area, address.start, &raw),
                )
                .await?
            },
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingConnection, RecordingPlc};
    use plcreg_comlink::{S7Connector, S7Endpoint, S7MemoryArea, TransportError};
    use tracing_test::traced_test;

    const TIMEOUT: Duration = Duration::from_secs(1);

    async fn dispatcher(plc: &RecordingPlc) -> S7Dispatcher<RecordingConnection> {
        let endpoint = S7Endpoint {
            host: "192.168.0.10".to_string(),
            rack: 0,
            slot: 1,
            pdu_length: 960,
        };
        let transport = S7Connector::connect(plc, &endpoint, TIMEOUT).await.unwrap();
        S7Dispatcher::new(transport, TIMEOUT)
    }

    fn plan(tag: &str, start: u16) -> (RegisterAddress, RegisterTypeSpec) {
        let spec = RegisterTypeSpec::parse(tag).unwrap();
        (RegisterAddress::s7(spec.area, 1, start), spec)
    }

    #[tokio::test]
    async fn test_read_db_word() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x01, 0x02]).await;
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("VW", 20);

        let value = dispatcher
            .execute_read(&address, &spec, ByteOrder::BA, None)
            .await
            .unwrap();

        assert_eq!(value, RegisterValue::UInt16(0x0102));
        assert_eq!(
            plc.calls().await[1],
            Call::ReadDb {
                db: 1,
                start: 20,
                len: 2
            }
        );
    }

    #[tokio::test]
    async fn test_read_dword_and_float_lengths() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x43, 0x48, 0x00, 0x00]).await;
        let mut dispatcher = dispatcher(&plc).await;

        let (address, spec) = plan("VF", 0);
        let value = dispatcher
            .execute_read(&address, &spec, ByteOrder::ABCD, None)
            .await
            .unwrap();
        assert_eq!(value, RegisterValue::Float32(200.0));

        let (address, spec) = plan("VD", 4);
        let value = dispatcher
            .execute_read(&address, &spec, ByteOrder::ABCD, None)
            .await
            .unwrap();
        assert_eq!(value, RegisterValue::UInt32(0x4348_0000));

        let calls = plc.calls().await;
        assert_eq!(calls[1], Call::ReadDb { db: 1, start: 0, len: 4 });
        assert_eq!(calls[2], Call::ReadDb { db: 1, start: 4, len: 4 });
    }

    #[tokio::test]
    async fn test_read_memory_areas() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x80]).await;
        let mut dispatcher = dispatcher(&plc).await;

        for (tag, area) in [
            ("MB", S7MemoryArea::Merkers),
            ("IB", S7MemoryArea::Inputs),
            ("QB", S7MemoryArea::Outputs),
        ] {
            let (address, spec) = plan(tag, 2);
            let value = dispatcher
                .execute_read(&address, &spec, ByteOrder::BA, None)
                .await
                .unwrap();
            assert_eq!(value, RegisterValue::Byte(0x80));
            assert_eq!(
                plc.calls().await.last(),
                Some(&Call::ReadArea {
                    area,
                    start: 2,
                    len: 1
                })
            );
        }
    }

    #[tokio::test]
    async fn test_write_db_and_areas() {
        let plc = RecordingPlc::new();
        let mut dispatcher = dispatcher(&plc).await;

        let (address, spec) = plan("VD", 8);
        dispatcher
            .execute_write(
                &address,
                &spec,
                ByteOrder::ABCD,
                RegisterValue::UInt32(0x0102_0304),
                None,
            )
            .await
            .unwrap();

        let (address, spec) = plan("MW", 6);
        dispatcher
            .execute_write(&address, &spec, ByteOrder::AB, RegisterValue::UInt16(0x0102), None)
            .await
            .unwrap();

        let (address, spec) = plan("QB", 0);
        dispatcher
            .execute_write(&address, &spec, ByteOrder::BA, RegisterValue::Byte(0xFF), None)
            .await
            .unwrap();

        assert_eq!(
            plc.calls().await[1..],
            [
                Call::WriteDb {
                    db: 1,
                    start: 8,
                    data: vec![0x01, 0x02, 0x03, 0x04]
                },
                Call::WriteArea {
                    area: S7MemoryArea::Merkers,
                    start: 6,
                    data: vec![0x02, 0x01]
                },
                Call::WriteArea {
                    area: S7MemoryArea::Outputs,
                    start: 0,
                    data: vec![0xFF]
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_input_area_is_read_only() {
        let plc = RecordingPlc::new();
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("IB", 0);

        let err = dispatcher
            .execute_write(&address, &spec, ByteOrder::BA, RegisterValue::Byte(1), None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::UnsupportedOperation(_)));
        assert_eq!(plc.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_modbus_tag_rejected() {
        let plc = RecordingPlc::new();
        let mut dispatcher = dispatcher(&plc).await;
        let spec = RegisterTypeSpec::parse("4xint").unwrap();
        let address = RegisterAddress::s7(RegisterArea::S7V, 1, 0);

        let err = dispatcher
            .execute_read(&address, &spec, ByteOrder::BA, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::UnsupportedOperation(_)));
    }

    #[tokio::test]
    async fn test_write_failure_propagates() {
        let plc = RecordingPlc::new();
        plc.fail_writes(TransportError::protocol("address out of range")).await;
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("VB", 0);

        let err = dispatcher
            .execute_write(&address, &spec, ByteOrder::BA, RegisterValue::Byte(1), None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegisterError::Transport(TransportError::Protocol("address out of range".into()))
        );
    }

    #[tokio::test]
    #[traced_test]
    async fn test_stages_are_logged_like_modbus() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x00, 0x2A]).await;
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("VW", 20);

        dispatcher
            .execute_read(&address, &spec, ByteOrder::BA, None)
            .await
            .unwrap();

        assert!(logs_contain("S7 read VW"));
        assert!(logs_contain(": parsed"));
        assert!(logs_contain(": validated"));
        assert!(logs_contain(": transport_invoked"));
        assert!(logs_contain(": decoded 42"));
        assert!(logs_contain(": completed"));

        plc.fail_writes(TransportError::protocol("write rejected")).await;
        let (address, spec) = plan("VB", 0);
        dispatcher
            .execute_write(&address, &spec, ByteOrder::BA, RegisterValue::Byte(1), None)
            .await
            .unwrap_err();

        assert!(logs_contain("S7 write VB"));
        assert!(logs_contain("failed (transport)"));
    }
}
