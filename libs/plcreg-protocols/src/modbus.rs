//! Modbus register operations
//!
//! One dispatcher call performs exactly one read, one write, or one
//! read-then-write for a bit inside a holding register.

use std::time::Duration;

use tracing::{debug, trace};

use plcreg_comlink::{
    BitSelector, ByteOrder, ModbusTransport, RegisterAddress, RegisterArea, RegisterError,
    RegisterValue, Result,
};

use crate::codec;
use crate::dispatch::{log_outcome, precheck, take_exact, timed, OperationStage};
use crate::type_spec::RegisterTypeSpec;

/// Executes register operations over one Modbus connection
pub struct ModbusDispatcher<T> {
    transport: T,
    request_timeout: Duration,
}

impl<T: ModbusTransport> ModbusDispatcher<T> {
    pub fn new(transport: T, request_timeout: Duration) -> Self {
        Self {
            transport,
            request_timeout,
        }
    }

    /// Give the connection back, e.g. to close it
    pub fn into_inner(self) -> T {
        self.transport
    }

    /// Check that `spec` can be read at `address`
    pub fn validate_read(address: &RegisterAddress, spec: &RegisterTypeSpec) -> Result<()> {
        if !spec.area.is_modbus() {
            return Err(RegisterError::unsupported(format!(
                "{} is not a Modbus register type",
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

    /// Check that `value` can be written as `spec` at `address`
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
        debug!("Modbus read {} at {}: {}", spec, address, OperationStage::Parsed);
        let result = self.read_value(address, spec, order, bit).await;
        log_outcome("Modbus", "read", spec, address, &result);
        result
    }

    /// Encode and write one value
    ///
    /// Bits inside a holding register read the current word first and write
    /// the merged word back; any failure in either step aborts the write.
    pub async fn execute_write(
        &mut self,
        address: &RegisterAddress,
        spec: &RegisterTypeSpec,
        order: ByteOrder,
        value: RegisterValue,
        bit: Option<BitSelector>,
    ) -> Result<()> {
        debug!("Modbus write {} at {}: {}", spec, address, OperationStage::Parsed);
        let result = self.write_value(address, spec, order, value, bit).await;
        log_outcome("Modbus", "write", spec, address, &result);
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
        debug!("Modbus read {} at {}: {}", spec, address, OperationStage::Validated);

        let raw = self.read_raw(address, spec).await?;
        let value = codec::decode(&raw, spec, order, bit)?;
        debug!(
            "Modbus read {} at {}: {} {}",
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
        debug!("Modbus write {} at {}: {}", spec, address, OperationStage::Validated);

        if spec.is_coil_bit() {
            let raw = codec::encode(value, spec, order, bit, None)?;
            let on = raw.first().copied() == Some(1);
            debug!(
                "Modbus write {} at {}: {} coil={}",
                spec,
                address,
                OperationStage::Encoded,
                on
            );
            return timed(
                self.request_timeout,
                "write_single_coil",
                self.transport
                    .write_single_coil(address.slave_id, address.start, on),
            )
            .await;
        }

        let current = if spec.is_register_bit() {
            let raw = self.read_raw(address, spec).await?;
            let word = codec::current_word(&raw, order)?;
            trace!("Current word at {}: 0x{:04X}", address, word);
            Some(word)
        } else {
            None
        };

        let raw = codec::encode(value, spec, order, bit, current)?;
        debug!(
            "Modbus write {} at {}: {} {:02X?}",
            spec,
            address,
            OperationStage::Encoded,
            raw
        );

        timed(
            self.request_timeout,
            "write_registers",
            self.transport.write_registers(
                address.slave_id,
                address.start,
                u16::from(spec.word_count),
                &raw,
            ),
        )
        .await
    }

    async fn read_raw(
        &mut self,
        address: &RegisterAddress,
        spec: &RegisterTypeSpec,
    ) -> Result<Vec<u8>> {
        let (slave, start, count) = (address.slave_id, address.start, spec.read_count());
        debug!(
            "Modbus read {} at {}: {} count={}",
            spec,
            address,
            OperationStage::TransportInvoked,
            count
        );

        let limit = self.request_timeout;
        let (operation, raw) = match address.area {
            RegisterArea::Coil => (
                "read_coils",
                timed(limit, "read_coils", self.transport.read_coils(slave, start, count)).await?,
            ),
            RegisterArea::DiscreteInput => (
                "read_discrete_inputs",
                timed(
                    limit,
                    "read_discrete_inputs",
                    self.transport.read_discrete_inputs(slave, start, count),
                )
                .await?,
            ),
            RegisterArea::InputRegister => (
                "read_input_registers",
                timed(
                    limit,
                    "read_input_registers",
                    self.transport.read_input_registers(slave, start, count),
                )
                .await?,
            ),
            RegisterArea::HoldingRegister => (
                "read_holding_registers",
                timed(
                    limit,
                    "read_holding_registers",
                    self.transport.read_holding_registers(slave, start, count),
                )
                .await?,
            ),
            other => {
                return Err(RegisterError::unsupported(format!(
                    "{} is not a Modbus area",
                    other
                )));
            },
        };

        trace!("{} <- {:02X?}", operation, raw);
        take_exact(raw, spec.raw_len(), operation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Call, RecordingConnection, RecordingPlc};
    use plcreg_comlink::{ModbusConnector, ModbusEndpoint, TransportError};
    use tracing_test::traced_test;

    const TIMEOUT: Duration = Duration::from_secs(1);

    async fn connect(plc: &RecordingPlc) -> RecordingConnection {
        let endpoint = ModbusEndpoint::new("127.0.0.1", 502);
        ModbusConnector::connect(plc, &endpoint, TIMEOUT)
            .await
            .unwrap()
    }

    async fn dispatcher(plc: &RecordingPlc) -> ModbusDispatcher<RecordingConnection> {
        ModbusDispatcher::new(connect(plc).await, TIMEOUT)
    }

    fn plan(tag: &str, start: u16) -> (RegisterAddress, RegisterTypeSpec) {
        let spec = RegisterTypeSpec::parse(tag).unwrap();
        (RegisterAddress::modbus(spec.area, 1, start), spec)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    #[tokio::test]
    async fn test_read_float_selects_holding_registers() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x43, 0x48, 0x00, 0x00]).await;
        let mut dispatcher = dispatcher(&plc).await;

        let (address, spec) = plan("4xfloat", 100);
        let value = dispatcher
            .execute_read(&address, &spec, ByteOrder::ABCD, None)
            .await
            .unwrap();

        assert_eq!(value, RegisterValue::Float32(200.0));
        assert_eq!(
            plc.calls().await,
            vec![
                Call::Connect("127.0.0.1:502".to_string()),
                Call::ReadHoldingRegisters {
                    slave: 1,
                    start: 100,
                    count: 2
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_read_selects_call_by_area() {
        let cases = [
            ("0xbit", vec![0x01], Call::ReadCoils { slave: 1, start: 7, count: 1 }),
            ("1xbit", vec![0x00], Call::ReadDiscreteInputs { slave: 1, start: 7, count: 1 }),
            ("3xint", vec![0x00, 0x05], Call::ReadInputRegisters { slave: 1, start: 7, count: 1 }),
        ];

        for (tag, response, expected) in cases {
            let plc = RecordingPlc::new();
            plc.respond_with(response).await;
            let mut dispatcher = dispatcher(&plc).await;
            let (address, spec) = plan(tag, 7);

            dispatcher
                .execute_read(&address, &spec, ByteOrder::BA, None)
                .await
                .unwrap();
            assert_eq!(plc.calls().await[1], expected, "tag {}", tag);
        }
    }

    #[tokio::test]
    async fn test_read_register_bit() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x00, 0x10]).await;
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("3xbit", 0);

        let value = dispatcher
            .execute_read(&address, &spec, ByteOrder::BA, Some(BitSelector::new(4).unwrap()))
            .await
            .unwrap();
        assert_eq!(value, RegisterValue::Bit(1));
    }

    #[tokio::test]
    async fn test_read_validation_makes_no_transport_call() {
        let plc = RecordingPlc::new();
        let mut dispatcher = dispatcher(&plc).await;

        let (address, spec) = plan("4xint", 0);
        let err = dispatcher
            .execute_read(&address, &spec, ByteOrder::CDAB, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::ByteOrderWidthMismatch { .. }));

        let (address, spec) = plan("4xbit", 0);
        let err = dispatcher
            .execute_read(&address, &spec, ByteOrder::BA, None)
            .await
            .unwrap_err();
        assert_eq!(err, RegisterError::MissingBitSelector("4xbit".to_string()));

        // Only the connect is recorded
        assert_eq!(plc.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_read_coil_area_with_word_kind_is_unsupported() {
        let plc = RecordingPlc::new();
        let mut dispatcher = dispatcher(&plc).await;

        for tag in ["0xfloat", "1xint"] {
            let (address, spec) = plan(tag, 0);
            let err = dispatcher
                .execute_read(&address, &spec, ByteOrder::ABCD, None)
                .await
                .unwrap_err();
            assert!(matches!(err, RegisterError::UnsupportedOperation(_)), "tag {}", tag);
        }
        assert_eq!(plc.calls().await.len(), 1);
    }

    #[tokio::test]
    async fn test_read_short_response() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x43, 0x48]).await;
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("4xfloat", 0);

        let err = dispatcher
            .execute_read(&address, &spec, ByteOrder::ABCD, None)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            RegisterError::Transport(TransportError::ShortRead {
                expected: 4,
                actual: 2
            })
        );
    }

    #[tokio::test]
    async fn test_read_transport_failure_is_classified() {
        let plc = RecordingPlc::new();
        plc.fail_reads(TransportError::protocol("illegal data address")).await;
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("4xint", 0);

        let err = dispatcher
            .execute_read(&address, &spec, ByteOrder::BA, None)
            .await
            .unwrap_err();
        assert_eq!(err.class(), plcreg_comlink::ErrorClass::Transport);
    }

    #[tokio::test]
    async fn test_read_timeout() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x00, 0x01]).await;
        plc.delay_reads(Duration::from_millis(500)).await;
        let mut dispatcher = ModbusDispatcher::new(connect(&plc).await, Duration::from_millis(20));
        let (address, spec) = plan("4xint", 0);

        let err = dispatcher
            .execute_read(&address, &spec, ByteOrder::BA, None)
            .await
            .unwrap_err();
        assert!(matches!(err, RegisterError::Transport(TransportError::Timeout(_))));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_read_logs_stages() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x00, 0x2A]).await;
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("4xuint", 3);

        dispatcher
            .execute_read(&address, &spec, ByteOrder::BA, None)
            .await
            .unwrap();

        assert!(logs_contain("transport_invoked"));
        assert!(logs_contain("completed"));
    }

    // ========================================================================
    // Writes
    // ========================================================================

    #[tokio::test]
    async fn test_write_register_bit_reads_then_writes() {
        let plc = RecordingPlc::new();
        plc.respond_with(vec![0x00, 0x01]).await;
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("4xbit", 40);

        dispatcher
            .execute_write(
                &address,
                &spec,
                ByteOrder::BA,
                RegisterValue::Bit(1),
                Some(BitSelector::new(4).unwrap()),
            )
            .await
            .unwrap();

        assert_eq!(
            plc.calls().await[1..],
            [
                Call::ReadHoldingRegisters {
                    slave: 1,
                    start: 40,
                    count: 1
                },
                Call::WriteRegisters {
                    slave: 1,
                    start: 40,
                    count: 1,
                    data: vec![0x00, 0x11]
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_write_register_bit_aborts_when_read_fails() {
        let plc = RecordingPlc::new();
        plc.fail_reads(TransportError::io("connection reset")).await;
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("4xbit", 40);

        let err = dispatcher
            .execute_write(
                &address,
                &spec,
                ByteOrder::BA,
                RegisterValue::Bit(1),
                Some(BitSelector::new(4).unwrap()),
            )
            .await
            .unwrap_err();

        assert!(matches!(err, RegisterError::Transport(TransportError::Io(_))));
        assert!(!plc
            .calls()
            .await
            .iter()
            .any(|call| matches!(call, Call::WriteRegisters { .. })));
    }

    #[tokio::test]
    async fn test_write_float_cdab() {
        let plc = RecordingPlc::new();
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("4xfloat", 10);

        dispatcher
            .execute_write(
                &address,
                &spec,
                ByteOrder::CDAB,
                RegisterValue::Float32(200.0),
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            plc.calls().await[1],
            Call::WriteRegisters {
                slave: 1,
                start: 10,
                count: 2,
                data: vec![0x00, 0x00, 0x43, 0x48]
            }
        );
    }

    #[tokio::test]
    async fn test_write_coil_uses_single_coil() {
        let plc = RecordingPlc::new();
        let mut dispatcher = dispatcher(&plc).await;
        let (address, spec) = plan("0xbit", 3);

        dispatcher
            .execute_write(&address, &spec, ByteOrder::BA, RegisterValue::Bit(1), None)
            .await
            .unwrap();

        assert_eq!(
            plc.calls().await[1],
            Call::WriteSingleCoil {
                slave: 1,
                start: 3,
                value: true
            }
        );
    }

    #[tokio::test]
    async fn test_unsupported_writes_make_no_transport_call() {
        let plc = RecordingPlc::new();
        let mut dispatcher = dispatcher(&plc).await;

        let cases = [
            ("3xint", RegisterValue::Int16(1)),
            ("1xbit", RegisterValue::Bit(1)),
            ("4xbyte", RegisterValue::Byte(1)),
            ("0xbit", RegisterValue::Float32(1.0)),
        ];
        for (tag, value) in cases {
            let (address, spec) = plan(tag, 0);
            let err = dispatcher
                .execute_write(&address, &spec, ByteOrder::BA, value, None)
                .await
                .unwrap_err();
            assert!(
                matches!(err, RegisterError::UnsupportedOperation(_)),
                "tag {}: {:?}",
                tag,
                err
            );
        }

        assert_eq!(plc.calls().await.len(), 1);
    }
}
