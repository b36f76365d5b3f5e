//! Recording transport doubles for dispatcher and gateway tests
//!
//! `RecordingPlc` is both connector and shared call log; every connection it
//! hands out appends to the same log, so tests can assert call order across
//! connect, transport calls and close.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;

use plcreg_comlink::{
    ModbusConnector, ModbusEndpoint, ModbusTransport, S7Connector, S7Endpoint, S7MemoryArea,
    S7Transport, TransportError, TransportResult,
};

/// One recorded collaborator call
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Connect(String),
    ReadCoils { slave: u8, start: u16, count: u16 },
    ReadDiscreteInputs { slave: u8, start: u16, count: u16 },
    ReadInputRegisters { slave: u8, start: u16, count: u16 },
    ReadHoldingRegisters { slave: u8, start: u16, count: u16 },
    WriteRegisters { slave: u8, start: u16, count: u16, data: Vec<u8> },
    WriteSingleCoil { slave: u8, start: u16, value: bool },
    ReadDb { db: u16, start: u16, len: u16 },
    WriteDb { db: u16, start: u16, data: Vec<u8> },
    ReadArea { area: S7MemoryArea, start: u16, len: u16 },
    WriteArea { area: S7MemoryArea, start: u16, data: Vec<u8> },
    Close,
}

#[derive(Debug, Default)]
struct Script {
    read_response: Vec<u8>,
    read_delay: Option<Duration>,
    connect_error: Option<TransportError>,
    read_error: Option<TransportError>,
    write_error: Option<TransportError>,
}

#[derive(Debug, Clone, Default)]
pub struct RecordingPlc {
    calls: Arc<Mutex<Vec<Call>>>,
    script: Arc<Mutex<Script>>,
}

impl RecordingPlc {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bytes returned by every read
    pub async fn respond_with(&self, bytes: Vec<u8>) {
        self.script.lock().await.read_response = bytes;
    }

    pub async fn delay_reads(&self, delay: Duration) {
        self.script.lock().await.read_delay = Some(delay);
    }

    pub async fn fail_connect(&self, err: TransportError) {
        self.script.lock().await.connect_error = Some(err);
    }

    pub async fn fail_reads(&self, err: TransportError) {
        self.script.lock().await.read_error = Some(err);
    }

    pub async fn fail_writes(&self, err: TransportError) {
        self.script.lock().await.write_error = Some(err);
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    async fn record(&self, call: Call) {
        self.calls.lock().await.push(call);
    }

    async fn connect_as(&self, target: String) -> TransportResult<RecordingConnection> {
        self.record(Call::Connect(target)).await;
        match self.script.lock().await.connect_error.clone() {
            Some(err) => Err(err),
            None => Ok(RecordingConnection { plc: self.clone() }),
        }
    }
}

/// Connection handed out by `RecordingPlc`
#[derive(Debug)]
pub struct RecordingConnection {
    plc: RecordingPlc,
}

impl RecordingConnection {
    async fn read(&self, call: Call) -> TransportResult<Vec<u8>> {
        self.plc.record(call).await;
        let (delay, error, response) = {
            let script = self.plc.script.lock().await;
            (
                script.read_delay,
                script.read_error.clone(),
                script.read_response.clone(),
            )
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        match error {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }

    async fn write(&self, call: Call) -> TransportResult<()> {
        self.plc.record(call).await;
        match self.plc.script.lock().await.write_error.clone() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ModbusTransport for RecordingConnection {
    async fn read_coils(&mut self, slave: u8, start: u16, count: u16) -> TransportResult<Vec<u8>> {
        self.read(Call::ReadCoils {
            slave,
            start,
            count,
        })
        .await
    }

    async fn read_discrete_inputs(
        &mut self,
        slave: u8,
        start: u16,
        count: u16,
    ) -> TransportResult<Vec<u8>> {
        self.read(Call::ReadDiscreteInputs {
            slave,
            start,
            count,
        })
        .await
    }

    async fn read_input_registers(
        &mut self,
        slave: u8,
        start: u16,
        count: u16,
    ) -> TransportResult<Vec<u8>> {
        self.read(Call::ReadInputRegisters {
            slave,
            start,
            count,
        })
        .await
    }

    async fn read_holding_registers(
        &mut self,
        slave: u8,
        start: u16,
        count: u16,
    ) -> TransportResult<Vec<u8>> {
        self.read(Call::ReadHoldingRegisters {
            slave,
            start,
            count,
        })
        .await
    }

    async fn write_registers(
        &mut self,
        slave: u8,
        start: u16,
        count: u16,
        data: &[u8],
    ) -> TransportResult<()> {
        self.write(Call::WriteRegisters {
            slave,
            start,
            count,
            data: data.to_vec(),
        })
        .await
    }

    async fn write_single_coil(&mut self, slave: u8, start: u16, value: bool) -> TransportResult<()> {
        self.write(Call::WriteSingleCoil {
            slave,
            start,
            value,
        })
        .await
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.plc.record(Call::Close).await;
        Ok(())
    }
}

#[async_trait]
impl S7Transport for RecordingConnection {
    async fn read_db(&mut self, db: u16, start: u16, len: u16) -> TransportResult<Vec<u8>> {
        self.read(Call::ReadDb { db, start, len }).await
    }

    async fn write_db(&mut self, db: u16, start: u16, data: &[u8]) -> TransportResult<()> {
        self.write(Call::WriteDb {
            db,
            start,
            data: data.to_vec(),
        })
        .await
    }

    async fn read_area(
        &mut self,
        area: S7MemoryArea,
        start: u16,
        len: u16,
    ) -> TransportResult<Vec<u8>> {
        self.read(Call::ReadArea { area, start, len }).await
    }

    async fn write_area(
        &mut self,
        area: S7MemoryArea,
        start: u16,
        data: &[u8],
    ) -> TransportResult<()> {
        self.write(Call::WriteArea {
            area,
            start,
            data: data.to_vec(),
        })
        .await
    }

    async fn close(&mut self) -> TransportResult<()> {
        self.plc.record(Call::Close).await;
        Ok(())
    }
}

#[async_trait]
impl ModbusConnector for RecordingPlc {
    type Transport = RecordingConnection;

    async fn connect(
        &self,
        endpoint: &ModbusEndpoint,
        _timeout: Duration,
    ) -> TransportResult<RecordingConnection> {
        self.connect_as(endpoint.to_string()).await
    }
}

#[async_trait]
impl S7Connector for RecordingPlc {
    type Transport = RecordingConnection;

    async fn connect(
        &self,
        endpoint: &S7Endpoint,
        _timeout: Duration,
    ) -> TransportResult<RecordingConnection> {
        self.connect_as(endpoint.to_string()).await
    }
}
