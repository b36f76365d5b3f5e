//! One-shot register sessions
//!
//! Each call validates the request, opens a connection with the configured
//! connect timeout, runs a single dispatcher operation and closes the
//! connection again on every path. Dropping the returned future drops the
//! connection, which the transport contract requires to release it.

use tracing::{debug, warn};

use plcreg_common::GatewayConfig;
use plcreg_comlink::{
    ModbusConnector, ModbusEndpoint, ModbusTransport, RegisterValue, Result, S7Connector,
    S7Endpoint, S7Transport,
};

use crate::codec::{format_value, parse_value};
use crate::dispatch::{precheck, timed};
use crate::envelope::{ModbusRequest, ResultEnvelope, S7Request};
use crate::modbus::ModbusDispatcher;
use crate::s7::S7Dispatcher;

/// Request entry point owning the transport connectors
pub struct Gateway<MC, SC> {
    modbus: MC,
    s7: SC,
    config: GatewayConfig,
}

impl<MC, SC> Gateway<MC, SC>
where
    MC: ModbusConnector,
    SC: S7Connector,
{
    pub fn new(modbus: MC, s7: SC, config: GatewayConfig) -> Self {
        Self { modbus, s7, config }
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    // ========================================================================
    // Modbus
    // ========================================================================

    /// Read one Modbus value
    pub async fn modbus_read(&self, request: &ModbusRequest) -> Result<RegisterValue> {
        let plan = request.plan()?;
        ModbusDispatcher::<MC::Transport>::validate_read(&plan.address, &plan.spec)?;
        precheck(&plan.spec, plan.order, plan.bit)?;

        let mut dispatcher = self.open_modbus(request).await?;
        let result = dispatcher
            .execute_read(&plan.address, &plan.spec, plan.order, plan.bit)
            .await;
        self.close_modbus(dispatcher.into_inner()).await;
        result
    }

    /// Write one Modbus value, returning the value written
    pub async fn modbus_write(&self, request: &ModbusRequest) -> Result<RegisterValue> {
        let plan = request.plan()?;
        let value = parse_value(plan.spec.kind, request.write_value()?)?;
        ModbusDispatcher::<MC::Transport>::validate_write(&plan.address, &plan.spec, &value)?;
        precheck(&plan.spec, plan.order, plan.bit)?;

        let mut dispatcher = self.open_modbus(request).await?;
        let result = dispatcher
            .execute_write(&plan.address, &plan.spec, plan.order, value, plan.bit)
            .await;
        self.close_modbus(dispatcher.into_inner()).await;
        result.map(|()| value)
    }

    async fn open_modbus(
        &self,
        request: &ModbusRequest,
    ) -> Result<ModbusDispatcher<MC::Transport>> {
        let settings = &self.config.modbus;
        let endpoint = ModbusEndpoint::new(
            request.host.clone(),
            request.port.unwrap_or(settings.default_port),
        );
        debug!("Connecting to Modbus {}", endpoint);

        let transport = timed(
            settings.connect_timeout(),
            "connect",
            self.modbus.connect(&endpoint, settings.connect_timeout()),
        )
        .await?;
        Ok(ModbusDispatcher::new(transport, settings.request_timeout()))
    }

    async fn close_modbus(&self, mut transport: MC::Transport) {
        let limit = self.config.modbus.request_timeout();
        if let Err(e) = timed(limit, "close", transport.close()).await {
            warn!("Failed to close Modbus connection: {}", e);
        }
    }

    // ========================================================================
    // S7
    // ========================================================================

    /// Read one S7 value
    pub async fn s7_read(&self, request: &S7Request) -> Result<RegisterValue> {
        let plan = request.plan(self.config.s7.db_number)?;
        S7Dispatcher::<SC::Transport>::validate_read(&plan.address, &plan.spec)?;

        let mut dispatcher = self.open_s7(request).await?;
        let result = dispatcher
            .execute_read(&plan.address, &plan.spec, plan.order, plan.bit)
            .await;
        self.close_s7(dispatcher.into_inner()).await;
        result
    }

    /// Write one S7 value, returning the value written
    pub async fn s7_write(&self, request: &S7Request) -> Result<RegisterValue> {
        let plan = request.plan(self.config.s7.db_number)?;
        let value = parse_value(plan.spec.kind, request.write_value()?)?;
        S7Dispatcher::<SC::Transport>::validate_write(&plan.address, &plan.spec, &value)?;

        let mut dispatcher = self.open_s7(request).await?;
        let result = dispatcher
            .execute_write(&plan.address, &plan.spec, plan.order, value, plan.bit)
            .await;
        self.close_s7(dispatcher.into_inner()).await;
        result.map(|()| value)
    }

    async fn open_s7(&self, request: &S7Request) -> Result<S7Dispatcher<SC::Transport>> {
        let settings = &self.config.s7;
        let endpoint = S7Endpoint {
            host: request.host.clone(),
            rack: settings.rack,
            slot: settings.slot,
            pdu_length: settings.pdu_length,
        };
        debug!("Connecting to S7 {}", endpoint);

        let transport = timed(
            settings.connect_timeout(),
            "connect",
            self.s7.connect(&endpoint, settings.connect_timeout()),
        )
        .await?;
        Ok(S7Dispatcher::new(transport, settings.request_timeout()))
    }

    async fn close_s7(&self, mut transport: SC::Transport) {
        let limit = self.config.s7.request_timeout();
        if let Err(e) = timed(limit, "close", transport.close()).await {
            warn!("Failed to close S7 connection: {}", e);
        }
    }

    // ========================================================================
    // JSON entry points
    // ========================================================================

    pub async fn handle_modbus_read_json(&self, body: &str) -> ResultEnvelope {
        let outcome = match ModbusRequest::from_json(body) {
            Ok(request) => self.modbus_read(&request).await,
            Err(e) => Err(e),
        };
        respond("Modbus read", outcome, None)
    }

    pub async fn handle_modbus_write_json(&self, body: &str) -> ResultEnvelope {
        match ModbusRequest::from_json(body) {
            Ok(request) => {
                let outcome = self.modbus_write(&request).await;
                respond("Modbus write", outcome, request.value.clone())
            },
            Err(e) => respond("Modbus write", Err(e), None),
        }
    }

    pub async fn handle_s7_read_json(&self, body: &str) -> ResultEnvelope {
        let outcome = match S7Request::from_json(body) {
            Ok(request) => self.s7_read(&request).await,
            Err(e) => Err(e),
        };
        respond("S7 read", outcome, None)
    }

    pub async fn handle_s7_write_json(&self, body: &str) -> ResultEnvelope {
        match S7Request::from_json(body) {
            Ok(request) => {
                let outcome = self.s7_write(&request).await;
                respond("S7 write", outcome, request.value.clone())
            },
            Err(e) => respond("S7 write", Err(e), None),
        }
    }
}

fn respond(
    operation: &str,
    outcome: Result<RegisterValue>,
    partial: Option<String>,
) -> ResultEnvelope {
    match outcome {
        Ok(value) => ResultEnvelope::success(format_value(&value)),
        Err(e) => {
            warn!("{} failed ({}): {}", operation, e.class(), e);
            ResultEnvelope::failure(&e, partial)
        },
    }
}
