//! The sensor peripheral: owns the bridge state and drives it.
//!
//! Bring-up follows the order the hardware needs:
//! 1. prime the attribute table with a first sample (failure is tolerated),
//! 2. enable the transport, register the service and start advertising
//!    (any failure here aborts before the sampling loop),
//! 3. run the loop.
//!
//! The loop consumes the periodic tick and transport events from one task,
//! so event handlers and sampling passes never overlap.

use crate::error::{AttError, Result};
use crate::gatt::attribute_table::AttributeKind;
use crate::gatt::transport::{EventReceiver, ServiceHandle, Transport, TransportEvent};
use crate::gatt::{
    Advertiser, AttributeTable, ConnHandle, ConnectionManager, QuantityId, SubscriptionRegistry,
    SubscriptionState,
};
use crate::scheduler::{CycleReport, NotificationScheduler};
use crate::sensors::{SensorDriver, SensorSampler};
use log::{debug, error, info, warn};
use std::future::Future;
use tokio::time::{MissedTickBehavior, interval};

/// Sensor-to-GATT bridge with all of its state.
pub struct SensorPeripheral<D, T> {
    sampler: SensorSampler<D>,
    table: AttributeTable,
    registry: SubscriptionRegistry,
    connections: ConnectionManager,
    advertiser: Advertiser,
    scheduler: NotificationScheduler,
    transport: T,
    service: Option<ServiceHandle>,
}

impl<D: SensorDriver, T: Transport> SensorPeripheral<D, T> {
    pub fn new(
        sampler: SensorSampler<D>,
        transport: T,
        advertiser: Advertiser,
        scheduler: NotificationScheduler,
    ) -> Self {
        Self {
            sampler,
            table: AttributeTable::new(),
            registry: SubscriptionRegistry::new(),
            connections: ConnectionManager::new(),
            advertiser,
            scheduler,
            transport,
            service: None,
        }
    }

    /// Prime the table, then bring the transport up and start advertising.
    ///
    /// Transport errors are fatal and returned to the caller.
    pub async fn bring_up(&mut self) -> Result<()> {
        match self.sampler.sample() {
            Ok((temperature, humidity)) => {
                self.table.update(QuantityId::Temperature, temperature);
                self.table.update(QuantityId::Humidity, humidity);
            }
            Err(e) => warn!("[Sensor] Initial sample failed: {}", e),
        }

        self.transport.enable().await.inspect_err(|e| {
            error!("[GATT] Bluetooth init failed: {}", e);
        })?;

        let service = self
            .transport
            .register_service(self.table.layout())
            .await
            .inspect_err(|e| error!("[GATT] Service registration failed: {}", e))?;
        info!("[GATT] Environmental sensing service at handle 0x{:04X}", service.0);
        self.service = Some(service);

        self.advertiser
            .start(&mut self.transport)
            .await
            .inspect_err(|e| error!("[Adv] Advertising failed to start: {}", e))?;
        Ok(())
    }

    /// Dispatch one transport callback.
    pub fn handle_event(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Connected { handle, status } => {
                self.connections
                    .on_connect(&mut self.registry, handle, status);
            }
            TransportEvent::Disconnected { handle, reason } => {
                self.connections
                    .on_disconnect(&mut self.registry, handle, reason);
            }
            TransportEvent::CccWritten {
                handle,
                attribute,
                value,
            } => self.on_ccc_written(handle, attribute, value),
            TransportEvent::Read {
                handle,
                attribute,
                offset,
                reply,
            } => {
                let result = self.on_read(handle, attribute, offset);
                if let Err(e) = &result {
                    debug!("[GATT] Read of 0x{:04X} by {} rejected: {}", attribute, handle, e);
                }
                if reply.send(result).is_err() {
                    debug!("[GATT] Read reply for {} dropped, peer gone", handle);
                }
            }
        }
    }

    fn on_ccc_written(&mut self, handle: ConnHandle, attribute: u16, value: u16) {
        let Some(entry) = self.table.entry(attribute) else {
            warn!("[GATT] Write to unknown attribute 0x{:04X} from {}", attribute, handle);
            return;
        };
        let AttributeKind::ClientConfiguration(quantity) = entry.kind else {
            warn!(
                "[GATT] Write to non-writable attribute 0x{:04X} from {}",
                attribute, handle
            );
            return;
        };

        if let Some(state) = self.registry.write_ccc(handle, quantity, value) {
            info!(
                "[GATT] {} notifications {} for {}",
                quantity,
                match state {
                    SubscriptionState::Subscribed => "enabled",
                    SubscriptionState::Unsubscribed => "disabled",
                },
                handle
            );
        }
    }

    /// Serve a peer read starting at `offset`.
    pub fn on_read(
        &self,
        handle: ConnHandle,
        attribute: u16,
        offset: usize,
    ) -> std::result::Result<Vec<u8>, AttError> {
        let value = self
            .table
            .attribute_value(attribute, |quantity| {
                self.registry.state(handle, quantity).ccc_value()
            })
            .ok_or(AttError::InvalidHandle(attribute))?;

        if offset > value.len() {
            return Err(AttError::InvalidOffset {
                offset,
                len: value.len(),
            });
        }
        Ok(value[offset..].to_vec())
    }

    /// Run one sample-and-notify pass.
    pub async fn run_cycle(&mut self) -> CycleReport {
        self.scheduler
            .run_cycle(
                &mut self.sampler,
                &mut self.table,
                &self.registry,
                &self.transport,
            )
            .await
    }

    /// Run the peripheral until `shutdown` resolves or the event queue closes.
    pub async fn run(&mut self, mut events: EventReceiver, shutdown: impl Future<Output = ()>) {
        let mut ticker = interval(self.scheduler.period());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; the table was primed in bring_up
        ticker.tick().await;

        tokio::pin!(shutdown);
        info!(
            "[Sched] Sampling every {} ms",
            self.scheduler.period().as_millis()
        );

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("[Sched] Shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    self.run_cycle().await;
                }
                event = events.recv() => match event {
                    Some(event) => self.handle_event(event),
                    None => {
                        warn!("[GATT] Transport event queue closed");
                        break;
                    }
                },
            }
        }
    }

    pub fn table(&self) -> &AttributeTable {
        &self.table
    }

    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    pub fn advertiser(&self) -> &Advertiser {
        &self.advertiser
    }

    pub fn scheduler(&self) -> &NotificationScheduler {
        &self.scheduler
    }

    pub fn service(&self) -> Option<ServiceHandle> {
        self.service
    }
}
