//! In-process BLE transport and central for development and tests.
//!
//! [`SimulatedTransport`] records everything the bridge asks of the stack
//! (registration, advertising, notifications) and can be told to fail.
//! [`SimulatedCentral`] plays a peer: it pushes connect, disconnect, CCC
//! write and read events into the bridge's event queue.

use crate::error::{AttError, TransportError};
use crate::gatt::ConnHandle;
use crate::gatt::attribute_table::AttributeEntry;
use crate::gatt::connection::STATUS_SUCCESS;
use crate::gatt::subscriptions::{CCC_DISABLED, CCC_NOTIFY};
use crate::gatt::transport::{EventSender, ServiceHandle, Transport, TransportEvent};
use async_trait::async_trait;
use log::info;
use parking_lot::Mutex;
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::oneshot;

/// A notification handed to the simulated stack.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SentNotification {
    pub handle: ConnHandle,
    pub attribute: u16,
    pub payload: Vec<u8>,
}

#[derive(Debug, Default)]
struct TransportState {
    enabled: bool,
    layout: Option<Vec<AttributeEntry>>,
    advertising: Option<Vec<u8>>,
    advertise_calls: u32,
    notifications: Vec<SentNotification>,
    fail_enable: bool,
    fail_advertising: bool,
    already_advertising: bool,
    failing_connections: HashSet<ConnHandle>,
}

/// Recording transport. Clones share state.
#[derive(Debug, Clone, Default)]
pub struct SimulatedTransport {
    state: Arc<Mutex<TransportState>>,
}

impl SimulatedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `enable` fail.
    pub fn fail_enable(&self, fail: bool) {
        self.state.lock().fail_enable = fail;
    }

    /// Make `start_advertising` fail.
    pub fn fail_advertising(&self, fail: bool) {
        self.state.lock().fail_advertising = fail;
    }

    /// Answer `start_advertising` with "already advertising".
    pub fn report_already_advertising(&self, already: bool) {
        self.state.lock().already_advertising = already;
    }

    /// Make notifications to `handle` fail.
    pub fn fail_notifications_to(&self, handle: ConnHandle) {
        self.state.lock().failing_connections.insert(handle);
    }

    pub fn is_enabled(&self) -> bool {
        self.state.lock().enabled
    }

    pub fn registered_layout(&self) -> Option<Vec<AttributeEntry>> {
        self.state.lock().layout.clone()
    }

    pub fn advertising_payload(&self) -> Option<Vec<u8>> {
        self.state.lock().advertising.clone()
    }

    pub fn advertise_calls(&self) -> u32 {
        self.state.lock().advertise_calls
    }

    /// Notifications sent so far, oldest first.
    pub fn notifications(&self) -> Vec<SentNotification> {
        self.state.lock().notifications.clone()
    }

    /// Drain the recorded notifications.
    pub fn take_notifications(&self) -> Vec<SentNotification> {
        std::mem::take(&mut self.state.lock().notifications)
    }
}

#[async_trait]
impl Transport for SimulatedTransport {
    async fn enable(&mut self) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.fail_enable {
            return Err(TransportError::InitFailed("controller not responding".into()));
        }
        state.enabled = true;
        info!("[Sim] Bluetooth initialized");
        Ok(())
    }

    async fn register_service(
        &mut self,
        layout: &[AttributeEntry],
    ) -> Result<ServiceHandle, TransportError> {
        let mut state = self.state.lock();
        if !state.enabled {
            return Err(TransportError::RegisterFailed("transport not enabled".into()));
        }
        let first = layout.first().map(|e| e.handle).unwrap_or_default();
        state.layout = Some(layout.to_vec());
        info!("[Sim] Registered service with {} attributes", layout.len());
        Ok(ServiceHandle(first))
    }

    async fn start_advertising(&mut self, payload: &[u8]) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        state.advertise_calls += 1;
        if state.fail_advertising {
            return Err(TransportError::AdvertiseFailed("advertising set busy".into()));
        }
        if state.already_advertising || state.advertising.is_some() {
            return Err(TransportError::AlreadyAdvertising);
        }
        state.advertising = Some(payload.to_vec());
        Ok(())
    }

    async fn notify(
        &self,
        handle: ConnHandle,
        value_handle: u16,
        payload: &[u8],
    ) -> Result<(), TransportError> {
        let mut state = self.state.lock();
        if state.failing_connections.contains(&handle) {
            return Err(TransportError::NotifyFailed {
                handle,
                reason: "tx buffer exhausted".into(),
            });
        }
        info!(
            "[Sim] notify conn={} attr=0x{:04X} value={:02x?}",
            handle, value_handle, payload
        );
        state.notifications.push(SentNotification {
            handle,
            attribute: value_handle,
            payload: payload.to_vec(),
        });
        Ok(())
    }
}

/// A simulated peer talking to the bridge through its event queue.
#[derive(Debug, Clone)]
pub struct SimulatedCentral {
    handle: ConnHandle,
    events: EventSender,
}

impl SimulatedCentral {
    pub fn new(handle: ConnHandle, events: EventSender) -> Self {
        Self { handle, events }
    }

    async fn send(&self, event: TransportEvent) -> bool {
        self.events.send(event).await.is_ok()
    }

    pub async fn connect(&self) -> bool {
        self.connect_with_status(STATUS_SUCCESS).await
    }

    pub async fn connect_with_status(&self, status: u8) -> bool {
        self.send(TransportEvent::Connected {
            handle: self.handle,
            status,
        })
        .await
    }

    pub async fn disconnect(&self, reason: u8) -> bool {
        self.send(TransportEvent::Disconnected {
            handle: self.handle,
            reason,
        })
        .await
    }

    /// Write a raw value to a client configuration descriptor.
    pub async fn write_ccc(&self, attribute: u16, value: u16) -> bool {
        self.send(TransportEvent::CccWritten {
            handle: self.handle,
            attribute,
            value,
        })
        .await
    }

    pub async fn subscribe(&self, ccc_handle: u16) -> bool {
        self.write_ccc(ccc_handle, CCC_NOTIFY).await
    }

    pub async fn unsubscribe(&self, ccc_handle: u16) -> bool {
        self.write_ccc(ccc_handle, CCC_DISABLED).await
    }

    /// Read an attribute and wait for the bridge's answer.
    pub async fn read(&self, attribute: u16, offset: usize) -> Option<Result<Vec<u8>, AttError>> {
        let (reply, response) = oneshot::channel();
        let sent = self
            .send(TransportEvent::Read {
                handle: self.handle,
                attribute,
                offset,
                reply,
            })
            .await;
        if !sent {
            return None;
        }
        response.await.ok()
    }
}
