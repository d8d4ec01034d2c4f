//! Contract with the BLE transport underneath the bridge.
//!
//! Outbound calls go through the [`Transport`] trait. Inbound callbacks
//! (connect, disconnect, descriptor writes, reads) arrive as
//! [`TransportEvent`]s on a single queue, so they are handled one at a time
//! and never interleave with a sampling pass.

use super::ConnHandle;
use super::attribute_table::AttributeEntry;
use crate::error::{AttError, TransportError};
use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

/// Handle of a registered service, as returned by the transport.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServiceHandle(pub u16);

/// Outbound primitives provided by a BLE stack.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Bring the controller up. Resolves once the stack reports ready.
    async fn enable(&mut self) -> Result<(), TransportError>;

    /// Register the attribute table with the stack.
    async fn register_service(
        &mut self,
        layout: &[AttributeEntry],
    ) -> Result<ServiceHandle, TransportError>;

    /// Start connectable advertising with the given AD payload.
    ///
    /// May return [`TransportError::AlreadyAdvertising`].
    async fn start_advertising(&mut self, payload: &[u8]) -> Result<(), TransportError>;

    /// Send a notification for `value_handle` to one connection.
    ///
    /// Fire-and-forget: there is no delivery confirmation.
    async fn notify(
        &self,
        handle: ConnHandle,
        value_handle: u16,
        payload: &[u8],
    ) -> Result<(), TransportError>;
}

/// Reply channel for a peer read.
pub type ReadReply = oneshot::Sender<Result<Vec<u8>, AttError>>;

/// Callbacks from the transport, in arrival order.
#[derive(Debug)]
pub enum TransportEvent {
    /// A connection attempt finished. Non-zero `status` means it failed.
    Connected { handle: ConnHandle, status: u8 },
    /// A connection went away. `reason` is an HCI error code.
    Disconnected { handle: ConnHandle, reason: u8 },
    /// A peer wrote a client configuration descriptor.
    CccWritten {
        handle: ConnHandle,
        attribute: u16,
        value: u16,
    },
    /// A peer read an attribute starting at `offset`.
    Read {
        handle: ConnHandle,
        attribute: u16,
        offset: usize,
        reply: ReadReply,
    },
}

/// Sending side of the event queue, held by the transport glue.
pub type EventSender = mpsc::Sender<TransportEvent>;

/// Receiving side of the event queue, consumed by the peripheral loop.
pub type EventReceiver = mpsc::Receiver<TransportEvent>;

/// Create the single-consumer event queue.
pub fn event_channel(capacity: usize) -> (EventSender, EventReceiver) {
    mpsc::channel(capacity)
}
