//! Connection lifecycle handling.
//!
//! Reacts to connect/disconnect events from the transport and keeps the
//! subscription registry in step: a connection gets a fresh record when it
//! comes up and loses all of its state when it goes away. There is no idle
//! timeout.

use super::ConnHandle;
use super::subscriptions::SubscriptionRegistry;
use log::{info, warn};

/// HCI status for a successfully established connection.
pub const STATUS_SUCCESS: u8 = 0x00;

/// Human readable name of an HCI disconnect reason, for logs only.
pub fn describe_reason(reason: u8) -> &'static str {
    match reason {
        0x08 => "connection timeout",
        0x13 => "remote user terminated",
        0x14 => "remote low resources",
        0x15 => "remote power off",
        0x16 => "local host terminated",
        0x22 => "LL response timeout",
        0x3B => "unacceptable connection parameters",
        0x3D => "MIC failure",
        0x3E => "failed to establish",
        _ => "unknown",
    }
}

/// Tracks connection events and drives record creation/teardown.
#[derive(Debug, Default)]
pub struct ConnectionManager {
    connects: u64,
    failed_connects: u64,
    disconnects: u64,
    last_disconnect_reason: Option<u8>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle a connection attempt reported by the transport.
    ///
    /// A non-zero `status` is a failed attempt and creates no record.
    /// Returns whether the connection is now live.
    pub fn on_connect(
        &mut self,
        registry: &mut SubscriptionRegistry,
        handle: ConnHandle,
        status: u8,
    ) -> bool {
        if status != STATUS_SUCCESS {
            self.failed_connects += 1;
            warn!(
                "[GATT] Connection failed (err 0x{:02X}) for handle {}",
                status, handle
            );
            return false;
        }

        registry.open(handle);
        self.connects += 1;
        info!(
            "[GATT] Connected: handle {} ({} active)",
            handle,
            registry.connection_count()
        );
        true
    }

    /// Handle a disconnect. The reason is only logged.
    pub fn on_disconnect(
        &mut self,
        registry: &mut SubscriptionRegistry,
        handle: ConnHandle,
        reason: u8,
    ) {
        self.last_disconnect_reason = Some(reason);
        match registry.close(handle) {
            Some(connection) => {
                self.disconnects += 1;
                info!(
                    "[GATT] Disconnected: handle {} (reason 0x{:02X}, {}), dropped {} subscription(s)",
                    handle,
                    reason,
                    describe_reason(reason),
                    connection.subscribed_count()
                );
            }
            None => {
                warn!(
                    "[GATT] Disconnect for unknown handle {} (reason 0x{:02X})",
                    handle, reason
                );
            }
        }
    }

    pub fn connects(&self) -> u64 {
        self.connects
    }

    pub fn failed_connects(&self) -> u64 {
        self.failed_connects
    }

    pub fn disconnects(&self) -> u64 {
        self.disconnects
    }

    pub fn last_disconnect_reason(&self) -> Option<u8> {
        self.last_disconnect_reason
    }
}
