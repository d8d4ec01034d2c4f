//! Per-connection notification subscriptions.
//!
//! Every (connection, quantity) pair is in one of two states. A peer moves
//! a pair to `Subscribed` only by writing `0x0001` to the quantity's client
//! configuration descriptor; any other written value moves it back to
//! `Unsubscribed`. Dropping the connection record is the only other way
//! state goes away. Pairs without a connection record read as
//! `Unsubscribed`.

use super::ConnHandle;
use super::attribute_table::QuantityId;
use log::{debug, warn};
use std::collections::HashMap;
use strum::EnumCount;

/// CCC value that enables notifications.
pub const CCC_NOTIFY: u16 = 0x0001;

/// CCC value reported for a disabled pair.
pub const CCC_DISABLED: u16 = 0x0000;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SubscriptionState {
    #[default]
    Unsubscribed,
    Subscribed,
}

impl SubscriptionState {
    /// Interpret a written client configuration value.
    pub fn from_ccc(value: u16) -> Self {
        if value == CCC_NOTIFY {
            SubscriptionState::Subscribed
        } else {
            SubscriptionState::Unsubscribed
        }
    }

    /// Value read back from the client configuration descriptor.
    pub fn ccc_value(self) -> u16 {
        match self {
            SubscriptionState::Subscribed => CCC_NOTIFY,
            SubscriptionState::Unsubscribed => CCC_DISABLED,
        }
    }
}

/// One live peer link and its subscription flags.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Connection {
    pub handle: ConnHandle,
    subscriptions: [SubscriptionState; QuantityId::COUNT],
}

impl Connection {
    pub fn new(handle: ConnHandle) -> Self {
        Self {
            handle,
            subscriptions: [SubscriptionState::Unsubscribed; QuantityId::COUNT],
        }
    }

    pub fn state(&self, quantity: QuantityId) -> SubscriptionState {
        self.subscriptions[quantity.index()]
    }

    pub fn subscribed_count(&self) -> usize {
        self.subscriptions
            .iter()
            .filter(|s| **s == SubscriptionState::Subscribed)
            .count()
    }
}

/// Subscription state for all live connections.
#[derive(Debug, Default)]
pub struct SubscriptionRegistry {
    connections: HashMap<ConnHandle, Connection>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a fresh record for `handle` with nothing subscribed.
    ///
    /// A record left behind under the same handle is replaced.
    pub fn open(&mut self, handle: ConnHandle) {
        if self
            .connections
            .insert(handle, Connection::new(handle))
            .is_some()
        {
            warn!(
                "[GATT] Connection {} reopened without disconnect, state reset",
                handle
            );
        }
    }

    /// Drop the record for `handle` and all of its subscriptions.
    pub fn close(&mut self, handle: ConnHandle) -> Option<Connection> {
        self.connections.remove(&handle)
    }

    /// Apply a client configuration write.
    ///
    /// Returns the resulting state, or `None` when `handle` has no record
    /// (the write is ignored).
    pub fn write_ccc(
        &mut self,
        handle: ConnHandle,
        quantity: QuantityId,
        value: u16,
    ) -> Option<SubscriptionState> {
        let Some(connection) = self.connections.get_mut(&handle) else {
            warn!(
                "[GATT] CCC write for unknown connection {} ignored",
                handle
            );
            return None;
        };

        let state = SubscriptionState::from_ccc(value);
        if value != CCC_NOTIFY && value != CCC_DISABLED {
            debug!(
                "[GATT] Unsupported CCC value 0x{:04X} on {} from {}, treating as disable",
                value, quantity, handle
            );
        }
        connection.subscriptions[quantity.index()] = state;
        Some(state)
    }

    pub fn state(&self, handle: ConnHandle, quantity: QuantityId) -> SubscriptionState {
        self.connections
            .get(&handle)
            .map(|c| c.state(quantity))
            .unwrap_or_default()
    }

    /// Connections subscribed to `quantity`, ordered by handle.
    pub fn subscribers(&self, quantity: QuantityId) -> Vec<ConnHandle> {
        let mut handles: Vec<ConnHandle> = self
            .connections
            .values()
            .filter(|c| c.state(quantity) == SubscriptionState::Subscribed)
            .map(|c| c.handle)
            .collect();
        handles.sort_unstable();
        handles
    }

    pub fn has_subscribers(&self, quantity: QuantityId) -> bool {
        self.connections
            .values()
            .any(|c| c.state(quantity) == SubscriptionState::Subscribed)
    }

    pub fn is_connected(&self, handle: ConnHandle) -> bool {
        self.connections.contains_key(&handle)
    }

    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_connection_is_unsubscribed() {
        let mut registry = SubscriptionRegistry::new();
        registry.open(1);
        assert_eq!(
            registry.state(1, QuantityId::Temperature),
            SubscriptionState::Unsubscribed
        );
        assert_eq!(
            registry.state(1, QuantityId::Humidity),
            SubscriptionState::Unsubscribed
        );
        assert!(!registry.has_subscribers(QuantityId::Temperature));
    }

    #[test]
    fn test_enable_then_query_is_subscribed() {
        let mut registry = SubscriptionRegistry::new();
        registry.open(1);
        assert_eq!(
            registry.write_ccc(1, QuantityId::Temperature, CCC_NOTIFY),
            Some(SubscriptionState::Subscribed)
        );
        assert_eq!(
            registry.state(1, QuantityId::Temperature),
            SubscriptionState::Subscribed
        );
        assert_eq!(
            registry.state(1, QuantityId::Humidity),
            SubscriptionState::Unsubscribed
        );
        assert_eq!(registry.subscribers(QuantityId::Temperature), vec![1]);
    }

    #[test]
    fn test_any_other_value_unsubscribes() {
        let mut registry = SubscriptionRegistry::new();
        registry.open(7);
        for value in [0x0000, 0x0002, 0x0003, 0x0100, 0xFFFF] {
            registry.write_ccc(7, QuantityId::Humidity, CCC_NOTIFY);
            assert_eq!(
                registry.write_ccc(7, QuantityId::Humidity, value),
                Some(SubscriptionState::Unsubscribed)
            );
            assert_eq!(
                registry.state(7, QuantityId::Humidity),
                SubscriptionState::Unsubscribed
            );
        }
    }

    #[test]
    fn test_close_clears_and_reopen_starts_fresh() {
        let mut registry = SubscriptionRegistry::new();
        registry.open(3);
        registry.write_ccc(3, QuantityId::Temperature, CCC_NOTIFY);
        registry.write_ccc(3, QuantityId::Humidity, CCC_NOTIFY);

        let closed = registry.close(3).unwrap();
        assert_eq!(closed.subscribed_count(), 2);
        assert!(!registry.has_subscribers(QuantityId::Temperature));
        assert_eq!(
            registry.state(3, QuantityId::Temperature),
            SubscriptionState::Unsubscribed
        );

        registry.open(3);
        assert_eq!(
            registry.state(3, QuantityId::Temperature),
            SubscriptionState::Unsubscribed
        );
        assert_eq!(
            registry.state(3, QuantityId::Humidity),
            SubscriptionState::Unsubscribed
        );
    }

    #[test]
    fn test_write_for_unknown_connection_is_ignored() {
        let mut registry = SubscriptionRegistry::new();
        assert_eq!(registry.write_ccc(9, QuantityId::Temperature, CCC_NOTIFY), None);
        assert_eq!(registry.connection_count(), 0);
        assert_eq!(
            registry.state(9, QuantityId::Temperature),
            SubscriptionState::Unsubscribed
        );
    }

    #[test]
    fn test_subscribers_are_per_quantity_and_sorted() {
        let mut registry = SubscriptionRegistry::new();
        for handle in [5, 2, 9] {
            registry.open(handle);
        }
        registry.write_ccc(9, QuantityId::Temperature, CCC_NOTIFY);
        registry.write_ccc(2, QuantityId::Temperature, CCC_NOTIFY);
        registry.write_ccc(5, QuantityId::Humidity, CCC_NOTIFY);

        assert_eq!(registry.subscribers(QuantityId::Temperature), vec![2, 9]);
        assert_eq!(registry.subscribers(QuantityId::Humidity), vec![5]);
    }

    #[test]
    fn test_ccc_value_round_trip() {
        assert_eq!(SubscriptionState::from_ccc(CCC_NOTIFY).ccc_value(), CCC_NOTIFY);
        assert_eq!(SubscriptionState::from_ccc(0x0002).ccc_value(), CCC_DISABLED);
    }
}
