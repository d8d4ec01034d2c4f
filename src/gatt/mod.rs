//! GATT side of the bridge.
//!
//! The attribute table describes what peers can read and subscribe to, the
//! subscription registry tracks per-connection notification state, and the
//! transport trait is the narrow contract to the BLE stack underneath.

pub mod advertiser;
pub mod attribute_table;
pub mod connection;
pub mod subscriptions;
pub mod transport;

pub use advertiser::{AdvertisingData, Advertiser};
pub use attribute_table::{AttributeEntry, AttributeKind, AttributeTable, Permissions, QuantityId};
pub use connection::ConnectionManager;
pub use subscriptions::{SubscriptionRegistry, SubscriptionState};
pub use transport::{ServiceHandle, Transport, TransportEvent};

/// Opaque connection identifier handed out by the transport.
pub type ConnHandle = u16;

/// Bluetooth SIG assigned 16-bit UUIDs used by the service.
pub mod uuids {
    /// Primary service declaration
    pub const PRIMARY_SERVICE: u16 = 0x2800;
    /// Characteristic declaration
    pub const CHARACTERISTIC: u16 = 0x2803;
    /// Client Characteristic Configuration descriptor
    pub const CLIENT_CHARACTERISTIC_CONFIGURATION: u16 = 0x2902;
    /// Environmental Sensing service
    pub const ENVIRONMENTAL_SENSING: u16 = 0x181A;
    pub const TEMPERATURE: u16 = 0x2A6E;
    pub const HUMIDITY: u16 = 0x2A6F;
}
