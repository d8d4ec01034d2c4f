//! Attribute table of the Environmental Sensing service.
//!
//! The table is built once at startup and its layout never changes. Each
//! exposed quantity gets three attributes after the service declaration:
//!
//! ```text
//! handle  attribute                         permissions
//! 0x0001  primary service (0x181A)          Read
//! 0x0002  characteristic decl (Temperature) Read
//! 0x0003  Temperature value (0x2A6E)        Read | Notify
//! 0x0004  CCC descriptor (0x2902)           Read | Write
//! 0x0005  characteristic decl (Humidity)    Read
//! 0x0006  Humidity value (0x2A6F)           Read | Notify
//! 0x0007  CCC descriptor (0x2902)           Read | Write
//! ```
//!
//! Values are stored both as a [`Measurement`] and in their serialized
//! form, so pull reads and notifications always carry identical bytes.

use super::uuids;
use crate::sensors::Measurement;
use crate::sensors::measurement::ENCODED_LEN;
use log::debug;
use std::ops::BitOr;
use strum::{Display, EnumCount, EnumIter, FromRepr, IntoEnumIterator};

/// First handle assigned to the service.
pub const FIRST_HANDLE: u16 = 0x0001;

/// Characteristic property bits used in declarations.
pub mod properties {
    pub const READ: u8 = 0x02;
    pub const WRITE: u8 = 0x08;
    pub const NOTIFY: u8 = 0x10;
}

/// Exposed physical quantities, in attribute table order.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Display, EnumCount, EnumIter, FromRepr)]
#[repr(u8)]
pub enum QuantityId {
    #[strum(serialize = "temperature")]
    Temperature = 0,
    #[strum(serialize = "humidity")]
    Humidity = 1,
}

impl QuantityId {
    /// SIG characteristic UUID of this quantity.
    pub fn uuid(self) -> u16 {
        match self {
            QuantityId::Temperature => uuids::TEMPERATURE,
            QuantityId::Humidity => uuids::HUMIDITY,
        }
    }

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Access permissions of an attribute.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Permissions(u8);

impl Permissions {
    pub const READ: Permissions = Permissions(0x01);
    pub const WRITE: Permissions = Permissions(0x02);
    pub const NOTIFY: Permissions = Permissions(0x04);

    pub const fn union(self, other: Permissions) -> Permissions {
        Permissions(self.0 | other.0)
    }

    pub const fn contains(self, other: Permissions) -> bool {
        self.0 & other.0 == other.0
    }

    /// Property byte advertised in a characteristic declaration.
    pub fn properties(self) -> u8 {
        let mut props = 0;
        if self.contains(Permissions::READ) {
            props |= properties::READ;
        }
        if self.contains(Permissions::WRITE) {
            props |= properties::WRITE;
        }
        if self.contains(Permissions::NOTIFY) {
            props |= properties::NOTIFY;
        }
        props
    }
}

impl BitOr for Permissions {
    type Output = Permissions;

    fn bitor(self, rhs: Permissions) -> Permissions {
        self.union(rhs)
    }
}

/// What an attribute handle refers to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttributeKind {
    PrimaryService,
    CharacteristicDeclaration(QuantityId),
    Value(QuantityId),
    ClientConfiguration(QuantityId),
}

/// One row of the registered attribute table.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AttributeEntry {
    pub handle: u16,
    /// 16-bit attribute type UUID
    pub uuid: u16,
    pub kind: AttributeKind,
    pub permissions: Permissions,
}

/// One exposed quantity and its current value.
#[derive(Clone, Debug)]
pub struct Quantity {
    pub id: QuantityId,
    pub permissions: Permissions,
    current_value: Measurement,
    last_serialized: [u8; ENCODED_LEN],
}

impl Quantity {
    fn new(id: QuantityId) -> Self {
        let current_value = Measurement::default();
        Self {
            id,
            permissions: Permissions::READ | Permissions::NOTIFY,
            current_value,
            last_serialized: current_value.encode(),
        }
    }

    pub fn current_value(&self) -> Measurement {
        self.current_value
    }
}

/// Process-wide table of exposed quantities.
pub struct AttributeTable {
    quantities: Vec<Quantity>,
    layout: Vec<AttributeEntry>,
}

impl AttributeTable {
    pub fn new() -> Self {
        let quantities: Vec<Quantity> = QuantityId::iter().map(Quantity::new).collect();

        let mut layout = Vec::with_capacity(1 + 3 * QuantityId::COUNT);
        let mut handle = FIRST_HANDLE;
        let mut push = |uuid, kind, permissions| {
            layout.push(AttributeEntry {
                handle,
                uuid,
                kind,
                permissions,
            });
            handle += 1;
        };

        push(
            uuids::PRIMARY_SERVICE,
            AttributeKind::PrimaryService,
            Permissions::READ,
        );
        for quantity in &quantities {
            push(
                uuids::CHARACTERISTIC,
                AttributeKind::CharacteristicDeclaration(quantity.id),
                Permissions::READ,
            );
            push(
                quantity.id.uuid(),
                AttributeKind::Value(quantity.id),
                quantity.permissions,
            );
            push(
                uuids::CLIENT_CHARACTERISTIC_CONFIGURATION,
                AttributeKind::ClientConfiguration(quantity.id),
                Permissions::READ | Permissions::WRITE,
            );
        }

        Self { quantities, layout }
    }

    pub fn quantity(&self, id: QuantityId) -> &Quantity {
        &self.quantities[id.index()]
    }

    /// Encode the current value of `id` into its 8-byte wire form.
    pub fn serialize(&self, id: QuantityId) -> [u8; ENCODED_LEN] {
        self.quantity(id).current_value.encode()
    }

    /// Overwrite the value of `id`. The only mutator of the table.
    pub fn update(&mut self, id: QuantityId, value: Measurement) {
        let quantity = &mut self.quantities[id.index()];
        quantity.current_value = value;
        quantity.last_serialized = value.encode();
        debug!("[GATT] {} <- {} {:02x?}", id, value, quantity.last_serialized);
    }

    /// Serialized value of `id`, as served to reads and notifications.
    pub fn read(&self, id: QuantityId) -> &[u8] {
        &self.quantity(id).last_serialized
    }

    /// Full attribute layout, in handle order.
    pub fn layout(&self) -> &[AttributeEntry] {
        &self.layout
    }

    pub fn entry(&self, handle: u16) -> Option<&AttributeEntry> {
        let index = handle.checked_sub(FIRST_HANDLE)? as usize;
        self.layout.get(index)
    }

    pub fn value_handle(&self, id: QuantityId) -> u16 {
        self.find(AttributeKind::Value(id))
    }

    pub fn ccc_handle(&self, id: QuantityId) -> u16 {
        self.find(AttributeKind::ClientConfiguration(id))
    }

    fn find(&self, kind: AttributeKind) -> u16 {
        self.layout
            .iter()
            .find(|entry| entry.kind == kind)
            .map(|entry| entry.handle)
            .unwrap_or_default()
    }

    /// Raw value of the attribute at `handle`, `None` for unknown handles.
    ///
    /// Client configuration descriptors are per connection, so their value
    /// comes from `ccc_value`.
    pub fn attribute_value(
        &self,
        handle: u16,
        ccc_value: impl FnOnce(QuantityId) -> u16,
    ) -> Option<Vec<u8>> {
        let entry = self.entry(handle)?;
        let value = match entry.kind {
            AttributeKind::PrimaryService => uuids::ENVIRONMENTAL_SENSING.to_le_bytes().to_vec(),
            AttributeKind::CharacteristicDeclaration(id) => {
                let value_handle = self.value_handle(id);
                let mut decl = Vec::with_capacity(5);
                decl.push(self.quantity(id).permissions.properties());
                decl.extend_from_slice(&value_handle.to_le_bytes());
                decl.extend_from_slice(&id.uuid().to_le_bytes());
                decl
            }
            AttributeKind::Value(id) => self.read(id).to_vec(),
            AttributeKind::ClientConfiguration(id) => ccc_value(id).to_le_bytes().to_vec(),
        };
        Some(value)
    }
}

impl Default for AttributeTable {
    fn default() -> Self {
        Self::new()
    }
}
