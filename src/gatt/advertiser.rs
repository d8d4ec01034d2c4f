//! Connectable advertising.
//!
//! The payload is a legacy advertising PDU body (at most 31 bytes):
//!
//! ```text
//! [0x02, 0x01, flags]              Flags AD structure
//! [len + 1, 0x08, name...]        Shortened local name
//! ```
//!
//! Names that do not fit are cut at a character boundary.

use super::transport::Transport;
use crate::error::TransportError;
use heapless::Vec;
use log::{info, warn};

/// Maximum legacy advertising payload.
pub const MAX_AD_LEN: usize = 31;

/// AD structure types.
pub mod ad_types {
    pub const FLAGS: u8 = 0x01;
    pub const SHORTENED_LOCAL_NAME: u8 = 0x08;
}

/// Flag bits of the Flags AD structure.
pub mod flags {
    pub const LE_GENERAL_DISCOVERABLE: u8 = 0x02;
    pub const BR_EDR_NOT_SUPPORTED: u8 = 0x04;
}

/// Bytes taken by the flags structure plus the name header.
const OVERHEAD: usize = 3 + 2;

/// Encoded advertising payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdvertisingData {
    payload: Vec<u8, MAX_AD_LEN>,
    name_len: usize,
}

impl AdvertisingData {
    /// Build the payload for `name`.
    pub fn new(name: &str) -> Self {
        let name = truncate_name(name, MAX_AD_LEN - OVERHEAD);
        let mut payload = Vec::new();
        // Capacity is checked by truncate_name, so these pushes cannot fail
        let _ = payload.extend_from_slice(&[
            0x02,
            ad_types::FLAGS,
            flags::LE_GENERAL_DISCOVERABLE | flags::BR_EDR_NOT_SUPPORTED,
            name.len() as u8 + 1,
            ad_types::SHORTENED_LOCAL_NAME,
        ]);
        let _ = payload.extend_from_slice(name.as_bytes());

        Self {
            payload,
            name_len: name.len(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.payload
    }

    /// The (possibly truncated) name carried in the payload.
    pub fn name(&self) -> &str {
        let start = OVERHEAD;
        std::str::from_utf8(&self.payload[start..start + self.name_len]).unwrap_or_default()
    }
}

fn truncate_name(name: &str, max: usize) -> &str {
    if name.len() <= max {
        return name;
    }
    let mut end = max;
    while !name.is_char_boundary(end) {
        end -= 1;
    }
    &name[..end]
}

/// Starts and tracks advertising.
///
/// Only knows whether advertising is on. Restarting after a disconnect is
/// the transport's own policy.
#[derive(Debug)]
pub struct Advertiser {
    data: AdvertisingData,
    advertising: bool,
}

impl Advertiser {
    pub fn new(name: &str) -> Self {
        Self {
            data: AdvertisingData::new(name),
            advertising: false,
        }
    }

    /// Start advertising. Repeated calls are no-ops.
    ///
    /// An "already advertising" answer from the transport counts as success.
    pub async fn start<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
    ) -> Result<(), TransportError> {
        if self.advertising {
            return Ok(());
        }

        match transport.start_advertising(self.data.as_bytes()).await {
            Ok(()) => {
                info!("[Adv] Advertising successfully started as '{}'", self.data.name());
            }
            Err(TransportError::AlreadyAdvertising) => {
                warn!("[Adv] Advertising was already running");
            }
            Err(e) => return Err(e),
        }
        self.advertising = true;
        Ok(())
    }

    pub fn is_advertising(&self) -> bool {
        self.advertising
    }

    pub fn data(&self) -> &AdvertisingData {
        &self.data
    }
}
