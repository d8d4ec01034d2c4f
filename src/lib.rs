//! Smart sensor bridge library.
//!
//! Exposes periodic temperature/humidity samples as a BLE Environmental
//! Sensing service, notifying every connection that subscribed.

pub mod config;
pub mod error;
pub mod gatt;
pub mod input;
pub mod peripheral;
pub mod scheduler;
pub mod sensors;
