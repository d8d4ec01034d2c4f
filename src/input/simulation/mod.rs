//! Simulated collaborators for running and testing the bridge on a host.

mod scenario;
mod sensors;
mod transport;

pub use scenario::{ScenarioHandles, run_central_simulation};
pub use sensors::{SUPPORTED_DEVICES, SimulatedSensor};
pub use transport::{SentNotification, SimulatedCentral, SimulatedTransport};
