//! Scripted central activity for running the bridge on a host.
//!
//! Connects virtual peers, reads and subscribes the way a phone app would,
//! so the sampling loop has someone to notify.

use super::transport::SimulatedCentral;
use crate::gatt::transport::EventSender;
use crate::gatt::{AttributeTable, QuantityId};
use crate::sensors::Measurement;
use log::{info, warn};
use tokio::task::JoinHandle;
use tokio::time::{Duration, sleep};

/// HCI reason "remote user terminated connection".
const REMOTE_USER_TERMINATED: u8 = 0x13;

/// HCI status "connection failed to be established".
const FAILED_TO_ESTABLISH: u8 = 0x3E;

/// Attribute handles the scripted peers talk to.
#[derive(Debug, Clone, Copy)]
pub struct ScenarioHandles {
    pub temperature_value: u16,
    pub temperature_ccc: u16,
    pub humidity_ccc: u16,
}

impl ScenarioHandles {
    pub fn from_table(table: &AttributeTable) -> Self {
        Self {
            temperature_value: table.value_handle(QuantityId::Temperature),
            temperature_ccc: table.ccc_handle(QuantityId::Temperature),
            humidity_ccc: table.ccc_handle(QuantityId::Humidity),
        }
    }
}

/// Spawn a task that plays two centrals against the bridge.
///
/// Phone (handle 1) reads and subscribes to temperature. Later a logger
/// (handle 2) gets through on its second attempt, subscribes to humidity
/// and sends an unsupported CCC value for temperature. The phone then drops
/// out, reconnects with fresh state and subscribes to humidity, after which
/// the logger unsubscribes. The task ends when the script is done.
///
/// # Returns
///
/// A `JoinHandle` that can be used to abort the scenario.
pub fn run_central_simulation(events: EventSender, handles: ScenarioHandles) -> JoinHandle<()> {
    tokio::spawn(async move {
        let phone = SimulatedCentral::new(1, events.clone());
        let logger = SimulatedCentral::new(2, events);

        sleep(Duration::from_secs(3)).await;
        phone.connect().await;
        match phone.read(handles.temperature_value, 0).await {
            Some(Ok(bytes)) => match Measurement::decode(&bytes) {
                Some(value) => info!("[Sim] Phone read temperature {}", value),
                None => warn!("[Sim] Phone read malformed temperature {:02x?}", bytes),
            },
            Some(Err(e)) => warn!("[Sim] Phone read failed: {}", e),
            None => return,
        }
        phone.subscribe(handles.temperature_ccc).await;
        info!("[Sim] Phone subscribed to temperature");

        sleep(Duration::from_secs(6)).await;
        logger.connect_with_status(FAILED_TO_ESTABLISH).await;
        logger.connect().await;
        logger.subscribe(handles.humidity_ccc).await;
        // Indications are not offered, so this leaves temperature disabled
        logger.write_ccc(handles.temperature_ccc, 0x0002).await;
        info!("[Sim] Logger subscribed to humidity");

        sleep(Duration::from_secs(12)).await;
        phone.disconnect(REMOTE_USER_TERMINATED).await;
        info!("[Sim] Phone disconnected");

        sleep(Duration::from_secs(6)).await;
        phone.connect().await;
        if let Some(Ok(ccc)) = phone.read(handles.temperature_ccc, 0).await {
            info!("[Sim] Phone reconnected, temperature CCC reads {:02x?}", ccc);
        }
        phone.subscribe(handles.humidity_ccc).await;
        info!("[Sim] Phone subscribed to humidity");

        sleep(Duration::from_secs(6)).await;
        logger.unsubscribe(handles.humidity_ccc).await;
        info!("[Sim] Logger unsubscribed from humidity");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gatt::transport::event_channel;
    use crate::gatt::{Advertiser, SubscriptionState};
    use crate::input::simulation::{SimulatedSensor, SimulatedTransport};
    use crate::peripheral::SensorPeripheral;
    use crate::scheduler::NotificationScheduler;
    use crate::sensors::SensorSampler;
    use tokio_test::assert_ok;

    #[tokio::test(start_paused = true)]
    async fn test_scripted_centrals_end_to_end() {
        let sensor =
            SimulatedSensor::new(Measurement::new(21, 500_000), Measurement::new(40, 200_000));
        let transport = SimulatedTransport::new();
        let mut peripheral = SensorPeripheral::new(
            SensorSampler::new(sensor),
            transport.clone(),
            Advertiser::new("SmartSensor"),
            NotificationScheduler::new(Duration::from_secs(2)),
        );
        assert_ok!(peripheral.bring_up().await);

        let handles = ScenarioHandles::from_table(peripheral.table());
        let (events, receiver) = event_channel(16);
        let script = run_central_simulation(events, handles);

        // The script owns the only senders, so the loop ends with it
        peripheral
            .run(receiver, std::future::pending::<()>())
            .await;
        assert_ok!(script.await);

        let connections = peripheral.connections();
        assert_eq!(connections.connects(), 3);
        assert_eq!(connections.failed_connects(), 1);
        assert_eq!(connections.disconnects(), 1);
        assert_eq!(connections.last_disconnect_reason(), Some(REMOTE_USER_TERMINATED));

        let registry = peripheral.registry();
        assert_eq!(
            registry.state(1, QuantityId::Temperature),
            SubscriptionState::Unsubscribed
        );
        assert_eq!(
            registry.state(1, QuantityId::Humidity),
            SubscriptionState::Subscribed
        );
        assert_eq!(
            registry.state(2, QuantityId::Temperature),
            SubscriptionState::Unsubscribed
        );
        assert_eq!(
            registry.state(2, QuantityId::Humidity),
            SubscriptionState::Unsubscribed
        );

        let temperature = peripheral.table().value_handle(QuantityId::Temperature);
        let humidity = peripheral.table().value_handle(QuantityId::Humidity);
        let sent = transport.notifications();
        let count = |handle: u16, attribute: u16| {
            sent.iter()
                .filter(|n| n.handle == handle && n.attribute == attribute)
                .count()
        };
        assert!(count(1, temperature) > 0);
        assert!(count(1, humidity) > 0);
        assert!(count(2, humidity) > 0);
        // 0x0002 never enables temperature for the logger
        assert_eq!(count(2, temperature), 0);
    }
}
