//! Periodic sample-and-notify pass.
//!
//! Every cycle:
//! 1. sample the sensor; on failure skip the whole cycle,
//! 2. write both readings into the attribute table,
//! 3. notify each subscribed connection of each quantity.
//!
//! A failed notification is logged and dropped. The next cycle carries a
//! fresher value, so nothing is retried.

use crate::gatt::transport::Transport;
use crate::gatt::{AttributeTable, QuantityId, SubscriptionRegistry};
use crate::sensors::{SensorDriver, SensorSampler};
use log::{debug, warn};
use std::time::Duration;
use strum::IntoEnumIterator;

/// Default sampling period.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(2);

/// Outcome of one scheduler cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub sampled: bool,
    pub notified: usize,
    pub failed: usize,
}

/// Fixed-period sampling and notification.
#[derive(Debug)]
pub struct NotificationScheduler {
    period: Duration,
    cycles: u64,
    skipped: u64,
}

impl NotificationScheduler {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            cycles: 0,
            skipped: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Cycles run so far, including skipped ones.
    pub fn cycles(&self) -> u64 {
        self.cycles
    }

    /// Cycles skipped because the sensor had no data.
    pub fn skipped(&self) -> u64 {
        self.skipped
    }

    /// Run a single cycle.
    pub async fn run_cycle<D, T>(
        &mut self,
        sampler: &mut SensorSampler<D>,
        table: &mut AttributeTable,
        registry: &SubscriptionRegistry,
        transport: &T,
    ) -> CycleReport
    where
        D: SensorDriver,
        T: Transport + ?Sized,
    {
        self.cycles += 1;
        let mut report = CycleReport::default();

        let (temperature, humidity) = match sampler.sample() {
            Ok(pair) => pair,
            Err(e) => {
                self.skipped += 1;
                warn!("[Sched] Cycle {} skipped: {}", self.cycles, e);
                return report;
            }
        };
        report.sampled = true;

        table.update(QuantityId::Temperature, temperature);
        table.update(QuantityId::Humidity, humidity);

        for quantity in QuantityId::iter() {
            let subscribers = registry.subscribers(quantity);
            if subscribers.is_empty() {
                continue;
            }

            let value_handle = table.value_handle(quantity);
            let payload = table.read(quantity);
            for handle in subscribers {
                match transport.notify(handle, value_handle, payload).await {
                    Ok(()) => report.notified += 1,
                    Err(e) => {
                        report.failed += 1;
                        warn!("[Sched] {} notification dropped: {}", quantity, e);
                    }
                }
            }
        }

        debug!(
            "[Sched] Cycle {}: {} sent, {} failed",
            self.cycles, report.notified, report.failed
        );
        report
    }
}

impl Default for NotificationScheduler {
    fn default() -> Self {
        Self::new(DEFAULT_PERIOD)
    }
}
