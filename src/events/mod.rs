//! Outbound event queue for best-effort side effects (audit, notifications).
//!
//! Services publish after their primary write succeeds; a full or closed queue
//! is logged and never fails the operation that raised the event.

use chrono::NaiveDate;
use metrics::counter;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::models::{BillingPeriod, Branch};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    ReadingsSubmitted {
        period: BillingPeriod,
        branch: Branch,
        saved_count: usize,
        submitted_by: Uuid,
    },
    ReadingCleared {
        period: BillingPeriod,
        branch: Branch,
        machine_id: Uuid,
    },
    ReadingsImported {
        period: BillingPeriod,
        branch: Branch,
        succeeded: usize,
        failed: usize,
        imported_by: Uuid,
    },
    MonthLocked {
        period: BillingPeriod,
        branch: Branch,
        locked_by: Uuid,
    },
    MonthUnlocked {
        period: BillingPeriod,
        branch: Branch,
    },
    PartOrderRecorded {
        replacement_id: Uuid,
        machine_id: Uuid,
        model_part_id: Uuid,
        order_date: NaiveDate,
        yield_met: bool,
    },
    PartOrdersImported {
        succeeded: usize,
        failed: usize,
        imported_by: Uuid,
    },
}

impl Event {
    pub fn name(&self) -> &'static str {
        match self {
            Event::ReadingsSubmitted { .. } => "readings_submitted",
            Event::ReadingCleared { .. } => "reading_cleared",
            Event::ReadingsImported { .. } => "readings_imported",
            Event::MonthLocked { .. } => "month_locked",
            Event::MonthUnlocked { .. } => "month_unlocked",
            Event::PartOrderRecorded { .. } => "part_order_recorded",
            Event::PartOrdersImported { .. } => "part_orders_imported",
        }
    }
}

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Queues an event without waiting; failures are logged and swallowed.
    pub fn send_or_log(&self, event: Event) {
        let name = event.name();
        match self.sender.try_send(event) {
            Ok(()) => counter!("fleetmeter.events.published", 1, "event" => name),
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event = name, "event queue full, dropping event");
                counter!("fleetmeter.events.dropped", 1, "event" => name);
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                error!(event = name, "event queue closed, dropping event");
                counter!("fleetmeter.events.dropped", 1, "event" => name);
            }
        }
    }
}

/// Creates a bounded queue and its sender.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Drains the queue into the audit log until every sender is dropped.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match &event {
            Event::ReadingsSubmitted {
                period,
                branch,
                saved_count,
                submitted_by,
            } => info!(
                %period, %branch, saved_count, %submitted_by,
                "audit: readings submitted"
            ),
            Event::ReadingCleared {
                period,
                branch,
                machine_id,
            } => info!(%period, %branch, %machine_id, "audit: reading cleared"),
            Event::ReadingsImported {
                period,
                branch,
                succeeded,
                failed,
                imported_by,
            } => info!(
                %period, %branch, succeeded, failed, %imported_by,
                "audit: readings imported"
            ),
            Event::MonthLocked {
                period,
                branch,
                locked_by,
            } => info!(%period, %branch, %locked_by, "audit: month locked"),
            Event::MonthUnlocked { period, branch } => {
                warn!(%period, %branch, "audit: month unlocked")
            }
            Event::PartOrderRecorded {
                replacement_id,
                machine_id,
                model_part_id,
                order_date,
                yield_met,
            } => info!(
                %replacement_id, %machine_id, %model_part_id, %order_date, yield_met,
                "audit: part order recorded"
            ),
            Event::PartOrdersImported {
                succeeded,
                failed,
                imported_by,
            } => info!(succeeded, failed, %imported_by, "audit: part orders imported"),
        }
        counter!("fleetmeter.events.processed", 1, "event" => event.name());
    }

    info!("Event processing loop stopped");
}
