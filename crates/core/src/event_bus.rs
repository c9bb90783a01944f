//! Ledger event bus — trait for emitting loyalty and booking events.
//!
//! The ledger and the booking pricer accept an `Arc<dyn EventSink>`; the
//! application shell routes events to its analytics dashboard.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};

use crate::loyalty::LoyaltyTier;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum LedgerEventType {
    AccountProvisioned,
    PointsEarned,
    PointsRedeemed,
    TierUpgrade,
    BookingPriced,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LedgerEvent {
    pub event_type: LedgerEventType,
    pub user_id: Option<String>,
    pub points: Option<u64>,
    pub amount: Option<Decimal>,
    pub tier: Option<LoyaltyTier>,
    pub timestamp: DateTime<Utc>,
}

impl LedgerEvent {
    pub fn new(event_type: LedgerEventType, user_id: Option<String>) -> Self {
        Self {
            event_type,
            user_id,
            points: None,
            amount: None,
            tier: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_points(mut self, points: u64) -> Self {
        self.points = Some(points);
        self
    }

    pub fn with_amount(mut self, amount: Decimal) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn with_tier(mut self, tier: LoyaltyTier) -> Self {
        self.tier = Some(tier);
        self
    }
}

pub trait EventSink: Send + Sync {
    fn emit(&self, event: LedgerEvent);
}

/// No-op sink for tests and callers that don't need event emission.
pub struct NoOpSink;

impl EventSink for NoOpSink {
    fn emit(&self, _event: LedgerEvent) {}
}

/// In-memory sink that captures events for testing.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<LedgerEvent>>,
}

impl CaptureSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<LedgerEvent> {
        self.events.lock().expect("event bus mutex poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.events.lock().expect("event bus mutex poisoned").len()
    }

    pub fn count_type(&self, event_type: LedgerEventType) -> usize {
        self.events
            .lock()
            .expect("event bus mutex poisoned")
            .iter()
            .filter(|e| e.event_type == event_type)
            .count()
    }
}

impl EventSink for CaptureSink {
    fn emit(&self, event: LedgerEvent) {
        self.events.lock().expect("event bus mutex poisoned").push(event);
    }
}

pub fn noop_sink() -> Arc<dyn EventSink> {
    Arc::new(NoOpSink)
}

pub fn capture_sink() -> Arc<CaptureSink> {
    Arc::new(CaptureSink::new())
}
