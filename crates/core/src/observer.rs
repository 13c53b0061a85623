//! Audit hooks for reconciliation.
//!
//! Reconciliation reports what it did through an injected observer instead
//! of logging on its own. [`TracingObserver`] is the usual choice; tests
//! use [`RecordingObserver`] to assert on the event stream.

use std::sync::Mutex;

use serde::Serialize;

use crate::role::{RecordKind, RoleKind};
use crate::types::DbId;

/// Something reconciliation did or repaired.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AuditEvent {
    PersonCreated { person_id: DbId },
    PersonUpdated { person_id: DbId },
    PersonLinked { person_id: DbId },
    /// A concurrent insert won the race for this identity.
    UniquenessRace { constraint: String, retried: bool },
    RecordSaved { kind: RoleKind, id: DbId, created: bool },
    /// The person's slot pointed at a different record and won.
    BindingRepaired { kind: RoleKind, from: Option<DbId>, to: DbId },
    /// A stale slot on a previous person was cleared.
    SlotCleared { kind: RoleKind, person_id: DbId },
    ParentLinked { player_id: DbId, parent_id: DbId },
    RecordDestroyed { kind: RoleKind, id: DbId },
    PersonDestroyed { person_id: DbId },
    Failed { kind: RecordKind, reason: String },
}

pub trait ReconcileObserver: Send + Sync {
    fn on_event(&self, event: &AuditEvent);
}

/// Discards every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl ReconcileObserver for NoopObserver {
    fn on_event(&self, _event: &AuditEvent) {}
}

/// Logs every event through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ReconcileObserver for TracingObserver {
    fn on_event(&self, event: &AuditEvent) {
        match event {
            AuditEvent::UniquenessRace {
                constraint,
                retried,
            } => {
                tracing::warn!(constraint = %constraint, retried, "Lost person creation race");
            }
            AuditEvent::BindingRepaired { kind, from, to } => {
                tracing::warn!(kind = %kind, from = ?from, to, "Repaired person binding");
            }
            AuditEvent::Failed { kind, reason } => {
                tracing::warn!(kind = ?kind, reason = %reason, "Reconciliation failed");
            }
            other => tracing::debug!(event = ?other, "Reconciliation event"),
        }
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingObserver {
    events: Mutex<Vec<AuditEvent>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl ReconcileObserver for RecordingObserver {
    fn on_event(&self, event: &AuditEvent) {
        self.events
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(event.clone());
    }
}
