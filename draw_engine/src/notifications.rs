//! Change notifications and audit records.
//!
//! The engine collects notifications while a mutation runs and publishes them
//! to the injected [`NotificationSink`] only after the change is committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Mutex;

use crate::model::{DrawPosition, MatchUpId, MatchUpStatus, Occupant, Side, StructureId};

/// Audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    /// Engine operation that made the change
    pub method: String,
    pub draw_id: String,
    pub recorded_at: DateTime<Utc>,
    pub detail: serde_json::Value,
}

impl AuditRecord {
    pub fn new(method: &str, draw_id: &str, detail: serde_json::Value) -> Self {
        Self {
            method: method.to_string(),
            draw_id: draw_id.to_string(),
            recorded_at: Utc::now(),
            detail,
        }
    }
}

/// Change notification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    PositionChanged {
        structure_id: StructureId,
        draw_position: DrawPosition,
        occupant: Option<Occupant>,
    },
    MatchUpModified {
        structure_id: StructureId,
        match_up_id: MatchUpId,
        match_up_status: MatchUpStatus,
        winning_side: Option<Side>,
    },
    /// A structure's consumed finishing order is stale
    StructureModified {
        structure_id: StructureId,
        reason: String,
    },
    Audit(AuditRecord),
}

/// Receiver of committed change notifications
pub trait NotificationSink: Send + Sync {
    fn publish(&self, notification: Notification);
}

/// Discards every notification
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl NotificationSink for NoopSink {
    fn publish(&self, _notification: Notification) {}
}

/// Keeps every notification in memory
#[derive(Debug, Default)]
pub struct RecordingSink {
    notifications: Mutex<Vec<Notification>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything published so far
    pub fn notifications(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn drain(&self) -> Vec<Notification> {
        match self.notifications.lock() {
            Ok(mut guard) => std::mem::take(&mut *guard),
            Err(poisoned) => std::mem::take(&mut *poisoned.into_inner()),
        }
    }

    pub fn audits(&self) -> Vec<AuditRecord> {
        self.notifications()
            .into_iter()
            .filter_map(|notification| match notification {
                Notification::Audit(record) => Some(record),
                _ => None,
            })
            .collect()
    }
}

impl NotificationSink for RecordingSink {
    fn publish(&self, notification: Notification) {
        match self.notifications.lock() {
            Ok(mut guard) => guard.push(notification),
            Err(poisoned) => poisoned.into_inner().push(notification),
        }
    }
}
