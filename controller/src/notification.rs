//! Notification channels at the loop boundary: one ring for entity and AEM
//! command events, one for ACMP transaction events. Both are bounded,
//! drop-oldest, with atomic missed counters.

use std::sync::Arc;

use crate::message::acmp::{AcmpFlags, AcmpMessageType};
use crate::message::EntityId;
use crate::util::ring::Ring;

/// Opaque correlation handle returned by command submissions and echoed in
/// the notification that resolves them. Internal commands carry `NONE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NotificationId(pub u64);

impl NotificationId {
    pub const NONE: NotificationId = NotificationId(0);

    pub fn is_none(&self) -> bool {
        *self == Self::NONE
    }
}

/// Terminal status of a resolved command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStatus {
    /// The protocol status code from a matched response.
    Protocol(u8),
    /// Retries exhausted without a response.
    Timeout,
    /// The target departed or the caller aborted.
    Canceled,
}

impl CommandStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, CommandStatus::Protocol(0))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    NoMatchFound,
    EntityDiscovered,
    EntityUpdated,
    EntityDeparted,
    /// A stream connection was established through this controller.
    EndStationConnected,
    /// A stream connection was torn down through this controller.
    EndStationDisconnected,
    ResponseReceived,
    UnsolicitedResponseReceived,
    CommandTimeout,
    CommandCanceled,
    EndStationReadCompleted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub entity_id: EntityId,
    pub command_type: u16,
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub status: CommandStatus,
    pub id: NotificationId,
}

/// ACMP events ride their own channel with transaction-shaped fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcmpNotification {
    pub message_type: AcmpMessageType,
    pub status: CommandStatus,
    pub sequence_id: u16,
    pub talker_entity_id: EntityId,
    pub talker_unique_id: u16,
    pub listener_entity_id: EntityId,
    pub listener_unique_id: u16,
    pub connection_count: u16,
    pub flags: AcmpFlags,
    pub id: NotificationId,
}

/// Producer side of a notification ring.
#[derive(Clone)]
pub struct Notifier<T> {
    ring: Arc<Ring<T>>,
}

impl<T> Notifier<T> {
    pub fn with_capacity(capacity: usize) -> Self {
        Notifier {
            ring: Ring::with_capacity(capacity),
        }
    }

    pub fn post(&self, event: T) {
        self.ring.push(event);
    }

    pub fn receiver(&self) -> NotificationReceiver<T> {
        NotificationReceiver {
            ring: self.ring.clone(),
        }
    }

    pub fn missed_count(&self) -> u32 {
        self.ring.missed_count()
    }
}

/// Consumer side; clone freely, drain from any thread.
#[derive(Clone)]
pub struct NotificationReceiver<T> {
    ring: Arc<Ring<T>>,
}

impl<T> NotificationReceiver<T> {
    pub fn pop(&self) -> Option<T> {
        self.ring.pop()
    }

    pub fn missed_count(&self) -> u32 {
        self.ring.missed_count()
    }
}
