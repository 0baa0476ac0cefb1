use crate::message::EntityId;

/// Library error taxonomy. Parser and state-machine failures never tear the
/// event loop down; they surface here or as terminal command statuses.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// Structural violation in a received frame; the frame is dropped whole.
    #[error("malformed frame: {0}")]
    Malformed(&'static str),

    /// A response arrived with no matching inflight command.
    #[error("response without matching inflight command (sequence_id {0})")]
    SequenceMismatch(u16),

    /// A matched response carried a non-SUCCESS protocol status.
    #[error("protocol status {0}")]
    ProtocolStatus(u8),

    /// Retries exhausted without a response.
    #[error("command timed out")]
    Timeout,

    /// The target departed or the caller aborted the command.
    #[error("command canceled")]
    Canceled,

    /// The network collaborator refused the frame.
    #[error("network send failed")]
    NetworkUnavailable,

    /// A boundary ring overflowed; recorded in the missed counters.
    #[error("ring overflow")]
    ResourceExhausted,

    /// The referenced entity is not in the end station table.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// API misuse, e.g. mutating the controller identity after start.
    #[error("invalid state: {0}")]
    InvalidState(&'static str),
}
