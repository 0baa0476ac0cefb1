//! In-core logging: a bounded drop-oldest ring drained by the application.
//! Messages above the configured level are discarded at the source.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use num::FromPrimitive;

use crate::constants::LOG_RING_CAPACITY;
use crate::util::ring::Ring;
use crate::util::time::Timestamp;

#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LogLevel {
    Error = 0,
    Warning = 1,
    Notice = 2,
    Info = 3,
    Debug = 4,
    Verbose = 5,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogMessage {
    pub level: LogLevel,
    pub message: String,
    pub timestamp_ms: Timestamp,
}

/// Producer handle held by the protocol core and its state machines.
#[derive(Clone)]
pub struct Logger {
    level: Arc<AtomicU8>,
    ring: Arc<Ring<LogMessage>>,
}

impl Logger {
    pub fn new(level: LogLevel) -> Self {
        Logger {
            level: Arc::new(AtomicU8::new(level as u8)),
            ring: Ring::with_capacity(LOG_RING_CAPACITY),
        }
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::Relaxed);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::Relaxed)).unwrap_or(LogLevel::Error)
    }

    pub fn post(&self, level: LogLevel, message: impl Into<String>, now: Timestamp) {
        if level > self.level() {
            return;
        }
        self.ring.push(LogMessage {
            level,
            message: message.into(),
            timestamp_ms: now,
        });
    }

    pub fn receiver(&self) -> LogReceiver {
        LogReceiver {
            ring: self.ring.clone(),
        }
    }

    pub fn missed_count(&self) -> u32 {
        self.ring.missed_count()
    }
}

/// Consumer handle; clone freely, drain from any thread.
#[derive(Clone)]
pub struct LogReceiver {
    ring: Arc<Ring<LogMessage>>,
}

impl LogReceiver {
    pub fn pop(&self) -> Option<LogMessage> {
        self.ring.pop()
    }

    pub fn missed_count(&self) -> u32 {
        self.ring.missed_count()
    }
}
