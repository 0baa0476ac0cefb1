//! An IEEE 1722.1 (AVDECC) controller library.
//!
//! The crate discovers AVB end stations on the local Ethernet segment (ADP),
//! walks their entity model into a descriptor registry (AECP-AEM), and
//! originates stream connection management transactions (ACMP). All protocol
//! state lives in a single-threaded [`Controller`] core; the optional
//! [`system::System`] wraps it in a tokio event loop and exposes a
//! thread-safe submission handle.
//!
//! The raw layer-2 interface is a collaborator: implement
//! [`transport::AvbNetwork`] over whatever packet backend the platform
//! offers (AF_PACKET, BPF, pcap) and feed received frames to the core.

#[macro_use]
extern crate num_derive;

pub mod constants;
pub mod controller;
pub mod descriptor;
pub mod discovery;
pub mod end_station;
pub mod enumeration;
mod error;
pub mod exchange;
pub mod log;
pub mod message;
pub mod notification;
pub mod system;
pub mod transport;
pub mod util;

pub use controller::{Controller, ControllerConfig};
pub use error::Error;
pub use log::{LogLevel, LogMessage, LogReceiver};
pub use message::{EntityId, Mac};
pub use notification::{
    AcmpNotification, CommandStatus, Notification, NotificationId, NotificationKind,
    NotificationReceiver,
};

/// Fixed-capacity buffer for AECP command and response bodies.
pub type CommandPayload = heapless::Vec<u8, 1024>;
