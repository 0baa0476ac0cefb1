//! The narrow seam to the raw layer-2 world. The library never opens a
//! socket itself: a platform backend implements [`AvbNetwork`] and feeds
//! received frames to the event loop through a recycled [`Packet`] channel.

use bytes::BytesMut;
use thingbuf::{recycling, Recycle};

use crate::error::Error;
use crate::message::Mac;

/// Raw Ethernet transmit/receive capability provided by the embedder.
/// Frames are complete Ethernet II images on EtherType 0x22F0; VLAN
/// tagging, if any, is the backend's business.
pub trait AvbNetwork: Send {
    /// Hand one frame to the wire. A refusal is mapped to an immediate
    /// timeout for the affected command.
    fn send_frame(&mut self, frame: &[u8]) -> Result<(), Error>;

    /// MAC address of the bound interface.
    fn local_mac(&self) -> Mac;
}

/// A reusable receive buffer travelling through the inbound frame channel.
#[derive(Debug, Clone, Default)]
pub struct Packet {
    pub bytes: BytesMut,
}

impl Packet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bytes: BytesMut::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.bytes.capacity()
    }

    pub fn shrink_to(&mut self, min_capacity: usize) {
        if self.capacity() > min_capacity {
            self.bytes.resize(min_capacity, 0u8)
        }
    }

    pub fn clear(&mut self) {
        self.bytes.clear();
    }
}

impl Recycle<Packet> for recycling::WithCapacity {
    fn new_element(&self) -> Packet {
        Packet::with_capacity(self.min_capacity())
    }

    fn recycle(&self, element: &mut Packet) {
        element.clear();
        element.shrink_to(self.max_capacity());
    }
}
