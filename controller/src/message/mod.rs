//! Wire codec for the three control sub-protocols sharing the AVTP
//! EtherType.
//!
//! Frame layout (all integers big-endian network order):
//!
//! Ethernet II header
//! - 06 destination MAC
//! - 06 source MAC
//! - 02 EtherType (0x22F0, optionally preceded by an 802.1Q tag)
//!
//! AVTPDU common control header (clause 5 of IEEE 1722)
//! - 01 cd (1) | subtype (7)
//! - 01 sv (1) | version (3) | message_type (4)
//! - 02 valid_time/status (5) | control_data_length (11)
//! - 08 entity_id / target_entity_id / stream_id
//!
//! followed by `control_data_length` octets of subtype-specific payload.
//! `control_data_length` counts from the end of the 8-octet ID field;
//! trailing bytes beyond it (Ethernet padding) are ignored.

use bytes::{BufMut, BytesMut};

use crate::constants::{
    CONTROL_HDR_LEN, ETHERTYPE_AVTP, ETHERTYPE_VLAN, ETHER_HDR_LEN, SUBTYPE_ACMP, SUBTYPE_ADP,
    SUBTYPE_AECP,
};
use crate::error::Error;

pub mod acmp;
pub mod adp;
pub mod aecp;

pub use acmp::Acmpdu;
pub use adp::Adpdu;
pub use aecp::AemPdu;

/// 64-bit EUI-64 entity identifier.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityId(pub u64);

impl EntityId {
    pub const ZERO: EntityId = EntityId(0);

    /// EUI-64 derived from a 48-bit MAC by inserting FF:FE in the middle,
    /// the conventional identity for a controller bound to one interface.
    pub fn from_mac(mac: Mac) -> Self {
        let m = mac.to_bytes();
        EntityId(u64::from_be_bytes([
            m[0], m[1], m[2], 0xFF, 0xFE, m[3], m[4], m[5],
        ]))
    }
}

impl std::fmt::Debug for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "EntityId(0x{:016X})", self.0)
    }
}

impl std::fmt::Display for EntityId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{:016X}", self.0)
    }
}

/// 48-bit MAC address held in the low bits of a u64.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Mac(pub u64);

impl Mac {
    pub fn from_bytes(bytes: [u8; 6]) -> Self {
        let mut value = 0u64;
        for b in bytes {
            value = value << 8 | b as u64;
        }
        Mac(value)
    }

    pub fn to_bytes(self) -> [u8; 6] {
        let v = self.0;
        [
            (v >> 40) as u8,
            (v >> 32) as u8,
            (v >> 24) as u8,
            (v >> 16) as u8,
            (v >> 8) as u8,
            v as u8,
        ]
    }
}

impl std::fmt::Debug for Mac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Mac({self})")
    }
}

impl std::fmt::Display for Mac {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let b = self.to_bytes();
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

/// A control PDU recognized by the codec.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pdu {
    Adp(Adpdu),
    Aecp(AemPdu),
    Acmp(Acmpdu),
}

/// A received frame after validation: link addresses plus the decoded PDU.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedFrame {
    pub dest: Mac,
    pub src: Mac,
    pub pdu: Pdu,
}

/// Fields of the AVTPDU common control header shared by all three subtypes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct ControlHeader {
    pub subtype: u8,
    /// Low nibble of the second octet; ADP/ACMP message type, AECP
    /// command/response selector.
    pub message_type: u8,
    /// Five-bit field above `control_data_length`; `valid_time` for ADP,
    /// `status` for AECP and ACMP.
    pub status_field: u8,
    pub control_data_length: u16,
    /// `entity_id` (ADP), `target_entity_id` (AECP) or `stream_id` (ACMP).
    pub stream_id: u64,
}

impl ControlHeader {
    fn parse(buf: &[u8]) -> Result<ControlHeader, Error> {
        if buf.len() < CONTROL_HDR_LEN {
            return Err(Error::Malformed("control header truncated"));
        }
        if buf[0] >> 7 != 1 {
            return Err(Error::Malformed("cd bit clear on control ethertype"));
        }
        let subtype = buf[0] & 0x7F;
        let version = buf[1] >> 4 & 0x07;
        if version != 0 {
            return Err(Error::Malformed("unsupported AVTP version"));
        }
        let message_type = buf[1] & 0x0F;
        let status_field = buf[2] >> 3;
        let control_data_length = u16::from(buf[2] & 0x07) << 8 | u16::from(buf[3]);
        let stream_id = u64::from_be_bytes(
            buf[4..12]
                .try_into()
                .map_err(|_| Error::Malformed("control header truncated"))?,
        );
        Ok(ControlHeader {
            subtype,
            message_type,
            status_field,
            control_data_length,
            stream_id,
        })
    }

    pub(crate) fn encode(&self, out: &mut BytesMut) {
        out.put_u8(0x80 | self.subtype);
        out.put_u8(self.message_type & 0x0F);
        out.put_u8(self.status_field << 3 | (self.control_data_length >> 8) as u8 & 0x07);
        out.put_u8(self.control_data_length as u8);
        out.put_u64(self.stream_id);
    }
}

pub(crate) fn encode_ethernet_header(out: &mut BytesMut, dest: Mac, src: Mac) {
    out.put_slice(&dest.to_bytes());
    out.put_slice(&src.to_bytes());
    out.put_u16(ETHERTYPE_AVTP);
}

/// Parse a raw Ethernet frame into a typed PDU. Any structural violation
/// rejects the whole frame; no partial state escapes to upper layers.
pub fn parse_frame(frame: &[u8]) -> Result<ReceivedFrame, Error> {
    if frame.len() < ETHER_HDR_LEN {
        return Err(Error::Malformed("frame shorter than Ethernet header"));
    }
    let dest = Mac::from_bytes(frame[0..6].try_into().expect("slice of 6"));
    let src = Mac::from_bytes(frame[6..12].try_into().expect("slice of 6"));
    let mut ethertype = u16::from_be_bytes([frame[12], frame[13]]);
    let mut payload = &frame[ETHER_HDR_LEN..];
    if ethertype == ETHERTYPE_VLAN {
        if payload.len() < 4 {
            return Err(Error::Malformed("VLAN tag truncated"));
        }
        ethertype = u16::from_be_bytes([payload[2], payload[3]]);
        payload = &payload[4..];
    }
    if ethertype != ETHERTYPE_AVTP {
        return Err(Error::Malformed("not an AVTP frame"));
    }

    let header = ControlHeader::parse(payload)?;
    let body_available = payload.len() - CONTROL_HDR_LEN;
    let body_len = header.control_data_length as usize;
    if body_len > body_available {
        return Err(Error::Malformed("control_data_length exceeds frame"));
    }
    let body = &payload[CONTROL_HDR_LEN..CONTROL_HDR_LEN + body_len];

    let pdu = match header.subtype {
        SUBTYPE_ADP => Pdu::Adp(adp::parse(&header, body)?),
        SUBTYPE_AECP => Pdu::Aecp(aecp::parse(&header, body)?),
        SUBTYPE_ACMP => Pdu::Acmp(acmp::parse(&header, body)?),
        _ => return Err(Error::Malformed("unrecognized AVTP subtype")),
    };
    Ok(ReceivedFrame { dest, src, pdu })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_id_from_mac_inserts_fffe() {
        let mac = Mac::from_bytes([0x00, 0x1B, 0x21, 0x60, 0x70, 0x80]);
        assert_eq!(EntityId::from_mac(mac), EntityId(0x001B_21FF_FE60_7080));
    }

    #[test]
    fn mac_byte_round_trip() {
        let bytes = [0x91, 0xE0, 0xF0, 0x01, 0x00, 0x00];
        assert_eq!(Mac::from_bytes(bytes).to_bytes(), bytes);
        assert_eq!(Mac::from_bytes(bytes), crate::constants::AVDECC_MULTICAST_MAC);
    }

    #[test]
    fn rejects_non_avtp_ethertype() {
        let mut frame = vec![0u8; 60];
        frame[12] = 0x08;
        frame[13] = 0x00;
        assert_eq!(
            parse_frame(&frame),
            Err(Error::Malformed("not an AVTP frame"))
        );
    }

    #[test]
    fn rejects_bad_version() {
        let mut frame = vec![0u8; 60];
        frame[12] = 0x22;
        frame[13] = 0xF0;
        frame[14] = 0x80 | SUBTYPE_ADP;
        frame[15] = 0x10; // version 1
        assert_eq!(
            parse_frame(&frame),
            Err(Error::Malformed("unsupported AVTP version"))
        );
    }

    #[test]
    fn rejects_overlong_control_data_length() {
        let mut frame = vec![0u8; 30];
        frame[12] = 0x22;
        frame[13] = 0xF0;
        frame[14] = 0x80 | SUBTYPE_ADP;
        frame[16] = 0x07; // cd_len far beyond the buffer
        frame[17] = 0xFF;
        assert_eq!(
            parse_frame(&frame),
            Err(Error::Malformed("control_data_length exceeds frame"))
        );
    }
}
