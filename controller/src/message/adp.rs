//! ADPDU codec (IEEE 1722.1 clause 6.2).
//!
//! ADPDU payload, 56 octets after the `entity_id` field:
//! - 08 entity_model_id
//! - 04 entity_capabilities
//! - 02 talker_stream_sources
//! - 02 talker_capabilities
//! - 02 listener_stream_sinks
//! - 02 listener_capabilities
//! - 04 controller_capabilities
//! - 04 available_index
//! - 08 gptp_grandmaster_id
//! - 01 gptp_domain_number
//! - 03 reserved
//! - 02 identify_control_index
//! - 02 interface_index
//! - 08 association_id
//! - 04 reserved

use bitflags::bitflags;
use bytes::{Buf, BufMut, BytesMut};
use num::FromPrimitive;

use crate::constants::{ADPDU_CONTROL_DATA_LEN, SUBTYPE_ADP};
use crate::error::Error;
use crate::message::{encode_ethernet_header, ControlHeader, EntityId, Mac};

#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdpMessageType {
    EntityAvailable = 0,
    EntityDeparting = 1,
    EntityDiscover = 2,
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct EntityCapabilities: u32 {
        const EFU_MODE = 0x0000_0001;
        const ADDRESS_ACCESS_SUPPORTED = 0x0000_0002;
        const GPTP_SUPPORTED = 0x0000_0004;
        const AEM_SUPPORTED = 0x0000_0008;
        const LEGACY_AVC = 0x0000_0010;
        const ASSOCIATION_ID_SUPPORTED = 0x0000_0020;
        const ASSOCIATION_ID_VALID = 0x0000_0040;
        const VENDOR_UNIQUE_SUPPORTED = 0x0000_0080;
        const CLASS_A_SUPPORTED = 0x0000_0100;
        const CLASS_B_SUPPORTED = 0x0000_0200;
        const GPTP_GRANDMASTER_SUPPORTED = 0x0000_0400;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct TalkerCapabilities: u16 {
        const IMPLEMENTED = 0x0001;
        const OTHER_SOURCE = 0x0200;
        const CONTROL_SOURCE = 0x0400;
        const MEDIA_CLOCK_SOURCE = 0x0800;
        const SMPTE_SOURCE = 0x1000;
        const MIDI_SOURCE = 0x2000;
        const AUDIO_SOURCE = 0x4000;
        const VIDEO_SOURCE = 0x8000;
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct ListenerCapabilities: u16 {
        const IMPLEMENTED = 0x0001;
        const OTHER_SINK = 0x0200;
        const CONTROL_SINK = 0x0400;
        const MEDIA_CLOCK_SINK = 0x0800;
        const SMPTE_SINK = 0x1000;
        const MIDI_SINK = 0x2000;
        const AUDIO_SINK = 0x4000;
        const VIDEO_SINK = 0x8000;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Adpdu {
    pub message_type: AdpMessageType,
    /// Advertised validity period in 2-second units, five bits on the wire.
    pub valid_time: u8,
    pub entity_id: EntityId,
    pub entity_model_id: u64,
    pub entity_capabilities: EntityCapabilities,
    pub talker_stream_sources: u16,
    pub talker_capabilities: TalkerCapabilities,
    pub listener_stream_sinks: u16,
    pub listener_capabilities: ListenerCapabilities,
    pub controller_capabilities: u32,
    pub available_index: u32,
    pub gptp_grandmaster_id: u64,
    pub gptp_domain_number: u8,
    pub identify_control_index: u16,
    pub interface_index: u16,
    pub association_id: u64,
}

impl Adpdu {
    /// An ENTITY_DISCOVER probe; entity_id 0 solicits every listener.
    pub fn discover(target: EntityId) -> Self {
        Adpdu {
            message_type: AdpMessageType::EntityDiscover,
            valid_time: 0,
            entity_id: target,
            entity_model_id: 0,
            entity_capabilities: EntityCapabilities::empty(),
            talker_stream_sources: 0,
            talker_capabilities: TalkerCapabilities::empty(),
            listener_stream_sinks: 0,
            listener_capabilities: ListenerCapabilities::empty(),
            controller_capabilities: 0,
            available_index: 0,
            gptp_grandmaster_id: 0,
            gptp_domain_number: 0,
            identify_control_index: 0,
            interface_index: 0,
            association_id: 0,
        }
    }

    pub fn to_frame(&self, dest: Mac, src: Mac) -> BytesMut {
        let mut out = BytesMut::with_capacity(82);
        encode_ethernet_header(&mut out, dest, src);
        ControlHeader {
            subtype: SUBTYPE_ADP,
            message_type: self.message_type as u8,
            status_field: self.valid_time & 0x1F,
            control_data_length: ADPDU_CONTROL_DATA_LEN,
            stream_id: self.entity_id.0,
        }
        .encode(&mut out);
        out.put_u64(self.entity_model_id);
        out.put_u32(self.entity_capabilities.bits());
        out.put_u16(self.talker_stream_sources);
        out.put_u16(self.talker_capabilities.bits());
        out.put_u16(self.listener_stream_sinks);
        out.put_u16(self.listener_capabilities.bits());
        out.put_u32(self.controller_capabilities);
        out.put_u32(self.available_index);
        out.put_u64(self.gptp_grandmaster_id);
        out.put_u8(self.gptp_domain_number);
        out.put_slice(&[0u8; 3]);
        out.put_u16(self.identify_control_index);
        out.put_u16(self.interface_index);
        out.put_u64(self.association_id);
        out.put_u32(0);
        out
    }
}

pub(crate) fn parse(header: &ControlHeader, mut body: &[u8]) -> Result<Adpdu, Error> {
    let message_type = AdpMessageType::from_u8(header.message_type)
        .ok_or(Error::Malformed("unknown ADP message type"))?;
    if header.control_data_length != ADPDU_CONTROL_DATA_LEN
        || body.len() < ADPDU_CONTROL_DATA_LEN as usize
    {
        return Err(Error::Malformed("ADPDU control_data_length"));
    }

    let entity_model_id = body.get_u64();
    let entity_capabilities = EntityCapabilities::from_bits_truncate(body.get_u32());
    let talker_stream_sources = body.get_u16();
    let talker_capabilities = TalkerCapabilities::from_bits_truncate(body.get_u16());
    let listener_stream_sinks = body.get_u16();
    let listener_capabilities = ListenerCapabilities::from_bits_truncate(body.get_u16());
    let controller_capabilities = body.get_u32();
    let available_index = body.get_u32();
    let gptp_grandmaster_id = body.get_u64();
    let gptp_domain_number = body.get_u8();
    body.advance(3);
    let identify_control_index = body.get_u16();
    let interface_index = body.get_u16();
    let association_id = body.get_u64();

    Ok(Adpdu {
        message_type,
        valid_time: header.status_field,
        entity_id: EntityId(header.stream_id),
        entity_model_id,
        entity_capabilities,
        talker_stream_sources,
        talker_capabilities,
        listener_stream_sinks,
        listener_capabilities,
        controller_capabilities,
        available_index,
        gptp_grandmaster_id,
        gptp_domain_number,
        identify_control_index,
        interface_index,
        association_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::AVDECC_MULTICAST_MAC;
    use crate::message::{parse_frame, Pdu};
    use hex_literal::hex;

    fn sample() -> Adpdu {
        Adpdu {
            message_type: AdpMessageType::EntityAvailable,
            valid_time: 31,
            entity_id: EntityId(0x0011_22FF_FE33_4455),
            entity_model_id: 0xAABB_0000_0000_0001,
            entity_capabilities: EntityCapabilities::AEM_SUPPORTED
                | EntityCapabilities::GPTP_SUPPORTED,
            talker_stream_sources: 2,
            talker_capabilities: TalkerCapabilities::IMPLEMENTED
                | TalkerCapabilities::AUDIO_SOURCE,
            listener_stream_sinks: 2,
            listener_capabilities: ListenerCapabilities::IMPLEMENTED
                | ListenerCapabilities::AUDIO_SINK,
            controller_capabilities: 0,
            available_index: 7,
            gptp_grandmaster_id: 0x0011_22FF_FE33_4400,
            gptp_domain_number: 0,
            identify_control_index: 0,
            interface_index: 0,
            association_id: 0,
        }
    }

    #[test]
    fn round_trip() {
        let pdu = sample();
        let frame = pdu.to_frame(AVDECC_MULTICAST_MAC, Mac(0x0011_2233_4455));
        let parsed = parse_frame(&frame).expect("frame parses");
        assert_eq!(parsed.src, Mac(0x0011_2233_4455));
        assert_eq!(parsed.pdu, Pdu::Adp(pdu));
    }

    #[test]
    fn golden_entity_available() {
        // ENTITY_AVAILABLE, valid_time 31 (62 s), available_index 1.
        let frame = hex!(
            "91e0f0010000"             // dest: AVDECC multicast
            "001122334455"             // src
            "22f0"                     // AVTP ethertype
            "fa"                       // cd=1, subtype 0x7A
            "00"                       // sv=0, version 0, ENTITY_AVAILABLE
            "f838"                     // valid_time 31, cd_len 56
            "001122fffe334455"         // entity_id
            "aabb000000000001"         // entity_model_id
            "00000008"                 // entity_capabilities: AEM_SUPPORTED
            "0002"                     // talker_stream_sources
            "4001"                     // talker_capabilities
            "0002"                     // listener_stream_sinks
            "4001"                     // listener_capabilities
            "00000000"                 // controller_capabilities
            "00000001"                 // available_index
            "001122fffe334400"         // gptp_grandmaster_id
            "00"                       // gptp_domain_number
            "000000"                   // reserved
            "0000"                     // identify_control_index
            "0000"                     // interface_index
            "0000000000000000"         // association_id
            "00000000"                 // reserved
        );
        let parsed = parse_frame(&frame).expect("golden frame parses");
        let Pdu::Adp(adpdu) = parsed.pdu else {
            panic!("expected ADPDU");
        };
        assert_eq!(adpdu.message_type, AdpMessageType::EntityAvailable);
        assert_eq!(adpdu.valid_time, 31);
        assert_eq!(adpdu.entity_id, EntityId(0x0011_22FF_FE33_4455));
        assert_eq!(adpdu.available_index, 1);
        assert!(adpdu
            .entity_capabilities
            .contains(EntityCapabilities::AEM_SUPPORTED));
        assert_eq!(
            adpdu.talker_capabilities,
            TalkerCapabilities::IMPLEMENTED | TalkerCapabilities::AUDIO_SOURCE
        );

        // And byte-exact emission against the same capture.
        let emitted = adpdu.to_frame(AVDECC_MULTICAST_MAC, Mac(0x0011_2233_4455));
        assert_eq!(&emitted[..], &frame[..]);
    }

    #[test]
    fn rejects_truncated_body() {
        let pdu = sample();
        let frame = pdu.to_frame(AVDECC_MULTICAST_MAC, Mac(1));
        assert!(parse_frame(&frame[..frame.len() - 4]).is_err());
    }

    #[test]
    fn rejects_wrong_control_data_length() {
        let mut frame = sample()
            .to_frame(AVDECC_MULTICAST_MAC, Mac(1))
            .to_vec();
        frame[17] = 55; // cd_len low byte
        assert!(parse_frame(&frame).is_err());
    }
}
