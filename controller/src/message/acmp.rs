//! ACMPDU codec (IEEE 1722.1 clause 8.2).
//!
//! ACMPDU payload, 44 octets after the `stream_id` field:
//! - 08 controller_entity_id
//! - 08 talker_entity_id
//! - 08 listener_entity_id
//! - 02 talker_unique_id
//! - 02 listener_unique_id
//! - 06 stream_dest_mac
//! - 02 connection_count
//! - 02 sequence_id
//! - 02 flags
//! - 02 stream_vlan_id
//! - 02 reserved

use bitflags::bitflags;
use bytes::{BufMut, BytesMut};
use num::FromPrimitive;

use crate::constants::{ACMPDU_CONTROL_DATA_LEN, SUBTYPE_ACMP};
use crate::error::Error;
use crate::message::{encode_ethernet_header, ControlHeader, EntityId, Mac};

#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AcmpMessageType {
    ConnectTxCommand = 0,
    ConnectTxResponse = 1,
    DisconnectTxCommand = 2,
    DisconnectTxResponse = 3,
    GetTxStateCommand = 4,
    GetTxStateResponse = 5,
    ConnectRxCommand = 6,
    ConnectRxResponse = 7,
    DisconnectRxCommand = 8,
    DisconnectRxResponse = 9,
    GetRxStateCommand = 10,
    GetRxStateResponse = 11,
    GetTxConnectionCommand = 12,
    GetTxConnectionResponse = 13,
}

impl AcmpMessageType {
    pub fn is_command(self) -> bool {
        self as u8 % 2 == 0
    }

    /// The response type answering this command type.
    pub fn response(self) -> Option<AcmpMessageType> {
        if self.is_command() {
            AcmpMessageType::from_u8(self as u8 + 1)
        } else {
            None
        }
    }
}

pub const ACMP_STATUS_SUCCESS: u8 = 0;
pub const ACMP_STATUS_LISTENER_UNKNOWN_ID: u8 = 1;
pub const ACMP_STATUS_TALKER_UNKNOWN_ID: u8 = 2;
pub const ACMP_STATUS_NOT_SUPPORTED: u8 = 31;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct AcmpFlags: u16 {
        const CLASS_B = 0x0001;
        const FAST_CONNECT = 0x0002;
        const SAVED_STATE = 0x0004;
        const STREAMING_WAIT = 0x0008;
        const SUPPORTS_ENCRYPTED = 0x0010;
        const ENCRYPTED_PDU = 0x0020;
        const TALKER_FAILED = 0x0040;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Acmpdu {
    pub message_type: AcmpMessageType,
    pub status: u8,
    pub stream_id: u64,
    pub controller_entity_id: EntityId,
    pub talker_entity_id: EntityId,
    pub listener_entity_id: EntityId,
    pub talker_unique_id: u16,
    pub listener_unique_id: u16,
    pub stream_dest_mac: Mac,
    pub connection_count: u16,
    pub sequence_id: u16,
    pub flags: AcmpFlags,
    pub stream_vlan_id: u16,
}

impl Acmpdu {
    /// A controller-originated command; stream fields the responder fills
    /// in stay zero.
    pub fn command(
        message_type: AcmpMessageType,
        controller_entity_id: EntityId,
        talker_entity_id: EntityId,
        talker_unique_id: u16,
        listener_entity_id: EntityId,
        listener_unique_id: u16,
        sequence_id: u16,
        flags: AcmpFlags,
    ) -> Self {
        Acmpdu {
            message_type,
            status: ACMP_STATUS_SUCCESS,
            stream_id: 0,
            controller_entity_id,
            talker_entity_id,
            listener_entity_id,
            talker_unique_id,
            listener_unique_id,
            stream_dest_mac: Mac(0),
            connection_count: 0,
            sequence_id,
            flags,
            stream_vlan_id: 0,
        }
    }

    pub fn to_frame(&self, dest: Mac, src: Mac) -> BytesMut {
        let mut out = BytesMut::with_capacity(70);
        encode_ethernet_header(&mut out, dest, src);
        ControlHeader {
            subtype: SUBTYPE_ACMP,
            message_type: self.message_type as u8,
            status_field: self.status & 0x1F,
            control_data_length: ACMPDU_CONTROL_DATA_LEN,
            stream_id: self.stream_id,
        }
        .encode(&mut out);
        out.put_u64(self.controller_entity_id.0);
        out.put_u64(self.talker_entity_id.0);
        out.put_u64(self.listener_entity_id.0);
        out.put_u16(self.talker_unique_id);
        out.put_u16(self.listener_unique_id);
        out.put_slice(&self.stream_dest_mac.to_bytes());
        out.put_u16(self.connection_count);
        out.put_u16(self.sequence_id);
        out.put_u16(self.flags.bits());
        out.put_u16(self.stream_vlan_id);
        out.put_u16(0);
        out
    }
}

pub(crate) fn parse(header: &ControlHeader, body: &[u8]) -> Result<Acmpdu, Error> {
    let message_type = AcmpMessageType::from_u8(header.message_type)
        .ok_or(Error::Malformed("unknown ACMP message type"))?;
    if header.control_data_length != ACMPDU_CONTROL_DATA_LEN
        || body.len() < ACMPDU_CONTROL_DATA_LEN as usize
    {
        return Err(Error::Malformed("ACMPDU control_data_length"));
    }
    let u64_at = |o: usize| u64::from_be_bytes(body[o..o + 8].try_into().expect("slice of 8"));
    let u16_at = |o: usize| u16::from_be_bytes([body[o], body[o + 1]]);

    Ok(Acmpdu {
        message_type,
        status: header.status_field,
        stream_id: header.stream_id,
        controller_entity_id: EntityId(u64_at(0)),
        talker_entity_id: EntityId(u64_at(8)),
        listener_entity_id: EntityId(u64_at(16)),
        talker_unique_id: u16_at(24),
        listener_unique_id: u16_at(26),
        stream_dest_mac: Mac::from_bytes(body[28..34].try_into().expect("slice of 6")),
        connection_count: u16_at(34),
        sequence_id: u16_at(36),
        flags: AcmpFlags::from_bits_truncate(u16_at(38)),
        stream_vlan_id: u16_at(40),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::AVDECC_MULTICAST_MAC;
    use crate::message::{parse_frame, Pdu};
    use hex_literal::hex;

    #[test]
    fn connect_rx_command_golden() {
        let pdu = Acmpdu::command(
            AcmpMessageType::ConnectRxCommand,
            EntityId(0x0022_44FF_FE66_8899),
            EntityId(0x1111_1111_1111_1111),
            0,
            EntityId(0x2222_2222_2222_2222),
            1,
            0x0005,
            AcmpFlags::empty(),
        );
        let frame = pdu.to_frame(AVDECC_MULTICAST_MAC, Mac(0x0022_4466_8899));
        let expected = hex!(
            "91e0f0010000"
            "002244668899"
            "22f0"
            "fc"                   // cd=1, subtype ACMP
            "06"                   // CONNECT_RX_COMMAND
            "002c"                 // status 0, cd_len 44
            "0000000000000000"     // stream_id
            "002244fffe668899"     // controller_entity_id
            "1111111111111111"     // talker_entity_id
            "2222222222222222"     // listener_entity_id
            "0000"                 // talker_unique_id
            "0001"                 // listener_unique_id
            "000000000000"         // stream_dest_mac
            "0000"                 // connection_count
            "0005"                 // sequence_id
            "0000"                 // flags
            "0000"                 // stream_vlan_id
            "0000"                 // reserved
        );
        assert_eq!(&frame[..], &expected[..]);
    }

    #[test]
    fn round_trip_response() {
        let mut pdu = Acmpdu::command(
            AcmpMessageType::ConnectRxCommand,
            EntityId(1),
            EntityId(2),
            0,
            EntityId(3),
            1,
            42,
            AcmpFlags::FAST_CONNECT,
        );
        pdu.message_type = AcmpMessageType::ConnectRxResponse;
        pdu.stream_id = 0x1111_1111_0000_0001;
        pdu.stream_dest_mac = Mac(0x91E0_F000_0E80);
        pdu.connection_count = 1;
        let frame = pdu.to_frame(Mac(9), Mac(8));
        let parsed = parse_frame(&frame).expect("frame parses");
        assert_eq!(parsed.pdu, Pdu::Acmp(pdu));
    }

    #[test]
    fn command_response_pairing() {
        assert_eq!(
            AcmpMessageType::ConnectRxCommand.response(),
            Some(AcmpMessageType::ConnectRxResponse)
        );
        assert_eq!(AcmpMessageType::ConnectRxResponse.response(), None);
        assert!(AcmpMessageType::GetTxConnectionCommand.is_command());
    }

    #[test]
    fn rejects_truncated() {
        let pdu = Acmpdu::command(
            AcmpMessageType::GetTxStateCommand,
            EntityId(1),
            EntityId(2),
            0,
            EntityId::ZERO,
            0,
            0,
            AcmpFlags::empty(),
        );
        let frame = pdu.to_frame(Mac(9), Mac(8));
        assert!(parse_frame(&frame[..frame.len() - 2]).is_err());
    }
}
