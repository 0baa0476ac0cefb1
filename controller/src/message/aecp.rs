//! AECP AEM codec (IEEE 1722.1 clause 9.2).
//!
//! After the common control header (`stream_id` carries the target
//! entity_id) every AEM PDU continues with:
//! - 08 controller_entity_id
//! - 02 sequence_id
//! - 02 u (1) | command_type (15)
//! - vr command-specific payload
//!
//! The command-specific payload is kept as raw bytes here; descriptor
//! bodies are decoded by [`crate::descriptor`], command payloads by the
//! builder functions below.

use bytes::{BufMut, BytesMut};
use num::FromPrimitive;

use crate::constants::{AECPDU_AEM_BASE_LEN, SUBTYPE_AECP};
use crate::error::Error;
use crate::message::{encode_ethernet_header, ControlHeader, EntityId, Mac};
use crate::CommandPayload;

#[repr(u8)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AecpMessageType {
    AemCommand = 0,
    AemResponse = 1,
}

/// AEM command types used by this controller. The wire field is 15 bits;
/// values outside this set still flow through the state machine as raw
/// `u16`s.
#[repr(u16)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq)]
pub enum AemCommandType {
    AcquireEntity = 0x0000,
    LockEntity = 0x0001,
    EntityAvailable = 0x0002,
    ControllerAvailable = 0x0003,
    ReadDescriptor = 0x0004,
    SetConfiguration = 0x0006,
    GetConfiguration = 0x0007,
    SetStreamFormat = 0x0008,
    GetStreamFormat = 0x0009,
    SetStreamInfo = 0x000E,
    GetStreamInfo = 0x000F,
    SetName = 0x0010,
    GetName = 0x0011,
    SetSamplingRate = 0x0014,
    GetSamplingRate = 0x0015,
    SetClockSource = 0x0016,
    GetClockSource = 0x0017,
    StartStreaming = 0x0022,
    StopStreaming = 0x0023,
    RegisterUnsolicitedNotification = 0x0024,
    DeregisterUnsolicitedNotification = 0x0025,
    GetAvbInfo = 0x0027,
    GetCounters = 0x0029,
}

pub const AEM_STATUS_SUCCESS: u8 = 0;
pub const AEM_STATUS_NOT_IMPLEMENTED: u8 = 1;
pub const AEM_STATUS_NO_SUCH_DESCRIPTOR: u8 = 2;
pub const AEM_STATUS_IN_PROGRESS: u8 = 9;
pub const AEM_STATUS_NOT_SUPPORTED: u8 = 11;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AemPdu {
    pub message_type: AecpMessageType,
    pub status: u8,
    pub target_entity_id: EntityId,
    pub controller_entity_id: EntityId,
    pub sequence_id: u16,
    pub unsolicited: bool,
    pub command_type: u16,
    pub payload: CommandPayload,
}

impl AemPdu {
    pub fn command(
        target_entity_id: EntityId,
        controller_entity_id: EntityId,
        sequence_id: u16,
        command_type: u16,
        payload: CommandPayload,
    ) -> Self {
        AemPdu {
            message_type: AecpMessageType::AemCommand,
            status: AEM_STATUS_SUCCESS,
            target_entity_id,
            controller_entity_id,
            sequence_id,
            unsolicited: false,
            command_type,
            payload,
        }
    }

    /// The SUCCESS response answering `command`, payload echoed.
    pub fn response_to(command: &AemPdu) -> Self {
        AemPdu {
            message_type: AecpMessageType::AemResponse,
            ..command.clone()
        }
    }

    pub fn command_name(&self) -> &'static str {
        crate::util::aem_command_name(self.command_type)
    }

    pub fn to_frame(&self, dest: Mac, src: Mac) -> BytesMut {
        let mut out = BytesMut::with_capacity(64 + self.payload.len());
        encode_ethernet_header(&mut out, dest, src);
        ControlHeader {
            subtype: SUBTYPE_AECP,
            message_type: self.message_type as u8,
            status_field: self.status & 0x1F,
            control_data_length: AECPDU_AEM_BASE_LEN + self.payload.len() as u16,
            stream_id: self.target_entity_id.0,
        }
        .encode(&mut out);
        out.put_u64(self.controller_entity_id.0);
        out.put_u16(self.sequence_id);
        out.put_u16((self.unsolicited as u16) << 15 | self.command_type & 0x7FFF);
        out.put_slice(&self.payload);
        out
    }
}

pub(crate) fn parse(header: &ControlHeader, body: &[u8]) -> Result<AemPdu, Error> {
    let message_type = AecpMessageType::from_u8(header.message_type)
        .ok_or(Error::Malformed("unsupported AECP message type"))?;
    if body.len() < AECPDU_AEM_BASE_LEN as usize {
        return Err(Error::Malformed("AECPDU truncated"));
    }
    let controller_entity_id = EntityId(u64::from_be_bytes(
        body[0..8].try_into().expect("slice of 8"),
    ));
    let sequence_id = u16::from_be_bytes([body[8], body[9]]);
    let raw_command = u16::from_be_bytes([body[10], body[11]]);
    let payload = CommandPayload::from_slice(&body[12..])
        .map_err(|_| Error::Malformed("AECP payload too large"))?;

    Ok(AemPdu {
        message_type,
        status: header.status_field,
        target_entity_id: EntityId(header.stream_id),
        controller_entity_id,
        sequence_id,
        unsolicited: raw_command >> 15 == 1,
        command_type: raw_command & 0x7FFF,
        payload,
    })
}

fn payload_of(fields: &[&[u8]]) -> CommandPayload {
    let mut payload = CommandPayload::new();
    for field in fields {
        payload
            .extend_from_slice(field)
            .expect("builder payload within capacity");
    }
    payload
}

/// READ_DESCRIPTOR command payload (clause 7.4.5.1).
pub fn read_descriptor(
    configuration_index: u16,
    descriptor_type: u16,
    descriptor_index: u16,
) -> CommandPayload {
    payload_of(&[
        &configuration_index.to_be_bytes(),
        &[0, 0],
        &descriptor_type.to_be_bytes(),
        &descriptor_index.to_be_bytes(),
    ])
}

/// ACQUIRE_ENTITY / LOCK_ENTITY share one shape (clauses 7.4.1, 7.4.2).
pub fn acquire_entity(
    flags: u32,
    owner_id: EntityId,
    descriptor_type: u16,
    descriptor_index: u16,
) -> CommandPayload {
    payload_of(&[
        &flags.to_be_bytes(),
        &owner_id.0.to_be_bytes(),
        &descriptor_type.to_be_bytes(),
        &descriptor_index.to_be_bytes(),
    ])
}

/// SET_CONFIGURATION payload (clause 7.4.7).
pub fn set_configuration(configuration_index: u16) -> CommandPayload {
    payload_of(&[&[0, 0], &configuration_index.to_be_bytes()])
}

/// Commands addressing a bare (descriptor_type, descriptor_index) pair:
/// GET_STREAM_FORMAT, START/STOP_STREAMING, GET_STREAM_INFO, GET_COUNTERS,
/// GET_AVB_INFO, GET_SAMPLING_RATE, GET_CLOCK_SOURCE.
pub fn descriptor_only(descriptor_type: u16, descriptor_index: u16) -> CommandPayload {
    payload_of(&[
        &descriptor_type.to_be_bytes(),
        &descriptor_index.to_be_bytes(),
    ])
}

/// SET_STREAM_FORMAT payload (clause 7.4.9).
pub fn set_stream_format(
    descriptor_type: u16,
    descriptor_index: u16,
    stream_format: u64,
) -> CommandPayload {
    payload_of(&[
        &descriptor_type.to_be_bytes(),
        &descriptor_index.to_be_bytes(),
        &stream_format.to_be_bytes(),
    ])
}

/// SET_NAME / GET_NAME payloads (clauses 7.4.16, 7.4.17).
pub fn set_name(
    descriptor_type: u16,
    descriptor_index: u16,
    name_index: u16,
    configuration_index: u16,
    name: &[u8; 64],
) -> CommandPayload {
    payload_of(&[
        &descriptor_type.to_be_bytes(),
        &descriptor_index.to_be_bytes(),
        &name_index.to_be_bytes(),
        &configuration_index.to_be_bytes(),
        name,
    ])
}

pub fn get_name(
    descriptor_type: u16,
    descriptor_index: u16,
    name_index: u16,
    configuration_index: u16,
) -> CommandPayload {
    payload_of(&[
        &descriptor_type.to_be_bytes(),
        &descriptor_index.to_be_bytes(),
        &name_index.to_be_bytes(),
        &configuration_index.to_be_bytes(),
    ])
}

/// SET_SAMPLING_RATE payload (clause 7.4.21).
pub fn set_sampling_rate(
    descriptor_type: u16,
    descriptor_index: u16,
    sampling_rate: u32,
) -> CommandPayload {
    payload_of(&[
        &descriptor_type.to_be_bytes(),
        &descriptor_index.to_be_bytes(),
        &sampling_rate.to_be_bytes(),
    ])
}

/// SET_CLOCK_SOURCE payload (clause 7.4.23).
pub fn set_clock_source(
    descriptor_type: u16,
    descriptor_index: u16,
    clock_source_index: u16,
) -> CommandPayload {
    payload_of(&[
        &descriptor_type.to_be_bytes(),
        &descriptor_index.to_be_bytes(),
        &clock_source_index.to_be_bytes(),
        &[0, 0],
    ])
}

/// READ_DESCRIPTOR response payload split into its envelope and the raw
/// descriptor bytes (clause 7.4.5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadDescriptorResponse<'a> {
    pub configuration_index: u16,
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub descriptor: &'a [u8],
}

impl<'a> ReadDescriptorResponse<'a> {
    pub fn parse(payload: &'a [u8]) -> Result<Self, Error> {
        if payload.len() < 8 {
            return Err(Error::Malformed("READ_DESCRIPTOR response truncated"));
        }
        Ok(ReadDescriptorResponse {
            configuration_index: u16::from_be_bytes([payload[0], payload[1]]),
            descriptor_type: u16::from_be_bytes([payload[4], payload[5]]),
            descriptor_index: u16::from_be_bytes([payload[6], payload[7]]),
            descriptor: &payload[4..],
        })
    }
}

/// The (descriptor_type, descriptor_index) pair a command or response is
/// about, for notification routing. Commands without one yield (0, 0).
pub fn descriptor_ref(command_type: u16, payload: &[u8]) -> (u16, u16) {
    let at = |offset: usize| {
        if payload.len() >= offset + 4 {
            (
                u16::from_be_bytes([payload[offset], payload[offset + 1]]),
                u16::from_be_bytes([payload[offset + 2], payload[offset + 3]]),
            )
        } else {
            (0, 0)
        }
    };
    match AemCommandType::from_u16(command_type) {
        Some(AemCommandType::ReadDescriptor) => at(4),
        Some(AemCommandType::AcquireEntity) | Some(AemCommandType::LockEntity) => at(12),
        Some(AemCommandType::EntityAvailable)
        | Some(AemCommandType::ControllerAvailable)
        | Some(AemCommandType::SetConfiguration)
        | Some(AemCommandType::GetConfiguration)
        | Some(AemCommandType::RegisterUnsolicitedNotification)
        | Some(AemCommandType::DeregisterUnsolicitedNotification)
        | None => (0, 0),
        Some(_) => at(0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{parse_frame, Pdu};
    use hex_literal::hex;

    const TARGET: EntityId = EntityId(0x0011_22FF_FE33_4455);
    const CONTROLLER: EntityId = EntityId(0x0022_44FF_FE66_8899);

    #[test]
    fn read_descriptor_command_golden() {
        let pdu = AemPdu::command(
            TARGET,
            CONTROLLER,
            0,
            AemCommandType::ReadDescriptor as u16,
            read_descriptor(0, 0x0000, 0),
        );
        let frame = pdu.to_frame(Mac(0x0011_2233_4455), Mac(0x0022_4466_8899));
        let expected = hex!(
            "001122334455"         // dest
            "002244668899"         // src
            "22f0"
            "fb"                   // cd=1, subtype AECP
            "00"                   // AEM_COMMAND
            "0014"                 // status 0, cd_len 20
            "001122fffe334455"     // target_entity_id
            "002244fffe668899"     // controller_entity_id
            "0000"                 // sequence_id
            "0004"                 // READ_DESCRIPTOR
            "0000"                 // configuration_index
            "0000"                 // reserved
            "0000"                 // ENTITY
            "0000"                 // index 0
        );
        assert_eq!(&frame[..], &expected[..]);
    }

    #[test]
    fn round_trip_response_with_u_bit() {
        let mut pdu = AemPdu::command(
            TARGET,
            CONTROLLER,
            0xFF00,
            AemCommandType::SetStreamFormat as u16,
            set_stream_format(0x0005, 0, 0x00A0_0202_4000_0200),
        );
        pdu.message_type = AecpMessageType::AemResponse;
        pdu.unsolicited = true;
        let frame = pdu.to_frame(Mac(2), Mac(3));
        let parsed = parse_frame(&frame).expect("frame parses");
        assert_eq!(parsed.pdu, Pdu::Aecp(pdu));
    }

    #[test]
    fn parse_rejects_unknown_message_type() {
        let pdu = AemPdu::command(TARGET, CONTROLLER, 1, 0x0004, CommandPayload::new());
        let mut frame = pdu.to_frame(Mac(2), Mac(3)).to_vec();
        frame[15] = 0x04; // AVC command, unsupported
        assert!(parse_frame(&frame).is_err());
    }

    #[test]
    fn read_descriptor_response_envelope() {
        let payload = hex!(
            "0000"             // configuration_index
            "0000"             // reserved
            "0001"             // CONFIGURATION
            "0000"             // index
            "aabb"             // descriptor bytes continue
        );
        let resp = ReadDescriptorResponse::parse(&payload).expect("parses");
        assert_eq!(resp.descriptor_type, 0x0001);
        assert_eq!(resp.descriptor_index, 0);
        assert_eq!(resp.descriptor.len(), 6);
    }

    #[test]
    fn descriptor_ref_offsets() {
        let read = read_descriptor(0, 0x0005, 3);
        assert_eq!(
            descriptor_ref(AemCommandType::ReadDescriptor as u16, &read),
            (0x0005, 3)
        );
        let acquire = acquire_entity(0, EntityId(9), 0x0000, 0);
        assert_eq!(
            descriptor_ref(AemCommandType::AcquireEntity as u16, &acquire),
            (0x0000, 0)
        );
        let fmt = set_stream_format(0x0006, 1, 0);
        assert_eq!(
            descriptor_ref(AemCommandType::SetStreamFormat as u16, &fmt),
            (0x0006, 1)
        );
        assert_eq!(
            descriptor_ref(AemCommandType::EntityAvailable as u16, &[]),
            (0, 0)
        );
    }
}
