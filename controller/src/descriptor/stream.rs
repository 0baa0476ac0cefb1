//! STREAM_INPUT / STREAM_OUTPUT descriptor (clause 7.2.6). Both directions
//! share one layout; the variant tag in [`crate::descriptor::Descriptor`]
//! keeps them apart.

use bitflags::bitflags;

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;
use crate::message::EntityId;

/// Fixed size of the 2013 stream descriptor; `formats_offset` must point
/// here. Any other value rejects the descriptor instead of trusting the
/// device.
const STREAM_FORMATS_OFFSET: u16 = 132;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct StreamFlags: u16 {
        const CLOCK_SYNC_SOURCE = 0x0001;
        const CLASS_A = 0x0002;
        const CLASS_B = 0x0004;
        const SUPPORTS_ENCRYPTED = 0x0008;
        const PRIMARY_BACKUP_SUPPORTED = 0x0010;
        const PRIMARY_BACKUP_VALID = 0x0020;
        const SECONDARY_BACKUP_SUPPORTED = 0x0040;
        const SECONDARY_BACKUP_VALID = 0x0080;
        const TERTIARY_BACKUP_SUPPORTED = 0x0100;
        const TERTIARY_BACKUP_VALID = 0x0200;
    }
}

/// An IEEE 1722 stream format code with its symbolic rendering.
#[derive(Clone, Copy, Default, PartialEq, Eq)]
pub struct StreamFormat(pub u64);

impl StreamFormat {
    pub fn name(&self) -> &'static str {
        crate::util::ieee1722_format_name(self.0)
    }
}

impl std::fmt::Debug for StreamFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "StreamFormat(0x{:016X}, {})", self.0, self.name())
    }
}

/// A backup talker reference advertised by a stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackupTalker {
    pub entity_id: EntityId,
    pub unique_id: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub object_name: LocalizedName,
    pub localized_description: u16,
    pub clock_domain_index: u16,
    pub stream_flags: StreamFlags,
    pub current_format: StreamFormat,
    pub supported_formats: Vec<StreamFormat>,
    pub backup_talkers: [BackupTalker; 3],
    pub backedup_talker: BackupTalker,
    pub avb_interface_index: u16,
    pub buffer_length: u32,
}

impl StreamDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        let descriptor_type = r.u16()?;
        let descriptor_index = r.u16()?;
        let object_name = r.name()?;
        let localized_description = r.u16()?;
        let clock_domain_index = r.u16()?;
        let stream_flags = StreamFlags::from_bits_truncate(r.u16()?);
        let current_format = StreamFormat(r.u64()?);
        let formats_offset = r.u16()?;
        if formats_offset != STREAM_FORMATS_OFFSET {
            return Err(Error::Malformed("stream descriptor formats_offset"));
        }
        // Zero formats is legal; the list simply stays empty.
        let number_of_formats = r.u16()?;
        let mut backup_talkers = [BackupTalker::default(); 3];
        for backup in backup_talkers.iter_mut() {
            backup.entity_id = EntityId(r.u64()?);
            backup.unique_id = r.u16()?;
        }
        let backedup_talker = BackupTalker {
            entity_id: EntityId(r.u64()?),
            unique_id: r.u16()?,
        };
        let avb_interface_index = r.u16()?;
        let buffer_length = r.u32()?;

        r.seek(formats_offset as usize)?;
        let mut supported_formats = Vec::with_capacity(number_of_formats as usize);
        for _ in 0..number_of_formats {
            supported_formats.push(StreamFormat(r.u64()?));
        }

        Ok(StreamDescriptor {
            descriptor_type,
            descriptor_index,
            object_name,
            localized_description,
            clock_domain_index,
            stream_flags,
            current_format,
            supported_formats,
            backup_talkers,
            backedup_talker,
            avb_interface_index,
            buffer_length,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn image(descriptor_type: u16, index: u16, formats: &[u64]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&descriptor_type.to_be_bytes());
        data.extend_from_slice(&index.to_be_bytes());
        data.extend_from_slice(&LocalizedName::from_str("Stream").0);
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // clock_domain_index
        data.extend_from_slice(&0x0003u16.to_be_bytes()); // CLOCK_SYNC_SOURCE | CLASS_A
        data.extend_from_slice(&0x00A0_0202_4000_0200u64.to_be_bytes());
        data.extend_from_slice(&STREAM_FORMATS_OFFSET.to_be_bytes());
        data.extend_from_slice(&(formats.len() as u16).to_be_bytes());
        for _ in 0..3 {
            data.extend_from_slice(&0u64.to_be_bytes());
            data.extend_from_slice(&0u16.to_be_bytes());
        }
        data.extend_from_slice(&0u64.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes()); // avb_interface_index
        data.extend_from_slice(&576u32.to_be_bytes()); // buffer_length
        for format in formats {
            data.extend_from_slice(&format.to_be_bytes());
        }
        data
    }

    #[test]
    fn parses_flags_and_formats() {
        let desc = StreamDescriptor::parse(&image(
            0x0005,
            0,
            &[0x00A0_0201_4000_0100, 0x00A0_0202_4000_0200],
        ))
        .expect("stream parses");
        assert!(desc.stream_flags.contains(StreamFlags::CLOCK_SYNC_SOURCE));
        assert!(desc.stream_flags.contains(StreamFlags::CLASS_A));
        assert!(!desc.stream_flags.contains(StreamFlags::CLASS_B));
        assert_eq!(desc.current_format.name(), "IEC61883_AM824_MBLA_48KHZ_2CH");
        assert_eq!(desc.supported_formats.len(), 2);
        assert_eq!(desc.buffer_length, 576);
    }

    #[test]
    fn zero_formats_is_legal() {
        let desc = StreamDescriptor::parse(&image(0x0005, 0, &[])).expect("stream parses");
        assert!(desc.supported_formats.is_empty());
    }

    #[test]
    fn nonstandard_formats_offset_rejected() {
        let mut data = image(0x0005, 0, &[0x00A0_0202_4000_0200]);
        data[83] = 140; // formats_offset low byte
        assert!(StreamDescriptor::parse(&data).is_err());
    }

    #[test]
    fn formats_past_end_rejected() {
        let mut data = image(0x0005, 0, &[0x00A0_0202_4000_0200]);
        data[85] = 4; // number_of_formats low byte
        assert!(StreamDescriptor::parse(&data).is_err());
    }
}
