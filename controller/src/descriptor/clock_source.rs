//! CLOCK_SOURCE descriptor (clause 7.2.9).

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;

pub const CLOCK_SOURCE_TYPE_INTERNAL: u16 = 0x0000;
pub const CLOCK_SOURCE_TYPE_EXTERNAL: u16 = 0x0001;
pub const CLOCK_SOURCE_TYPE_INPUT_STREAM: u16 = 0x0002;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSourceDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub object_name: LocalizedName,
    pub localized_description: u16,
    pub clock_source_flags: u16,
    pub clock_source_type: u16,
    pub clock_source_identifier: u64,
    pub clock_source_location_type: u16,
    pub clock_source_location_index: u16,
}

impl ClockSourceDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        Ok(ClockSourceDescriptor {
            descriptor_type: r.u16()?,
            descriptor_index: r.u16()?,
            object_name: r.name()?,
            localized_description: r.u16()?,
            clock_source_flags: r.u16()?,
            clock_source_type: r.u16()?,
            clock_source_identifier: r.u64()?,
            clock_source_location_type: r.u16()?,
            clock_source_location_index: r.u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses() {
        let mut data = Vec::new();
        data.extend_from_slice(&10u16.to_be_bytes()); // CLOCK_SOURCE
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&LocalizedName::from_str("Stream Clock").0);
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&CLOCK_SOURCE_TYPE_INPUT_STREAM.to_be_bytes());
        data.extend_from_slice(&0u64.to_be_bytes());
        data.extend_from_slice(&0x0005u16.to_be_bytes()); // STREAM_INPUT
        data.extend_from_slice(&0u16.to_be_bytes());
        let desc = ClockSourceDescriptor::parse(&data).expect("clock source parses");
        assert_eq!(desc.clock_source_type, CLOCK_SOURCE_TYPE_INPUT_STREAM);
        assert_eq!(desc.clock_source_location_type, 0x0005);
    }
}
