//! AUDIO_MAP descriptor (clause 7.2.19): stream-channel to cluster-channel
//! mappings.

use crate::descriptor::FieldReader;
use crate::error::Error;

/// Fixed offset of the mappings array in 1722.1-2013.
const MAPPINGS_OFFSET: u16 = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioMapping {
    pub stream_index: u16,
    pub stream_channel: u16,
    pub cluster_offset: u16,
    pub cluster_channel: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioMapDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub mappings: Vec<AudioMapping>,
}

impl AudioMapDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        let descriptor_type = r.u16()?;
        let descriptor_index = r.u16()?;
        let mappings_offset = r.u16()?;
        if mappings_offset != MAPPINGS_OFFSET {
            return Err(Error::Malformed("audio map mappings_offset"));
        }
        let number_of_mappings = r.u16()?;
        r.seek(mappings_offset as usize)?;
        let mut mappings = Vec::with_capacity(number_of_mappings as usize);
        for _ in 0..number_of_mappings {
            mappings.push(AudioMapping {
                stream_index: r.u16()?,
                stream_channel: r.u16()?,
                cluster_offset: r.u16()?,
                cluster_channel: r.u16()?,
            });
        }
        Ok(AudioMapDescriptor {
            descriptor_type,
            descriptor_index,
            mappings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_mappings() {
        let mut data = Vec::new();
        data.extend_from_slice(&23u16.to_be_bytes()); // AUDIO_MAP
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&MAPPINGS_OFFSET.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        for channel in 0..2u16 {
            data.extend_from_slice(&0u16.to_be_bytes());
            data.extend_from_slice(&channel.to_be_bytes());
            data.extend_from_slice(&0u16.to_be_bytes());
            data.extend_from_slice(&channel.to_be_bytes());
        }
        let desc = AudioMapDescriptor::parse(&data).expect("map parses");
        assert_eq!(desc.mappings.len(), 2);
        assert_eq!(desc.mappings[1].stream_channel, 1);
    }

    #[test]
    fn mappings_past_end_rejected() {
        let data = vec![0x00, 0x17, 0x00, 0x00, 0x00, 0x08, 0x00, 0x05];
        assert!(AudioMapDescriptor::parse(&data).is_err());
    }
}
