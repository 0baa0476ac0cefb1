//! CONFIGURATION descriptor (clause 7.2.2). Its `descriptor_counts` array
//! is the map the enumeration walk follows.

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;

/// Fixed offset of the `descriptor_counts` array from the start of the
/// descriptor in 1722.1-2013.
const DESCRIPTOR_COUNTS_OFFSET: u16 = 74;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DescriptorCount {
    pub descriptor_type: u16,
    pub count: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigurationDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub object_name: LocalizedName,
    pub localized_description: u16,
    pub descriptor_counts: Vec<DescriptorCount>,
}

impl ConfigurationDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        let descriptor_type = r.u16()?;
        let descriptor_index = r.u16()?;
        let object_name = r.name()?;
        let localized_description = r.u16()?;
        let counts_count = r.u16()?;
        let counts_offset = r.u16()?;
        if counts_offset != DESCRIPTOR_COUNTS_OFFSET {
            return Err(Error::Malformed("configuration descriptor_counts_offset"));
        }
        r.seek(counts_offset as usize)?;
        let mut descriptor_counts = Vec::with_capacity(counts_count as usize);
        for _ in 0..counts_count {
            descriptor_counts.push(DescriptorCount {
                descriptor_type: r.u16()?,
                count: r.u16()?,
            });
        }
        Ok(ConfigurationDescriptor {
            descriptor_type,
            descriptor_index,
            object_name,
            localized_description,
            descriptor_counts,
        })
    }

    /// Count advertised for one descriptor type, 0 when absent.
    pub fn count_of(&self, descriptor_type: u16) -> u16 {
        self.descriptor_counts
            .iter()
            .find(|c| c.descriptor_type == descriptor_type)
            .map(|c| c.count)
            .unwrap_or(0)
    }

    /// Total number of (type, index) pairs this configuration advertises.
    pub fn total_descriptors(&self) -> usize {
        self.descriptor_counts
            .iter()
            .map(|c| c.count as usize)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(super) fn image(counts: &[(u16, u16)]) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&1u16.to_be_bytes()); // CONFIGURATION
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&LocalizedName::from_str("Default").0);
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
        data.extend_from_slice(&(counts.len() as u16).to_be_bytes());
        data.extend_from_slice(&DESCRIPTOR_COUNTS_OFFSET.to_be_bytes());
        for (descriptor_type, count) in counts {
            data.extend_from_slice(&descriptor_type.to_be_bytes());
            data.extend_from_slice(&count.to_be_bytes());
        }
        data
    }

    #[test]
    fn parses_counts_array() {
        let desc = ConfigurationDescriptor::parse(&image(&[
            (0x0002, 1), // AUDIO_UNIT
            (0x0005, 2), // STREAM_INPUT
            (0x0006, 2), // STREAM_OUTPUT
            (0x0009, 1), // AVB_INTERFACE
        ]))
        .expect("configuration parses");
        assert_eq!(desc.descriptor_counts.len(), 4);
        assert_eq!(desc.count_of(0x0005), 2);
        assert_eq!(desc.count_of(0x0024), 0);
        assert_eq!(desc.total_descriptors(), 6);
    }

    #[test]
    fn rejects_nonstandard_counts_offset() {
        let mut data = image(&[(0x0005, 1)]);
        data[73] = 76; // counts_offset low byte
        assert!(ConfigurationDescriptor::parse(&data).is_err());
    }

    #[test]
    fn rejects_counts_past_end() {
        let mut data = image(&[(0x0005, 1)]);
        data[71] = 9; // counts_count low byte, array truncated
        assert!(ConfigurationDescriptor::parse(&data).is_err());
    }
}
