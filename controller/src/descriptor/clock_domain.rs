//! CLOCK_DOMAIN descriptor (clause 7.2.32).

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;

/// Fixed offset of the clock-sources array in 1722.1-2013.
const CLOCK_SOURCES_OFFSET: u16 = 76;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockDomainDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub object_name: LocalizedName,
    pub localized_description: u16,
    /// Index into `clock_sources` of the active source.
    pub clock_source_index: u16,
    /// CLOCK_SOURCE descriptor indices selectable in this domain.
    pub clock_sources: Vec<u16>,
}

impl ClockDomainDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        let descriptor_type = r.u16()?;
        let descriptor_index = r.u16()?;
        let object_name = r.name()?;
        let localized_description = r.u16()?;
        let clock_source_index = r.u16()?;
        let sources_offset = r.u16()?;
        if sources_offset != CLOCK_SOURCES_OFFSET {
            return Err(Error::Malformed("clock domain clock_sources_offset"));
        }
        let sources_count = r.u16()?;
        r.seek(sources_offset as usize)?;
        let mut clock_sources = Vec::with_capacity(sources_count as usize);
        for _ in 0..sources_count {
            clock_sources.push(r.u16()?);
        }
        Ok(ClockDomainDescriptor {
            descriptor_type,
            descriptor_index,
            object_name,
            localized_description,
            clock_source_index,
            clock_sources,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sources() {
        let mut data = Vec::new();
        data.extend_from_slice(&0x0024u16.to_be_bytes()); // CLOCK_DOMAIN
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&LocalizedName::from_str("Domain 0").0);
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&CLOCK_SOURCES_OFFSET.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        let desc = ClockDomainDescriptor::parse(&data).expect("domain parses");
        assert_eq!(desc.clock_source_index, 1);
        assert_eq!(desc.clock_sources, vec![0, 1]);
    }
}
