//! STREAM_PORT_INPUT / STREAM_PORT_OUTPUT descriptor (clause 7.2.13).

use bitflags::bitflags;

use crate::descriptor::FieldReader;
use crate::error::Error;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct PortFlags: u16 {
        const CLOCK_SYNC_SOURCE = 0x0001;
        const ASYNC_SAMPLE_RATE_CONV = 0x0002;
        const SYNC_SAMPLE_RATE_CONV = 0x0004;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamPortDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub clock_domain_index: u16,
    pub port_flags: PortFlags,
    pub number_of_controls: u16,
    pub base_control: u16,
    pub number_of_clusters: u16,
    pub base_cluster: u16,
    pub number_of_maps: u16,
    pub base_map: u16,
}

impl StreamPortDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        Ok(StreamPortDescriptor {
            descriptor_type: r.u16()?,
            descriptor_index: r.u16()?,
            clock_domain_index: r.u16()?,
            port_flags: PortFlags::from_bits_truncate(r.u16()?),
            number_of_controls: r.u16()?,
            base_control: r.u16()?,
            number_of_clusters: r.u16()?,
            base_cluster: r.u16()?,
            number_of_maps: r.u16()?,
            base_map: r.u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses() {
        let data: Vec<u8> = [
            14u16, 0, // STREAM_PORT_INPUT, index 0
            0,     // clock_domain_index
            0x0001, // CLOCK_SYNC_SOURCE
            0, 0, // controls
            2, 0, // clusters
            1, 0, // maps
        ]
        .iter()
        .flat_map(|v| v.to_be_bytes())
        .collect();
        let desc = StreamPortDescriptor::parse(&data).expect("port parses");
        assert!(desc.port_flags.contains(PortFlags::CLOCK_SYNC_SOURCE));
        assert_eq!(desc.number_of_clusters, 2);
        assert_eq!(desc.number_of_maps, 1);
    }
}
