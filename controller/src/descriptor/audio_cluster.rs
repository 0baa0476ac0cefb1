//! AUDIO_CLUSTER descriptor (clause 7.2.16).

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClusterDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub object_name: LocalizedName,
    pub localized_description: u16,
    /// Referenced signal source as a (type, index, output) triple.
    pub signal_type: u16,
    pub signal_index: u16,
    pub signal_output: u16,
    pub path_latency: u32,
    pub block_latency: u32,
    pub channel_count: u16,
    pub format: u8,
}

impl AudioClusterDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        Ok(AudioClusterDescriptor {
            descriptor_type: r.u16()?,
            descriptor_index: r.u16()?,
            object_name: r.name()?,
            localized_description: r.u16()?,
            signal_type: r.u16()?,
            signal_index: r.u16()?,
            signal_output: r.u16()?,
            path_latency: r.u32()?,
            block_latency: r.u32()?,
            channel_count: r.u16()?,
            format: r.u8()?,
        })
    }
}
