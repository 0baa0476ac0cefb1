//! JACK_INPUT / JACK_OUTPUT descriptor (clause 7.2.7).

use bitflags::bitflags;

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;

bitflags! {
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct JackFlags: u16 {
        const CLOCK_SYNC_SOURCE = 0x0001;
        const CAPTIVE = 0x0002;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JackDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub object_name: LocalizedName,
    pub localized_description: u16,
    pub jack_flags: JackFlags,
    pub jack_type: u16,
    pub number_of_controls: u16,
    pub base_control: u16,
}

impl JackDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        Ok(JackDescriptor {
            descriptor_type: r.u16()?,
            descriptor_index: r.u16()?,
            object_name: r.name()?,
            localized_description: r.u16()?,
            jack_flags: JackFlags::from_bits_truncate(r.u16()?),
            jack_type: r.u16()?,
            number_of_controls: r.u16()?,
            base_control: r.u16()?,
        })
    }
}
