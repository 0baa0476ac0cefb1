//! AUDIO_UNIT descriptor (clause 7.2.3).

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;

/// Fixed offset of the sampling-rates array in 1722.1-2013.
const SAMPLING_RATES_OFFSET: u16 = 144;

/// A number/base pair locating a run of child descriptors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChildRange {
    pub number: u16,
    pub base: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioUnitDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub object_name: LocalizedName,
    pub localized_description: u16,
    pub clock_domain_index: u16,
    pub stream_input_ports: ChildRange,
    pub stream_output_ports: ChildRange,
    pub external_input_ports: ChildRange,
    pub external_output_ports: ChildRange,
    pub internal_input_ports: ChildRange,
    pub internal_output_ports: ChildRange,
    pub controls: ChildRange,
    pub signal_selectors: ChildRange,
    pub mixers: ChildRange,
    pub matrices: ChildRange,
    pub splitters: ChildRange,
    pub combiners: ChildRange,
    pub demultiplexers: ChildRange,
    pub multiplexers: ChildRange,
    pub transcoders: ChildRange,
    pub control_blocks: ChildRange,
    /// Pull field and base frequency packed as on the wire.
    pub current_sampling_rate: u32,
    pub sampling_rates: Vec<u32>,
}

impl AudioUnitDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        let descriptor_type = r.u16()?;
        let descriptor_index = r.u16()?;
        let object_name = r.name()?;
        let localized_description = r.u16()?;
        let clock_domain_index = r.u16()?;
        let mut range = || -> Result<ChildRange, Error> {
            Ok(ChildRange {
                number: r.u16()?,
                base: r.u16()?,
            })
        };
        let stream_input_ports = range()?;
        let stream_output_ports = range()?;
        let external_input_ports = range()?;
        let external_output_ports = range()?;
        let internal_input_ports = range()?;
        let internal_output_ports = range()?;
        let controls = range()?;
        let signal_selectors = range()?;
        let mixers = range()?;
        let matrices = range()?;
        let splitters = range()?;
        let combiners = range()?;
        let demultiplexers = range()?;
        let multiplexers = range()?;
        let transcoders = range()?;
        let control_blocks = range()?;
        let current_sampling_rate = r.u32()?;
        let rates_offset = r.u16()?;
        if rates_offset != SAMPLING_RATES_OFFSET {
            return Err(Error::Malformed("audio unit sampling_rates_offset"));
        }
        let rates_count = r.u16()?;
        r.seek(rates_offset as usize)?;
        let mut sampling_rates = Vec::with_capacity(rates_count as usize);
        for _ in 0..rates_count {
            sampling_rates.push(r.u32()?);
        }

        Ok(AudioUnitDescriptor {
            descriptor_type,
            descriptor_index,
            object_name,
            localized_description,
            clock_domain_index,
            stream_input_ports,
            stream_output_ports,
            external_input_ports,
            external_output_ports,
            internal_input_ports,
            internal_output_ports,
            controls,
            signal_selectors,
            mixers,
            matrices,
            splitters,
            combiners,
            demultiplexers,
            multiplexers,
            transcoders,
            control_blocks,
            current_sampling_rate,
            sampling_rates,
        })
    }
}
