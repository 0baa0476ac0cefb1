//! Typed AEM descriptors (IEEE 1722.1 clause 7.2).
//!
//! Every descriptor is decoded eagerly into a value type at parse time; the
//! network buffer is never retained. Cross-descriptor references stay as
//! `(descriptor_type, descriptor_index)` keys resolved through the
//! [`registry::DescriptorRegistry`], which keeps cycles in the AEM tree
//! harmless.

use num::FromPrimitive;

use crate::error::Error;

pub mod audio_cluster;
pub mod audio_map;
pub mod audio_unit;
pub mod avb_interface;
pub mod clock_domain;
pub mod clock_source;
pub mod configuration;
pub mod entity;
pub mod jack;
pub mod locale;
pub mod registry;
pub mod stream;
pub mod stream_port;

pub use audio_cluster::AudioClusterDescriptor;
pub use audio_map::{AudioMapDescriptor, AudioMapping};
pub use audio_unit::AudioUnitDescriptor;
pub use avb_interface::AvbInterfaceDescriptor;
pub use clock_domain::ClockDomainDescriptor;
pub use clock_source::ClockSourceDescriptor;
pub use configuration::{ConfigurationDescriptor, DescriptorCount};
pub use entity::EntityDescriptor;
pub use jack::JackDescriptor;
pub use locale::{LocaleDescriptor, StringsDescriptor};
pub use registry::DescriptorRegistry;
pub use stream::{StreamDescriptor, StreamFlags, StreamFormat};
pub use stream_port::StreamPortDescriptor;

/// AEM descriptor type codes (table 7.1).
#[repr(u16)]
#[derive(FromPrimitive, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DescriptorType {
    Entity = 0x0000,
    Configuration = 0x0001,
    AudioUnit = 0x0002,
    VideoUnit = 0x0003,
    SensorUnit = 0x0004,
    StreamInput = 0x0005,
    StreamOutput = 0x0006,
    JackInput = 0x0007,
    JackOutput = 0x0008,
    AvbInterface = 0x0009,
    ClockSource = 0x000A,
    MemoryObject = 0x000B,
    Locale = 0x000C,
    Strings = 0x000D,
    StreamPortInput = 0x000E,
    StreamPortOutput = 0x000F,
    ExternalPortInput = 0x0010,
    ExternalPortOutput = 0x0011,
    InternalPortInput = 0x0012,
    InternalPortOutput = 0x0013,
    AudioCluster = 0x0014,
    AudioMap = 0x0017,
    Control = 0x001A,
    SignalSelector = 0x001B,
    Mixer = 0x001C,
    Matrix = 0x001D,
    ClockDomain = 0x0024,
}

/// A 64-octet localized name buffer, NUL padded on the wire.
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct LocalizedName(pub [u8; 64]);

impl LocalizedName {
    pub fn from_str(name: &str) -> Self {
        let mut buf = [0u8; 64];
        let take = name.len().min(64);
        buf[..take].copy_from_slice(&name.as_bytes()[..take]);
        LocalizedName(buf)
    }

    pub fn as_string(&self) -> String {
        let end = self.0.iter().position(|&b| b == 0).unwrap_or(64);
        String::from_utf8_lossy(&self.0[..end]).into_owned()
    }
}

impl Default for LocalizedName {
    fn default() -> Self {
        LocalizedName([0u8; 64])
    }
}

impl std::fmt::Debug for LocalizedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self.as_string())
    }
}

impl std::fmt::Display for LocalizedName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.as_string())
    }
}

/// Bounds-checked big-endian field reader over a descriptor image.
pub(crate) struct FieldReader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> FieldReader<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        FieldReader { buf, pos: 0 }
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], Error> {
        if self.buf.len() - self.pos < len {
            return Err(Error::Malformed("descriptor truncated"));
        }
        let slice = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub fn u8(&mut self) -> Result<u8, Error> {
        Ok(self.take(1)?[0])
    }

    pub fn u16(&mut self) -> Result<u16, Error> {
        let b = self.take(2)?;
        Ok(u16::from_be_bytes([b[0], b[1]]))
    }

    pub fn u32(&mut self) -> Result<u32, Error> {
        let b = self.take(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn u64(&mut self) -> Result<u64, Error> {
        let b = self.take(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn name(&mut self) -> Result<LocalizedName, Error> {
        let b = self.take(64)?;
        let mut buf = [0u8; 64];
        buf.copy_from_slice(b);
        Ok(LocalizedName(buf))
    }

    pub fn skip(&mut self, len: usize) -> Result<(), Error> {
        self.take(len).map(|_| ())
    }

    /// Absolute offset from the start of the descriptor image, for
    /// offset-addressed arrays (formats, sampling rates, mappings).
    pub fn seek(&mut self, offset: usize) -> Result<(), Error> {
        if offset > self.buf.len() {
            return Err(Error::Malformed("descriptor offset out of range"));
        }
        self.pos = offset;
        Ok(())
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}

/// One AEM descriptor, keyed by `(descriptor_type, descriptor_index)`.
/// Types without a typed variant are held raw so enumeration completeness
/// is still observable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Descriptor {
    Entity(EntityDescriptor),
    Configuration(ConfigurationDescriptor),
    AudioUnit(AudioUnitDescriptor),
    StreamInput(StreamDescriptor),
    StreamOutput(StreamDescriptor),
    JackInput(JackDescriptor),
    JackOutput(JackDescriptor),
    AvbInterface(AvbInterfaceDescriptor),
    ClockSource(ClockSourceDescriptor),
    Locale(LocaleDescriptor),
    Strings(StringsDescriptor),
    StreamPortInput(StreamPortDescriptor),
    StreamPortOutput(StreamPortDescriptor),
    AudioCluster(AudioClusterDescriptor),
    AudioMap(AudioMapDescriptor),
    ClockDomain(ClockDomainDescriptor),
    Other(RawDescriptor),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub data: Vec<u8>,
}

impl Descriptor {
    /// Decode a descriptor image beginning at its `descriptor_type` field.
    pub fn parse(data: &[u8]) -> Result<Descriptor, Error> {
        if data.len() < 4 {
            return Err(Error::Malformed("descriptor shorter than header"));
        }
        let descriptor_type = u16::from_be_bytes([data[0], data[1]]);
        let descriptor = match DescriptorType::from_u16(descriptor_type) {
            Some(DescriptorType::Entity) => Descriptor::Entity(EntityDescriptor::parse(data)?),
            Some(DescriptorType::Configuration) => {
                Descriptor::Configuration(ConfigurationDescriptor::parse(data)?)
            }
            Some(DescriptorType::AudioUnit) => {
                Descriptor::AudioUnit(AudioUnitDescriptor::parse(data)?)
            }
            Some(DescriptorType::StreamInput) => {
                Descriptor::StreamInput(StreamDescriptor::parse(data)?)
            }
            Some(DescriptorType::StreamOutput) => {
                Descriptor::StreamOutput(StreamDescriptor::parse(data)?)
            }
            Some(DescriptorType::JackInput) => Descriptor::JackInput(JackDescriptor::parse(data)?),
            Some(DescriptorType::JackOutput) => {
                Descriptor::JackOutput(JackDescriptor::parse(data)?)
            }
            Some(DescriptorType::AvbInterface) => {
                Descriptor::AvbInterface(AvbInterfaceDescriptor::parse(data)?)
            }
            Some(DescriptorType::ClockSource) => {
                Descriptor::ClockSource(ClockSourceDescriptor::parse(data)?)
            }
            Some(DescriptorType::Locale) => Descriptor::Locale(LocaleDescriptor::parse(data)?),
            Some(DescriptorType::Strings) => Descriptor::Strings(StringsDescriptor::parse(data)?),
            Some(DescriptorType::StreamPortInput) => {
                Descriptor::StreamPortInput(StreamPortDescriptor::parse(data)?)
            }
            Some(DescriptorType::StreamPortOutput) => {
                Descriptor::StreamPortOutput(StreamPortDescriptor::parse(data)?)
            }
            Some(DescriptorType::AudioCluster) => {
                Descriptor::AudioCluster(AudioClusterDescriptor::parse(data)?)
            }
            Some(DescriptorType::AudioMap) => {
                Descriptor::AudioMap(AudioMapDescriptor::parse(data)?)
            }
            Some(DescriptorType::ClockDomain) => {
                Descriptor::ClockDomain(ClockDomainDescriptor::parse(data)?)
            }
            _ => Descriptor::Other(RawDescriptor {
                descriptor_type,
                descriptor_index: u16::from_be_bytes([data[2], data[3]]),
                data: data.to_vec(),
            }),
        };
        Ok(descriptor)
    }

    pub fn descriptor_type(&self) -> u16 {
        match self {
            Descriptor::Entity(d) => d.descriptor_type,
            Descriptor::Configuration(d) => d.descriptor_type,
            Descriptor::AudioUnit(d) => d.descriptor_type,
            Descriptor::StreamInput(d) | Descriptor::StreamOutput(d) => d.descriptor_type,
            Descriptor::JackInput(d) | Descriptor::JackOutput(d) => d.descriptor_type,
            Descriptor::AvbInterface(d) => d.descriptor_type,
            Descriptor::ClockSource(d) => d.descriptor_type,
            Descriptor::Locale(d) => d.descriptor_type,
            Descriptor::Strings(d) => d.descriptor_type,
            Descriptor::StreamPortInput(d) | Descriptor::StreamPortOutput(d) => d.descriptor_type,
            Descriptor::AudioCluster(d) => d.descriptor_type,
            Descriptor::AudioMap(d) => d.descriptor_type,
            Descriptor::ClockDomain(d) => d.descriptor_type,
            Descriptor::Other(d) => d.descriptor_type,
        }
    }

    pub fn descriptor_index(&self) -> u16 {
        match self {
            Descriptor::Entity(d) => d.descriptor_index,
            Descriptor::Configuration(d) => d.descriptor_index,
            Descriptor::AudioUnit(d) => d.descriptor_index,
            Descriptor::StreamInput(d) | Descriptor::StreamOutput(d) => d.descriptor_index,
            Descriptor::JackInput(d) | Descriptor::JackOutput(d) => d.descriptor_index,
            Descriptor::AvbInterface(d) => d.descriptor_index,
            Descriptor::ClockSource(d) => d.descriptor_index,
            Descriptor::Locale(d) => d.descriptor_index,
            Descriptor::Strings(d) => d.descriptor_index,
            Descriptor::StreamPortInput(d) | Descriptor::StreamPortOutput(d) => d.descriptor_index,
            Descriptor::AudioCluster(d) => d.descriptor_index,
            Descriptor::AudioMap(d) => d.descriptor_index,
            Descriptor::ClockDomain(d) => d.descriptor_index,
            Descriptor::Other(d) => d.descriptor_index,
        }
    }

    pub fn type_name(&self) -> &'static str {
        crate::util::descriptor_name(self.descriptor_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn localized_name_trims_padding() {
        let name = LocalizedName::from_str("Input 1");
        assert_eq!(name.as_string(), "Input 1");
        assert_eq!(format!("{name}"), "Input 1");
    }

    #[test]
    fn unmodeled_type_parses_raw() {
        let mut data = vec![0x00, 0x1A, 0x00, 0x03]; // CONTROL, index 3
        data.extend_from_slice(&[0xAB; 16]);
        let parsed = Descriptor::parse(&data).expect("raw parse");
        assert_eq!(parsed.descriptor_type(), 0x001A);
        assert_eq!(parsed.descriptor_index(), 3);
        assert!(matches!(parsed, Descriptor::Other(_)));
    }

    #[test]
    fn short_image_rejected() {
        assert!(Descriptor::parse(&[0x00]).is_err());
    }
}
