//! ENTITY descriptor (clause 7.2.1), the root of the AEM tree.

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;
use crate::message::adp::{EntityCapabilities, ListenerCapabilities, TalkerCapabilities};
use crate::message::EntityId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub entity_id: EntityId,
    pub entity_model_id: u64,
    pub entity_capabilities: EntityCapabilities,
    pub talker_stream_sources: u16,
    pub talker_capabilities: TalkerCapabilities,
    pub listener_stream_sinks: u16,
    pub listener_capabilities: ListenerCapabilities,
    pub controller_capabilities: u32,
    pub available_index: u32,
    pub association_id: u64,
    pub entity_name: LocalizedName,
    pub vendor_name_string: u16,
    pub model_name_string: u16,
    pub firmware_version: LocalizedName,
    pub group_name: LocalizedName,
    pub serial_number: LocalizedName,
    pub configurations_count: u16,
    pub current_configuration: u16,
}

impl EntityDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        Ok(EntityDescriptor {
            descriptor_type: r.u16()?,
            descriptor_index: r.u16()?,
            entity_id: EntityId(r.u64()?),
            entity_model_id: r.u64()?,
            entity_capabilities: EntityCapabilities::from_bits_truncate(r.u32()?),
            talker_stream_sources: r.u16()?,
            talker_capabilities: TalkerCapabilities::from_bits_truncate(r.u16()?),
            listener_stream_sinks: r.u16()?,
            listener_capabilities: ListenerCapabilities::from_bits_truncate(r.u16()?),
            controller_capabilities: r.u32()?,
            available_index: r.u32()?,
            association_id: r.u64()?,
            entity_name: r.name()?,
            vendor_name_string: r.u16()?,
            model_name_string: r.u16()?,
            firmware_version: r.name()?,
            group_name: r.name()?,
            serial_number: r.name()?,
            configurations_count: r.u16()?,
            current_configuration: r.u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn image(current_configuration: u16) -> Vec<u8> {
        let mut data = Vec::new();
        data.extend_from_slice(&0u16.to_be_bytes()); // ENTITY
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&0x0011_22FF_FE33_4455u64.to_be_bytes());
        data.extend_from_slice(&0xAABB_0000_0000_0001u64.to_be_bytes());
        data.extend_from_slice(&0x0000_0008u32.to_be_bytes()); // AEM_SUPPORTED
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&0x4001u16.to_be_bytes());
        data.extend_from_slice(&2u16.to_be_bytes());
        data.extend_from_slice(&0x4001u16.to_be_bytes());
        data.extend_from_slice(&0u32.to_be_bytes());
        data.extend_from_slice(&1u32.to_be_bytes()); // available_index
        data.extend_from_slice(&0u64.to_be_bytes());
        data.extend_from_slice(&LocalizedName::from_str("Unit Under Test").0);
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&LocalizedName::from_str("1.0.0").0);
        data.extend_from_slice(&LocalizedName::from_str("Lab").0);
        data.extend_from_slice(&LocalizedName::from_str("SN-0001").0);
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&current_configuration.to_be_bytes());
        data
    }

    #[test]
    fn parses_all_fields() {
        let desc = EntityDescriptor::parse(&image(0)).expect("entity parses");
        assert_eq!(desc.entity_id, EntityId(0x0011_22FF_FE33_4455));
        assert_eq!(desc.entity_name.as_string(), "Unit Under Test");
        assert_eq!(desc.configurations_count, 1);
        assert_eq!(desc.current_configuration, 0);
        assert!(desc
            .entity_capabilities
            .contains(EntityCapabilities::AEM_SUPPORTED));
    }

    #[test]
    fn truncation_rejected() {
        let data = image(0);
        assert!(EntityDescriptor::parse(&data[..data.len() - 1]).is_err());
    }
}
