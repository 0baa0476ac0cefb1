//! AVB_INTERFACE descriptor (clause 7.2.8).

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;
use crate::message::Mac;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvbInterfaceDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub object_name: LocalizedName,
    pub localized_description: u16,
    pub mac_address: Mac,
    pub interface_flags: u16,
    pub clock_identity: u64,
    pub priority1: u8,
    pub clock_class: u8,
    pub offset_scaled_log_variance: u16,
    pub clock_accuracy: u8,
    pub priority2: u8,
    pub domain_number: u8,
    pub log_sync_interval: i8,
    pub log_announce_interval: i8,
    pub log_pdelay_interval: i8,
    pub port_number: u16,
}

impl AvbInterfaceDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        let descriptor_type = r.u16()?;
        let descriptor_index = r.u16()?;
        let object_name = r.name()?;
        let localized_description = r.u16()?;
        let mut mac = [0u8; 6];
        for b in mac.iter_mut() {
            *b = r.u8()?;
        }
        Ok(AvbInterfaceDescriptor {
            descriptor_type,
            descriptor_index,
            object_name,
            localized_description,
            mac_address: Mac::from_bytes(mac),
            interface_flags: r.u16()?,
            clock_identity: r.u64()?,
            priority1: r.u8()?,
            clock_class: r.u8()?,
            offset_scaled_log_variance: r.u16()?,
            clock_accuracy: r.u8()?,
            priority2: r.u8()?,
            domain_number: r.u8()?,
            log_sync_interval: r.u8()? as i8,
            log_announce_interval: r.u8()? as i8,
            log_pdelay_interval: r.u8()? as i8,
            port_number: r.u16()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses() {
        let mut data = Vec::new();
        data.extend_from_slice(&9u16.to_be_bytes()); // AVB_INTERFACE
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&LocalizedName::from_str("eth0").0);
        data.extend_from_slice(&0xFFFFu16.to_be_bytes());
        data.extend_from_slice(&[0x00, 0x1B, 0x21, 0x60, 0x70, 0x80]);
        data.extend_from_slice(&0x0007u16.to_be_bytes());
        data.extend_from_slice(&0x001B_21FF_FE60_7080u64.to_be_bytes());
        data.extend_from_slice(&[248, 248]); // priority1, clock_class
        data.extend_from_slice(&0x4100u16.to_be_bytes());
        data.extend_from_slice(&[0xFE, 248, 0]); // accuracy, priority2, domain
        data.extend_from_slice(&[0xFD, 0x00, 0x00]); // log intervals
        data.extend_from_slice(&1u16.to_be_bytes());
        let desc = AvbInterfaceDescriptor::parse(&data).expect("interface parses");
        assert_eq!(
            desc.mac_address,
            Mac::from_bytes([0x00, 0x1B, 0x21, 0x60, 0x70, 0x80])
        );
        assert_eq!(desc.log_sync_interval, -3);
        assert_eq!(desc.port_number, 1);
    }
}
