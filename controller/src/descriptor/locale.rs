//! LOCALE and STRINGS descriptors (clauses 7.2.11, 7.2.12). A locale names
//! a run of STRINGS descriptors; each STRINGS descriptor carries seven
//! 64-octet entries referenced by localized_description fields elsewhere.

use crate::descriptor::{FieldReader, LocalizedName};
use crate::error::Error;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub locale_identifier: LocalizedName,
    pub number_of_strings: u16,
    pub base_strings: u16,
}

impl LocaleDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        Ok(LocaleDescriptor {
            descriptor_type: r.u16()?,
            descriptor_index: r.u16()?,
            locale_identifier: r.name()?,
            number_of_strings: r.u16()?,
            base_strings: r.u16()?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StringsDescriptor {
    pub descriptor_type: u16,
    pub descriptor_index: u16,
    pub strings: [LocalizedName; 7],
}

impl StringsDescriptor {
    pub fn parse(data: &[u8]) -> Result<Self, Error> {
        let mut r = FieldReader::new(data);
        let descriptor_type = r.u16()?;
        let descriptor_index = r.u16()?;
        let mut strings = [LocalizedName::default(); 7];
        for entry in strings.iter_mut() {
            *entry = r.name()?;
        }
        Ok(StringsDescriptor {
            descriptor_type,
            descriptor_index,
            strings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn locale_parses() {
        let mut data = Vec::new();
        data.extend_from_slice(&12u16.to_be_bytes()); // LOCALE
        data.extend_from_slice(&0u16.to_be_bytes());
        data.extend_from_slice(&LocalizedName::from_str("en-US").0);
        data.extend_from_slice(&1u16.to_be_bytes());
        data.extend_from_slice(&0u16.to_be_bytes());
        let desc = LocaleDescriptor::parse(&data).expect("locale parses");
        assert_eq!(desc.locale_identifier.as_string(), "en-US");
        assert_eq!(desc.number_of_strings, 1);
    }

    #[test]
    fn strings_parses_all_seven() {
        let mut data = Vec::new();
        data.extend_from_slice(&13u16.to_be_bytes()); // STRINGS
        data.extend_from_slice(&0u16.to_be_bytes());
        for i in 0..7u8 {
            data.extend_from_slice(&LocalizedName::from_str(&format!("string {i}")).0);
        }
        let desc = StringsDescriptor::parse(&data).expect("strings parses");
        assert_eq!(desc.strings[6].as_string(), "string 6");
    }

    #[test]
    fn strings_truncation_rejected() {
        let data = vec![0x00, 0x0D, 0x00, 0x00, 0xAA];
        assert!(StringsDescriptor::parse(&data).is_err());
    }
}
