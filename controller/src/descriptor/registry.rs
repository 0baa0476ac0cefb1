//! Per-end-station descriptor storage, keyed by (type, index).

use std::collections::HashMap;

use crate::descriptor::Descriptor;

pub type DescriptorKey = (u16, u16);

/// The descriptor set read from one entity. Insertion is monotone within an
/// enumeration pass; a new pass starts from [`DescriptorRegistry::clear`].
#[derive(Debug, Default)]
pub struct DescriptorRegistry {
    descriptors: HashMap<DescriptorKey, Descriptor>,
}

impl DescriptorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, descriptor: Descriptor) {
        let key = (descriptor.descriptor_type(), descriptor.descriptor_index());
        self.descriptors.insert(key, descriptor);
    }

    pub fn get(&self, descriptor_type: u16, descriptor_index: u16) -> Option<&Descriptor> {
        self.descriptors.get(&(descriptor_type, descriptor_index))
    }

    pub fn get_mut(
        &mut self,
        descriptor_type: u16,
        descriptor_index: u16,
    ) -> Option<&mut Descriptor> {
        self.descriptors
            .get_mut(&(descriptor_type, descriptor_index))
    }

    pub fn contains(&self, descriptor_type: u16, descriptor_index: u16) -> bool {
        self.descriptors
            .contains_key(&(descriptor_type, descriptor_index))
    }

    /// Descriptors of one type in ascending index order.
    pub fn of_type(&self, descriptor_type: u16) -> Vec<&Descriptor> {
        let mut matches: Vec<&Descriptor> = self
            .descriptors
            .values()
            .filter(|d| d.descriptor_type() == descriptor_type)
            .collect();
        matches.sort_by_key(|d| d.descriptor_index());
        matches
    }

    pub fn count_of_type(&self, descriptor_type: u16) -> usize {
        self.descriptors
            .keys()
            .filter(|(t, _)| *t == descriptor_type)
            .count()
    }

    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    pub fn clear(&mut self) {
        self.descriptors.clear();
    }
}
