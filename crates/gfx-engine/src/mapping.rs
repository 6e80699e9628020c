//! Name-keyed table of device objects used for bulk binding.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;

use crate::object::DeviceObject;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("resource '{name}' with array index {index} already exists in the resource mapping")]
    Duplicate { name: String, index: u32 },
}

/// One entry for [`ResourceMapping::from_entries`].
#[derive(Debug, Clone)]
pub struct ResourceMappingEntry {
    pub name: String,
    pub object: Arc<DeviceObject>,
    pub array_index: u32,
}

/// Maps `(name, array index)` to a device object.
///
/// Entries hold strong references; replacing or removing an entry drops
/// the reference it held.
#[derive(Debug, Clone, Default)]
pub struct ResourceMapping {
    entries: HashMap<String, BTreeMap<u32, Arc<DeviceObject>>>,
}

impl ResourceMapping {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mapping in which every `(name, array index)` is unique.
    pub fn from_entries(entries: impl IntoIterator<Item = ResourceMappingEntry>) -> Result<Self, MappingError> {
        let mut mapping = Self::new();
        for entry in entries {
            mapping.add_resource_at(&entry.name, entry.array_index, entry.object, true)?;
        }
        Ok(mapping)
    }

    /// Insert `object` at array index 0.
    pub fn add_resource(&mut self, name: &str, object: Arc<DeviceObject>, must_be_unique: bool) -> Result<(), MappingError> {
        self.add_resource_at(name, 0, object, must_be_unique)
    }

    /// Insert or replace `name[index]`. With `must_be_unique` an existing
    /// entry is an error and is left in place.
    pub fn add_resource_at(
        &mut self,
        name: &str,
        index: u32,
        object: Arc<DeviceObject>,
        must_be_unique: bool,
    ) -> Result<(), MappingError> {
        self.add_resource_array(name, index, std::slice::from_ref(&object), must_be_unique)
    }

    /// Insert `objects` at consecutive array indices starting at
    /// `start_index`. Nothing is inserted when a uniqueness check fails.
    pub fn add_resource_array(
        &mut self,
        name: &str,
        start_index: u32,
        objects: &[Arc<DeviceObject>],
        must_be_unique: bool,
    ) -> Result<(), MappingError> {
        if must_be_unique {
            if let Some(slots) = self.entries.get(name) {
                for index in (start_index..).take(objects.len()) {
                    if slots.contains_key(&index) {
                        return Err(MappingError::Duplicate {
                            name: name.to_string(),
                            index,
                        });
                    }
                }
            }
        }

        let slots = self.entries.entry(name.to_string()).or_default();
        for (index, object) in (start_index..).zip(objects) {
            slots.insert(index, Arc::clone(object));
        }
        Ok(())
    }

    /// Remove `name[index]`. Absent entries are ignored.
    pub fn remove_resource_by_name(&mut self, name: &str, index: u32) {
        if let Some(slots) = self.entries.get_mut(name) {
            slots.remove(&index);
            if slots.is_empty() {
                self.entries.remove(name);
            }
        }
    }

    /// New strong reference to `name[index]`, if present.
    pub fn get_resource(&self, name: &str, index: u32) -> Option<Arc<DeviceObject>> {
        self.entries.get(name)?.get(&index).cloned()
    }

    /// Total number of `(name, index)` entries.
    pub fn size(&self) -> usize {
        self.entries.values().map(BTreeMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.values().all(BTreeMap::is_empty)
    }
}

#[cfg(test)]
#[path = "mapping_tests.rs"]
mod mapping_tests;
