//! Managed heap of the emulator.
//!
//! Objects are class instances with per-field storage keyed by the full name of the
//! declaring type and the field name, so a derived instance holds the fields of every type
//! in its hierarchy side by side. References remain valid for the lifetime of the heap (no
//! garbage collection is simulated).

use std::collections::HashMap;

use crate::{
    emulation::{EmValue, HeapRef},
    metadata::{field::FieldRef, typesystem::TypeRef},
    Error, Result,
};

/// One object on the heap.
#[derive(Clone, Debug)]
pub struct HeapObject {
    /// The runtime type of the object
    pub class: TypeRef,
    fields: HashMap<(String, String), EmValue>,
}

impl HeapObject {
    /// Number of instance fields the object stores
    pub fn field_count(&self) -> usize {
        self.fields.len()
    }
}

/// The managed heap.
#[derive(Debug, Default)]
pub struct ManagedHeap {
    objects: Vec<HeapObject>,
}

impl ManagedHeap {
    /// Create an empty heap
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate an object of type `class` with the given initial field values, keyed by
    /// `(declaring type full name, field name)`
    pub fn alloc(&mut self, class: TypeRef, fields: Vec<((String, String), EmValue)>) -> HeapRef {
        let reference = HeapRef::new(self.objects.len() as u64);
        self.objects.push(HeapObject {
            class,
            fields: fields.into_iter().collect(),
        });
        reference
    }

    /// Number of allocated objects
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    /// True if nothing has been allocated
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    /// Look up an object
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] for a dangling reference.
    pub fn get(&self, object: HeapRef) -> Result<&HeapObject> {
        usize::try_from(object.id())
            .ok()
            .and_then(|index| self.objects.get(index))
            .ok_or_else(|| Error::Emulation(format!("dangling reference {object}")))
    }

    fn get_mut(&mut self, object: HeapRef) -> Result<&mut HeapObject> {
        usize::try_from(object.id())
            .ok()
            .and_then(|index| self.objects.get_mut(index))
            .ok_or_else(|| Error::Emulation(format!("dangling reference {object}")))
    }

    /// Read the instance field `field` of `object`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] if the object does not have the field.
    pub fn load_field(&self, object: HeapRef, field: &FieldRef) -> Result<EmValue> {
        let instance = self.get(object)?;
        instance
            .fields
            .get(&field_key(field))
            .cloned()
            .ok_or_else(|| {
                Error::Emulation(format!("{} has no field {}", instance.class, field))
            })
    }

    /// Write the instance field `field` of `object`
    ///
    /// # Errors
    ///
    /// Returns [`Error::Emulation`] if the object does not have the field.
    pub fn store_field(&mut self, object: HeapRef, field: &FieldRef, value: EmValue) -> Result<()> {
        let instance = self.get_mut(object)?;
        match instance.fields.get_mut(&field_key(field)) {
            Some(slot) => {
                *slot = value;
                Ok(())
            }
            None => Err(Error::Emulation(format!(
                "{} has no field {}",
                instance.class, field
            ))),
        }
    }
}

fn field_key(field: &FieldRef) -> (String, String) {
    (field.declaring.full_name(), field.name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::corlib;

    #[test]
    fn test_field_storage() -> Result<()> {
        let person = TypeRef::new("M", "Ns", "Person");
        let name = FieldRef::new(person.clone(), "name", corlib::string());
        let mut heap = ManagedHeap::new();
        let object = heap.alloc(
            person.clone(),
            vec![(("Ns.Person".to_string(), "name".to_string()), EmValue::Null)],
        );

        assert_eq!(heap.load_field(object, &name)?, EmValue::Null);
        heap.store_field(object, &name, "ivan".into())?;
        assert_eq!(heap.load_field(object, &name)?, EmValue::from("ivan"));
        assert_eq!(heap.get(object)?.class, person);

        let missing = FieldRef::new(person, "age", corlib::int32());
        assert!(matches!(heap.load_field(object, &missing), Err(Error::Emulation(_))));
        assert!(matches!(heap.get(HeapRef::new(7)), Err(Error::Emulation(_))));
        Ok(())
    }
}
