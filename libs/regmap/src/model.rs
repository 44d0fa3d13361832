use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Widest register the decoder can represent.
pub const MAX_REGISTER_BITS: u32 = u64::BITS;

/// One contiguous bit range of a register.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "bitOffset")]
    pub bit_offset: u32,
    #[serde(rename = "bitWidth")]
    pub bit_width: u32,
    #[serde(rename = "desc", default)]
    pub description: String,
}

impl FieldDef {
    pub fn new(name: impl Into<String>, bit_offset: u32, bit_width: u32) -> Self {
        Self {
            name: name.into(),
            bit_offset,
            bit_width,
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Highest bit covered by the field. Equals `bit_offset` for a zero width.
    pub fn msb(&self) -> u32 {
        self.bit_offset.saturating_add(self.bit_width.saturating_sub(1))
    }

    fn overlaps(&self, other: &Self) -> bool {
        let end = u64::from(self.bit_offset) + u64::from(self.bit_width);
        let other_end = u64::from(other.bit_offset) + u64::from(other.bit_width);
        u64::from(self.bit_offset) < other_end && u64::from(other.bit_offset) < end
    }
}

/// One addressable register. Fields keep document order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisterDef {
    name: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    peripheral: String,
    address: u64,
    size: u32,
    #[serde(default)]
    access: String,
    #[serde(rename = "desc", default)]
    description: String,
    #[serde(default)]
    fields: Vec<FieldDef>,
}

impl RegisterDef {
    pub fn new(name: impl Into<String>, address: u64, size: u32) -> Self {
        Self {
            name: name.into(),
            peripheral: String::new(),
            address,
            size,
            access: String::new(),
            description: String::new(),
            fields: Vec::new(),
        }
    }

    pub fn with_peripheral(mut self, peripheral: impl Into<String>) -> Self {
        self.peripheral = peripheral.into();
        self
    }

    pub fn with_access(mut self, access: impl Into<String>) -> Self {
        self.access = access.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Name of the peripheral the register was declared in, empty if unknown.
    pub fn peripheral(&self) -> &str {
        &self.peripheral
    }

    pub fn address(&self) -> u64 {
        self.address
    }

    /// Width in bits.
    pub fn size(&self) -> u32 {
        self.size
    }

    pub fn access(&self) -> &str {
        &self.access
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// `PERIPHERAL.REGISTER`, or just the register name when the peripheral
    /// is unknown.
    pub fn identifier(&self) -> String {
        if self.peripheral.is_empty() {
            self.name.clone()
        } else {
            format!("{}.{}", self.peripheral, self.name)
        }
    }

    /// Rejects sizes the decoder cannot hold and fields that stick out of
    /// the register. Overlapping fields are accepted.
    pub(crate) fn check_bounds(&self) -> Result<()> {
        let context = self.identifier();
        if self.size == 0 || self.size > MAX_REGISTER_BITS {
            return Err(Error::malformed(
                context,
                format!("register size {} is outside 1..={MAX_REGISTER_BITS}", self.size),
            ));
        }
        for field in &self.fields {
            if field.bit_width == 0 {
                return Err(Error::malformed(
                    format!("{context}.{}", field.name),
                    "bitWidth must be at least 1",
                ));
            }
            let end = u64::from(field.bit_offset) + u64::from(field.bit_width);
            if end > u64::from(self.size) {
                return Err(Error::malformed(
                    format!("{context}.{}", field.name),
                    format!(
                        "bits [{}:{}] do not fit a {}-bit register",
                        u64::from(field.bit_offset) + u64::from(field.bit_width) - 1,
                        field.bit_offset,
                        self.size
                    ),
                ));
            }
        }
        for (i, field) in self.fields.iter().enumerate() {
            for other in &self.fields[i + 1..] {
                if field.overlaps(other) {
                    log::debug!(
                        "{}: fields {} and {} overlap",
                        context,
                        field.name,
                        other.name
                    );
                }
            }
        }
        Ok(())
    }
}

/// A register that lost its address to an earlier one.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AddressCollision {
    pub address: u64,
    pub kept: String,
    pub discarded: String,
}

/// Address-indexed catalog of register definitions.
///
/// The first register registered at an address wins. Later ones are
/// dropped and recorded in [`MemoryMap::collisions`].
#[derive(Clone, Debug, Default)]
pub struct MemoryMap {
    regs: BTreeMap<u64, RegisterDef>,
    collisions: Vec<AddressCollision>,
}

impl MemoryMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_register(&self, address: u64) -> Option<&RegisterDef> {
        self.regs.get(&address)
    }

    pub fn contains(&self, address: u64) -> bool {
        self.regs.contains_key(&address)
    }

    pub fn len(&self) -> usize {
        self.regs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regs.is_empty()
    }

    /// Registers in ascending address order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisterDef> {
        self.regs.values()
    }

    pub fn addresses(&self) -> impl Iterator<Item = u64> + '_ {
        self.regs.keys().copied()
    }

    pub fn collisions(&self) -> &[AddressCollision] {
        &self.collisions
    }

    /// Returns `false` when the address was already taken.
    pub fn insert(&mut self, register: RegisterDef) -> bool {
        let address = register.address;
        match self.regs.get(&address) {
            Some(previous) => {
                log::warn!(
                    "Address collision at {:#010x}: [{}] discarded, [{}] kept",
                    address,
                    register.identifier(),
                    previous.identifier(),
                );
                self.collisions.push(AddressCollision {
                    address,
                    kept: previous.identifier(),
                    discarded: register.identifier(),
                });
                false
            }
            None => {
                self.regs.insert(address, register);
                true
            }
        }
    }

    pub(crate) fn registers(&self) -> &BTreeMap<u64, RegisterDef> {
        &self.regs
    }

    pub(crate) fn from_registers(regs: BTreeMap<u64, RegisterDef>) -> Self {
        Self {
            regs,
            collisions: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cr(address: u64) -> RegisterDef {
        RegisterDef::new("CR", address, 32)
            .with_peripheral("RCC")
            .with_field(FieldDef::new("HSION", 0, 1))
            .with_field(FieldDef::new("HSITRIM", 3, 5))
    }

    #[test]
    fn first_registration_wins() {
        let mut map = MemoryMap::new();
        assert!(map.insert(cr(0x4002_3800)));
        let other = RegisterDef::new("OTHER", 0x4002_3800, 16).with_peripheral("GPIOA");
        assert!(!map.insert(other));

        assert_eq!(map.len(), 1);
        let kept = map.get_register(0x4002_3800).unwrap();
        assert_eq!(kept.name(), "CR");
        assert_eq!(kept.fields().len(), 2);
        assert_eq!(
            map.collisions(),
            &[AddressCollision {
                address: 0x4002_3800,
                kept: "RCC.CR".into(),
                discarded: "GPIOA.OTHER".into(),
            }]
        );
    }

    #[test]
    fn absent_address_is_none() {
        let mut map = MemoryMap::new();
        map.insert(cr(0x4002_3800));
        assert!(map.get_register(0x4002_3804).is_none());
        assert!(!map.contains(0));
    }

    #[test]
    fn identifier_without_peripheral() {
        assert_eq!(RegisterDef::new("CSW", 0, 32).identifier(), "CSW");
        assert_eq!(cr(0).identifier(), "RCC.CR");
    }

    #[test]
    fn bounds() {
        assert!(cr(0).check_bounds().is_ok());
        assert!(RegisterDef::new("R", 0, 0).check_bounds().is_err());
        assert!(RegisterDef::new("R", 0, 65).check_bounds().is_err());
        assert!(RegisterDef::new("R", 0, 64)
            .with_field(FieldDef::new("ALL", 0, 64))
            .check_bounds()
            .is_ok());

        let error = RegisterDef::new("R", 0, 8)
            .with_field(FieldDef::new("F", 6, 3))
            .check_bounds()
            .unwrap_err();
        assert_eq!(
            error.to_string(),
            "malformed schema at R.F: bits [8:6] do not fit a 8-bit register"
        );
        assert!(RegisterDef::new("R", 0, 8)
            .with_field(FieldDef::new("F", 0, 0))
            .check_bounds()
            .is_err());
    }

    #[test]
    fn overlapping_fields_are_accepted() {
        let register = RegisterDef::new("R", 0, 8)
            .with_field(FieldDef::new("LOW", 0, 4))
            .with_field(FieldDef::new("MID", 2, 4));
        assert!(register.check_bounds().is_ok());
        assert!(register.fields()[0].overlaps(&register.fields()[1]));
        assert!(!FieldDef::new("A", 0, 2).overlaps(&FieldDef::new("B", 2, 2)));
    }

    #[test]
    fn msb() {
        assert_eq!(FieldDef::new("F", 4, 4).msb(), 7);
        assert_eq!(FieldDef::new("F", 0, 1).msb(), 0);
        assert_eq!(FieldDef::new("F", u32::MAX, 2).msb(), u32::MAX);
    }
}
