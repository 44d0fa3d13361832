use std::fmt::{self, Display};

use crate::{FieldDef, RegisterDef};

/// Bits `[offset, offset + width)` of `value`, shifted down to bit 0.
///
/// Shifting past bit 63 yields zero and a width of 64 or more keeps every
/// remaining bit, so the result is always defined.
pub fn extract_bits(value: u64, offset: u32, width: u32) -> u64 {
    let mask = match 1u64.checked_shl(width) {
        Some(bit) => bit - 1,
        None => u64::MAX,
    };
    value.checked_shr(offset).unwrap_or(0) & mask
}

/// What a field value means, as far as the decoder can tell without
/// enumerated values.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum FieldState {
    Disabled,
    Enabled,
    RawData(u64),
}

pub fn classify(value: u64) -> FieldState {
    match value {
        0 => FieldState::Disabled,
        1 => FieldState::Enabled,
        other => FieldState::RawData(other),
    }
}

impl Display for FieldState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldState::Disabled => f.write_str("DISABLED"),
            FieldState::Enabled => f.write_str("ENABLED"),
            FieldState::RawData(value) => write!(f, "{value:#x}"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedField {
    pub name: String,
    pub value: u64,
}

impl DecodedField {
    pub fn state(&self) -> FieldState {
        classify(self.value)
    }
}

/// Field name to extracted value. A repeated name overwrites the earlier
/// value in place.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodedFields {
    entries: Vec<DecodedField>,
}

impl DecodedFields {
    fn insert(&mut self, name: &str, value: u64) {
        match self.entries.iter_mut().find(|entry| entry.name == name) {
            Some(entry) => entry.value = value,
            None => self.entries.push(DecodedField {
                name: name.to_owned(),
                value,
            }),
        }
    }

    pub fn get(&self, name: &str) -> Option<u64> {
        self.entries
            .iter()
            .find(|entry| entry.name == name)
            .map(|entry| entry.value)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DecodedField> {
        self.entries.iter()
    }
}

impl<'a> IntoIterator for &'a DecodedFields {
    type Item = &'a DecodedField;
    type IntoIter = std::slice::Iter<'a, DecodedField>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Splits `raw` into the register's fields. Never fails; bits above the
/// register width are simply not looked at.
pub fn decode(register: &RegisterDef, raw: u64) -> DecodedFields {
    let mut decoded = DecodedFields::default();
    for field in register.fields() {
        let value = extract_bits(raw, field.bit_offset, field.bit_width);
        decoded.insert(&field.name, value);
    }
    decoded
}

/// A raw value together with the register it was decoded against.
#[derive(Clone, Debug)]
pub struct DecodedRegister<'a> {
    register: &'a RegisterDef,
    raw: u64,
    fields: DecodedFields,
}

impl RegisterDef {
    pub fn decode_value(&self, raw: u64) -> DecodedRegister<'_> {
        DecodedRegister {
            register: self,
            raw,
            fields: decode(self, raw),
        }
    }
}

impl<'a> DecodedRegister<'a> {
    pub fn register(&self) -> &'a RegisterDef {
        self.register
    }

    pub fn raw(&self) -> u64 {
        self.raw
    }

    pub fn fields(&self) -> &DecodedFields {
        &self.fields
    }

    /// Whether `raw` has bits set above the register width.
    pub fn exceeds_width(&self) -> bool {
        self.raw.checked_shr(self.register.size()).unwrap_or(0) != 0
    }

    /// Every field definition in document order with its decoded value.
    pub fn iter(&self) -> impl Iterator<Item = (&'a FieldDef, u64)> + '_ {
        self.register
            .fields()
            .iter()
            .map(|field| (field, self.fields.get(&field.name).unwrap_or_default()))
    }
}
