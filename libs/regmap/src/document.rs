//! SVD document to [`MemoryMap`].
//!
//! The document is deserialized into a loose mirror of the SVD element tree
//! where every leaf is optional text, then walked peripheral by peripheral.
//! Numbers and required elements are checked during the walk so the error
//! can name the exact peripheral/register/field it came from.

use std::collections::HashMap;

use serde::Deserialize;

use crate::scalar::{parse_bit_range, parse_dec, parse_hex, parse_size};
use crate::{Error, FieldDef, MemoryMap, RegisterDef, Result};

#[derive(Debug, Deserialize)]
struct Device {
    size: Option<String>,
    access: Option<String>,
    #[serde(default)]
    peripherals: Peripherals,
}

#[derive(Debug, Default, Deserialize)]
struct Peripherals {
    #[serde(default)]
    peripheral: Vec<Peripheral>,
}

#[derive(Debug, Deserialize)]
struct Peripheral {
    #[serde(rename = "@derivedFrom")]
    derived_from: Option<String>,
    name: Option<String>,
    #[serde(rename = "baseAddress")]
    base_address: Option<String>,
    size: Option<String>,
    access: Option<String>,
    registers: Option<Registers>,
}

#[derive(Debug, Default, Deserialize)]
struct Registers {
    #[serde(rename = "$value", default)]
    items: Vec<RegisterItem>,
}

#[derive(Debug, Deserialize)]
enum RegisterItem {
    #[serde(rename = "register")]
    Register(Register),
    #[serde(rename = "cluster")]
    Cluster(Cluster),
    // <description>, <dim> and the like inside a <cluster>.
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
struct Cluster {
    name: Option<String>,
    #[serde(rename = "addressOffset")]
    address_offset: Option<String>,
    size: Option<String>,
    access: Option<String>,
    #[serde(rename = "$value", default)]
    items: Vec<RegisterItem>,
}

#[derive(Debug, Deserialize)]
struct Register {
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "addressOffset")]
    address_offset: Option<String>,
    size: Option<String>,
    access: Option<String>,
    fields: Option<Fields>,
}

#[derive(Debug, Default, Deserialize)]
struct Fields {
    #[serde(default)]
    field: Vec<Field>,
}

#[derive(Debug, Deserialize)]
struct Field {
    name: Option<String>,
    description: Option<String>,
    #[serde(rename = "bitOffset")]
    bit_offset: Option<String>,
    #[serde(rename = "bitWidth")]
    bit_width: Option<String>,
    lsb: Option<String>,
    msb: Option<String>,
    #[serde(rename = "bitRange")]
    bit_range: Option<String>,
}

/// Register properties flowing down device → peripheral → cluster → register.
#[derive(Clone, Debug, Default)]
struct Properties {
    size: Option<u32>,
    access: Option<String>,
}

impl Properties {
    fn nested(&self, size: Option<&String>, access: Option<&String>, context: &str) -> Result<Self> {
        let size = match size {
            Some(text) => Some(size_value(text, context)?),
            None => self.size,
        };
        let access = access
            .map(|text| text.trim().to_owned())
            .or_else(|| self.access.clone());
        Ok(Self { size, access })
    }
}

fn required<'a>(value: Option<&'a String>, context: &str, element: &str) -> Result<&'a str> {
    value
        .map(|text| text.trim())
        .ok_or_else(|| Error::malformed(context, format!("missing <{element}>")))
}

fn hex_value(text: &str, context: &str, element: &str) -> Result<u64> {
    parse_hex(text)
        .ok_or_else(|| Error::malformed(context, format!("<{element}> `{text}` is not hexadecimal")))
}

fn dec_value(text: &str, context: &str, element: &str) -> Result<u32> {
    parse_dec(text)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| Error::malformed(context, format!("<{element}> `{text}` is not a decimal number")))
}

fn size_value(text: &str, context: &str) -> Result<u32> {
    parse_size(text)
        .and_then(|value| u32::try_from(value).ok())
        .ok_or_else(|| Error::malformed(context, format!("<size> `{}` is not a number", text.trim())))
}

fn text_or_empty(value: Option<&String>) -> String {
    value.map(|text| text.trim().to_owned()).unwrap_or_default()
}

/// Parses an SVD document. All-or-nothing: the first malformed element
/// aborts the load.
pub fn parse_document(text: &str) -> Result<MemoryMap> {
    let device: Device = quick_xml::de::from_str(text)?;
    let defaults = Properties::default().nested(device.size.as_ref(), device.access.as_ref(), "device")?;

    let by_name: HashMap<&str, &Peripheral> = device
        .peripherals
        .peripheral
        .iter()
        .filter_map(|peripheral| Some((peripheral.name.as_deref()?.trim(), peripheral)))
        .collect();

    let mut map = MemoryMap::new();
    for (index, peripheral) in device.peripherals.peripheral.iter().enumerate() {
        let name = text_or_empty(peripheral.name.as_ref());
        let context = if name.is_empty() {
            format!("peripheral #{index}")
        } else {
            name.clone()
        };
        let base_address = hex_value(
            required(peripheral.base_address.as_ref(), &context, "baseAddress")?,
            &context,
            "baseAddress",
        )?;

        // A derived peripheral without its own registers reuses those of its parent.
        let parent = match &peripheral.derived_from {
            Some(parent_name) => {
                let parent = by_name.get(parent_name.trim()).copied();
                if parent.is_none() {
                    log::warn!(
                        "{} derived from {} but the latter does not exist? Skipping",
                        context,
                        parent_name
                    );
                }
                parent
            }
            None => None,
        };
        let properties = match parent {
            Some(parent) => defaults
                .nested(parent.size.as_ref(), parent.access.as_ref(), &context)?
                .nested(peripheral.size.as_ref(), peripheral.access.as_ref(), &context)?,
            None => defaults.nested(peripheral.size.as_ref(), peripheral.access.as_ref(), &context)?,
        };
        let registers = match (&peripheral.registers, parent) {
            (Some(registers), _) => Some(registers),
            (None, Some(parent)) => parent.registers.as_ref(),
            (None, None) => None,
        };

        let scope = Scope {
            peripheral: &name,
            context: &context,
            base_address,
            properties,
        };
        if let Some(registers) = registers {
            scope.add_items(&registers.items, &mut map)?;
        }
    }
    Ok(map)
}

struct Scope<'a> {
    peripheral: &'a str,
    context: &'a str,
    base_address: u64,
    properties: Properties,
}

impl Scope<'_> {
    fn add_cluster(&self, cluster: &Cluster, map: &mut MemoryMap) -> Result<()> {
        let name = text_or_empty(cluster.name.as_ref());
        let context = format!("{}.{}", self.context, name);
        let offset = hex_value(
            required(cluster.address_offset.as_ref(), &context, "addressOffset")?,
            &context,
            "addressOffset",
        )?;
        let scope = Scope {
            peripheral: self.peripheral,
            context: &context,
            base_address: offset_address(self.base_address, offset, &context)?,
            properties: self
                .properties
                .nested(cluster.size.as_ref(), cluster.access.as_ref(), &context)?,
        };
        scope.add_items(&cluster.items, map)
    }

    fn add_items(&self, items: &[RegisterItem], map: &mut MemoryMap) -> Result<()> {
        for item in items {
            match item {
                RegisterItem::Register(register) => self.add_register(register, map)?,
                RegisterItem::Cluster(cluster) => self.add_cluster(cluster, map)?,
                RegisterItem::Other => {}
            }
        }
        Ok(())
    }

    fn add_register(&self, register: &Register, map: &mut MemoryMap) -> Result<()> {
        let name = required(register.name.as_ref(), self.context, "name")?;
        let context = format!("{}.{}", self.context, name);
        let offset = hex_value(
            required(register.address_offset.as_ref(), &context, "addressOffset")?,
            &context,
            "addressOffset",
        )?;
        let address = offset_address(self.base_address, offset, &context)?;
        let properties = self
            .properties
            .nested(register.size.as_ref(), register.access.as_ref(), &context)?;
        let size = properties
            .size
            .ok_or_else(|| Error::malformed(&context, "missing <size>"))?;

        let mut register_def = RegisterDef::new(name, address, size)
            .with_peripheral(self.peripheral)
            .with_access(properties.access.unwrap_or_default())
            .with_description(text_or_empty(register.description.as_ref()));
        for field in register.fields.iter().flat_map(|fields| fields.field.iter()) {
            register_def = register_def.with_field(field_def(field, &context)?);
        }
        register_def.check_bounds()?;
        map.insert(register_def);
        Ok(())
    }
}

fn offset_address(base: u64, offset: u64, context: &str) -> Result<u64> {
    base.checked_add(offset).ok_or_else(|| {
        Error::malformed(context, format!("address {base:#x} + {offset:#x} overflows"))
    })
}

fn field_def(field: &Field, register_context: &str) -> Result<FieldDef> {
    let name = required(field.name.as_ref(), register_context, "name")?;
    let context = format!("{register_context}.{name}");
    let (bit_offset, bit_width) = match (
        &field.bit_offset,
        &field.bit_width,
        &field.lsb,
        &field.msb,
        &field.bit_range,
    ) {
        (Some(offset), Some(width), ..) => (
            dec_value(offset, &context, "bitOffset")?,
            dec_value(width, &context, "bitWidth")?,
        ),
        (Some(_), None, ..) => return Err(Error::malformed(context, "missing <bitWidth>")),
        (None, Some(_), ..) => return Err(Error::malformed(context, "missing <bitOffset>")),
        (None, None, Some(lsb), Some(msb), _) => {
            let lsb = dec_value(lsb, &context, "lsb")?;
            let msb = dec_value(msb, &context, "msb")?;
            lsb_msb(lsb, msb, &context)?
        }
        (None, None, _, _, Some(range)) => {
            let (msb, lsb) = parse_bit_range(range)
                .and_then(|(msb, lsb)| Some((u32::try_from(msb).ok()?, u32::try_from(lsb).ok()?)))
                .ok_or_else(|| {
                    Error::malformed(&context, format!("<bitRange> `{}` is not [msb:lsb]", range.trim()))
                })?;
            lsb_msb(lsb, msb, &context)?
        }
        _ => return Err(Error::malformed(context, "missing <bitOffset>/<bitWidth>")),
    };
    Ok(FieldDef::new(name, bit_offset, bit_width)
        .with_description(text_or_empty(field.description.as_ref())))
}

fn lsb_msb(lsb: u32, msb: u32, context: &str) -> Result<(u32, u32)> {
    if msb < lsb {
        return Err(Error::malformed(context, format!("msb {msb} is below lsb {lsb}")));
    }
    Ok((lsb, msb - lsb + 1))
}
