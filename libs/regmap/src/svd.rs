//! Building a [`MemoryMap`] from a device already parsed by `svd-parser`.

use std::ops::{Deref, DerefMut};

use svd_rs::{Access, PeripheralInfoBuilder, RegisterCluster, RegisterInfo, RegisterProperties};

use crate::{Error, FieldDef, MemoryMap, RegisterDef, Result};

impl MemoryMap {
    pub fn from_device(device: svd_rs::Device) -> Result<Self> {
        let mut map = Self::new();
        map.extend_with_device(device)?;
        Ok(map)
    }

    /// Adds every register of `device`. Addresses already present keep
    /// their register, so earlier devices take precedence.
    pub fn extend_with_device(&mut self, device: svd_rs::Device) -> Result<()> {
        let device = expand_derived_from_attribute(device)?;
        let defaults = device.default_register_properties.clone();
        for peripheral in device.peripherals.iter() {
            let peripheral = peripheral.deref();
            let properties = inherit(&peripheral.default_register_properties, &defaults);
            let children = peripheral.registers.as_deref().unwrap_or_default();
            self.extend_with_children(&peripheral.name, peripheral.base_address, children, &properties)?;
        }
        Ok(())
    }

    /// Registers and clusters are visited in document order, which decides
    /// who wins an address collision.
    fn extend_with_children(
        &mut self,
        peripheral_name: &str,
        base_address: u64,
        children: &[RegisterCluster],
        properties: &RegisterProperties,
    ) -> Result<()> {
        for child in children {
            match child {
                RegisterCluster::Register(register) => {
                    let register_def = register_def(peripheral_name, base_address, register, properties)?;
                    self.insert(register_def);
                }
                RegisterCluster::Cluster(cluster) => {
                    let context = format!("{}.{}", peripheral_name, cluster.name);
                    let base_address = offset_address(base_address, cluster.address_offset, &context)?;
                    let properties = inherit(&cluster.default_register_properties, properties);
                    self.extend_with_children(peripheral_name, base_address, &cluster.children, &properties)?;
                }
            }
        }
        Ok(())
    }
}

fn offset_address(base: u64, offset: u32, context: &str) -> Result<u64> {
    base.checked_add(u64::from(offset)).ok_or_else(|| {
        Error::malformed(context, format!("address {base:#x} + {offset:#x} overflows"))
    })
}

fn inherit(own: &RegisterProperties, outer: &RegisterProperties) -> RegisterProperties {
    let mut properties = outer.clone();
    if own.size.is_some() {
        properties.size = own.size;
    }
    if own.access.is_some() {
        properties.access = own.access;
    }
    properties
}

fn access_name(access: Access) -> &'static str {
    match access {
        Access::ReadOnly => "read-only",
        Access::WriteOnly => "write-only",
        Access::ReadWrite => "read-write",
        Access::WriteOnce => "writeOnce",
        Access::ReadWriteOnce => "read-writeOnce",
    }
}

fn register_def(
    peripheral_name: &str,
    base_address: u64,
    register: &RegisterInfo,
    outer: &RegisterProperties,
) -> Result<RegisterDef> {
    let properties = inherit(&register.properties, outer);
    let context = format!("{}.{}", peripheral_name, register.name);
    let size = properties
        .size
        .ok_or_else(|| Error::malformed(&context, "missing <size>"))?;
    let address = offset_address(base_address, register.address_offset, &context)?;
    let mut register_def = RegisterDef::new(register.name.clone(), address, size)
    .with_peripheral(peripheral_name)
    .with_access(properties.access.map(access_name).unwrap_or_default())
    .with_description(register.description.as_deref().unwrap_or_default().trim());
    for field in register.fields() {
        let field = field.deref();
        register_def = register_def.with_field(
            FieldDef::new(field.name.clone(), field.bit_range.offset, field.bit_range.width)
                .with_description(field.description.as_deref().unwrap_or_default().trim()),
        );
    }
    register_def.check_bounds()?;
    Ok(register_def)
}

/// Copies the register blocks of `derivedFrom` parents into their children.
/// Only one level of derivation is resolved.
fn expand_derived_from_attribute(mut device: svd_rs::Device) -> Result<svd_rs::Device> {
    let device_copy = device.clone();
    for peripheral in device
        .peripherals
        .iter_mut()
        .filter(|v| v.derived_from.is_some())
    {
        let peripheral = peripheral.deref_mut();
        let Some(derived_from) = peripheral.derived_from.clone() else {
            continue;
        };
        let Some(derived_from_peripheral) = device_copy.get_peripheral(&derived_from) else {
            log::warn!(
                "{} derived from {} but the latter does not exist? Skipping",
                &peripheral.name,
                derived_from
            );
            continue;
        };
        let name = peripheral.name.clone();
        let peripheral_as_builder =
            PeripheralInfoBuilder::from(peripheral.clone()).derived_from(None);
        let mut derived_from_peripheral = derived_from_peripheral.deref().clone();
        derived_from_peripheral
            .modify_from(peripheral_as_builder, Default::default())
            .map_err(|error| Error::malformed(&name, format!("cannot expand derivedFrom: {error}")))?;
        peripheral
            .modify_from(derived_from_peripheral.into(), Default::default())
            .map_err(|error| Error::malformed(&name, format!("cannot expand derivedFrom: {error}")))?;
        peripheral.derived_from = None;
    }
    if device
        .peripherals
        .iter()
        .any(|v| v.derived_from.is_some())
    {
        log::warn!("Multi-pass derivedFrom peripherals expansion is not implemented, YMMV.");
    }
    Ok(device)
}
