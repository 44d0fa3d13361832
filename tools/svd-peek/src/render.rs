use std::fmt::{self, Display};

use regmap::{DecodedRegister, FieldState, MemoryMap};

/// Field-by-field breakdown of one decoded register.
pub struct Report<'a, 'r>(pub &'a DecodedRegister<'r>);

impl Display for Report<'_, '_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decoded = self.0;
        let register = decoded.register();
        let digits = register.size().div_ceil(4) as usize;
        writeln!(f, "Register: {} ({:#010x})", register.identifier(), register.address())?;
        if !register.description().is_empty() {
            writeln!(f, "Description: {}", register.description())?;
        }
        if !register.access().is_empty() {
            writeln!(f, "Access: {}", register.access())?;
        }
        writeln!(f, "Value: {:#0width$x}", decoded.raw(), width = digits + 2)?;
        if decoded.exceeds_width() {
            writeln!(f, "  (value is wider than {} bits)", register.size())?;
        }
        if register.fields().is_empty() {
            return writeln!(f, "No fields");
        }
        writeln!(f, "Fields:")?;
        for (field, value) in decoded.iter() {
            let bits = if field.bit_width == 1 {
                format!("[{}]", field.bit_offset)
            } else {
                format!("[{}:{}]", field.msb(), field.bit_offset)
            };
            write!(f, "  {} {} = {:#x}", field.name, bits, value)?;
            match regmap::classify(value) {
                FieldState::RawData(_) => {}
                state => write!(f, " {state}")?,
            }
            if field.description.is_empty() {
                writeln!(f)?;
            } else {
                writeln!(f, " - {}", field.description)?;
            }
        }
        Ok(())
    }
}

/// One line per register in address order.
pub struct Listing<'a>(pub &'a MemoryMap);

impl Display for Listing<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for register in self.0.iter() {
            write!(f, "{:#010x}  {}  {}-bit", register.address(), register.identifier(), register.size())?;
            if register.access().is_empty() {
                writeln!(f)?;
            } else {
                writeln!(f, "  {}", register.access())?;
            }
        }
        Ok(())
    }
}

pub struct NotFound(pub u64);

impl Display for NotFound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Register address 0x{:08X} not found in memory map.", self.0)
    }
}

#[cfg(test)]
mod tests {
    use regmap::{FieldDef, RegisterDef};

    use super::*;

    fn ctrl() -> RegisterDef {
        RegisterDef::new("CTRL", 0x4000_0000, 16)
            .with_peripheral("TIM2")
            .with_access("read-write")
            .with_description("control register 1")
            .with_field(FieldDef::new("CEN", 0, 1).with_description("Counter enable"))
            .with_field(FieldDef::new("UDIS", 1, 1))
            .with_field(FieldDef::new("CMS", 5, 2).with_description("Center-aligned mode selection"))
    }

    #[test]
    fn report() {
        let register = ctrl();
        let decoded = register.decode_value(0x41);
        assert_eq!(
            Report(&decoded).to_string(),
            "Register: TIM2.CTRL (0x40000000)
Description: control register 1
Access: read-write
Value: 0x0041
Fields:
  CEN [0] = 0x1 ENABLED - Counter enable
  UDIS [1] = 0x0 DISABLED
  CMS [6:5] = 0x2 - Center-aligned mode selection
"
        );
    }

    #[test]
    fn report_flags_oversized_values_and_empty_registers() {
        let register = RegisterDef::new("DR", 0x10, 8);
        let decoded = register.decode_value(0x1FF);
        assert_eq!(
            Report(&decoded).to_string(),
            "Register: DR (0x00000010)
Value: 0x1ff
  (value is wider than 8 bits)
No fields
"
        );
    }

    #[test]
    fn listing() {
        let mut map = MemoryMap::new();
        map.insert(ctrl());
        map.insert(RegisterDef::new("SR", 0x3FFF_FFF0, 32).with_peripheral("RCC"));
        assert_eq!(
            Listing(&map).to_string(),
            "0x3ffffff0  RCC.SR  32-bit
0x40000000  TIM2.CTRL  16-bit  read-write
"
        );
    }

    #[test]
    fn not_found_message() {
        assert_eq!(
            NotFound(0x4002_1000).to_string(),
            "Register address 0x40021000 not found in memory map."
        );
    }
}
