//! Flat JSON snapshot of a [`MemoryMap`].
//!
//! The file is an object keyed by the decimal address as a string, each
//! value holding `name, address, size, access, desc, fields`. Collisions are
//! not part of the snapshot.

use std::{
    collections::BTreeMap,
    fs::File,
    io::{self, BufReader, BufWriter, Write},
    path::Path,
};

use crate::{MemoryMap, RegisterDef};

/// Writes the map next to `path` and renames it into place, so concurrent
/// readers see either the old or the new snapshot.
pub fn store(map: &MemoryMap, path: &Path) -> io::Result<()> {
    let dir = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    {
        let mut writer = BufWriter::new(file.as_file_mut());
        serde_json::to_writer_pretty(&mut writer, map.registers())?;
        writer.flush()?;
    }
    file.persist(path).map_err(|error| error.error)?;
    Ok(())
}

pub fn restore(path: &Path) -> io::Result<MemoryMap> {
    let reader = BufReader::new(File::open(path)?);
    let regs: BTreeMap<u64, RegisterDef> = serde_json::from_reader(reader)?;
    if let Some((key, register)) = regs.iter().find(|(key, register)| **key != register.address()) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "entry {key} holds register {} at {:#x}",
                register.identifier(),
                register.address()
            ),
        ));
    }
    // A snapshot holds only what the document loader would accept.
    for register in regs.values() {
        register
            .check_bounds()
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, error.to_string()))?;
    }
    Ok(MemoryMap::from_registers(regs))
}
