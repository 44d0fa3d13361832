use std::path::Path;

use regmap::MemoryReader;

/// Memory image captured from a target, starting at `base`.
pub struct DumpReader {
    base: u64,
    bytes: Vec<u8>,
}

impl DumpReader {
    pub fn new(base: u64, bytes: Vec<u8>) -> Self {
        Self { base, bytes }
    }

    pub fn open(path: &Path, base: u64) -> std::io::Result<Self> {
        Ok(Self::new(base, std::fs::read(path)?))
    }
}

impl MemoryReader for DumpReader {
    fn read_word(&mut self, address: u64) -> Option<u32> {
        let start = usize::try_from(address.checked_sub(self.base)?).ok()?;
        let word = self.bytes.get(start..start.checked_add(4)?)?;
        Some(u32::from_le_bytes(word.try_into().ok()?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn little_endian_words() {
        let mut reader = DumpReader::new(0x2000_0000, vec![0x83, 0x00, 0x00, 0x03, 0xAA, 0xBB]);
        assert_eq!(reader.read_word(0x2000_0000), Some(0x0300_0083));
        assert_eq!(reader.read_word(0x2000_0001), Some(0xAA03_0000));
        assert_eq!(reader.read_word(0x2000_0002), Some(0xBBAA_0300));
    }

    #[test]
    fn out_of_range_reads_fail() {
        let mut reader = DumpReader::new(0x2000_0000, vec![0; 8]);
        assert_eq!(reader.read_word(0x1FFF_FFFF), None);
        assert_eq!(reader.read_word(0x2000_0005), None);
        assert_eq!(reader.read_word(u64::MAX), None);
        assert_eq!(reader.read_word(0x2000_0004), Some(0));
    }

    #[test]
    fn open_reads_the_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sram.bin");
        std::fs::write(&path, [1, 0, 0, 0]).unwrap();
        let mut reader = DumpReader::open(&path, 0x100).unwrap();
        assert_eq!(reader.read_word(0x100), Some(1));
        assert!(DumpReader::open(&dir.path().join("missing.bin"), 0).is_err());
    }
}
