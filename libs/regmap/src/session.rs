use crate::{load_schema, DecodedRegister, LoaderConfig, MemoryMap, RegisterDef, Result};

/// Source of live register values, e.g. a debugger or a memory image.
pub trait MemoryReader {
    /// Little-endian 32-bit word at `address`, `None` when it cannot be read.
    fn read_word(&mut self, address: u64) -> Option<u32>;
}

impl<F> MemoryReader for F
where
    F: FnMut(u64) -> Option<u32>,
{
    fn read_word(&mut self, address: u64) -> Option<u32> {
        self(address)
    }
}

/// Outcome of [`Session::peek`].
#[derive(Debug)]
pub enum Peek<'a> {
    NotInMap,
    ReadFailed,
    Decoded(DecodedRegister<'a>),
}

/// One schema source plus its lazily loaded catalog.
#[derive(Debug)]
pub struct Session {
    source_id: String,
    config: LoaderConfig,
    map: Option<MemoryMap>,
}

impl Session {
    pub fn new(source_id: impl Into<String>, config: LoaderConfig) -> Self {
        Self {
            source_id: source_id.into(),
            config,
            map: None,
        }
    }

    /// A session over an already built catalog. [`Session::reload`] on it
    /// goes back to `source_id`.
    pub fn with_map(source_id: impl Into<String>, config: LoaderConfig, map: MemoryMap) -> Self {
        Self {
            source_id: source_id.into(),
            config,
            map: Some(map),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn is_loaded(&self) -> bool {
        self.map.is_some()
    }

    /// Loads the catalog on first use. A failed load leaves the session
    /// unloaded so the next call tries again.
    pub fn memory_map(&mut self) -> Result<&MemoryMap> {
        let map = match self.map.take() {
            Some(map) => map,
            None => load_schema(&self.source_id, &self.config)?,
        };
        Ok(&*self.map.insert(map))
    }

    /// Drops the current catalog and loads it again.
    pub fn reload(&mut self) -> Result<&MemoryMap> {
        self.map = None;
        self.memory_map()
    }

    pub fn lookup(&mut self, address: u64) -> Result<Option<&RegisterDef>> {
        Ok(self.memory_map()?.get_register(address))
    }

    /// Reads `address` through `reader` and decodes it.
    pub fn peek<R>(&mut self, address: u64, reader: &mut R) -> Result<Peek<'_>>
    where
        R: MemoryReader + ?Sized,
    {
        let Some(register) = self.memory_map()?.get_register(address) else {
            return Ok(Peek::NotInMap);
        };
        match reader.read_word(address) {
            Some(word) => Ok(Peek::Decoded(register.decode_value(u64::from(word)))),
            None => {
                log::warn!("Failed to read memory at {:#010x}", address);
                Ok(Peek::ReadFailed)
            }
        }
    }
}
