//! Register catalog built from SVD hardware descriptions, plus the
//! bit-field decoder that splits raw register values into named fields.
//!
//! A [`MemoryMap`] is loaded once per schema (see [`load_schema`] and
//! [`Session`]) and is read-only afterwards. Decoding is pure and can be
//! done from any number of threads against a shared map.

mod cache;
mod decode;
mod document;
mod error;
mod loader;
mod model;
pub mod scalar;
mod session;
mod svd;

#[cfg(test)]
mod testdata {
    pub const STM32_MINI: &str = include_str!("testdata/stm32_mini.svd");
}

pub use cache::{restore as restore_cache, store as store_cache};
pub use decode::{classify, decode, extract_bits, DecodedField, DecodedFields, DecodedRegister, FieldState};
pub use document::parse_document;
pub use error::{Error, Result};
pub use loader::{cache_key, load_schema, load_schema_file, resolve, LoaderConfig};
pub use model::{AddressCollision, FieldDef, MemoryMap, RegisterDef};
pub use session::{MemoryReader, Peek, Session};
