use std::path::{Path, PathBuf};

use crate::{cache, parse_document, Error, MemoryMap, Result};

/// Where schema documents are looked up and where parsed catalogs are cached.
#[derive(Clone, Debug, Default)]
pub struct LoaderConfig {
    /// Directories searched when the source is a chip name rather than a path.
    pub search_dirs: Vec<PathBuf>,
    /// Cache snapshots are only read and written when this is set.
    pub cache_dir: Option<PathBuf>,
    pub use_cache: bool,
}

impl LoaderConfig {
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self.use_cache = true;
        self
    }

    pub fn with_search_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.search_dirs.push(dir.into());
        self
    }

    fn cache_file(&self, source_id: &str) -> Option<PathBuf> {
        if !self.use_cache {
            return None;
        }
        let dir = self.cache_dir.as_ref()?;
        Some(dir.join(format!("{}.json", cache_key(source_id)?)))
    }
}

/// Base name of the source without its extension.
pub fn cache_key(source_id: &str) -> Option<String> {
    Path::new(source_id)
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
}

/// Turns a path or chip name into an existing document path.
pub fn resolve(source_id: &str, config: &LoaderConfig) -> Option<PathBuf> {
    let direct = PathBuf::from(source_id);
    if direct.is_file() {
        return Some(direct);
    }
    config.search_dirs.iter().find_map(|dir| {
        [
            dir.join(source_id),
            dir.join(format!("{source_id}.svd")),
            dir.join(format!("{source_id}.xml")),
        ]
        .into_iter()
        .find(|candidate| candidate.is_file())
    })
}

/// Parses one document, bypassing resolution and the cache.
pub fn load_schema_file(path: &Path) -> Result<MemoryMap> {
    let text = std::fs::read_to_string(path).map_err(|error| Error::from_io(path, error))?;
    let map = parse_document(&text)?;
    log::debug!("Parsed {} registers from {}", map.len(), path.display());
    Ok(map)
}

/// Loads the catalog for `source_id`, preferring a cached snapshot.
///
/// An unreadable snapshot is logged and ignored. After a fresh parse the
/// snapshot is rewritten; failing to do so is logged and otherwise ignored.
pub fn load_schema(source_id: &str, config: &LoaderConfig) -> Result<MemoryMap> {
    let cache_file = config.cache_file(source_id);
    if let Some(cache_file) = cache_file.as_deref().filter(|path| path.is_file()) {
        match cache::restore(cache_file) {
            Ok(map) => {
                log::info!(
                    "Loaded {} registers for {} from cache {}",
                    map.len(),
                    source_id,
                    cache_file.display()
                );
                return Ok(map);
            }
            Err(error) => {
                log::warn!(
                    "Ignoring unreadable cache {}: {}",
                    cache_file.display(),
                    error
                );
            }
        }
    }

    let Some(path) = resolve(source_id, config) else {
        return Err(Error::NotFound {
            source_id: source_id.to_owned(),
        });
    };
    let map = load_schema_file(&path)?;

    if let Some(cache_file) = cache_file {
        match cache::store(&map, &cache_file) {
            Ok(()) => log::info!("Cached {} registers in {}", map.len(), cache_file.display()),
            Err(error) => log::warn!("Failed to write cache {}: {}", cache_file.display(), error),
        }
    }
    Ok(map)
}
