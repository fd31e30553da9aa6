use std::path::{Path, PathBuf};

use fxhash::FxHashMap;
use log::{debug, trace};

use crate::error::MapError;
use crate::loader::tileset::decode_tsx_str;
use crate::tileset::Tileset;

/// Where external tilesets (`<tileset firstgid=".." source=".."/>`) come
/// from.
///
/// The returned tileset's `first_gid` and `source` are overwritten by the
/// caller with the values of the referencing map.
pub trait TilesetSource {
    /// Loads the tileset named by a `source` attribute, as written in the map.
    fn load_tileset(&mut self, reference: &str) -> Result<Tileset, MapError>;
}

impl<F> TilesetSource for F
where
    F: FnMut(&str) -> Result<Tileset, MapError>,
{
    fn load_tileset(&mut self, reference: &str) -> Result<Tileset, MapError> {
        self(reference)
    }
}

/// Refuses every external reference. Used for maps parsed from memory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoExternalTilesets;

impl TilesetSource for NoExternalTilesets {
    fn load_tileset(&mut self, reference: &str) -> Result<Tileset, MapError> {
        Err(MapError::MissingTileset {
            reference: reference.to_owned(),
            reason: "no tileset source was provided for external tilesets".to_owned(),
        })
    }
}

/// Reads TSX files relative to a base directory, optionally keeping every
/// parsed tileset for later loads.
#[derive(Debug)]
pub struct FileTilesetSource {
    base_dir: PathBuf,
    cache: Option<FxHashMap<PathBuf, Tileset>>,
}

impl FileTilesetSource {
    /// Caching source rooted at `base_dir`.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        FileTilesetSource {
            base_dir: base_dir.into(),
            cache: Some(FxHashMap::default()),
        }
    }

    /// Turns caching on or off. Turning it off drops cached tilesets.
    pub fn with_cache(mut self, enabled: bool) -> Self {
        self.cache = enabled.then(|| self.cache.take().unwrap_or_default());
        self
    }

    /// Directory references are resolved against.
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    /// Number of tilesets held in the cache.
    pub fn cached(&self) -> usize {
        self.cache.as_ref().map_or(0, |c| c.len())
    }
}

impl TilesetSource for FileTilesetSource {
    fn load_tileset(&mut self, reference: &str) -> Result<Tileset, MapError> {
        let path = self.base_dir.join(reference);
        let missing = |reason: String| MapError::MissingTileset {
            reference: reference.to_owned(),
            reason,
        };
        let key = path
            .canonicalize()
            .map_err(|e| missing(format!("{}: {e}", path.display())))?;

        if let Some(hit) = self.cache.as_ref().and_then(|c| c.get(&key)) {
            trace!("tileset cache hit for {}", key.display());
            return Ok(hit.clone());
        }

        let text = std::fs::read_to_string(&key).map_err(|e| missing(format!("{}: {e}", key.display())))?;
        let tileset = decode_tsx_str(&text, &key.display().to_string())?;
        debug!("loaded external tileset '{}' from {}", tileset.name, key.display());

        if let Some(cache) = self.cache.as_mut() {
            cache.insert(key, tileset.clone());
        }
        Ok(tileset)
    }
}
