use std::collections::BTreeMap;
use std::path::Path;

use glam::Vec2;
use serde::Serialize;
use thiserror::Error;

use crate::error::MapError;
use crate::object::Object;
use crate::properties::{Color, Properties};

/// Index of a tileset inside [`Map::tilesets`](crate::Map::tilesets).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct TilesetId(pub(crate) usize);

impl TilesetId {
    /// Position in the map's tileset list.
    pub fn index(self) -> usize {
        self.0
    }
}

/// An image referenced by a tileset, tile or image layer.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Image {
    /// Path as written in the document, relative to it.
    pub source: String,
    /// Width in pixels, when declared.
    pub width: Option<u32>,
    /// Height in pixels, when declared.
    pub height: Option<u32>,
    /// Color to treat as transparent.
    pub transparent: Option<Color>,
}

/// One frame of a tile animation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Frame {
    /// Tile shown during this frame, local to the same tileset.
    pub local_id: u32,
    /// How long the frame lasts.
    pub duration_ms: u32,
}

/// Extra data attached to a single tile of a tileset.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TileData {
    /// `class` attribute (or the older `type`), empty when unset.
    pub class: String,
    /// Weight used by the editor's random brush.
    pub probability: f32,
    /// Per-tile image of an image-collection tileset.
    pub image: Option<Image>,
    /// Animation frames in playback order; empty for static tiles.
    pub animation: Vec<Frame>,
    /// Collision shapes, in tile-local pixel coordinates.
    pub collision: Vec<Object>,
    /// Custom properties.
    pub properties: Properties,
}

/// Pixel rectangle of a tile inside its tileset image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TileRect {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

/// A catalog of tiles claiming the gid range
/// `first_gid .. first_gid + gid_span()`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct Tileset {
    /// First gid claimed; 0 until the tileset is attached to a map.
    pub first_gid: u32,
    /// Name given in the editor.
    pub name: String,
    /// `class` attribute, empty when unset.
    pub class: String,
    /// Reference of the external TSX this tileset came from.
    pub source: Option<String>,
    /// Grid cell width in pixels.
    pub tile_width: u32,
    /// Grid cell height in pixels.
    pub tile_height: u32,
    /// Number of tiles in the tileset.
    pub tile_count: u32,
    /// 0 for image-collection tilesets.
    pub columns: u32,
    /// Pixels between neighbouring tiles in the atlas.
    pub spacing: u32,
    /// Pixels around the tiles at the atlas edges.
    pub margin: u32,
    /// Drawing offset applied to every tile.
    pub tile_offset: Vec2,
    /// Atlas image; `None` for image-collection tilesets.
    pub image: Option<Image>,
    /// Per-tile data keyed by local id. Only tiles with extra data appear.
    pub tiles: BTreeMap<u32, TileData>,
    /// Custom properties.
    pub properties: Properties,
}

impl Tileset {
    /// Bare atlas tileset without image or per-tile data.
    pub fn atlas(
        name: impl Into<String>,
        first_gid: u32,
        tile_count: u32,
        tile_width: u32,
        tile_height: u32,
    ) -> Self {
        Tileset {
            first_gid,
            name: name.into(),
            tile_width,
            tile_height,
            tile_count,
            ..Default::default()
        }
    }

    /// Parses a standalone TSX document.
    pub fn load_from_str(xml: &str) -> Result<Self, MapError> {
        crate::loader::tileset::decode_tsx_str(xml, "<string>")
    }

    /// Reads and parses a TSX file.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        crate::loader::tileset::decode_tsx_str(&text, &path.display().to_string())
    }

    /// Number of local ids the tileset claims.
    ///
    /// This is the declared tile count, widened to cover every tile id that
    /// carries data: image collections keep their ids after tiles are
    /// removed, so their ids may run past the count.
    pub fn gid_span(&self) -> u32 {
        match self.tiles.keys().next_back() {
            Some(&last) if self.image.is_none() => self.tile_count.max(last.saturating_add(1)),
            _ => self.tile_count,
        }
    }

    /// Exclusive end of the claimed gid range.
    pub fn gid_end(&self) -> u64 {
        u64::from(self.first_gid) + u64::from(self.gid_span())
    }

    /// Per-tile data for `local_id`, if any was declared.
    pub fn tile(&self, local_id: u32) -> Option<&TileData> {
        self.tiles.get(&local_id)
    }

    /// Source rectangle of `local_id` inside the atlas image. `None` for ids
    /// outside the atlas or rects whose position does not fit in `u32`.
    pub fn tile_rect(&self, local_id: u32) -> Option<TileRect> {
        if self.columns == 0 || local_id >= self.tile_count {
            return None;
        }
        let col = local_id % self.columns;
        let row = local_id / self.columns;
        let offset = |index: u32, extent: u32| {
            extent
                .checked_add(self.spacing)?
                .checked_mul(index)?
                .checked_add(self.margin)
        };
        Some(TileRect {
            x: offset(col, self.tile_width)?,
            y: offset(row, self.tile_height)?,
            width: self.tile_width,
            height: self.tile_height,
        })
    }
}

/// Reasons a tileset cannot join a registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Range 0 is the empty cell.
    #[error("tileset '{0}' has firstgid 0, which is reserved for empty cells")]
    ZeroFirstGid(String),
    /// The new range intersects one already registered.
    #[error("tileset '{name}' (gids {first}..{end}) overlaps tileset '{other}' (gids {other_first}..{other_end})")]
    Overlap {
        /// Tileset being inserted.
        name: String,
        /// Its first gid.
        first: u64,
        /// Its exclusive end gid.
        end: u64,
        /// Tileset already registered.
        other: String,
        /// First gid of `other`.
        other_first: u64,
        /// Exclusive end gid of `other`.
        other_end: u64,
    },
}

/// Tilesets of one map, sorted by `first_gid` with disjoint gid ranges.
#[derive(Debug, Clone, Default)]
pub struct TilesetRegistry {
    tilesets: Vec<Tileset>,
}

impl TilesetRegistry {
    /// Empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a tileset at its sorted position.
    ///
    /// Ids handed out by [`lookup`](Self::lookup) before an insertion may
    /// shift, so lookups are only meaningful once every tileset is in.
    pub fn insert(&mut self, tileset: Tileset) -> Result<(), RegistryError> {
        if tileset.first_gid == 0 {
            return Err(RegistryError::ZeroFirstGid(tileset.name));
        }
        let first = u64::from(tileset.first_gid);
        let end = tileset.gid_end();
        let overlap = |other: &Tileset| RegistryError::Overlap {
            name: tileset.name.clone(),
            first,
            end,
            other: other.name.clone(),
            other_first: u64::from(other.first_gid),
            other_end: other.gid_end(),
        };

        let pos = self
            .tilesets
            .partition_point(|t| t.first_gid < tileset.first_gid);
        if let Some(prev) = pos.checked_sub(1).map(|i| &self.tilesets[i]) {
            if prev.gid_end() > first {
                return Err(overlap(prev));
            }
        }
        if let Some(next) = self.tilesets.get(pos) {
            if next.first_gid == tileset.first_gid || end > u64::from(next.first_gid) {
                return Err(overlap(next));
            }
        }

        self.tilesets.insert(pos, tileset);
        Ok(())
    }

    /// Finds the tileset claiming `gid` (flags already stripped, non-zero)
    /// and the local index inside it. Binary search over `first_gid`.
    pub fn lookup(&self, gid: u32) -> Option<(TilesetId, u32)> {
        let pos = self.tilesets.partition_point(|t| t.first_gid <= gid);
        let index = pos.checked_sub(1)?;
        let tileset = &self.tilesets[index];
        let local = gid - tileset.first_gid;
        (local < tileset.gid_span()).then_some((TilesetId(index), local))
    }

    /// Tileset by id.
    pub fn get(&self, id: TilesetId) -> Option<&Tileset> {
        self.tilesets.get(id.0)
    }

    /// Number of registered tilesets.
    pub fn len(&self) -> usize {
        self.tilesets.len()
    }

    /// Whether no tileset is registered.
    pub fn is_empty(&self) -> bool {
        self.tilesets.is_empty()
    }

    /// Tilesets in `first_gid` order.
    pub fn iter(&self) -> impl Iterator<Item = &Tileset> {
        self.tilesets.iter()
    }

    /// Sorted tilesets; a [`TilesetId`] is an index into this vector.
    pub fn into_tilesets(self) -> Vec<Tileset> {
        self.tilesets
    }
}
