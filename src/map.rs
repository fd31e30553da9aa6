use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use roxmltree::Document;
use serde::Serialize;
use thiserror::Error;

use crate::error::MapError;
use crate::gid::TileRef;
use crate::layer::{Layer, Layers};
use crate::loader::source::{FileTilesetSource, NoExternalTilesets, TilesetSource};
use crate::loader::tmx_loader::decode_map_document;
use crate::options::LoadOptions;
use crate::properties::{Color, Properties};
use crate::tileset::{TileData, Tileset, TilesetId};

/// A keyword attribute carried a value outside its allowed set.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} '{value}'")]
pub struct UnknownKeyword {
    /// Which keyword set was expected.
    pub kind: &'static str,
    /// What the document said.
    pub value: String,
}

macro_rules! keyword_enum {
    ($(#[$meta:meta])* $name:ident, $kind:literal { $($variant:ident => $text:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
        #[allow(missing_docs)]
        pub enum $name {
            $(#[serde(rename = $text)] $variant),+
        }

        impl FromStr for $name {
            type Err = UnknownKeyword;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(UnknownKeyword { kind: $kind, value: s.to_owned() }),
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(match self {
                    $($name::$variant => $text,)+
                })
            }
        }
    };
}

keyword_enum!(
    /// Projection of the map grid.
    Orientation, "orientation" {
        Orthogonal => "orthogonal",
        Isometric => "isometric",
        Staggered => "staggered",
        Hexagonal => "hexagonal",
    }
);

keyword_enum!(
    /// Order in which tiles are meant to be drawn.
    RenderOrder, "render order" {
        RightDown => "right-down",
        RightUp => "right-up",
        LeftDown => "left-down",
        LeftUp => "left-up",
    }
);

keyword_enum!(
    /// Axis along which staggered and hexagonal rows shift.
    StaggerAxis, "stagger axis" {
        X => "x",
        Y => "y",
    }
);

keyword_enum!(
    /// Whether odd or even rows/columns are shifted.
    StaggerIndex, "stagger index" {
        Odd => "odd",
        Even => "even",
    }
);

/// A fully decoded TMX map. Built once, read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Map {
    /// TMX format version, empty when absent.
    pub version: String,
    /// Editor version that wrote the file.
    pub tiled_version: Option<String>,
    /// Grid projection.
    pub orientation: Orientation,
    /// Order in which tiles are meant to be drawn.
    pub render_order: RenderOrder,
    /// Width in tiles.
    pub width: u32,
    /// Height in tiles.
    pub height: u32,
    /// Tile width in pixels.
    pub tile_width: u32,
    /// Tile height in pixels.
    pub tile_height: u32,
    /// Side length of hexagonal tiles, in pixels.
    pub hex_side_length: Option<u32>,
    /// Stagger axis of staggered and hexagonal maps.
    pub stagger_axis: Option<StaggerAxis>,
    /// Stagger index of staggered and hexagonal maps.
    pub stagger_index: Option<StaggerIndex>,
    /// Background fill, `None` for transparent.
    pub background_color: Option<Color>,
    /// Sorted by `first_gid`; [`TilesetId`] indexes into this.
    pub tilesets: Vec<Tileset>,
    /// Root layers in document order.
    pub layers: Vec<Layer>,
    /// Custom properties.
    pub properties: Properties,
}

impl Map {
    /// Assembles a map from an already parsed document.
    ///
    /// External tilesets are requested from `tilesets`. All tilesets are
    /// registered before any layer is decoded.
    pub fn from_document(
        doc: &Document,
        tilesets: &mut dyn TilesetSource,
        options: &LoadOptions,
    ) -> Result<Self, MapError> {
        decode_map_document(doc, tilesets, options)
    }

    /// Parses a TMX document held in memory. Maps referencing external
    /// tilesets fail with [`MapError::MissingTileset`]; use
    /// [`load_from_str_with`](Self::load_from_str_with) to provide them.
    pub fn load_from_str(xml: &str) -> Result<Self, MapError> {
        Self::load_from_str_with(xml, &mut NoExternalTilesets, &LoadOptions::default())
    }

    /// Parses a TMX document held in memory with a custom tileset source.
    pub fn load_from_str_with(
        xml: &str,
        tilesets: &mut dyn TilesetSource,
        options: &LoadOptions,
    ) -> Result<Self, MapError> {
        let doc = Document::parse(xml).map_err(|source| MapError::Xml {
            origin: "<string>".to_owned(),
            source,
        })?;
        Self::from_document(&doc, tilesets, options)
    }

    /// Reads a TMX file; external tilesets are resolved next to it.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, MapError> {
        Self::load_from_file_with(path, &LoadOptions::default())
    }

    /// Like [`load_from_file`](Self::load_from_file) with explicit options.
    pub fn load_from_file_with(path: impl AsRef<Path>, options: &LoadOptions) -> Result<Self, MapError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| MapError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let doc = Document::parse(&text).map_err(|source| MapError::Xml {
            origin: path.display().to_string(),
            source,
        })?;

        let map_dir = path
            .parent()
            .map(|d| d.to_path_buf())
            .unwrap_or_else(|| PathBuf::from("./"));
        let mut source = FileTilesetSource::new(map_dir).with_cache(options.cache_tilesets);
        Self::from_document(&doc, &mut source, options)
    }

    /// Tileset by id, as found in [`TileRef::tileset`].
    pub fn tileset(&self, id: TilesetId) -> Option<&Tileset> {
        self.tilesets.get(id.index())
    }

    /// Tileset owning a resolved tile.
    pub fn tile_tileset(&self, tile: TileRef) -> Option<&Tileset> {
        self.tileset(tile.tileset)
    }

    /// Per-tile data (animation, collision, properties) of a resolved tile.
    pub fn tile_data(&self, tile: TileRef) -> Option<&TileData> {
        self.tile_tileset(tile)?.tile(tile.local_id)
    }

    /// Every layer of the tree, depth first, in document order.
    pub fn layers(&self) -> Layers<'_> {
        Layers::new(&self.layers)
    }

    /// First layer with this name, searching the whole tree.
    pub fn find_layer(&self, name: &str) -> Option<&Layer> {
        self.layers().find(|l| l.name == name)
    }
}
