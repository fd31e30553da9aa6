#![warn(missing_docs)]

//! Decoder for Tiled TMX maps and TSX tilesets.
//!
//! A map is decoded in one pass into an immutable [`Map`]: tile layers are
//! resolved to [`TileRef`]s, objects and typed properties are kept in
//! document order, and external tilesets are pulled in through a
//! [`TilesetSource`].
//!
//! ```no_run
//! let map = rapid_tmx::Map::load_from_file("assets/demo.tmx")?;
//! for layer in map.layers() {
//!     if let Some(tiles) = layer.as_tiles() {
//!         for (x, y, tile) in tiles.iter() {
//!             let tileset = map.tileset(tile.tileset).unwrap();
//!             println!("{x},{y}: {} #{}", tileset.name, tile.local_id);
//!         }
//!     }
//! }
//! # Ok::<(), rapid_tmx::MapError>(())
//! ```

pub mod codec;
mod error;
pub mod gid;
mod layer;
mod loader {
    pub mod grid;
    pub mod object;
    pub mod properties;
    pub mod source;
    pub mod tileset;
    pub mod tmx_loader;
    pub mod xml;
}
mod map;
mod object;
mod options;
mod properties;
mod tileset;

pub use codec::{CodecError, Compression};
pub use error::MapError;
pub use gid::{FlagLayout, GidCache, TileFlags, TileRef, UnresolvedGid};
pub use layer::{DrawOrder, GroupLayer, ImageLayer, Layer, LayerKind, Layers, ObjectGroup, TileLayer};
pub use loader::grid::{decode_tile_data, Encoding};
pub use loader::source::{FileTilesetSource, NoExternalTilesets, TilesetSource};
pub use map::{Map, Orientation, RenderOrder, StaggerAxis, StaggerIndex, UnknownKeyword};
pub use object::{HorizontalAlign, Object, ObjectShape, Text, VerticalAlign};
pub use options::LoadOptions;
pub use properties::{Color, ParseColorError, Properties, PropertyValue};
pub use tileset::{Frame, Image, RegistryError, TileData, TileRect, Tileset, TilesetId, TilesetRegistry};

/// The XML parser the decoder is built on, for callers of [`Map::from_document`].
pub use roxmltree;
