use glam::Vec2;
use serde::Serialize;

use crate::gid::TileRef;
use crate::object::Object;
use crate::properties::{Color, Properties};
use crate::tileset::Image;

/// A node of the map's layer tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Layer {
    /// Editor id, 0 when the document omits it.
    pub id: u32,
    /// Name shown in the editor, possibly empty.
    pub name: String,
    /// `class` attribute, empty when unset.
    pub class: String,
    /// Hidden layers are still decoded.
    pub visible: bool,
    /// 0.0 to 1.0.
    pub opacity: f32,
    /// Pixel offset relative to the parent layer.
    pub offset: Vec2,
    /// Scroll factor relative to the camera, 1.0 on both axes by default.
    pub parallax: Vec2,
    /// Color multiplied into the layer's tiles or image.
    pub tint: Option<Color>,
    /// Custom properties.
    pub properties: Properties,
    /// What the layer holds.
    pub kind: LayerKind,
}

/// The closed set of layer kinds.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LayerKind {
    /// A grid of tiles.
    Tiles(TileLayer),
    /// Free-positioned objects.
    Objects(ObjectGroup),
    /// A single image.
    Image(ImageLayer),
    /// Child layers.
    Group(GroupLayer),
}

impl Layer {
    /// The tile grid, for tile layers.
    pub fn as_tiles(&self) -> Option<&TileLayer> {
        match &self.kind {
            LayerKind::Tiles(tiles) => Some(tiles),
            _ => None,
        }
    }

    /// The objects, for object groups.
    pub fn as_objects(&self) -> Option<&ObjectGroup> {
        match &self.kind {
            LayerKind::Objects(group) => Some(group),
            _ => None,
        }
    }

    /// The image, for image layers.
    pub fn as_image(&self) -> Option<&ImageLayer> {
        match &self.kind {
            LayerKind::Image(image) => Some(image),
            _ => None,
        }
    }

    /// The children, for group layers.
    pub fn as_group(&self) -> Option<&GroupLayer> {
        match &self.kind {
            LayerKind::Group(group) => Some(group),
            _ => None,
        }
    }

    /// Child layers; empty for anything but a group.
    pub fn children(&self) -> &[Layer] {
        match &self.kind {
            LayerKind::Group(group) => &group.layers,
            _ => &[],
        }
    }
}

/// Row-major grid of resolved cells, `None` being an empty cell.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    /// Columns, equal to the map width.
    pub width: u32,
    /// Rows, equal to the map height.
    pub height: u32,
    /// `width * height` cells, row by row.
    pub tiles: Vec<Option<TileRef>>,
}

impl TileLayer {
    /// Cell at column `x`, row `y`. `None` when empty or out of bounds.
    pub fn get(&self, x: u32, y: u32) -> Option<TileRef> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.tiles[y as usize * self.width as usize + x as usize]
    }

    /// Non-empty cells as `(x, y, tile)`, row by row.
    pub fn iter(&self) -> impl Iterator<Item = (u32, u32, TileRef)> + '_ {
        let width = self.width.max(1) as usize;
        self.tiles.iter().enumerate().filter_map(move |(idx, tile)| {
            tile.map(|t| ((idx % width) as u32, (idx / width) as u32, t))
        })
    }
}

/// Order in which objects of a group are drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawOrder {
    /// Sorted by y coordinate.
    #[default]
    TopDown,
    /// Document order.
    Index,
}

/// Objects of an `<objectgroup>`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectGroup {
    /// Display color of the group in the editor.
    pub color: Option<Color>,
    /// How the objects are meant to be sorted when drawn.
    pub draw_order: DrawOrder,
    /// Objects in document order.
    pub objects: Vec<Object>,
}

/// Layer showing a single image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImageLayer {
    /// `None` when the layer has no image yet.
    pub image: Option<Image>,
    /// Tile the image horizontally.
    pub repeat_x: bool,
    /// Tile the image vertically.
    pub repeat_y: bool,
}

/// Layer owning an ordered list of child layers.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct GroupLayer {
    /// Children in document order.
    pub layers: Vec<Layer>,
}

/// Depth-first, document-order walk over a layer tree.
pub struct Layers<'a> {
    stack: Vec<std::slice::Iter<'a, Layer>>,
}

impl<'a> Layers<'a> {
    pub(crate) fn new(roots: &'a [Layer]) -> Self {
        Layers {
            stack: vec![roots.iter()],
        }
    }
}

impl<'a> Iterator for Layers<'a> {
    type Item = &'a Layer;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let top = self.stack.last_mut()?;
            match top.next() {
                Some(layer) => {
                    if let LayerKind::Group(group) = &layer.kind {
                        self.stack.push(group.layers.iter());
                    }
                    return Some(layer);
                }
                None => {
                    self.stack.pop();
                }
            }
        }
    }
}
