use glam::Vec2;
use serde::Serialize;

use crate::gid::TileRef;
use crate::properties::{Color, Properties};

/// Geometry of an [`Object`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum ObjectShape {
    /// Axis-aligned box of `size`, rotated around `position`.
    Rectangle,
    /// Ellipse inscribed in the object's box.
    Ellipse,
    /// Single point at `position`.
    Point,
    /// Closed outline, points relative to the object position.
    Polygon(Vec<Vec2>),
    /// Open outline, points relative to the object position.
    Polyline(Vec<Vec2>),
    /// Text laid out inside the object's box.
    Text(Text),
    /// Tile object; the tile itself is in [`Object::tile`].
    Tile,
}

/// Horizontal alignment of a text object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum HorizontalAlign {
    #[default]
    Left,
    Center,
    Right,
    Justify,
}

/// Vertical alignment of a text object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
#[allow(missing_docs)]
pub enum VerticalAlign {
    #[default]
    Top,
    Center,
    Bottom,
}

/// Payload of a text object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Text {
    /// Content, taken from the element text.
    pub text: String,
    /// Font name; `sans-serif` when absent.
    pub font_family: String,
    /// Font size in pixels.
    pub pixel_size: u32,
    /// Whether lines wrap at the box width.
    pub wrap: bool,
    /// Text color; opaque black when absent.
    pub color: Color,
    /// Bold face.
    pub bold: bool,
    /// Italic face.
    pub italic: bool,
    /// Underlined.
    pub underline: bool,
    /// Struck through.
    pub strikeout: bool,
    /// Defaults to `true`.
    pub kerning: bool,
    /// Horizontal alignment inside the box.
    pub halign: HorizontalAlign,
    /// Vertical alignment inside the box.
    pub valign: VerticalAlign,
}

impl Default for Text {
    fn default() -> Self {
        Text {
            text: String::new(),
            font_family: "sans-serif".to_owned(),
            pixel_size: 16,
            wrap: false,
            color: Color::rgb(0, 0, 0),
            bold: false,
            italic: false,
            underline: false,
            strikeout: false,
            kerning: true,
            halign: HorizontalAlign::Left,
            valign: VerticalAlign::Top,
        }
    }
}

/// A free-positioned object of an object group or a tile collision group.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Object {
    /// Unique id within the map; 0 inside tileset collision groups that omit it.
    pub id: u32,
    /// Name given in the editor, possibly empty.
    pub name: String,
    /// `class` attribute, falling back to the older `type`.
    pub class_name: String,
    /// Pixel position; the bottom-left corner for tile objects.
    pub position: Vec2,
    /// Width and height in pixels, zero for points.
    pub size: Vec2,
    /// Clockwise, in degrees.
    pub rotation: f32,
    /// Hidden objects are still decoded.
    pub visible: bool,
    /// Geometry of the object.
    pub shape: ObjectShape,
    /// Set exactly when `shape` is [`ObjectShape::Tile`].
    pub tile: Option<TileRef>,
    /// Custom properties.
    pub properties: Properties,
}
