use glam::{vec2, Vec2};
use log::warn;
use roxmltree::Node;

use crate::error::MapError;
use crate::gid::GidCache;
use crate::loader::properties::parse_properties;
use crate::loader::xml::{self, elements, invalid, schema};
use crate::object::{HorizontalAlign, Object, ObjectShape, Text, VerticalAlign};
use crate::properties::Color;

/// Parses an `<object>`. `tiles` resolves the `gid` of tile objects; it is
/// `None` inside tileset collision groups, where tile objects are rejected.
pub(crate) fn parse_object(
    node: Node,
    tiles: Option<&mut GidCache>,
    context: &str,
) -> Result<Object, MapError> {
    xml::expect_tag(node, "object")?;
    let id = xml::parse_or(node, "id", 0u32)?;

    if node.attribute("template").is_some() {
        warn!("object {id} in {context} uses a template; template values are not merged");
    }

    let (shape, tile) = match node.attribute("gid") {
        Some(_) => {
            let raw: u32 = xml::parse_required(node, "gid")?;
            let tiles = tiles.ok_or_else(|| {
                schema(node, format!("tile object {id} is not allowed in {context}"))
            })?;
            let object_context = || format!("object {id} of {context}");
            let tile = tiles
                .resolve(raw)
                .map_err(|source| MapError::UnresolvedGid {
                    context: object_context(),
                    source,
                })?
                .ok_or_else(|| schema(node, format!("{} has gid 0", object_context())))?;
            (ObjectShape::Tile, Some(tile))
        }
        None => (parse_shape(node)?, None),
    };

    let class_name = node
        .attribute("class")
        .or_else(|| node.attribute("type"))
        .unwrap_or_default()
        .to_owned();

    Ok(Object {
        id,
        name: xml::string_or_default(node, "name"),
        class_name,
        position: vec2(xml::parse_or(node, "x", 0.0)?, xml::parse_or(node, "y", 0.0)?),
        size: vec2(
            xml::parse_or(node, "width", 0.0)?,
            xml::parse_or(node, "height", 0.0)?,
        ),
        rotation: xml::parse_or(node, "rotation", 0.0)?,
        visible: xml::parse_bool_or(node, "visible", true)?,
        shape,
        tile,
        properties: parse_properties(node)?,
    })
}

fn parse_shape(node: Node) -> Result<ObjectShape, MapError> {
    for shape in elements(node) {
        match shape.tag_name().name() {
            "ellipse" => return Ok(ObjectShape::Ellipse),
            "point" => return Ok(ObjectShape::Point),
            "polygon" => return Ok(ObjectShape::Polygon(parse_points(shape)?)),
            "polyline" => return Ok(ObjectShape::Polyline(parse_points(shape)?)),
            "text" => return Ok(ObjectShape::Text(parse_text(shape)?)),
            _ => {}
        }
    }
    Ok(ObjectShape::Rectangle)
}

/// `points="0,0 16,0 16,16"`
fn parse_points(node: Node) -> Result<Vec<Vec2>, MapError> {
    let text = xml::required(node, "points")?;
    text.split_ascii_whitespace()
        .map(|pair| -> Result<Vec2, MapError> {
            let bad = |reason: &str| invalid(node, "attribute 'points'", pair, reason);
            let (x, y) = pair.split_once(',').ok_or_else(|| bad("expected x,y"))?;
            let x: f32 = x.parse().map_err(|_| bad("x is not a number"))?;
            let y: f32 = y.parse().map_err(|_| bad("y is not a number"))?;
            Ok(vec2(x, y))
        })
        .collect()
}

fn parse_text(node: Node) -> Result<Text, MapError> {
    let defaults = Text::default();
    let halign = match node.attribute("halign").unwrap_or("left") {
        "left" => HorizontalAlign::Left,
        "center" => HorizontalAlign::Center,
        "right" => HorizontalAlign::Right,
        "justify" => HorizontalAlign::Justify,
        other => return Err(invalid(node, "attribute 'halign'", other, "unknown alignment")),
    };
    let valign = match node.attribute("valign").unwrap_or("top") {
        "top" => VerticalAlign::Top,
        "center" => VerticalAlign::Center,
        "bottom" => VerticalAlign::Bottom,
        other => return Err(invalid(node, "attribute 'valign'", other, "unknown alignment")),
    };

    Ok(Text {
        text: node.text().unwrap_or_default().to_owned(),
        font_family: node
            .attribute("fontfamily")
            .map(str::to_owned)
            .unwrap_or(defaults.font_family),
        pixel_size: xml::parse_or(node, "pixelsize", defaults.pixel_size)?,
        wrap: xml::parse_bool_or(node, "wrap", defaults.wrap)?,
        color: xml::parse_or::<Color>(node, "color", defaults.color)?,
        bold: xml::parse_bool_or(node, "bold", defaults.bold)?,
        italic: xml::parse_bool_or(node, "italic", defaults.italic)?,
        underline: xml::parse_bool_or(node, "underline", defaults.underline)?,
        strikeout: xml::parse_bool_or(node, "strikeout", defaults.strikeout)?,
        kerning: xml::parse_bool_or(node, "kerning", defaults.kerning)?,
        halign,
        valign,
    })
}

/// Objects of an `<objectgroup>` in document order.
pub(crate) fn parse_objects(
    group: Node,
    mut tiles: Option<&mut GidCache>,
    context: &str,
) -> Result<Vec<Object>, MapError> {
    elements(group)
        .filter(|n| n.has_tag_name("object"))
        .map(|n| parse_object(n, tiles.as_deref_mut(), context))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gid::FlagLayout;
    use crate::tileset::{Tileset, TilesetRegistry};
    use roxmltree::Document;

    fn parse(xml: &str, tiles: Option<&mut GidCache>) -> Result<Object, MapError> {
        let doc = Document::parse(xml).expect("xml");
        parse_object(doc.root_element(), tiles, "test group")
    }

    #[test]
    fn detects_shapes() {
        let rect = parse(r#"<object id="1" x="4" y="8" width="16" height="12"/>"#, None).unwrap();
        assert_eq!(rect.shape, ObjectShape::Rectangle);
        assert_eq!(rect.position, vec2(4.0, 8.0));
        assert_eq!(rect.size, vec2(16.0, 12.0));

        let ellipse = parse(r#"<object id="2"><ellipse/></object>"#, None).unwrap();
        assert_eq!(ellipse.shape, ObjectShape::Ellipse);

        let point = parse(r#"<object id="3"><point/></object>"#, None).unwrap();
        assert_eq!(point.shape, ObjectShape::Point);

        let poly = parse(r#"<object id="4"><polygon points="0,0 16,0 16,-8.5"/></object>"#, None).unwrap();
        assert_eq!(
            poly.shape,
            ObjectShape::Polygon(vec![vec2(0.0, 0.0), vec2(16.0, 0.0), vec2(16.0, -8.5)])
        );

        let line = parse(r#"<object id="5"><polyline points="1,2 3,4"/></object>"#, None).unwrap();
        assert_eq!(line.shape, ObjectShape::Polyline(vec![vec2(1.0, 2.0), vec2(3.0, 4.0)]));
    }

    #[test]
    fn reads_text_objects() {
        let obj = parse(
            r##"<object id="9" name="sign" type="label">
                  <text fontfamily="Serif" pixelsize="24" wrap="1" color="#ff0000" halign="center">Hello</text>
                </object>"##,
            None,
        )
        .unwrap();
        assert_eq!(obj.class_name, "label");
        let ObjectShape::Text(text) = obj.shape else {
            panic!("expected text");
        };
        assert_eq!(text.text, "Hello");
        assert_eq!(text.font_family, "Serif");
        assert_eq!(text.pixel_size, 24);
        assert!(text.wrap);
        assert!(text.kerning);
        assert_eq!(text.color, Color::rgb(255, 0, 0));
        assert_eq!(text.halign, HorizontalAlign::Center);
        assert_eq!(text.valign, VerticalAlign::Top);
    }

    #[test]
    fn resolves_tile_objects() {
        let mut registry = TilesetRegistry::new();
        registry.insert(Tileset::atlas("t", 1, 4, 16, 16)).unwrap();
        let mut cache = GidCache::new(&registry, FlagLayout::Modern);

        let obj = parse(r#"<object id="7" gid="1073741827" x="0" y="16"/>"#, Some(&mut cache)).unwrap();
        assert_eq!(obj.shape, ObjectShape::Tile);
        let tile = obj.tile.unwrap();
        assert_eq!(tile.local_id, 2);
        assert!(tile.flip_v());

        let err = parse(r#"<object id="8" gid="9"/>"#, Some(&mut cache)).unwrap_err();
        assert!(matches!(err, MapError::UnresolvedGid { ref context, .. } if context.contains("object 8")));

        let err = parse(r#"<object id="8" gid="0"/>"#, Some(&mut cache)).unwrap_err();
        assert!(matches!(err, MapError::Schema { .. }));
    }

    #[test]
    fn tile_objects_need_a_resolver() {
        let err = parse(r#"<object id="1" gid="1"/>"#, None).unwrap_err();
        assert!(matches!(err, MapError::Schema { .. }));
    }

    #[test]
    fn malformed_points_are_parse_errors() {
        let err = parse(r#"<object id="1"><polygon points="0,0 16"/></object>"#, None).unwrap_err();
        assert!(matches!(err, MapError::Parse { ref value, .. } if value == "16"));
    }
}
