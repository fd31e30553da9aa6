use std::collections::BTreeMap;

use glam::{vec2, Vec2};
use log::debug;
use roxmltree::{Document, Node};

use crate::error::MapError;
use crate::loader::object::parse_objects;
use crate::loader::properties::parse_properties;
use crate::loader::source::TilesetSource;
use crate::loader::xml::{self, child, elements, expect_tag, schema};
use crate::tileset::{Frame, Image, TileData, Tileset};

/// Parses a standalone TSX document. `origin` labels XML errors.
pub(crate) fn decode_tsx_str(text: &str, origin: &str) -> Result<Tileset, MapError> {
    let doc = Document::parse(text).map_err(|source| MapError::Xml {
        origin: origin.to_owned(),
        source,
    })?;
    let root = doc.root_element();
    expect_tag(root, "tileset")?;
    if root.attribute("source").is_some() {
        return Err(schema(root, "a TSX document cannot reference another tileset"));
    }
    parse_tileset(root)
}

/// Reads a `<tileset>` child of `<map>`, embedded or pointing at a TSX
/// through `source`.
pub(crate) fn load_tileset_entry(
    node: Node,
    tilesets: &mut dyn TilesetSource,
) -> Result<Tileset, MapError> {
    let first_gid: u32 = xml::parse_required(node, "firstgid")?;
    let mut tileset = match node.attribute("source") {
        Some(reference) => {
            let mut tileset = tilesets.load_tileset(reference)?;
            tileset.source = Some(reference.to_owned());
            tileset
        }
        None => parse_tileset(node)?,
    };
    tileset.first_gid = first_gid;
    debug!(
        "tileset '{}': gids {}..{}",
        tileset.name,
        first_gid,
        tileset.gid_end()
    );
    Ok(tileset)
}

/// Parses the body of a `<tileset>` element. `first_gid` is left at 0.
pub(crate) fn parse_tileset(node: Node) -> Result<Tileset, MapError> {
    let name = xml::string_or_default(node, "name");
    let tile_width: u32 = xml::parse_required(node, "tilewidth")?;
    let tile_height: u32 = xml::parse_required(node, "tileheight")?;
    let spacing: u32 = xml::parse_or(node, "spacing", 0)?;
    let margin: u32 = xml::parse_or(node, "margin", 0)?;
    let image = child(node, "image").map(parse_image).transpose()?;

    let tile_offset = match child(node, "tileoffset") {
        Some(offset) => vec2(xml::parse_or(offset, "x", 0.0)?, xml::parse_or(offset, "y", 0.0)?),
        None => Vec2::ZERO,
    };

    let mut tiles = BTreeMap::new();
    for tile in elements(node).filter(|n| n.has_tag_name("tile")) {
        let (id, data) = parse_tile(tile, &name)?;
        if tiles.insert(id, data).is_some() {
            return Err(schema(tile, format!("tile {id} is declared twice in tileset '{name}'")));
        }
    }

    let grid = image
        .as_ref()
        .and_then(|image| atlas_grid(image, tile_width, tile_height, spacing, margin));
    let tile_count = match (xml::parse_optional::<u32>(node, "tilecount")?, grid, &image) {
        (Some(count), _, _) => count,
        (None, Some((columns, rows)), _) => columns.checked_mul(rows).ok_or_else(|| {
            schema(
                node,
                format!("tileset '{name}' has too many tiles ({columns}x{rows})"),
            )
        })?,
        (None, None, None) => tiles.len() as u32,
        (None, None, Some(_)) => {
            return Err(schema(
                node,
                format!("tileset '{name}' has no tilecount and its image size is unknown"),
            ))
        }
    };
    let columns = match xml::parse_optional::<u32>(node, "columns")? {
        Some(columns) => columns,
        None => grid.map(|(columns, _)| columns).unwrap_or(0),
    };

    let tileset = Tileset {
        first_gid: 0,
        name,
        class: xml::string_or_default(node, "class"),
        source: None,
        tile_width,
        tile_height,
        tile_count,
        columns,
        spacing,
        margin,
        tile_offset,
        image,
        tiles,
        properties: parse_properties(node)?,
    };

    let span = tileset.gid_span();
    for (id, data) in &tileset.tiles {
        if let Some(frame) = data.animation.iter().find(|f| f.local_id >= span) {
            return Err(schema(
                node,
                format!(
                    "tile {id} of tileset '{}' animates to tile {}, which does not exist",
                    tileset.name, frame.local_id
                ),
            ));
        }
    }
    Ok(tileset)
}

/// Columns and rows of a regular atlas, when the image size is known.
fn atlas_grid(image: &Image, tile_width: u32, tile_height: u32, spacing: u32, margin: u32) -> Option<(u32, u32)> {
    let fit = |extent: u32, tile: u32| {
        let step = tile.checked_add(spacing).filter(|s| *s > 0)?;
        Some(
            extent
                .saturating_sub(margin.saturating_mul(2))
                .saturating_add(spacing)
                / step,
        )
    };
    Some((
        fit(image.width?, tile_width)?,
        fit(image.height?, tile_height)?,
    ))
}

pub(crate) fn parse_image(node: Node) -> Result<Image, MapError> {
    Ok(Image {
        source: xml::required(node, "source")?.to_owned(),
        width: xml::parse_optional(node, "width")?,
        height: xml::parse_optional(node, "height")?,
        transparent: xml::parse_optional(node, "trans")?,
    })
}

fn parse_tile(node: Node, tileset: &str) -> Result<(u32, TileData), MapError> {
    let id: u32 = xml::parse_required(node, "id")?;

    let animation = match child(node, "animation") {
        Some(animation) => elements(animation)
            .filter(|n| n.has_tag_name("frame"))
            .map(|frame| -> Result<Frame, MapError> {
                Ok(Frame {
                    local_id: xml::parse_required(frame, "tileid")?,
                    duration_ms: xml::parse_required(frame, "duration")?,
                })
            })
            .collect::<Result<Vec<_>, _>>()?,
        None => Vec::new(),
    };

    let collision = match child(node, "objectgroup") {
        Some(group) => parse_objects(
            group,
            None,
            &format!("collision group of tile {id} in tileset '{tileset}'"),
        )?,
        None => Vec::new(),
    };

    let class = node
        .attribute("class")
        .or_else(|| node.attribute("type"))
        .unwrap_or_default()
        .to_owned();

    Ok((
        id,
        TileData {
            class,
            probability: xml::parse_or(node, "probability", 1.0)?,
            image: child(node, "image").map(parse_image).transpose()?,
            animation,
            collision,
            properties: parse_properties(node)?,
        },
    ))
}
