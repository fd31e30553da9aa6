use glam::vec2;
use log::{debug, warn};
use roxmltree::{Document, Node};

use crate::error::MapError;
use crate::gid::GidCache;
use crate::layer::{DrawOrder, GroupLayer, ImageLayer, Layer, LayerKind, ObjectGroup, TileLayer};
use crate::loader::grid::decode_tile_data;
use crate::loader::object::parse_objects;
use crate::loader::properties::parse_properties;
use crate::loader::source::TilesetSource;
use crate::loader::tileset::{load_tileset_entry, parse_image};
use crate::loader::xml::{self, child, elements, expect_tag, schema};
use crate::map::{Map, Orientation, RenderOrder};
use crate::options::LoadOptions;
use crate::tileset::TilesetRegistry;

/// Turns a parsed TMX document into a [`Map`].
///
/// Every `<tileset>` is registered first; layers are decoded afterwards,
/// depth first and in document order. The first failure aborts the load.
pub fn decode_map_document(
    doc: &Document,
    tilesets: &mut dyn TilesetSource,
    options: &LoadOptions,
) -> Result<Map, MapError> {
    let root = doc.root_element();
    expect_tag(root, "map")?;

    if xml::parse_bool_or(root, "infinite", false)? {
        return Err(schema(root, "infinite maps are not supported"));
    }

    let width: u32 = xml::parse_required(root, "width")?;
    let height: u32 = xml::parse_required(root, "height")?;

    let mut registry = TilesetRegistry::new();
    for node in elements(root).filter(|n| n.has_tag_name("tileset")) {
        let tileset = load_tileset_entry(node, tilesets)?;
        registry
            .insert(tileset)
            .map_err(|e| schema(node, e.to_string()))?;
    }

    let assembler = Assembler {
        registry: &registry,
        options,
        width,
        height,
    };
    let layers = assembler.parse_layers(root)?;
    debug!(
        "map {}x{}: {} tilesets, {} root layers",
        width,
        height,
        registry.len(),
        layers.len()
    );

    Ok(Map {
        version: xml::string_or_default(root, "version"),
        tiled_version: root.attribute("tiledversion").map(str::to_owned),
        orientation: xml::parse_required::<Orientation>(root, "orientation")?,
        render_order: xml::parse_or(root, "renderorder", RenderOrder::RightDown)?,
        width,
        height,
        tile_width: xml::parse_required(root, "tilewidth")?,
        tile_height: xml::parse_required(root, "tileheight")?,
        hex_side_length: xml::parse_optional(root, "hexsidelength")?,
        stagger_axis: xml::parse_optional(root, "staggeraxis")?,
        stagger_index: xml::parse_optional(root, "staggerindex")?,
        background_color: xml::parse_optional(root, "backgroundcolor")?,
        tilesets: registry.into_tilesets(),
        layers,
        properties: parse_properties(root)?,
    })
}

struct Assembler<'r> {
    registry: &'r TilesetRegistry,
    options: &'r LoadOptions,
    width: u32,
    height: u32,
}

impl Assembler<'_> {
    /// Layer children of `<map>` or `<group>`, in document order.
    fn parse_layers(&self, parent: Node) -> Result<Vec<Layer>, MapError> {
        let mut layers = Vec::new();
        for node in elements(parent) {
            match node.tag_name().name() {
                "layer" | "objectgroup" | "imagelayer" | "group" => layers.push(self.parse_layer(node)?),
                "tileset" | "properties" | "editorsettings" => {}
                other => warn!("ignoring unknown element <{other}> at {}", xml::location(node)),
            }
        }
        Ok(layers)
    }

    fn parse_layer(&self, node: Node) -> Result<Layer, MapError> {
        let name = xml::string_or_default(node, "name");
        let kind = match node.tag_name().name() {
            "layer" => LayerKind::Tiles(self.parse_tile_layer(node, &name)?),
            "objectgroup" => LayerKind::Objects(self.parse_object_group(node, &name)?),
            "imagelayer" => LayerKind::Image(ImageLayer {
                image: child(node, "image").map(parse_image).transpose()?,
                repeat_x: xml::parse_bool_or(node, "repeatx", false)?,
                repeat_y: xml::parse_bool_or(node, "repeaty", false)?,
            }),
            _ => LayerKind::Group(GroupLayer {
                layers: self.parse_layers(node)?,
            }),
        };

        Ok(Layer {
            id: xml::parse_or(node, "id", 0)?,
            class: xml::string_or_default(node, "class"),
            visible: xml::parse_bool_or(node, "visible", true)?,
            opacity: xml::parse_or(node, "opacity", 1.0)?,
            offset: vec2(
                xml::parse_or(node, "offsetx", 0.0)?,
                xml::parse_or(node, "offsety", 0.0)?,
            ),
            parallax: vec2(
                xml::parse_or(node, "parallaxx", 1.0)?,
                xml::parse_or(node, "parallaxy", 1.0)?,
            ),
            tint: xml::parse_optional(node, "tintcolor")?,
            properties: parse_properties(node)?,
            name,
            kind,
        })
    }

    fn parse_tile_layer(&self, node: Node, name: &str) -> Result<TileLayer, MapError> {
        let width = xml::parse_or(node, "width", self.width)?;
        let height = xml::parse_or(node, "height", self.height)?;
        if (width, height) != (self.width, self.height) {
            return Err(schema(
                node,
                format!(
                    "layer '{name}' is {width}x{height} but the map is {}x{}",
                    self.width, self.height
                ),
            ));
        }

        let data = child(node, "data")
            .ok_or_else(|| schema(node, format!("layer '{name}' has no <data> element")))?;
        let gids = decode_tile_data(data, width, height, name)?;

        let mut cache = GidCache::new(self.registry, self.options.flag_layout);
        let tiles = gids
            .into_iter()
            .map(|raw| cache.resolve(raw))
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| MapError::UnresolvedGid {
                context: format!("layer '{name}'"),
                source,
            })?;
        debug!("layer '{name}': {} distinct gids", cache.distinct());

        Ok(TileLayer { width, height, tiles })
    }

    fn parse_object_group(&self, node: Node, name: &str) -> Result<ObjectGroup, MapError> {
        let draw_order = match node.attribute("draworder") {
            None | Some("topdown") => DrawOrder::TopDown,
            Some("index") => DrawOrder::Index,
            Some(other) => {
                return Err(xml::invalid(node, "attribute 'draworder'", other, "expected topdown or index"))
            }
        };
        let mut cache = GidCache::new(self.registry, self.options.flag_layout);
        Ok(ObjectGroup {
            color: xml::parse_optional(node, "color")?,
            draw_order,
            objects: parse_objects(node, Some(&mut cache), &format!("object group '{name}'"))?,
        })
    }
}
