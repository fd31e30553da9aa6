use log::debug;
use roxmltree::Node;

use crate::codec::{self, Compression};
use crate::error::MapError;
use crate::loader::xml::{self, elements, expect_tag, invalid, schema};

/// Wire encoding of a `<data>` element.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// One `<tile gid="..."/>` child per cell.
    Xml,
    /// Comma separated decimal gids.
    Csv,
    /// Little-endian `u32` gids, optionally compressed.
    Base64(Compression),
}

impl Encoding {
    /// Reads the `encoding` / `compression` attributes of a `<data>` node.
    pub fn of(data: Node) -> Result<Self, MapError> {
        let compression = data.attribute("compression");
        match (data.attribute("encoding"), compression) {
            (None, None) => Ok(Encoding::Xml),
            (Some("csv"), None) => Ok(Encoding::Csv),
            (Some("base64"), tag) => {
                let tag = tag.unwrap_or_default();
                Compression::from_tag(tag)
                    .map(Encoding::Base64)
                    .ok_or_else(|| schema(data, format!("unsupported compression '{tag}'")))
            }
            (None | Some("csv"), Some(tag)) => Err(schema(
                data,
                format!("compression '{tag}' is only valid for base64 data"),
            )),
            (Some(other), _) => Err(schema(data, format!("unsupported encoding '{other}'"))),
        }
    }
}

/// Decodes the cells of a tile layer's `<data>` element into raw gids.
///
/// The result always holds exactly `width * height` values, in row-major
/// order; anything else fails with [`MapError::GridSize`].
pub fn decode_tile_data(data: Node, width: u32, height: u32, layer: &str) -> Result<Vec<u32>, MapError> {
    expect_tag(data, "data")?;
    if xml::child(data, "chunk").is_some() {
        return Err(schema(
            data,
            format!("layer '{layer}' uses chunked data; infinite maps are not supported"),
        ));
    }

    let expected = (width as usize)
        .checked_mul(height as usize)
        .ok_or_else(|| schema(data, format!("layer '{layer}' is too large ({width}x{height})")))?;

    let encoding = Encoding::of(data)?;
    let gids = match encoding {
        Encoding::Xml => decode_elements(data)?,
        Encoding::Csv => decode_csv(data, layer)?,
        Encoding::Base64(compression) => {
            let limit = expected.saturating_mul(4);
            let text = data.text().unwrap_or_default();
            let bytes = codec::decode_with_limit(text, compression, limit).map_err(|source| {
                MapError::Codec {
                    layer: layer.to_owned(),
                    source,
                }
            })?;
            codec::gids_from_le_bytes(&bytes)
        }
    };

    if gids.len() != expected {
        return Err(MapError::GridSize {
            layer: layer.to_owned(),
            expected,
            actual: gids.len(),
        });
    }
    debug!("layer '{layer}': decoded {expected} cells ({encoding:?})");
    Ok(gids)
}

// Buffers grow with the cells actually present; the declared size is only
// compared at the end.
fn decode_elements(data: Node) -> Result<Vec<u32>, MapError> {
    let mut gids = Vec::new();
    for tile in elements(data).filter(|n| n.has_tag_name("tile")) {
        // editors omit the gid of empty cells
        gids.push(xml::parse_or(tile, "gid", 0u32)?);
    }
    Ok(gids)
}

fn decode_csv(data: Node, layer: &str) -> Result<Vec<u32>, MapError> {
    let text = data.text().unwrap_or_default();
    // at most one cell per two bytes ("1,")
    let mut gids = Vec::with_capacity(text.len() / 2 + 1);
    let tokens = text
        .split(|c: char| c == ',' || c.is_ascii_whitespace())
        .filter(|t| !t.is_empty());
    for (index, token) in tokens.enumerate() {
        let gid = token
            .parse::<u32>()
            .map_err(|e| invalid(data, format!("csv cell {index} of layer '{layer}'"), token, e))?;
        gids.push(gid);
    }
    Ok(gids)
}
