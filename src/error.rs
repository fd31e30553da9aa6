use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::codec::CodecError;
use crate::gid::UnresolvedGid;

/// Everything that can go wrong while loading a map or tileset.
///
/// Any of these aborts the whole load; a partially assembled map is never
/// returned.
#[derive(Debug, Error)]
pub enum MapError {
    /// The map or tileset file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// File that was being read.
        path: PathBuf,
        /// Underlying I/O error.
        source: io::Error,
    },

    /// The document is not well-formed XML.
    #[error("malformed XML in {origin}: {source}")]
    Xml {
        /// Path or label of the document.
        origin: String,
        /// Error reported by the XML parser.
        source: roxmltree::Error,
    },

    /// A base64 or compressed tile payload could not be decoded.
    #[error("tile data of layer '{layer}' could not be decoded: {source}")]
    Codec {
        /// Layer owning the payload.
        layer: String,
        /// What the codec rejected.
        source: CodecError,
    },

    /// An attribute value or CSV token is not of the expected type.
    #[error("invalid value {value:?} for {what} at {location}: {reason}")]
    Parse {
        /// `line:column` in the document.
        location: String,
        /// Attribute name or token description.
        what: String,
        /// The offending text.
        value: String,
        /// Parser message.
        reason: String,
    },

    /// Decoded tile data does not cover exactly width × height cells.
    #[error("layer '{layer}' holds {actual} cells, expected {expected}")]
    GridSize {
        /// Layer name.
        layer: String,
        /// width × height.
        expected: usize,
        /// Number of cells actually decoded.
        actual: usize,
    },

    /// A gid points outside every registered tileset.
    #[error("unresolved tile in {context}: {source}")]
    UnresolvedGid {
        /// Layer or object the gid was found in.
        context: String,
        /// The gid that failed to resolve.
        source: UnresolvedGid,
    },

    /// An external tileset reference could not be loaded.
    #[error("external tileset '{reference}' could not be loaded: {reason}")]
    MissingTileset {
        /// The `source` attribute of the `<tileset>` element.
        reference: String,
        /// Why loading failed.
        reason: String,
    },

    /// The document does not follow the TMX schema.
    #[error("{message} at {location}")]
    Schema {
        /// `line:column` in the document.
        location: String,
        /// What is wrong.
        message: String,
    },
}

impl MapError {
    pub(crate) fn schema(location: impl Into<String>, message: impl Into<String>) -> Self {
        MapError::Schema {
            location: location.into(),
            message: message.into(),
        }
    }
}
