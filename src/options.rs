use serde::{Deserialize, Serialize};

use crate::gid::FlagLayout;

/// Knobs for a map load. Deserializable so tools can read them from JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadOptions {
    /// How the high bits of a gid are split into flags and id.
    pub flag_layout: FlagLayout,
    /// Keep parsed external tilesets around so a TSX shared by several
    /// maps loaded through the same source is parsed once.
    pub cache_tilesets: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        LoadOptions {
            flag_layout: FlagLayout::Modern,
            cache_tilesets: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let options: LoadOptions = serde_json::from_str(r#"{"flag_layout":"legacy"}"#).unwrap();
        assert_eq!(options.flag_layout, FlagLayout::Legacy);
        assert!(options.cache_tilesets);

        let options: LoadOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(options, LoadOptions::default());
    }
}
