//! Global tile ids: flag extraction and resolution against the tileset
//! registry.

use bitflags::bitflags;
use fxhash::FxHashMap;
use log::trace;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tileset::{TilesetId, TilesetRegistry};

bitflags! {
    /// Transform flags stored in the high bits of a gid.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
    pub struct TileFlags: u32 {
        /// bit 31
        const FLIP_HORIZONTAL = 0x8000_0000;
        /// bit 30
        const FLIP_VERTICAL = 0x4000_0000;
        /// bit 29
        const FLIP_DIAGONAL = 0x2000_0000;
        /// bit 28, hexagonal maps only
        const ROTATE_120 = 0x1000_0000;
    }
}

/// Which high bits of a gid are flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlagLayout {
    /// Bits 28..=31 are flags, ids are 28 bits wide.
    #[default]
    Modern,
    /// Bits 29..=31 are flags and bit 28 belongs to the id, as in documents
    /// written before the rotate-120 flag existed.
    Legacy,
}

impl FlagLayout {
    /// Bits holding transform flags.
    pub const fn flag_mask(self) -> u32 {
        match self {
            FlagLayout::Modern => 0xF000_0000,
            FlagLayout::Legacy => 0xE000_0000,
        }
    }

    /// Bits holding the numeric id.
    pub const fn id_mask(self) -> u32 {
        !self.flag_mask()
    }

    /// Splits a raw gid into its numeric id and flags.
    #[inline]
    pub fn split(self, raw: u32) -> (u32, TileFlags) {
        (
            raw & self.id_mask(),
            TileFlags::from_bits_truncate(raw & self.flag_mask()),
        )
    }
}

/// A resolved, non-empty map cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct TileRef {
    /// Tileset the tile belongs to.
    pub tileset: TilesetId,
    /// Index of the tile inside its tileset.
    pub local_id: u32,
    /// Transform applied to the tile in this cell.
    pub flags: TileFlags,
}

impl TileRef {
    /// Mirrored left to right.
    #[inline]
    pub fn flip_h(&self) -> bool {
        self.flags.contains(TileFlags::FLIP_HORIZONTAL)
    }
    /// Mirrored top to bottom.
    #[inline]
    pub fn flip_v(&self) -> bool {
        self.flags.contains(TileFlags::FLIP_VERTICAL)
    }
    /// Mirrored along the top-left to bottom-right diagonal.
    #[inline]
    pub fn flip_d(&self) -> bool {
        self.flags.contains(TileFlags::FLIP_DIAGONAL)
    }
    /// Rotated 120 degrees clockwise (hexagonal maps).
    #[inline]
    pub fn rotate_120(&self) -> bool {
        self.flags.contains(TileFlags::ROTATE_120)
    }
}

/// A gid that no registered tileset claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("gid {gid} (raw {raw:#010x}) is not covered by any tileset")]
pub struct UnresolvedGid {
    /// Numeric id with flags stripped.
    pub gid: u32,
    /// Value as stored in the document.
    pub raw: u32,
}

/// Resolves a raw gid. `Ok(None)` is the empty cell (id 0), which never
/// reaches the registry.
pub fn resolve(
    raw: u32,
    registry: &TilesetRegistry,
    layout: FlagLayout,
) -> Result<Option<TileRef>, UnresolvedGid> {
    let (gid, flags) = layout.split(raw);
    if gid == 0 {
        return Ok(None);
    }
    let (tileset, local_id) = registry.lookup(gid).ok_or(UnresolvedGid { gid, raw })?;
    Ok(Some(TileRef {
        tileset,
        local_id,
        flags,
    }))
}

/// Memoizing resolver, one per layer so a repeated raw value costs a single
/// registry lookup.
pub struct GidCache<'r> {
    registry: &'r TilesetRegistry,
    layout: FlagLayout,
    memo: FxHashMap<u32, Option<TileRef>>,
}

impl<'r> GidCache<'r> {
    /// Empty cache over `registry`.
    pub fn new(registry: &'r TilesetRegistry, layout: FlagLayout) -> Self {
        GidCache {
            registry,
            layout,
            memo: FxHashMap::default(),
        }
    }

    /// Same as [`resolve`], answered from the cache when `raw` was seen before.
    pub fn resolve(&mut self, raw: u32) -> Result<Option<TileRef>, UnresolvedGid> {
        if let Some(hit) = self.memo.get(&raw) {
            return Ok(*hit);
        }
        let resolved = resolve(raw, self.registry, self.layout)?;
        trace!("gid {raw:#010x} -> {resolved:?}");
        self.memo.insert(raw, resolved);
        Ok(resolved)
    }

    /// Number of distinct raw values looked up so far.
    pub fn distinct(&self) -> usize {
        self.memo.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tileset::Tileset;

    fn registry() -> TilesetRegistry {
        let mut registry = TilesetRegistry::new();
        registry
            .insert(Tileset::atlas("t1", 1, 10, 16, 16))
            .expect("t1");
        registry
            .insert(Tileset::atlas("t2", 11, 5, 16, 16))
            .expect("t2");
        registry
    }

    #[test]
    fn gid_zero_is_empty_whatever_the_registry() {
        assert_eq!(resolve(0, &TilesetRegistry::new(), FlagLayout::Modern), Ok(None));
        assert_eq!(resolve(0, &registry(), FlagLayout::Modern), Ok(None));
        // flags on an empty cell still mean empty
        assert_eq!(resolve(0x8000_0000, &registry(), FlagLayout::Modern), Ok(None));
    }

    #[test]
    fn resolves_across_tileset_boundary() {
        let registry = registry();
        let t10 = resolve(10, &registry, FlagLayout::Modern).unwrap().unwrap();
        assert_eq!((t10.tileset.index(), t10.local_id), (0, 9));

        let t11 = resolve(11, &registry, FlagLayout::Modern).unwrap().unwrap();
        assert_eq!((t11.tileset.index(), t11.local_id), (1, 0));

        let err = resolve(16, &registry, FlagLayout::Modern).unwrap_err();
        assert_eq!(err.gid, 16);
    }

    #[test]
    fn extracts_flip_horizontal() {
        let tile = resolve(0x8000_0005, &registry(), FlagLayout::Modern)
            .unwrap()
            .unwrap();
        assert_eq!(tile.local_id, 4);
        assert!(tile.flip_h());
        assert!(!tile.flip_v());
        assert!(!tile.flip_d());
        assert!(!tile.rotate_120());
    }

    #[test]
    fn every_flag_combination_is_recoverable() {
        for bits in 0u32..16 {
            let raw = (bits << 28) | 5;
            let (gid, flags) = FlagLayout::Modern.split(raw);
            assert_eq!(gid, 5);
            assert_eq!(flags.bits(), bits << 28);
            assert_eq!(flags.contains(TileFlags::FLIP_HORIZONTAL), bits & 0b1000 != 0);
            assert_eq!(flags.contains(TileFlags::FLIP_VERTICAL), bits & 0b0100 != 0);
            assert_eq!(flags.contains(TileFlags::FLIP_DIAGONAL), bits & 0b0010 != 0);
            assert_eq!(flags.contains(TileFlags::ROTATE_120), bits & 0b0001 != 0);
        }
    }

    #[test]
    fn legacy_layout_keeps_bit_28_in_the_id() {
        let (gid, flags) = FlagLayout::Legacy.split(0x9000_0001);
        assert_eq!(gid, 0x1000_0001);
        assert_eq!(flags, TileFlags::FLIP_HORIZONTAL);
    }

    #[test]
    fn below_first_gid_is_unresolved() {
        let mut registry = TilesetRegistry::new();
        registry
            .insert(Tileset::atlas("late", 100, 4, 8, 8))
            .expect("insert");
        assert!(resolve(99, &registry, FlagLayout::Modern).is_err());
        assert!(resolve(100, &registry, FlagLayout::Modern).unwrap().is_some());
    }

    #[test]
    fn cache_looks_up_each_raw_value_once() {
        let registry = registry();
        let mut cache = GidCache::new(&registry, FlagLayout::Modern);
        for raw in [1, 1, 11, 0, 11, 0x4000_0001] {
            cache.resolve(raw).expect("resolve");
        }
        assert_eq!(cache.distinct(), 4);
        assert!(cache.resolve(42).is_err());
        assert_eq!(cache.distinct(), 4);
    }
}
