// tests/load_tests.rs

use std::fs;
use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use rapid_tmx::{
    FileTilesetSource, LoadOptions, Map, MapError, Tileset, TilesetSource,
};

const EXTERNAL_MAP: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<map version="1.10" orientation="orthogonal" width="2" height="1" tilewidth="8" tileheight="8">
  <tileset firstgid="1" source="tiles/shared.tsx"/>
  <layer name="L" width="2" height="1"><data encoding="csv">4,1</data></layer>
</map>"#;

const SHARED_TSX: &str = r#"<tileset name="shared" tilewidth="8" tileheight="8" tilecount="4" columns="2">
  <tile id="3"><properties><property name="solid" type="bool" value="true"/></properties></tile>
</tileset>"#;

fn temp_dir(tag: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("clock went backwards")
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("rapid_tmx_{tag}_{nanos}"));
    fs::create_dir_all(dir.join("tiles")).expect("failed to create temp dir");
    dir
}

#[test]
fn integration_load_from_file_and_str() {
    let xml = r#"<map orientation="orthogonal" width="1" height="1" tilewidth="4" tileheight="4">
        <layer name="L"><data encoding="csv">0</data></layer>
    </map>"#;
    let map = Map::load_from_str(xml).expect("should parse inline TMX");
    assert_eq!(map.width, 1);

    let dir = temp_dir("inline");
    let path = dir.join("map.tmx");
    fs::write(&path, xml).unwrap();
    let map2 = Map::load_from_file(&path).unwrap();
    assert_eq!(map2.tile_width, 4);
    assert_eq!(map, map2);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn missing_map_file_is_an_io_error() {
    let err = Map::load_from_file("does/not/exist.tmx").unwrap_err();
    match err {
        MapError::Io { path, .. } => assert_eq!(path, PathBuf::from("does/not/exist.tmx")),
        other => panic!("expected Io, got {other:?}"),
    }
}

#[test]
fn external_tilesets_resolve_next_to_the_map() {
    let dir = temp_dir("external");
    fs::write(dir.join("level.tmx"), EXTERNAL_MAP).unwrap();
    fs::write(dir.join("tiles/shared.tsx"), SHARED_TSX).unwrap();

    let map = Map::load_from_file(dir.join("level.tmx")).unwrap();
    let tileset = &map.tilesets[0];
    assert_eq!(tileset.name, "shared");
    assert_eq!(tileset.first_gid, 1);
    assert_eq!(tileset.source.as_deref(), Some("tiles/shared.tsx"));

    let cell = map.layers[0].as_tiles().unwrap().get(0, 0).unwrap();
    let data = map.tile_data(cell).expect("tile 3 has data");
    assert_eq!(data.properties.get_bool("solid"), Some(true));
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn file_source_is_shared_between_maps() {
    let dir = temp_dir("shared");
    fs::write(dir.join("tiles/shared.tsx"), SHARED_TSX).unwrap();

    let mut source = FileTilesetSource::new(&dir);
    let options = LoadOptions::default();
    let first = Map::load_from_str_with(EXTERNAL_MAP, &mut source, &options).unwrap();
    let second = Map::load_from_str_with(EXTERNAL_MAP, &mut source, &options).unwrap();
    assert_eq!(first.tilesets, second.tilesets);
    assert_eq!(source.cached(), 1);
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn custom_sources_can_serve_tilesets_from_memory() {
    let mut requested = Vec::new();
    let mut source = |reference: &str| -> Result<Tileset, MapError> {
        requested.push(reference.to_owned());
        Tileset::load_from_str(SHARED_TSX)
    };
    let map = Map::load_from_str_with(EXTERNAL_MAP, &mut source, &LoadOptions::default()).unwrap();
    assert_eq!(map.tilesets[0].name, "shared");
    assert_eq!(requested, ["tiles/shared.tsx"]);
}

#[test]
fn in_memory_maps_cannot_reach_external_tilesets() {
    let err = Map::load_from_str(EXTERNAL_MAP).unwrap_err();
    assert!(matches!(err, MapError::MissingTileset { ref reference, .. } if reference == "tiles/shared.tsx"));
}

#[test]
fn missing_tsx_file_fails_the_map() {
    let dir = temp_dir("missing_tsx");
    fs::write(dir.join("level.tmx"), EXTERNAL_MAP).unwrap();
    let err = Map::load_from_file(dir.join("level.tmx")).unwrap_err();
    assert!(matches!(err, MapError::MissingTileset { .. }), "{err:?}");
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn tileset_files_load_on_their_own() {
    let dir = temp_dir("tsx");
    let path = dir.join("tiles/shared.tsx");
    fs::write(&path, SHARED_TSX).unwrap();
    let tileset = Tileset::load_from_file(&path).unwrap();
    assert_eq!(tileset.tile_count, 4);
    assert_eq!(tileset.first_gid, 0);

    let rect = tileset.tile_rect(3).unwrap();
    assert_eq!((rect.x, rect.y, rect.width, rect.height), (8, 8, 8, 8));
    assert!(tileset.tile_rect(4).is_none());
    fs::remove_dir_all(&dir).unwrap();
}

#[test]
fn trait_objects_work_as_sources() {
    let mut file_source = FileTilesetSource::new("does/not/exist");
    let source: &mut dyn TilesetSource = &mut file_source;
    assert!(source.load_tileset("shared.tsx").is_err());
}
