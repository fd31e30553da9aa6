//! Decodes a TMX map and prints the resulting model as JSON.
//!
//! ```text
//! tmx2json <map.tmx> [--pretty] [--options load_options.json]
//! ```

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use log::info;
use rapid_tmx::{LoadOptions, Map};

struct Args {
    map: PathBuf,
    pretty: bool,
    options: Option<PathBuf>,
}

fn parse_args() -> Result<Args> {
    let mut map = None;
    let mut pretty = false;
    let mut options = None;

    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--pretty" => pretty = true,
            "--options" => {
                let path = args.next().context("--options needs a file argument")?;
                options = Some(PathBuf::from(path));
            }
            flag if flag.starts_with("--") => bail!("unknown flag {flag}"),
            _ if map.is_none() => map = Some(PathBuf::from(arg)),
            _ => bail!("unexpected argument {arg}"),
        }
    }

    Ok(Args {
        map: map.context("usage: tmx2json <map.tmx> [--pretty] [--options file.json]")?,
        pretty,
        options,
    })
}

fn main() -> Result<()> {
    env_logger::init();
    let args = parse_args()?;

    let options = match &args.options {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("failed to read {}", path.display()))?;
            serde_json::from_str::<LoadOptions>(&text)
                .with_context(|| format!("invalid load options in {}", path.display()))?
        }
        None => LoadOptions::default(),
    };

    let map = Map::load_from_file_with(&args.map, &options)
        .with_context(|| format!("failed to load {}", args.map.display()))?;
    info!(
        "{}: {}x{} {}, {} tilesets, {} layers",
        args.map.display(),
        map.width,
        map.height,
        map.orientation,
        map.tilesets.len(),
        map.layers().count()
    );

    let json = if args.pretty {
        serde_json::to_string_pretty(&map)?
    } else {
        serde_json::to_string(&map)?
    };
    println!("{json}");
    Ok(())
}
