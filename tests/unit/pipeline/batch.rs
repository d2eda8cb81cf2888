use std::path::Path;

use super::*;
use crate::assets::encode::encode_file;
use crate::color::rgba::Color;
use crate::encode::sink::InMemorySink;
use crate::palette::palette::Palette;
use crate::raster::buffer::{ColorImage, IndexedImage};

const CONFIG: &str = r#"{
    "in-palette": {
        "none": "0,0,0,0",
        "rain-1": "0,200,0",
        "rain-2": "200,200,0",
        "rain-3": "200,0,0"
    }
}"#;

fn write_inputs(dir: &str) -> Vec<PathBuf> {
    let dir = Path::new(dir);
    let cfg = TrailConfig::from_json_str(CONFIG).unwrap();
    let mut indexed = IndexedImage::new(5, 5, cfg.in_palette.clone());
    for y in 0..5 {
        for x in 0..5 {
            indexed.set(x, y, ((x + y) % 4) as u8);
        }
    }
    let indexed_path = dir.join("b-indexed.png");
    encode_file(&indexed_path, &PixelBuffer::Indexed(indexed)).unwrap();

    let color_path = dir.join("a-color.png");
    let color = ColorImage::filled(5, 5, Color::rgb(90, 90, 90));
    encode_file(&color_path, &PixelBuffer::Rgb(color)).unwrap();

    vec![indexed_path, color_path]
}

#[test]
fn blur_processes_indexed_and_skips_truecolor() {
    let cfg = TrailConfig::from_json_str(CONFIG).unwrap();
    let paths = write_inputs("target/unit-pipeline/batch/blur");
    let mut sink = InMemorySink::new();
    let stats = run_blur(
        &paths,
        &cfg,
        DEFAULT_BLUR_RADIUS,
        &mut sink,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(
        stats,
        BatchStats {
            processed: 1,
            skipped: 1,
            cancelled: false
        }
    );
    assert_eq!(sink.names(), vec!["b-indexed.png"]);
    let out = &sink.frames[0].1;
    assert_eq!(out.bit_depth(), 32);
    assert_eq!((out.width(), out.height()), (5, 5));
}

#[test]
fn shade_handles_every_depth_in_sorted_order() {
    let cfg = TrailConfig::from_json_str(CONFIG).unwrap();
    let paths = write_inputs("target/unit-pipeline/batch/shade");
    let mut sink = InMemorySink::new();
    let stats = run_shade(
        &paths,
        &cfg,
        ShadeKind::Smoothed,
        &mut sink,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(stats.processed, 2);
    assert_eq!(sink.names(), vec!["a-color.png", "b-indexed.png"]);
    assert_eq!(sink.frames[0].1.bit_depth(), 24);
    assert_eq!(sink.frames[1].1.bit_depth(), 32);
}

#[test]
fn cancelled_batch_touches_nothing() {
    let cfg = TrailConfig::from_json_str(CONFIG).unwrap();
    let cancel = CancelToken::new();
    cancel.cancel();
    let mut sink = InMemorySink::new();
    let stats = run_shade(
        &[PathBuf::from("target/unit-pipeline/batch/none.png")],
        &cfg,
        ShadeKind::Slope,
        &mut sink,
        &cancel,
    )
    .unwrap();
    assert!(stats.cancelled);
    assert!(sink.frames.is_empty());
}

#[test]
fn tile_grid_parsing() {
    let grid = |s: &str| s.parse::<TileGrid>();
    assert_eq!(
        grid("2x3").unwrap(),
        TileGrid {
            columns: 2,
            rows: Some(3)
        }
    );
    assert_eq!(grid("4X1").unwrap().rows, Some(1));
    assert_eq!(grid("2").unwrap().rows, None);
    assert_eq!(grid("2x").unwrap().rows, None);
    assert!(grid("0x2").is_err());
    assert!(grid("2x0").is_err());
    assert!(grid("x3").is_err());
    assert!(grid("wide").is_err());
}

fn write_tile(dir: &Path, name: &str, palette: Vec<Color>, pixels: Vec<u8>) -> PathBuf {
    let palette = Palette::from_colors(palette, true).unwrap();
    let img = IndexedImage::from_parts(2, 1, pixels, palette).unwrap();
    let path = dir.join(name);
    encode_file(&path, &PixelBuffer::Indexed(img)).unwrap();
    path
}

#[test]
fn montage_remaps_tiles_and_grows_the_palette() {
    let cfg = TrailConfig::from_json_str(CONFIG).unwrap();
    let entry = |idx: usize| cfg.in_palette.get(idx).unwrap();
    let blue = Color::rgb(10, 20, 250);
    let dir = Path::new("target/unit-pipeline/batch/montage");
    let paths = vec![
        write_tile(dir, "c.png", vec![entry(1), entry(0), blue], vec![2, 0]),
        write_tile(dir, "a.png", cfg.in_palette.colors().to_vec(), vec![1, 2]),
        write_tile(
            dir,
            "b.png",
            vec![entry(3), entry(2), entry(1), entry(0)],
            vec![2, 1],
        ),
    ];

    let mut sink = InMemorySink::new();
    let grid = TileGrid {
        columns: 2,
        rows: None,
    };
    let stats = run_montage(
        &paths,
        Some(&cfg.in_palette),
        grid,
        "all.png",
        &mut sink,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(stats.tiles, 3);
    assert_eq!(stats.colors_added, 1);

    assert_eq!(sink.names(), vec!["all.png"]);
    let PixelBuffer::Indexed(out) = &sink.frames[0].1 else {
        panic!("expected indexed montage");
    };
    assert_eq!((out.width(), out.height()), (4, 2));
    assert_eq!(out.palette().len(), 5);
    assert_eq!(out.palette().get(4), Some(blue));
    assert_eq!(out.pixels(), &[1, 2, 1, 2, 4, 1, 0, 0]);
    assert_eq!(out.color_at(0, 1), blue);
}

#[test]
fn montage_rejects_mismatched_tiles() {
    let cfg = TrailConfig::from_json_str(CONFIG).unwrap();
    let dir = Path::new("target/unit-pipeline/batch/montage-mismatch");
    let small = write_tile(dir, "a.png", cfg.in_palette.colors().to_vec(), vec![1, 2]);
    let large = dir.join("b.png");
    encode_file(
        &large,
        &PixelBuffer::Indexed(IndexedImage::new(3, 3, cfg.in_palette.clone())),
    )
    .unwrap();

    let mut sink = InMemorySink::new();
    let grid = TileGrid {
        columns: 2,
        rows: Some(1),
    };
    let result = run_montage(
        &[small, large],
        None,
        grid,
        "m.png",
        &mut sink,
        &CancelToken::new(),
    );
    assert!(matches!(result, Err(TrailError::Validation(_))));
    assert!(sink.frames.is_empty());
}

#[test]
fn color_montage_places_tiles_row_major() {
    let dir = Path::new("target/unit-pipeline/batch/montage-color");
    let red = dir.join("1.png");
    let green = dir.join("2.png");
    let blue = dir.join("3.png");
    for (path, color) in [
        (&red, Color::rgb(255, 0, 0)),
        (&green, Color::rgb(0, 255, 0)),
        (&blue, Color::rgb(0, 0, 255)),
    ] {
        encode_file(path, &PixelBuffer::Rgb(ColorImage::filled(1, 1, color))).unwrap();
    }

    let mut sink = InMemorySink::new();
    let grid = TileGrid {
        columns: 2,
        rows: Some(1),
    };
    let stats = run_montage(
        &[blue, green, red],
        None,
        grid,
        "m.png",
        &mut sink,
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(stats.tiles, 2);
    let PixelBuffer::Rgba(out) = &sink.frames[0].1 else {
        panic!("expected rgba montage");
    };
    assert_eq!(out.pixels(), &[Color::rgb(255, 0, 0), Color::rgb(0, 255, 0)]);
}

#[test]
fn togray_indexes_by_red_channel() {
    let dir = Path::new("target/unit-pipeline/batch/togray");
    let gray = dir.join("a-gray.png");
    let img = ColorImage::from_pixels(
        2,
        1,
        vec![Color::rgb(0, 0, 0), Color::rgb(100, 100, 100)],
    )
    .unwrap();
    encode_file(&gray, &PixelBuffer::Rgba(img)).unwrap();
    let paths = write_inputs("target/unit-pipeline/batch/togray");

    let mut all = vec![gray];
    all.extend(paths);
    let mut sink = InMemorySink::new();
    let stats = run_to_gray(&all, &mut sink, &CancelToken::new()).unwrap();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.skipped, 1);
    assert_eq!(sink.names(), vec!["a-color.png", "a-gray.png"]);

    let PixelBuffer::Indexed(out) = &sink.frames[1].1 else {
        panic!("expected indexed output");
    };
    assert_eq!(out.pixels(), &[0, 100]);
    assert_eq!(out.color_at(0, 0), Color::TRANSPARENT);
    assert_eq!(out.color_at(1, 0), Color::rgba(100, 100, 100, 200));
    assert_eq!(out.palette().get(200), Some(Color::rgba(200, 200, 200, 255)));
}
