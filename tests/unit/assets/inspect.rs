use super::*;
use crate::color::rgba::Color;
use crate::raster::buffer::ColorImage;

fn sample() -> IndexedImage {
    let mut palette = Palette::new();
    palette.push_named(Color::TRANSPARENT, "none").unwrap();
    palette.push_named(Color::rgb(0, 255, 0), "light").unwrap();
    palette.set_has_transparency(true);
    IndexedImage::from_parts(2, 2, vec![1, 1, 0, 1], palette).unwrap()
}

#[test]
fn describe_reports_depth_and_palette() {
    let info = describe(&PixelBuffer::Indexed(sample()));
    assert_eq!(
        info,
        ImageInfo {
            width: 2,
            height: 2,
            bit_depth: 8,
            palette_len: 2,
            has_transparency: true,
        }
    );

    let info = describe(&PixelBuffer::Rgb(ColorImage::new(4, 1)));
    assert_eq!(info.bit_depth, 24);
    assert_eq!(info.palette_len, 0);
    assert!(!info.has_transparency);
}

#[test]
fn histogram_counts_indices() {
    let counts = index_histogram(&sample());
    assert_eq!(counts[0], 1);
    assert_eq!(counts[1], 3);
    assert_eq!(counts.iter().sum::<u64>(), 4);
}

#[test]
fn report_lists_entries_with_usage() {
    let text = report("frame.png", &PixelBuffer::Indexed(sample()));
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 3);
    assert_eq!(lines[0], "frame.png: 2x2 8-bit, 2 colors with alpha");
    assert!(lines[1].contains("0,0,0,0"));
    assert!(lines[1].ends_with("used=1"));
    assert!(lines[2].contains("0,255,0,255"));
    assert!(lines[2].contains("light"));
    assert!(lines[2].ends_with("used=3"));
}

#[test]
fn color_report_is_one_line() {
    let text = report("x.png", &PixelBuffer::Rgba(ColorImage::new(3, 5)));
    assert_eq!(text, "x.png: 3x5 32-bit");
}
