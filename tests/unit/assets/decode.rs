use super::*;

fn png_bytes(
    w: u32,
    h: u32,
    color: png::ColorType,
    depth: png::BitDepth,
    plte: Option<&[u8]>,
    trns: Option<&[u8]>,
    data: &[u8],
) -> Vec<u8> {
    let mut buf = Vec::new();
    {
        let mut encoder = png::Encoder::new(Cursor::new(&mut buf), w, h);
        encoder.set_color(color);
        encoder.set_depth(depth);
        if let Some(plte) = plte {
            encoder.set_palette(plte.to_vec());
        }
        if let Some(trns) = trns {
            encoder.set_trns(trns.to_vec());
        }
        let mut writer = encoder.write_header().unwrap();
        writer.write_image_data(data).unwrap();
    }
    buf
}

#[test]
fn indexed_png_keeps_indices_palette_and_alpha() {
    let plte = [0, 0, 0, 255, 0, 0, 0, 255, 0];
    let bytes = png_bytes(
        3,
        1,
        png::ColorType::Indexed,
        png::BitDepth::Eight,
        Some(&plte),
        Some(&[0]),
        &[2, 1, 0],
    );
    let PixelBuffer::Indexed(img) = decode_image(&bytes).unwrap() else {
        panic!("expected indexed");
    };
    assert_eq!(img.pixels(), &[2, 1, 0]);
    assert_eq!(img.palette().len(), 3);
    assert_eq!(img.palette().get(0), Some(Color::TRANSPARENT));
    assert_eq!(img.palette().get(1), Some(Color::rgb(255, 0, 0)));
    assert!(img.palette().has_transparency());
}

#[test]
fn packed_indices_are_unpacked() {
    assert_eq!(unpack_indices(&[0b0001_1011], 4, 1, 1, 2), vec![0, 1, 2, 3]);
    assert_eq!(unpack_indices(&[0b1010_0000], 3, 1, 1, 1), vec![1, 0, 1]);
    assert_eq!(unpack_indices(&[0x3c, 0x50], 2, 2, 1, 4), vec![3, 12, 5, 0]);

    let plte = [0, 0, 0, 255, 255, 255];
    let bytes = png_bytes(
        4,
        1,
        png::ColorType::Indexed,
        png::BitDepth::Four,
        Some(&plte),
        None,
        &[0x10, 0x01],
    );
    let PixelBuffer::Indexed(img) = decode_image(&bytes).unwrap() else {
        panic!("expected indexed");
    };
    assert_eq!(img.pixels(), &[1, 0, 0, 1]);
    assert!(!img.palette().has_transparency());
}

#[test]
fn grayscale_png_becomes_indexed_with_gray_ramp() {
    let bytes = png_bytes(
        2,
        1,
        png::ColorType::Grayscale,
        png::BitDepth::Eight,
        None,
        None,
        &[0, 200],
    );
    let PixelBuffer::Indexed(img) = decode_image(&bytes).unwrap() else {
        panic!("expected indexed");
    };
    assert_eq!(img.pixels(), &[0, 200]);
    assert_eq!(img.palette().len(), 256);
    assert_eq!(img.color_at(1, 0), Color::rgb(200, 200, 200));
}

#[test]
fn truecolor_png_keeps_depth() {
    let rgb = png_bytes(
        1,
        1,
        png::ColorType::Rgb,
        png::BitDepth::Eight,
        None,
        None,
        &[1, 2, 3],
    );
    assert_eq!(decode_image(&rgb).unwrap().bit_depth(), 24);

    let rgba = png_bytes(
        1,
        1,
        png::ColorType::Rgba,
        png::BitDepth::Eight,
        None,
        None,
        &[1, 2, 3, 4],
    );
    let PixelBuffer::Rgba(img) = decode_image(&rgba).unwrap() else {
        panic!("expected rgba");
    };
    assert_eq!(img.get(0, 0), Color::rgba(1, 2, 3, 4));
}

#[test]
fn unsupported_layouts_report_their_depth() {
    let gray16 = png_bytes(
        1,
        1,
        png::ColorType::Grayscale,
        png::BitDepth::Sixteen,
        None,
        None,
        &[0, 0],
    );
    assert!(matches!(
        decode_image(&gray16),
        Err(TrailError::UnsupportedDepth(16))
    ));

    let gray_alpha = png_bytes(
        1,
        1,
        png::ColorType::GrayscaleAlpha,
        png::BitDepth::Eight,
        None,
        None,
        &[0, 0],
    );
    assert!(matches!(
        decode_image(&gray_alpha),
        Err(TrailError::UnsupportedDepth(16))
    ));
}

#[test]
fn garbage_is_a_decode_error() {
    assert!(matches!(
        decode_image(b"definitely not an image"),
        Err(TrailError::Decode(_))
    ));
    assert!(decode_file(Path::new("target/no-such-dir/frame.png")).is_err());
}

#[test]
fn missing_file_error_carries_the_os_reason() {
    let err = decode_file(Path::new("target/no-such-dir/frame.png")).unwrap_err();
    let shown = format!("{err:#}");
    assert!(shown.contains("read image"), "{shown}");
    assert!(shown.contains("os error"), "{shown}");
}
