use super::*;

const RED: Color = Color::rgb(255, 0, 0);

fn img(w: u32, h: u32, px: &[Color]) -> ColorImage {
    ColorImage::from_pixels(w, h, px.to_vec()).unwrap()
}

#[test]
fn over_touches_only_the_shared_region() {
    let mut dst = img(2, 1, &[Color::BLACK, Color::BLACK]);
    over_in_place(&mut dst, &img(1, 1, &[RED]));
    assert_eq!(dst.pixels(), &[RED, Color::BLACK]);
}

#[test]
fn under_keeps_opaque_destination_and_fills_holes() {
    let mut dst = img(2, 1, &[Color::TRANSPARENT, RED]);
    under_in_place(&mut dst, &img(2, 1, &[Color::WHITE, Color::WHITE]));
    assert_eq!(dst.pixels(), &[Color::WHITE, RED]);
}

#[test]
fn indexed_over_skips_transparent_entries() {
    let pal = Palette::from_colors(vec![Color::TRANSPARENT, RED], true).unwrap();
    let src = IndexedImage::from_parts(2, 1, vec![0, 1], pal.clone()).unwrap();
    let mut dst = img(2, 1, &[Color::WHITE, Color::WHITE]);
    indexed_over(&mut dst, &src, &pal);
    assert_eq!(dst.pixels(), &[Color::WHITE, RED]);
}

#[test]
fn indexed_under_caps_bottom_alpha() {
    let pal = Palette::from_colors(vec![Color::TRANSPARENT, Color::GRAY.with_alpha(200)], true)
        .unwrap();
    let src = IndexedImage::from_parts(2, 1, vec![1, 1], pal.clone()).unwrap();
    let mut dst = img(2, 1, &[Color::TRANSPARENT, RED]);
    indexed_under(&mut dst, &src, &pal, Some(100));
    assert_eq!(dst.pixels(), &[Color::GRAY.with_alpha(100), RED]);
}

#[test]
fn maximum_never_lowers_an_index() {
    let pal = Palette::new();
    let mut dst = IndexedImage::from_parts(3, 1, vec![0, 3, 2], pal.clone()).unwrap();
    let src = IndexedImage::from_parts(3, 1, vec![1, 1, 5], pal).unwrap();
    maximum_indexed(&mut dst, &src);
    assert_eq!(dst.pixels(), &[1, 3, 5]);
}

#[test]
fn fade_scales_alpha_and_respects_minimum() {
    let mut layer = img(2, 1, &[RED.with_alpha(200), RED.with_alpha(100)]);
    fade_alpha(&mut layer, 0.5, 0);
    assert_eq!([layer.get(0, 0).a, layer.get(1, 0).a], [100, 50]);

    let mut layer = img(2, 1, &[RED.with_alpha(200), RED.with_alpha(100)]);
    fade_alpha(&mut layer, 0.5, 150);
    assert_eq!([layer.get(0, 0).a, layer.get(1, 0).a], [150, 50]);

    let mut layer = img(1, 1, &[RED.with_alpha(77)]);
    fade_alpha(&mut layer, 1.0, 0);
    assert_eq!(layer.get(0, 0).a, 77);
}

#[test]
fn cap_alpha_clamps() {
    let mut layer = img(2, 1, &[RED, RED.with_alpha(10)]);
    cap_alpha(&mut layer, 64);
    assert_eq!([layer.get(0, 0).a, layer.get(1, 0).a], [64, 10]);
}

#[test]
fn active_filter_keeps_green_red_dominant_pixels() {
    let src = img(
        4,
        1,
        &[
            Color::rgb(200, 150, 10),
            Color::rgb(10, 10, 200),
            Color::BLACK,
            Color::rgb(100, 100, 0),
        ],
    );
    let out = select_active(&src);
    assert_eq!(
        out.pixels(),
        &[
            Color::rgb(200, 150, 10),
            Color::TRANSPARENT,
            Color::TRANSPARENT,
            Color::rgb(100, 100, 0),
        ]
    );
}
