use super::*;

const C1: Color = Color::rgb(0, 0, 200);
const C2: Color = Color::rgb(0, 200, 0);
const C3: Color = Color::rgb(200, 0, 0);

fn out_palette() -> Palette {
    Palette::from_colors(
        vec![Color::TRANSPARENT, C1, C2, C3, Color::BLACK, Color::WHITE],
        true,
    )
    .unwrap()
}

fn indexed(w: u32, h: u32, px: &[u8]) -> IndexedImage {
    IndexedImage::from_parts(w, h, px.to_vec(), out_palette()).unwrap()
}

#[test]
fn intensity_ramp_brackets_the_gradient() {
    let ramp = intensity_palette(&out_palette()).unwrap();
    assert_eq!(ramp.len(), 1 + 2 * 84 + 2);
    assert_eq!(ramp.get(0), Some(Color::TRANSPARENT));
    assert_eq!(ramp.get(1), Some(C1));
    assert_eq!(ramp.get(ramp.len() - 2), Some(Color::BLACK));
    assert_eq!(ramp.get(ramp.len() - 1), Some(Color::WHITE));
}

#[test]
fn flat_images_are_left_unchanged_by_every_variant() {
    let src = indexed(3, 3, &[2; 9]);
    for kind in [ShadeKind::Slope, ShadeKind::Smoothed, ShadeKind::Blurred] {
        let mut shader = create_shader(kind, &out_palette()).unwrap();
        let out = shader.shade_indexed(&src).unwrap();
        assert!(out.pixels().iter().all(|&c| c == C2), "{}", shader.name());
    }
}

#[test]
fn slope_darkens_upward_steps_and_brightens_downward_steps() {
    let mut shader = create_shader(ShadeKind::Slope, &out_palette()).unwrap();

    let up = shader.shade_indexed(&indexed(2, 1, &[1, 3])).unwrap();
    assert_eq!(up.get(0, 0), C1);
    assert_eq!(up.get(1, 0), Color::rgb(0, 0, 0));

    let down = shader.shade_indexed(&indexed(2, 1, &[3, 1])).unwrap();
    assert_eq!(down.get(0, 0), C3);
    assert_eq!(down.get(1, 0), Color::rgb(7, 7, 255));
}

#[test]
fn smoothing_carries_an_edge_into_following_pixels() {
    let src = indexed(4, 1, &[3, 1, 1, 1]);

    let mut raw = create_shader(ShadeKind::Slope, &out_palette()).unwrap();
    let raw_out = raw.shade_indexed(&src).unwrap();
    assert_eq!(raw_out.get(2, 0), C1);
    assert_eq!(raw_out.get(3, 0), C1);

    let mut smooth = create_shader(ShadeKind::Smoothed, &out_palette()).unwrap();
    let out = smooth.shade_indexed(&src).unwrap();
    assert_ne!(out.get(1, 0), C1);
    assert_ne!(out.get(2, 0), C1);
    assert_ne!(out.get(3, 0), C1);
}

#[test]
fn shade_color_uses_red_channel_and_skips_first_row() {
    let mut img = ColorImage::from_pixels(1, 2, vec![Color::rgb(100, 0, 0), Color::rgb(50, 0, 0)])
        .unwrap();
    let mut shader = create_shader(ShadeKind::Slope, &out_palette()).unwrap();
    shader.shade_color(&mut img).unwrap();
    assert_eq!(img.get(0, 0), Color::rgb(100, 0, 0));
    assert_eq!(img.get(0, 1), Color::rgb(91, 2, 2));
}

#[test]
fn smoothed_shade_color_leaves_flat_images_alone() {
    let mut img = ColorImage::filled(3, 3, Color::rgb(90, 40, 40));
    let before = img.clone();
    let mut shader = create_shader(ShadeKind::Smoothed, &out_palette()).unwrap();
    shader.shade_color(&mut img).unwrap();
    assert_eq!(img, before);
}

#[test]
fn kind_parsing_and_empty_palette() {
    assert_eq!("xy2".parse::<ShadeKind>().unwrap(), ShadeKind::Smoothed);
    assert_eq!("Blurred".parse::<ShadeKind>().unwrap(), ShadeKind::Blurred);
    assert!("xy9".parse::<ShadeKind>().is_err());
    assert!(create_shader(ShadeKind::Slope, &Palette::new()).is_err());
}
