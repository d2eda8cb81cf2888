use super::*;

fn pal(colors: &[Color]) -> Palette {
    Palette::from_colors(colors.to_vec(), false).unwrap()
}

#[test]
fn find_closest_never_crosses_alpha() {
    let p = pal(&[Color::rgba(255, 0, 0, 128), Color::rgb(0, 0, 255)]);
    let (idx, _) = p.find_closest(Color::rgb(255, 0, 0)).unwrap();
    assert_eq!(idx, 1);

    let (idx, dist) = p.find_closest(Color::rgba(250, 0, 0, 128)).unwrap();
    assert_eq!(idx, 0);
    assert!(dist < 0.01);

    assert!(p.find_closest(Color::rgba(255, 0, 0, 7)).is_none());
}

#[test]
fn find_closest_ignores_distance_magnitude() {
    let p = pal(&[Color::WHITE]);
    assert_eq!(p.find_closest(Color::rgb(0, 0, 255)).map(|m| m.0), Some(0));
}

#[test]
fn find_closest_prefers_first_on_ties() {
    let p = pal(&[Color::rgb(0, 200, 0), Color::rgb(0, 200, 0)]);
    assert_eq!(p.find_closest(Color::rgb(0, 200, 0)).map(|m| m.0), Some(0));
}

#[test]
fn find_alpha_requires_transparency_and_translucent_query() {
    let colors = vec![Color::rgb(255, 0, 0), Color::TRANSPARENT];
    let with = Palette::from_colors(colors.clone(), true).unwrap();
    let without = Palette::from_colors(colors, false).unwrap();

    assert_eq!(with.find_alpha(Color::rgba(9, 9, 9, 0)), Some(1));
    assert_eq!(without.find_alpha(Color::rgba(9, 9, 9, 0)), None);
    assert_eq!(with.find_alpha(Color::rgb(255, 0, 0)), None);
}

#[test]
fn find_color_and_remove_are_exact() {
    let mut p = Palette::new();
    p.push_named(Color::BLACK, "black").unwrap();
    p.push_named(Color::WHITE, "white").unwrap();
    assert_eq!(p.find_color(Color::WHITE), Some(1));
    assert_eq!(p.find_color(Color::rgba(255, 255, 255, 254)), None);

    assert!(p.remove(Color::BLACK));
    assert!(!p.remove(Color::BLACK));
    assert_eq!(p.colors(), &[Color::WHITE]);
    assert_eq!(p.name(0), Some("white"));
}

#[test]
fn push_beyond_256_is_rejected() {
    let mut p = Palette::from_colors(vec![Color::BLACK; MAX_COLORS], false).unwrap();
    assert!(p.push(Color::WHITE).is_err());
    assert!(Palette::from_colors(vec![Color::BLACK; MAX_COLORS + 1], false).is_err());
}

#[test]
fn spread_interpolates_with_repeated_endpoints() {
    let p = pal(&[Color::BLACK, Color::WHITE]);
    let out = p.spread(2, 8);
    assert_eq!(
        out.colors(),
        &[
            Color::BLACK,
            Color::rgb(85, 85, 85),
            Color::rgb(170, 170, 170),
            Color::WHITE
        ]
    );

    let p = pal(&[Color::BLACK, Color::rgb(255, 0, 0), Color::WHITE]);
    let out = p.spread(3, 9);
    assert_eq!(
        out.colors(),
        &[
            Color::BLACK,
            Color::rgb(127, 0, 0),
            Color::rgb(255, 0, 0),
            Color::rgb(255, 0, 0),
            Color::rgb(255, 127, 127),
            Color::WHITE,
        ]
    );
}

#[test]
fn spread_handles_descending_ramps_and_alpha() {
    let p = pal(&[Color::WHITE, Color::TRANSPARENT]);
    let out = p.spread(0, 8);
    assert_eq!(out.len(), 4);
    assert_eq!(out.get(1), Some(Color::rgba(170, 170, 170, 170)));
    assert_eq!(out.get(3), Some(Color::TRANSPARENT));
}

#[test]
fn spread_never_reduces() {
    let p = pal(&[Color::BLACK, Color::WHITE, Color::GRAY]);
    assert_eq!(p.spread(3, 2).colors(), p.colors());
    assert_eq!(p.spread(3, 3).colors(), p.colors());
}

#[test]
fn merge_is_noop_for_identical_or_full_palettes() {
    let mut p = pal(&[Color::BLACK, Color::WHITE]);
    let same = p.clone();
    assert_eq!(p.merge(&same, 256), 0);

    let other = pal(&[Color::rgb(255, 0, 0), Color::rgb(0, 255, 0)]);
    assert_eq!(p.merge(&other, 2), 0);
    assert_eq!(p.len(), 2);
}

#[test]
fn merge_adds_novel_colors_up_to_limit() {
    let mut p = pal(&[Color::BLACK, Color::WHITE]);
    let other = pal(&[
        Color::BLACK,
        Color::WHITE,
        Color::rgb(255, 0, 0),
        Color::rgb(0, 255, 0),
        Color::rgb(0, 0, 255),
    ]);
    let added = p.merge(&other, 4);
    assert_eq!(added, 2);
    assert_eq!(p.len(), 4);
    for c in &p.colors()[2..] {
        assert!(other.find_color(*c).is_some());
        assert_ne!(*c, Color::BLACK);
        assert_ne!(*c, Color::WHITE);
    }
}
