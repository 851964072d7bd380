//! Tests for arrow field rendering.

use std::f64::consts::PI;

use renderer::arrows::{dynamic_arrow_vector, pixels_per_arrow};
use renderer::legend::colour_bar::arrow_bar_thresholds;
use renderer::{ArrowFieldRenderer, ArrowStyle, Color, FieldGrid, MagnitudeDomain};
use test_utils::assert_approx_eq;

fn painted_pixels(canvas: &renderer::FrameCanvas) -> usize {
    let mut count = 0;
    for y in 0..canvas.height() {
        for x in 0..canvas.width() {
            if canvas.pixel(x, y).is_some_and(|c| c.a > 0) {
                count += 1;
            }
        }
    }
    count
}

// ============================================================================
// Lattice
// ============================================================================

#[test]
fn test_pixels_per_arrow_tiles_two_sizes() {
    assert_eq!(pixels_per_arrow(100, 20), 50.0);
    assert_eq!(pixels_per_arrow(120, 20), 40.0);
}

#[test]
fn test_pixels_per_arrow_at_least_one_arrow() {
    assert_eq!(pixels_per_arrow(10, 20), 10.0);
    assert_eq!(pixels_per_arrow(10, 0), 10.0 / 5.0);
}

// ============================================================================
// Magnitude and angle
// ============================================================================

#[test]
fn test_normalised_magnitude_clamped() {
    let arrows = ArrowFieldRenderer::new(ArrowStyle::DynaFatArrow, Some(10))
        .with_magnitude_domain(Some(MagnitudeDomain { min: 0.0, max: 2.0 }));
    assert_eq!(arrows.normalised_magnitude(Some(1.0)), 0.5);
    assert_eq!(arrows.normalised_magnitude(Some(5.0)), 1.0);
    assert_eq!(arrows.normalised_magnitude(Some(-1.0)), 0.0);
    assert_eq!(arrows.normalised_magnitude(None), 1.0);
}

#[test]
fn test_normalised_magnitude_without_domain_is_full() {
    let arrows = ArrowFieldRenderer::new(ArrowStyle::FatArrow, Some(10));
    assert_eq!(arrows.normalised_magnitude(Some(0.1)), 1.0);
}

#[test]
fn test_angle_in_degrees() {
    let arrows = ArrowFieldRenderer::new(ArrowStyle::ThinArrow, Some(10));
    assert_approx_eq!(arrows.normalised_radian_angle(90.0), PI / 2.0, 1e-9);
}

#[test]
fn test_angle_in_other_units_with_north_offset() {
    let grads = ArrowFieldRenderer::new(ArrowStyle::ThinArrow, Some(10))
        .with_direction_turns(Some(400.0));
    assert_approx_eq!(grads.normalised_radian_angle(100.0), PI / 2.0, 1e-9);

    let rotated = ArrowFieldRenderer::new(ArrowStyle::ThinArrow, Some(10))
        .with_north_angle(Some(90.0));
    assert_approx_eq!(rotated.normalised_radian_angle(90.0), 0.0, 1e-9);
}

#[test]
fn test_dynamic_arrow_length_follows_magnitude() {
    let arrows = ArrowFieldRenderer::new(ArrowStyle::DynaFatArrow, Some(20))
        .with_magnitude_domain(Some(MagnitudeDomain { min: 0.0, max: 1.0 }))
        .with_scale(2.0);
    assert!(arrows.arrow_length(0.25) < arrows.arrow_length(0.75));
    assert_eq!(arrows.scaled_arrow_length(0.5), arrows.arrow_length(0.5) * 2.0);
    assert!(dynamic_arrow_vector(arrows.arrow_length(0.5)).is_some());
}

// ============================================================================
// Rendering
// ============================================================================

#[test]
fn test_every_style_draws_something() {
    let direction = FieldGrid::filled(40, 40, 45.0).unwrap();
    for style in [
        ArrowStyle::Upstream,
        ArrowStyle::ThinArrow,
        ArrowStyle::FatArrow,
        ArrowStyle::TriArrow,
        ArrowStyle::WindBarbs,
        ArrowStyle::DynaFatArrow,
    ] {
        let canvas = ArrowFieldRenderer::new(style, Some(5))
            .render(&direction, None)
            .unwrap();
        assert!(painted_pixels(&canvas) > 0, "{:?} drew nothing", style);
    }
}

#[test]
fn test_missing_directions_draw_nothing() {
    let direction = FieldGrid::filled(40, 40, f32::NAN).unwrap();
    let canvas = ArrowFieldRenderer::new(ArrowStyle::FatArrow, Some(5))
        .render(&direction, None)
        .unwrap();
    assert_eq!(painted_pixels(&canvas), 0);
}

#[test]
fn test_missing_magnitudes_draw_nothing() {
    let direction = FieldGrid::filled(40, 40, 45.0).unwrap();
    let missing = FieldGrid::filled(40, 40, f32::NAN).unwrap();
    for style in [ArrowStyle::FatArrow, ArrowStyle::ThinArrow, ArrowStyle::Upstream] {
        let canvas = ArrowFieldRenderer::new(style, Some(5))
            .with_magnitude_domain(Some(MagnitudeDomain { min: 0.0, max: 1.0 }))
            .render(&direction, Some(&missing))
            .unwrap();
        assert_eq!(painted_pixels(&canvas), 0, "{:?} drew a missing vector", style);
    }
}

#[test]
fn test_background_fills_canvas() {
    let direction = FieldGrid::filled(10, 10, f32::NAN).unwrap();
    let canvas = ArrowFieldRenderer::new(ArrowStyle::FatArrow, Some(5))
        .with_background(Color::WHITE)
        .render(&direction, None)
        .unwrap();
    assert_eq!(canvas.pixel(0, 0), Some(Color::WHITE));
    assert_eq!(canvas.pixel(9, 9), Some(Color::WHITE));
}

#[test]
fn test_coloured_dynamic_arrows_skip_missing_magnitude() {
    use frame_common::VariableConfig;
    use renderer::{ColourScheme, Palette};

    let scheme = ColourScheme::from_variable(
        &VariableConfig {
            id: "speed".into(),
            scale_min: Some(0.0),
            scale_max: Some(1.0),
            ..Default::default()
        },
        &Palette::default_palette(),
    );
    let arrows = ArrowFieldRenderer::new(ArrowStyle::DynaFatArrow, Some(5))
        .with_colour_scheme(Some(scheme))
        .with_magnitude_domain(Some(MagnitudeDomain { min: 0.0, max: 1.0 }));

    let direction = FieldGrid::filled(40, 40, 0.0).unwrap();
    let missing = FieldGrid::filled(40, 40, f32::NAN).unwrap();
    let present = FieldGrid::filled(40, 40, 0.8).unwrap();

    let without = arrows.render(&direction, Some(&missing)).unwrap();
    let with = arrows.render(&direction, Some(&present)).unwrap();
    assert_eq!(painted_pixels(&without), 0);
    assert!(painted_pixels(&with) > 0);
}

// ============================================================================
// Threshold bar
// ============================================================================

#[test]
fn test_arrow_bar_overflow_extrapolated() {
    assert_eq!(arrow_bar_thresholds(&[0.5, 0.2, 1.0], 5.0), vec![0.2, 0.5, 1.0, 1.5]);
}

#[test]
fn test_arrow_bar_overflow_capped_at_scale_max() {
    assert_eq!(arrow_bar_thresholds(&[0.2, 0.5, 1.0], 1.2), vec![0.2, 0.5, 1.0, 1.2]);
}

#[test]
fn test_arrow_bar_single_threshold_uses_scale_max() {
    assert_eq!(arrow_bar_thresholds(&[0.4], 2.0), vec![0.4, 2.0]);
}
