//! "DATA NOT AVAILABLE" banner drawn over panels without data.

use frame_common::{scale_f32, scale_px};
use renderer::{Color, FrameCanvas, TextAlign, TextStyle, Typeface};

const BANNER_BACKGROUND: Color = Color::new(255, 255, 255, 191);
const BANNER_TEXT: Color = Color::new(80, 80, 80, 127);
const BANNER_WIDTH: i32 = 250;
const BANNER_HEIGHT: i32 = 130;
const BANNER_FONT_SIZE: f32 = 30.0;
const LINE_CENTRE: i32 = 10;
const LINE_OFFSET: i32 = 20;

/// Draw the banner centred in a panel.
///
/// # Arguments
/// * `offset` - Panel top-left on the canvas
/// * `panel_size` - Panel size in scaled pixels
pub fn draw_no_data(
    canvas: &mut FrameCanvas,
    title_prefix: &str,
    offset: (i32, i32),
    panel_size: (i32, i32),
    scale: f32,
    typeface: &Typeface,
) {
    canvas.create_layer(format!("{} Data not available", title_prefix));

    let centre_x = offset.0 + panel_size.0 / 2;
    let centre_y = offset.1 + panel_size.1 / 2;

    canvas.fill_rect(
        centre_x - scale_px(BANNER_WIDTH / 2, scale),
        centre_y - scale_px(BANNER_HEIGHT / 2, scale),
        scale_px(BANNER_WIDTH, scale),
        scale_px(BANNER_HEIGHT, scale),
        BANNER_BACKGROUND,
    );

    let style = TextStyle::new(scale_f32(BANNER_FONT_SIZE, scale), BANNER_TEXT).bold(true);
    canvas.draw_text(
        "DATA NOT",
        centre_x,
        centre_y + scale_px(LINE_CENTRE - LINE_OFFSET, scale),
        &style,
        TextAlign::Centre,
        typeface,
    );
    canvas.draw_text(
        "AVAILABLE",
        centre_x,
        centre_y + scale_px(LINE_CENTRE + LINE_OFFSET, scale),
        &style,
        TextAlign::Centre,
        typeface,
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner_box_centred() {
        let mut canvas = FrameCanvas::new(400, 300).unwrap();
        canvas.fill(Color::BLACK);
        draw_no_data(&mut canvas, "Temperature", (0, 0), (400, 300), 1.0, &Typeface::none());

        // Box spans x 75..325, y 85..215.
        let inside = canvas.pixel(200, 150).unwrap();
        assert!(inside.r > 150 && inside.r == inside.g);
        assert_eq!(canvas.pixel(70, 150), Some(Color::BLACK));
        assert_eq!(canvas.pixel(200, 80), Some(Color::BLACK));
        assert_eq!(
            canvas.layer_names().last().map(String::as_str),
            Some("Temperature Data not available")
        );
    }
}
