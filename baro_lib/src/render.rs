//! Presentation sinks: a line-oriented console stream or two rounded
//! readout fields on a TFT panel. Sinks never report failure back to
//! the acquisition loop.

use core::fmt::Write;

use embedded_graphics::mono_font::iso_8859_1::FONT_10X20;
use embedded_graphics::mono_font::MonoTextStyleBuilder;
use embedded_graphics::pixelcolor::Rgb565;
use embedded_graphics::prelude::*;
use embedded_graphics::primitives::{PrimitiveStyle, Rectangle, RoundedRectangle};
use embedded_graphics::text::Text;
use heapless::String;

pub const FIELD_COUNT: u32 = 2;
pub const FIELD_WIDTH: u32 = 110;
pub const FIELD_HEIGHT: u32 = 36;
pub const FIELD_RADIUS: u32 = 5;

const TEXT_X: i32 = 8;
const TEXT_Y: i32 = 26;
const TEXT_FG: Rgb565 = Rgb565::BLACK;
const TEXT_BG: Rgb565 = Rgb565::WHITE;
const PANEL_BG: Rgb565 = Rgb565::BLUE;

/// Strategy seam between the acquisition loop and whatever shows the
/// values; selected at runtime from the build configuration.
pub trait Render {
    fn render(&mut self, temperature_c: f64, pressure_hpa: f64);
}

/// `"+23.4°C"`: sign always shown, one decimal.
pub fn format_temperature(temperature_c: f64) -> String<16> {
    let mut s = String::new();
    let _ = write!(s, "{:+.1}\u{00b0}C", temperature_c);
    s
}

/// `"1013hPa"`: rounded to whole hectopascals.
pub fn format_pressure(pressure_hpa: f64) -> String<16> {
    let mut s = String::new();
    let _ = write!(s, "{:.0}hPa", pressure_hpa);
    s
}

/// Left-over panel height distributed evenly around the fields: one
/// gap above, one between, one below.
pub fn vertical_gap(panel_height: u32, field_height: u32) -> u32 {
    (panel_height - FIELD_COUNT * field_height) / (FIELD_COUNT + 1)
}

/// Writes one line per sample to a console stream.
pub struct TextRenderer<W> {
    out: W,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }
}

impl<W: Write> Render for TextRenderer<W> {
    fn render(&mut self, temperature_c: f64, pressure_hpa: f64) {
        let _ = writeln!(
            self.out,
            "{} {}",
            format_temperature(temperature_c),
            format_pressure(pressure_hpa)
        );
    }
}

/// Repaints two fixed-size rounded rectangles with the formatted
/// values every cycle; no differential redraw.
pub struct Panel<D> {
    display: D,
    width: u32,
    height: u32,
}

impl<D: DrawTarget<Color = Rgb565>> Panel<D> {
    /// Takes the display over and clears it to the panel background.
    pub fn new(mut display: D, width: u32, height: u32) -> Self {
        let _ = display.clear(PANEL_BG);
        Self {
            display,
            width,
            height,
        }
    }
}

impl<D: DrawTarget<Color = Rgb565>> Render for Panel<D> {
    fn render(&mut self, temperature_c: f64, pressure_hpa: f64) {
        let values = [
            format_temperature(temperature_c),
            format_pressure(pressure_hpa),
        ];

        let hgap = ((self.width - FIELD_WIDTH) / 2) as i32;
        let vgap = vertical_gap(self.height, FIELD_HEIGHT);
        let style = MonoTextStyleBuilder::new()
            .font(&FONT_10X20)
            .text_color(TEXT_FG)
            .background_color(TEXT_BG)
            .build();

        let mut y = vgap as i32;
        for value in &values {
            let field = Rectangle::new(
                Point::new(hgap, y),
                Size::new(FIELD_WIDTH, FIELD_HEIGHT),
            );
            let _ = RoundedRectangle::with_equal_corners(
                field,
                Size::new(FIELD_RADIUS, FIELD_RADIUS),
            )
            .into_styled(PrimitiveStyle::with_fill(TEXT_BG))
            .draw(&mut self.display);

            let _ = Text::new(value, Point::new(hgap + TEXT_X, y + TEXT_Y), style)
                .draw(&mut self.display);

            y += (FIELD_HEIGHT + vgap) as i32;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temperature_keeps_sign_and_one_decimal() {
        assert_eq!(format_temperature(23.45).as_str(), "+23.4\u{00b0}C");
        assert_eq!(format_temperature(-5.0).as_str(), "-5.0\u{00b0}C");
        assert_eq!(format_temperature(0.0).as_str(), "+0.0\u{00b0}C");
    }

    #[test]
    fn pressure_rounds_to_whole_hectopascals() {
        assert_eq!(format_pressure(1013.26).as_str(), "1013hPa");
        assert_eq!(format_pressure(999.5).as_str(), "1000hPa");
    }

    #[test]
    fn gaps_fill_the_panel_exactly_when_divisible() {
        // 3g + 2F = H
        let g = vertical_gap(156, FIELD_HEIGHT);
        assert_eq!(3 * g + 2 * FIELD_HEIGHT, 156);
    }

    #[test]
    fn gaps_round_down_otherwise() {
        assert_eq!(vertical_gap(160, FIELD_HEIGHT), 29);
    }

    #[test]
    fn text_renderer_emits_one_line_per_sample() {
        let mut renderer = TextRenderer::new(String::<64>::new());
        renderer.render(23.45, 1013.26);
        assert_eq!(renderer.out.as_str(), "+23.4\u{00b0}C 1013hPa\n");
    }
}
