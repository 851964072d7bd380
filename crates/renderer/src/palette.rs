//! Colour palettes: ordered colour lists sampled at fractional positions.

use crate::color::{interpolate_color, Color};
use crate::error::{RenderError, RenderResult};

const DEFAULT_PALETTE: &[&str] = &[
    "#0000AA", "#0000FF", "#0055FF", "#00AAFF", "#00FFFF", "#55FFAA", "#AAFF55", "#FFFF00",
    "#FFAA00", "#FF5500", "#FF0000", "#AA0000",
];

const GREYSCALE_PALETTE: &[&str] = &["#000000", "#FFFFFF"];

const RAINBOW_PALETTE: &[&str] = &[
    "#9400D3", "#4B0082", "#0000FF", "#00FF00", "#FFFF00", "#FF7F00", "#FF0000",
];

/// An ordered list of colours.
#[derive(Debug, Clone, PartialEq)]
pub struct Palette {
    colours: Vec<Color>,
}

impl Palette {
    pub fn new(colours: Vec<Color>) -> RenderResult<Self> {
        if colours.is_empty() {
            return Err(RenderError::InvalidPalette("palette has no colours".into()));
        }
        Ok(Self { colours })
    }

    /// Build from hex strings, failing on the first malformed entry.
    pub fn from_hex_list<S: AsRef<str>>(hex: &[S]) -> RenderResult<Self> {
        let colours = hex
            .iter()
            .map(|h| {
                Color::from_hex(h.as_ref()).ok_or_else(|| {
                    RenderError::InvalidPalette(format!("invalid colour '{}'", h.as_ref()))
                })
            })
            .collect::<RenderResult<Vec<_>>>()?;
        Self::new(colours)
    }

    /// Parse a palette document: one colour per line, blank lines and lines
    /// starting with `%` or `#` followed by a non-hex character are skipped.
    pub fn parse(text: &str) -> RenderResult<Self> {
        let mut colours = Vec::new();
        for (line_no, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('%') {
                continue;
            }
            match Color::from_hex(line) {
                Some(colour) => colours.push(colour),
                None if line.starts_with('#') => continue,
                None => {
                    return Err(RenderError::InvalidPalette(format!(
                        "line {}: invalid colour '{}'",
                        line_no + 1,
                        line
                    )))
                }
            }
        }
        Self::new(colours)
    }

    /// Built-in palettes by name. A `-inv` suffix reverses the palette.
    pub fn named(name: &str) -> Option<Self> {
        if let Some(base) = name.strip_suffix("-inv") {
            return Self::named(base).map(|p| p.reversed());
        }
        let hex = match name {
            "default" => DEFAULT_PALETTE,
            "greyscale" | "grayscale" => GREYSCALE_PALETTE,
            "x-Rainbow" | "rainbow" => RAINBOW_PALETTE,
            _ => return None,
        };
        Self::from_hex_list(hex).ok()
    }

    pub fn default_palette() -> Self {
        Self {
            colours: DEFAULT_PALETTE
                .iter()
                .filter_map(|h| Color::from_hex(h))
                .collect(),
        }
    }

    pub fn reversed(&self) -> Self {
        let mut colours = self.colours.clone();
        colours.reverse();
        Self { colours }
    }

    pub fn colours(&self) -> &[Color] {
        &self.colours
    }

    pub fn len(&self) -> usize {
        self.colours.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colours.is_empty()
    }

    /// Colour at `fraction` (0 = first colour, 1 = last), interpolating
    /// between neighbours.
    pub fn sample(&self, fraction: f32) -> Color {
        let last = self.colours.len() - 1;
        if last == 0 || !(fraction > 0.0) {
            return self.colours[0];
        }
        if fraction >= 1.0 {
            return self.colours[last];
        }

        let position = fraction * last as f32;
        let index = position.floor() as usize;
        let t = position - index as f32;
        interpolate_color(self.colours[index], self.colours[(index + 1).min(last)], t)
    }

    /// `count` colours evenly spread from first to last.
    pub fn sample_n(&self, count: usize) -> Vec<Color> {
        match count {
            0 => Vec::new(),
            1 => vec![self.sample(0.0)],
            n => {
                let step = 1.0 / (n as f32 - 1.0);
                (0..n).map(|i| self.sample(i as f32 * step)).collect()
            }
        }
    }
}
