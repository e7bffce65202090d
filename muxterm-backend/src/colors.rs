//! Color model shared by the SGR dispatcher and the OSC palette surface.

/// A simple 8-bit-per-channel RGB color.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ColorRgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl ColorRgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Format in the `rgb:rrrr/gggg/bbbb` form used by OSC color replies.
    pub fn to_x11_string(self) -> String {
        format!(
            "rgb:{0:02x}{0:02x}/{1:02x}{1:02x}/{2:02x}{2:02x}",
            self.r, self.g, self.b
        )
    }
}

/// Standard colors addressable by name in SGR sequences.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NamedColor {
    Black = 0,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    White,
    LightBlack,
    LightRed,
    LightGreen,
    LightYellow,
    LightBlue,
    LightMagenta,
    LightCyan,
    LightWhite,
    /// The foreground color.
    Foreground = 256,
    /// The background color.
    Background,
    /// Color of the cursor itself.
    Cursor,
}

/// A color as referenced by an escape sequence.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum AnsiColor {
    Named(NamedColor),
    Spec(ColorRgb),
    Indexed(u8),
}

/// The xterm default 256-color palette.
///
/// Entries 0-15 are the standard and bright ANSI colors, 16-231 the
/// 6x6x6 color cube, and 232-255 the grayscale ramp.
pub fn default_palette() -> Box<[ColorRgb; 256]> {
    let mut table = Box::new([ColorRgb::default(); 256]);

    const ANSI: [ColorRgb; 16] = [
        ColorRgb::new(0x00, 0x00, 0x00),
        ColorRgb::new(0xcd, 0x00, 0x00),
        ColorRgb::new(0x00, 0xcd, 0x00),
        ColorRgb::new(0xcd, 0xcd, 0x00),
        ColorRgb::new(0x00, 0x00, 0xee),
        ColorRgb::new(0xcd, 0x00, 0xcd),
        ColorRgb::new(0x00, 0xcd, 0xcd),
        ColorRgb::new(0xe5, 0xe5, 0xe5),
        ColorRgb::new(0x7f, 0x7f, 0x7f),
        ColorRgb::new(0xff, 0x00, 0x00),
        ColorRgb::new(0x00, 0xff, 0x00),
        ColorRgb::new(0xff, 0xff, 0x00),
        ColorRgb::new(0x5c, 0x5c, 0xff),
        ColorRgb::new(0xff, 0x00, 0xff),
        ColorRgb::new(0x00, 0xff, 0xff),
        ColorRgb::new(0xff, 0xff, 0xff),
    ];
    table[..16].copy_from_slice(&ANSI);

    for index in 16..232 {
        let i = index - 16;
        let scale = |v: usize| if v == 0 { 0 } else { (v * 40 + 55) as u8 };
        table[index] = ColorRgb::new(
            scale(i / 36),
            scale((i / 6) % 6),
            scale(i % 6),
        );
    }

    for index in 232..256 {
        let level = (8 + (index - 232) * 10) as u8;
        table[index] = ColorRgb::new(level, level, level);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_cube_corners() {
        let palette = default_palette();
        assert_eq!(palette[16], ColorRgb::new(0, 0, 0));
        assert_eq!(palette[231], ColorRgb::new(255, 255, 255));
        assert_eq!(palette[196], ColorRgb::new(255, 0, 0));
    }

    #[test]
    fn palette_grayscale_ramp() {
        let palette = default_palette();
        assert_eq!(palette[232], ColorRgb::new(8, 8, 8));
        assert_eq!(palette[255], ColorRgb::new(238, 238, 238));
    }
}
