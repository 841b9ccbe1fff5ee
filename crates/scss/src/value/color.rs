//! RGBA colors with HSL conversion and CSS serialization.
//!
//! Colors written in the source (`#FFF`, `red`) remember their spelling
//! and are emitted unchanged; colors produced by an operation or function
//! are serialized as the shortest suitable form: a color name, a hex
//! triplet or an `rgba()` call.
//!
//! ## Supported Color Formats
//!
//! - **Hex**: `#RGB`, `#RGBA`, `#RRGGBB`, `#RRGGBBAA`
//! - **Named**: CSS color names like `red`, `aliceblue`, `rebeccapurple`
//! - **Special**: `transparent`
//!
//! `rgb()`/`hsl()` calls are built-in functions and construct colors
//! through [`Color::rgba`] and [`Color::from_hsla`].

use phf::phf_map;

use super::number::format_float;

/// Channel values of the CSS named colors.
static NAMED_COLORS: phf::Map<&'static str, (u8, u8, u8)> = phf_map! {
    "aliceblue" => (240, 248, 255),
    "antiquewhite" => (250, 235, 215),
    "aqua" => (0, 255, 255),
    "aquamarine" => (127, 255, 212),
    "azure" => (240, 255, 255),
    "beige" => (245, 245, 220),
    "bisque" => (255, 228, 196),
    "black" => (0, 0, 0),
    "blanchedalmond" => (255, 235, 205),
    "blue" => (0, 0, 255),
    "blueviolet" => (138, 43, 226),
    "brown" => (165, 42, 42),
    "burlywood" => (222, 184, 135),
    "cadetblue" => (95, 158, 160),
    "chartreuse" => (127, 255, 0),
    "chocolate" => (210, 105, 30),
    "coral" => (255, 127, 80),
    "cornflowerblue" => (100, 149, 237),
    "cornsilk" => (255, 248, 220),
    "crimson" => (220, 20, 60),
    "cyan" => (0, 255, 255),
    "darkblue" => (0, 0, 139),
    "darkcyan" => (0, 139, 139),
    "darkgoldenrod" => (184, 134, 11),
    "darkgray" => (169, 169, 169),
    "darkgrey" => (169, 169, 169),
    "darkgreen" => (0, 100, 0),
    "darkkhaki" => (189, 183, 107),
    "darkmagenta" => (139, 0, 139),
    "darkolivegreen" => (85, 107, 47),
    "darkorange" => (255, 140, 0),
    "darkorchid" => (153, 50, 204),
    "darkred" => (139, 0, 0),
    "darksalmon" => (233, 150, 122),
    "darkseagreen" => (143, 188, 143),
    "darkslateblue" => (72, 61, 139),
    "darkslategray" => (47, 79, 79),
    "darkslategrey" => (47, 79, 79),
    "darkturquoise" => (0, 206, 209),
    "darkviolet" => (148, 0, 211),
    "deeppink" => (255, 20, 147),
    "deepskyblue" => (0, 191, 255),
    "dimgray" => (105, 105, 105),
    "dimgrey" => (105, 105, 105),
    "dodgerblue" => (30, 144, 255),
    "firebrick" => (178, 34, 34),
    "floralwhite" => (255, 250, 240),
    "forestgreen" => (34, 139, 34),
    "fuchsia" => (255, 0, 255),
    "gainsboro" => (220, 220, 220),
    "ghostwhite" => (248, 248, 255),
    "gold" => (255, 215, 0),
    "goldenrod" => (218, 165, 32),
    "gray" => (128, 128, 128),
    "grey" => (128, 128, 128),
    "green" => (0, 128, 0),
    "greenyellow" => (173, 255, 47),
    "honeydew" => (240, 255, 240),
    "hotpink" => (255, 105, 180),
    "indianred" => (205, 92, 92),
    "indigo" => (75, 0, 130),
    "ivory" => (255, 255, 240),
    "khaki" => (240, 230, 140),
    "lavender" => (230, 230, 250),
    "lavenderblush" => (255, 240, 245),
    "lawngreen" => (124, 252, 0),
    "lemonchiffon" => (255, 250, 205),
    "lightblue" => (173, 216, 230),
    "lightcoral" => (240, 128, 128),
    "lightcyan" => (224, 255, 255),
    "lightgoldenrodyellow" => (250, 250, 210),
    "lightgray" => (211, 211, 211),
    "lightgrey" => (211, 211, 211),
    "lightgreen" => (144, 238, 144),
    "lightpink" => (255, 182, 193),
    "lightsalmon" => (255, 160, 122),
    "lightseagreen" => (32, 178, 170),
    "lightskyblue" => (135, 206, 250),
    "lightslategray" => (119, 136, 153),
    "lightslategrey" => (119, 136, 153),
    "lightsteelblue" => (176, 196, 222),
    "lightyellow" => (255, 255, 224),
    "lime" => (0, 255, 0),
    "limegreen" => (50, 205, 50),
    "linen" => (250, 240, 230),
    "magenta" => (255, 0, 255),
    "maroon" => (128, 0, 0),
    "mediumaquamarine" => (102, 205, 170),
    "mediumblue" => (0, 0, 205),
    "mediumorchid" => (186, 85, 211),
    "mediumpurple" => (147, 112, 219),
    "mediumseagreen" => (60, 179, 113),
    "mediumslateblue" => (123, 104, 238),
    "mediumspringgreen" => (0, 250, 154),
    "mediumturquoise" => (72, 209, 204),
    "mediumvioletred" => (199, 21, 133),
    "midnightblue" => (25, 25, 112),
    "mintcream" => (245, 255, 250),
    "mistyrose" => (255, 228, 225),
    "moccasin" => (255, 228, 181),
    "navajowhite" => (255, 222, 173),
    "navy" => (0, 0, 128),
    "oldlace" => (253, 245, 230),
    "olive" => (128, 128, 0),
    "olivedrab" => (107, 142, 35),
    "orange" => (255, 165, 0),
    "orangered" => (255, 69, 0),
    "orchid" => (218, 112, 214),
    "palegoldenrod" => (238, 232, 170),
    "palegreen" => (152, 251, 152),
    "paleturquoise" => (175, 238, 238),
    "palevioletred" => (219, 112, 147),
    "papayawhip" => (255, 239, 213),
    "peachpuff" => (255, 218, 185),
    "peru" => (205, 133, 63),
    "pink" => (255, 192, 203),
    "plum" => (221, 160, 221),
    "powderblue" => (176, 224, 230),
    "purple" => (128, 0, 128),
    "rebeccapurple" => (102, 51, 153),
    "red" => (255, 0, 0),
    "rosybrown" => (188, 143, 143),
    "royalblue" => (65, 105, 225),
    "saddlebrown" => (139, 69, 19),
    "salmon" => (250, 128, 114),
    "sandybrown" => (244, 164, 96),
    "seagreen" => (46, 139, 87),
    "seashell" => (255, 245, 238),
    "sienna" => (160, 82, 45),
    "silver" => (192, 192, 192),
    "skyblue" => (135, 206, 235),
    "slateblue" => (106, 90, 205),
    "slategray" => (112, 128, 144),
    "slategrey" => (112, 128, 144),
    "snow" => (255, 250, 250),
    "springgreen" => (0, 255, 127),
    "steelblue" => (70, 130, 180),
    "tan" => (210, 180, 140),
    "teal" => (0, 128, 128),
    "thistle" => (216, 191, 216),
    "tomato" => (255, 99, 71),
    "turquoise" => (64, 224, 208),
    "violet" => (238, 130, 238),
    "wheat" => (245, 222, 179),
    "white" => (255, 255, 255),
    "whitesmoke" => (245, 245, 245),
    "yellow" => (255, 255, 0),
    "yellowgreen" => (154, 205, 50),
};

/// An RGBA color. Channels are kept as floats so repeated adjustments do
/// not accumulate rounding error; they are rounded on output.
#[derive(Clone, Debug)]
pub struct Color {
    /// Red component (0-255).
    pub r: f64,
    /// Green component (0-255).
    pub g: f64,
    /// Blue component (0-255).
    pub b: f64,
    /// Alpha component (0.0 = transparent, 1.0 = opaque).
    pub a: f64,
    /// Source spelling, kept for literal colors only.
    repr: Option<String>,
}

impl PartialEq for Color {
    fn eq(&self, other: &Self) -> bool {
        self.channels() == other.channels() && (self.a - other.a).abs() < 1e-10
    }
}

impl Color {
    pub fn rgba(r: f64, g: f64, b: f64, a: f64) -> Self {
        Self {
            r: r.clamp(0.0, 255.0),
            g: g.clamp(0.0, 255.0),
            b: b.clamp(0.0, 255.0),
            a: a.clamp(0.0, 1.0),
            repr: None,
        }
    }

    pub fn rgb(r: f64, g: f64, b: f64) -> Self {
        Self::rgba(r, g, b, 1.0)
    }

    /// Returns a copy of this color with the specified alpha value.
    pub fn with_alpha(&self, alpha: f64) -> Self {
        Self::rgba(self.r, self.g, self.b, alpha)
    }

    fn with_repr(mut self, repr: &str) -> Self {
        self.repr = Some(repr.to_string());
        self
    }

    /// Rounded 8-bit channels.
    pub fn channels(&self) -> (u8, u8, u8) {
        (
            self.r.round() as u8,
            self.g.round() as u8,
            self.b.round() as u8,
        )
    }

    /// Parses a hex color from the digits after `#`, remembering the
    /// original spelling.
    pub fn from_hex(digits: &str) -> Option<Self> {
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        let nibble = |i: usize| u8::from_str_radix(&digits[i..=i], 16).ok().map(|v| v * 17);
        let pair = |i: usize| u8::from_str_radix(&digits[i..i + 2], 16).ok();
        let (r, g, b, a) = match digits.len() {
            3 => (nibble(0)?, nibble(1)?, nibble(2)?, 255),
            4 => (nibble(0)?, nibble(1)?, nibble(2)?, nibble(3)?),
            6 => (pair(0)?, pair(2)?, pair(4)?, 255),
            8 => (pair(0)?, pair(2)?, pair(4)?, pair(6)?),
            _ => return None,
        };
        let color = Self::rgba(r as f64, g as f64, b as f64, a as f64 / 255.0);
        Some(color.with_repr(&format!("#{digits}")))
    }

    /// Looks up a CSS color name, remembering the original spelling.
    pub fn from_name(name: &str) -> Option<Self> {
        let lower = name.to_ascii_lowercase();
        if lower == "transparent" {
            return Some(Self::rgba(0.0, 0.0, 0.0, 0.0).with_repr(name));
        }
        let (r, g, b) = NAMED_COLORS.get(lower.as_str())?;
        Some(Self::rgb(*r as f64, *g as f64, *b as f64).with_repr(name))
    }

    /// Hue in degrees, saturation and lightness in percent.
    pub fn to_hsl(&self) -> (f64, f64, f64) {
        let r = self.r / 255.0;
        let g = self.g / 255.0;
        let b = self.b / 255.0;

        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let l = (max + min) / 2.0;

        if (max - min).abs() < f64::EPSILON {
            return (0.0, 0.0, l * 100.0);
        }
        let d = max - min;
        let s = if l > 0.5 {
            d / (2.0 - max - min)
        } else {
            d / (max + min)
        };
        let mut h = if max == r {
            (g - b) / d + if g < b { 6.0 } else { 0.0 }
        } else if max == g {
            (b - r) / d + 2.0
        } else {
            (r - g) / d + 4.0
        };
        h /= 6.0;
        (h * 360.0, s * 100.0, l * 100.0)
    }

    /// Creates a color from hue (degrees), saturation and lightness
    /// (percent) and alpha.
    pub fn from_hsla(h: f64, s: f64, l: f64, a: f64) -> Self {
        let h = (h.rem_euclid(360.0)) / 360.0;
        let s = (s / 100.0).clamp(0.0, 1.0);
        let l = (l / 100.0).clamp(0.0, 1.0);
        let (r, g, b) = if s == 0.0 {
            (l, l, l)
        } else {
            let q = if l < 0.5 { l * (1.0 + s) } else { l + s - l * s };
            let p = 2.0 * l - q;
            (
                hue_to_rgb(p, q, h + 1.0 / 3.0),
                hue_to_rgb(p, q, h),
                hue_to_rgb(p, q, h - 1.0 / 3.0),
            )
        };
        Self::rgba(r * 255.0, g * 255.0, b * 255.0, a)
    }

    fn hex_string(&self, compressed: bool) -> String {
        let (r, g, b) = self.channels();
        let hex = format!("#{r:02x}{g:02x}{b:02x}");
        if compressed { shorten_hex(&hex) } else { hex }
    }

    fn name(&self) -> Option<&'static str> {
        if self.a < 1.0 {
            return None;
        }
        let channels = self.channels();
        NAMED_COLORS
            .entries()
            .filter(|(_, rgb)| **rgb == channels)
            .map(|(name, _)| *name)
            .min()
    }

    /// Serializes the color for CSS output.
    pub fn to_css(&self, precision: usize, compressed: bool) -> String {
        if let Some(repr) = &self.repr {
            if !compressed {
                return repr.clone();
            }
            if repr.starts_with('#') {
                return shorten_hex(repr);
            }
            if self.a >= 1.0 {
                let hex = self.hex_string(true);
                if hex.len() < repr.len() {
                    return hex;
                }
            }
            return repr.clone();
        }

        let (r, g, b) = self.channels();
        if self.a < 1.0 {
            if self.a == 0.0 && (r, g, b) == (0, 0, 0) {
                return "transparent".to_string();
            }
            let alpha = format_float(self.a, precision, compressed);
            return if compressed {
                format!("rgba({r},{g},{b},{alpha})")
            } else {
                format!("rgba({r}, {g}, {b}, {alpha})")
            };
        }

        let hex = self.hex_string(compressed);
        match self.name() {
            Some(name) if !compressed || name.len() < hex.len() => name.to_string(),
            _ => hex,
        }
    }
}

/// `#aabbcc` → `#abc`; other spellings are returned unchanged.
fn shorten_hex(hex: &str) -> String {
    let digits: Vec<char> = hex.chars().skip(1).collect();
    if digits.len() == 6
        && digits[0] == digits[1]
        && digits[2] == digits[3]
        && digits[4] == digits[5]
    {
        format!("#{}{}{}", digits[0], digits[2], digits[4])
    } else {
        hex.to_string()
    }
}

fn hue_to_rgb(p: f64, q: f64, mut t: f64) -> f64 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        return p + (q - p) * 6.0 * t;
    }
    if t < 1.0 / 2.0 {
        return q;
    }
    if t < 2.0 / 3.0 {
        return p + (q - p) * (2.0 / 3.0 - t) * 6.0;
    }
    p
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_3_digit() {
        let color = Color::from_hex("f00").unwrap();
        assert_eq!(color, Color::rgb(255.0, 0.0, 0.0));
        let color = Color::from_hex("abc").unwrap();
        assert_eq!(color, Color::rgb(170.0, 187.0, 204.0));
    }

    #[test]
    fn test_hex_8_digit_alpha() {
        let color = Color::from_hex("ff000080").unwrap();
        assert!((color.a - 128.0 / 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_hex() {
        assert!(Color::from_hex("ggg").is_none());
        assert!(Color::from_hex("ff").is_none());
    }

    #[test]
    fn literal_keeps_spelling() {
        let color = Color::from_hex("FFF").unwrap();
        assert_eq!(color.to_css(5, false), "#FFF");
        assert_eq!(color.to_css(5, true), "#FFF");
        let color = Color::from_hex("FFFFFF").unwrap();
        assert_eq!(color.to_css(5, true), "#FFF");
    }

    #[test]
    fn computed_color_prefers_name() {
        assert_eq!(Color::rgb(255.0, 0.0, 0.0).to_css(5, false), "red");
        assert_eq!(Color::rgb(255.0, 255.0, 255.0).to_css(5, true), "#fff");
        assert_eq!(Color::rgb(18.0, 52.0, 86.0).to_css(5, false), "#123456");
    }

    #[test]
    fn translucent_color_uses_rgba() {
        let color = Color::rgba(255.0, 0.0, 0.0, 0.5);
        assert_eq!(color.to_css(5, false), "rgba(255, 0, 0, 0.5)");
        assert_eq!(color.to_css(5, true), "rgba(255,0,0,.5)");
    }

    #[test]
    fn hsl_round_trip() {
        let color = Color::from_hsla(120.0, 100.0, 25.0, 1.0);
        assert_eq!(color.channels(), (0, 128, 0));
        let (h, s, l) = color.to_hsl();
        assert!((h - 120.0).abs() < 0.5);
        assert!((s - 100.0).abs() < 0.5);
        assert!((l - 25.0).abs() < 0.5);
    }

    #[test]
    fn named_lookup_is_case_insensitive() {
        let color = Color::from_name("CornflowerBlue").unwrap();
        assert_eq!(color.channels(), (100, 149, 237));
        assert_eq!(color.to_css(5, false), "CornflowerBlue");
    }
}
