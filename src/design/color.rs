//! Color strings as written by the color pickers.

use bevy::color::palettes::css;
use bevy::prelude::*;
use thiserror::Error;

/// Errors that can occur when parsing a color string.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ColorParseError {
    #[error("Color string is empty")]
    Empty,

    #[error("Invalid hex color '{value}'")]
    InvalidHex { value: String },

    #[error("Unknown color name '{value}'")]
    UnknownName { value: String },
}

/// Parse a CSS-style color string.
///
/// Accepts `#rgb`, `#rgba`, `#rrggbb`, `#rrggbbaa` and a small set of
/// named colors (`white`, `black`, `red`, ...). Names are case-insensitive.
pub fn parse_color(value: &str) -> Result<Srgba, ColorParseError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ColorParseError::Empty);
    }

    if trimmed.starts_with('#') {
        return Srgba::hex(trimmed).map_err(|_| ColorParseError::InvalidHex {
            value: trimmed.to_string(),
        });
    }

    named_color(trimmed).ok_or_else(|| ColorParseError::UnknownName {
        value: trimmed.to_string(),
    })
}

/// Parse a color string, substituting `fallback` when it is malformed.
pub fn parse_color_or(value: &str, fallback: Srgba) -> Srgba {
    match parse_color(value) {
        Ok(color) => color,
        Err(e) => {
            warn!("{e}; using fallback color {}", fallback.to_hex());
            fallback
        }
    }
}

fn named_color(name: &str) -> Option<Srgba> {
    let color = match name.to_ascii_lowercase().as_str() {
        "white" => css::WHITE,
        "black" => css::BLACK,
        "red" => css::RED,
        "green" => css::GREEN,
        "lime" => css::LIME,
        "blue" => css::BLUE,
        "yellow" => css::YELLOW,
        "orange" => css::ORANGE,
        "purple" => css::PURPLE,
        "pink" => css::PINK,
        "gray" | "grey" => css::GRAY,
        "navy" => css::NAVY,
        "maroon" => css::MAROON,
        "teal" => css::TEAL,
        "silver" => css::SILVER,
        "gold" => css::GOLD,
        "transparent" => Srgba::NONE,
        _ => return None,
    };
    Some(color)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::color::ColorToPacked;

    #[test]
    fn test_parse_hex() {
        let color = parse_color("#3498db").unwrap();
        assert_eq!(color.to_u8_array(), [0x34, 0x98, 0xdb, 0xff]);

        let short = parse_color("#fff").unwrap();
        assert_eq!(short.to_u8_array(), [255, 255, 255, 255]);
    }

    #[test]
    fn test_parse_named() {
        assert_eq!(parse_color("White").unwrap(), css::WHITE);
        assert_eq!(parse_color(" black ").unwrap(), css::BLACK);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_color(""), Err(ColorParseError::Empty));
        assert!(matches!(
            parse_color("#12"),
            Err(ColorParseError::InvalidHex { .. })
        ));
        assert!(matches!(
            parse_color("chartreuse-ish"),
            Err(ColorParseError::UnknownName { .. })
        ));
    }

    #[test]
    fn test_parse_fallback() {
        assert_eq!(parse_color_or("nope", css::BLACK), css::BLACK);
    }
}
