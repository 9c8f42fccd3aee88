use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, SheetError};

/// Named colors accepted by [`Color::from_str`], as `0xRRGGBB`.
const NAMED_COLORS: &[(&str, u32)] = &[
    ("black", 0x000000),
    ("white", 0xFFFFFF),
    ("red", 0xFF0000),
    ("green", 0x008000),
    ("lime", 0x00FF00),
    ("blue", 0x0000FF),
    ("yellow", 0xFFFF00),
    ("cyan", 0x00FFFF),
    ("aqua", 0x00FFFF),
    ("magenta", 0xFF00FF),
    ("fuchsia", 0xFF00FF),
    ("gray", 0x808080),
    ("grey", 0x808080),
    ("silver", 0xC0C0C0),
    ("maroon", 0x800000),
    ("olive", 0x808000),
    ("navy", 0x000080),
    ("purple", 0x800080),
    ("teal", 0x008080),
    ("orange", 0xFFA500),
    ("pink", 0xFFC0CB),
    ("brown", 0xA52A2A),
    ("gold", 0xFFD700),
    ("lightgray", 0xD3D3D3),
    ("lightgrey", 0xD3D3D3),
    ("darkgray", 0xA9A9A9),
    ("darkgrey", 0xA9A9A9),
    ("lightblue", 0xADD8E6),
    ("lightgreen", 0x90EE90),
    ("lightyellow", 0xFFFFE0),
];

/// An opaque RGB color.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub red: u8,
    pub green: u8,
    pub blue: u8,
}

impl Color {
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color { red, green, blue }
    }

    pub const fn from_hex(value: u32) -> Self {
        Color {
            red: ((value >> 16) & 0xFF) as u8,
            green: ((value >> 8) & 0xFF) as u8,
            blue: (value & 0xFF) as u8,
        }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02X}{:02X}{:02X}", self.red, self.green, self.blue)
    }
}

impl FromStr for Color {
    type Err = SheetError;

    /// Accepts a color name (`"red"`), `#rgb` or `#rrggbb`.
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            let expanded: String = match hex.len() {
                3 => hex.chars().flat_map(|c| [c, c]).collect(),
                6 => hex.to_string(),
                _ => return Err(SheetError::Validation(format!("'{}' is not a hex color", s))),
            };
            return u32::from_str_radix(&expanded, 16)
                .map(Color::from_hex)
                .map_err(|_| SheetError::Validation(format!("'{}' is not a hex color", s)));
        }
        let name = s.to_ascii_lowercase().replace([' ', '_'], "");
        NAMED_COLORS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| Color::from_hex(*v))
            .ok_or_else(|| SheetError::Validation(format!("unknown color '{}'", s)))
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

// The service expresses color channels as floats in 0..=1.
impl Serialize for Color {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        use serde::ser::SerializeStruct;
        let mut s = serializer.serialize_struct("Color", 3)?;
        s.serialize_field("red", &(self.red as f32 / 255.0))?;
        s.serialize_field("green", &(self.green as f32 / 255.0))?;
        s.serialize_field("blue", &(self.blue as f32 / 255.0))?;
        s.end()
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Channels {
            #[serde(default)]
            red: f32,
            #[serde(default)]
            green: f32,
            #[serde(default)]
            blue: f32,
        }
        let c = Channels::deserialize(deserializer)?;
        let scale = |v: f32| (v.clamp(0.0, 1.0) * 255.0).round() as u8;
        Ok(Color::rgb(scale(c.red), scale(c.green), scale(c.blue)))
    }
}

/// Text formatting applied to a cell.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Font {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_family: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub font_size: Option<u32>,
    #[serde(default)]
    pub bold: bool,
    #[serde(default)]
    pub italic: bool,
    #[serde(default)]
    pub underline: bool,
    #[serde(default)]
    pub strikethrough: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foreground_color: Option<Color>,
}

impl Font {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn family(mut self, family: &str) -> Self {
        self.font_family = Some(family.to_string());
        self
    }

    pub fn size(mut self, size: u32) -> Self {
        self.font_size = Some(size);
        self
    }

    pub fn bold(mut self, bold: bool) -> Self {
        self.bold = bold;
        self
    }

    pub fn italic(mut self, italic: bool) -> Self {
        self.italic = italic;
        self
    }

    pub fn underline(mut self, underline: bool) -> Self {
        self.underline = underline;
        self
    }

    pub fn strikethrough(mut self, strikethrough: bool) -> Self {
        self.strikethrough = strikethrough;
        self
    }

    pub fn color(mut self, color: Color) -> Self {
        self.foreground_color = Some(color);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HorizontalAlign {
    Left,
    Center,
    Right,
}

impl FromStr for HorizontalAlign {
    type Err = SheetError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "left" => Ok(HorizontalAlign::Left),
            "center" | "centre" => Ok(HorizontalAlign::Center),
            "right" => Ok(HorizontalAlign::Right),
            _ => Err(SheetError::Validation(format!(
                "alignment must be \"left\", \"right\" or \"center\", got '{}'",
                s
            ))),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BorderStyle {
    Dotted,
    Dashed,
    Solid,
    SolidMedium,
    SolidThick,
    Double,
    None,
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BorderSide {
    pub style: BorderStyle,
    pub color: Color,
}

impl BorderSide {
    pub fn new(style: BorderStyle, color: Color) -> Self {
        BorderSide { style, color }
    }
}

/// Borders for a rectangle. Sides left as `None` are not touched remotely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Border {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top: Option<BorderSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bottom: Option<BorderSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub left: Option<BorderSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub right: Option<BorderSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_horizontal: Option<BorderSide>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inner_vertical: Option<BorderSide>,
}

impl Border {
    /// Same side on the outline of the rectangle.
    pub fn outline(side: BorderSide) -> Self {
        Border {
            top: Some(side),
            bottom: Some(side),
            left: Some(side),
            right: Some(side),
            ..Default::default()
        }
    }

    /// Same side on every edge, inner grid lines included.
    pub fn all(side: BorderSide) -> Self {
        Border {
            inner_horizontal: Some(side),
            inner_vertical: Some(side),
            ..Border::outline(side)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.top.is_none()
            && self.bottom.is_none()
            && self.left.is_none()
            && self.right.is_none()
            && self.inner_horizontal.is_none()
            && self.inner_vertical.is_none()
    }
}

/// Something that can be assigned to a styled cell attribute.
///
/// Typed values pass through; strings are parsed and rejected with
/// [`SheetError::Validation`] when outside the attribute's domain.
pub trait StyleValue<T> {
    fn into_style(self) -> Result<T>;
}

impl StyleValue<Color> for Color {
    fn into_style(self) -> Result<Color> {
        Ok(self)
    }
}

impl StyleValue<Color> for &str {
    fn into_style(self) -> Result<Color> {
        self.parse()
    }
}

impl StyleValue<Color> for String {
    fn into_style(self) -> Result<Color> {
        self.parse()
    }
}

impl StyleValue<HorizontalAlign> for HorizontalAlign {
    fn into_style(self) -> Result<HorizontalAlign> {
        Ok(self)
    }
}

impl StyleValue<HorizontalAlign> for &str {
    fn into_style(self) -> Result<HorizontalAlign> {
        self.parse()
    }
}

impl StyleValue<HorizontalAlign> for String {
    fn into_style(self) -> Result<HorizontalAlign> {
        self.parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn color_names_match_parsed_objects() {
        let by_name: Color = "red".into_style().unwrap();
        assert_eq!(by_name, Color::rgb(255, 0, 0));
        assert_eq!(by_name, "#ff0000".parse::<Color>().unwrap());
        assert_eq!(by_name, "#F00".parse::<Color>().unwrap());
        assert_eq!("Light Gray".parse::<Color>().unwrap(), Color::from_hex(0xD3D3D3));
    }

    #[test]
    fn bad_colors_are_rejected() {
        for bad in ["", "#12", "#GGGGGG", "reddish", "#1234567"] {
            assert!(matches!(bad.parse::<Color>(), Err(SheetError::Validation(_))), "{}", bad);
        }
    }

    #[test]
    fn color_serializes_as_unit_floats() {
        let json = serde_json::to_value(Color::rgb(255, 0, 51)).unwrap();
        assert_eq!(json["red"], 1.0);
        assert_eq!(json["green"], 0.0);
        assert!((json["blue"].as_f64().unwrap() - 0.2).abs() < 1e-6);
        let back: Color = serde_json::from_value(json).unwrap();
        assert_eq!(back, Color::rgb(255, 0, 51));
    }

    #[test]
    fn centre_is_normalized() {
        let align: HorizontalAlign = "centre".into_style().unwrap();
        assert_eq!(align, HorizontalAlign::Center);
        assert_eq!("Left".parse::<HorizontalAlign>().unwrap(), HorizontalAlign::Left);
        assert!("justify".parse::<HorizontalAlign>().is_err());
        assert_eq!(serde_json::to_value(align).unwrap(), "CENTER");
    }

    #[test]
    fn font_serializes_service_field_names() {
        let font = Font::new().family("Arial").size(12).bold(true).color(Color::rgb(0, 0, 0));
        let json = serde_json::to_value(&font).unwrap();
        assert_eq!(json["fontFamily"], "Arial");
        assert_eq!(json["fontSize"], 12);
        assert_eq!(json["bold"], true);
        assert_eq!(json["italic"], false);
        assert!(json.get("foregroundColor").is_some());
    }

    #[test]
    fn border_outline_skips_inner_lines() {
        let side = BorderSide::new(BorderStyle::SolidThick, Color::rgb(0, 0, 0));
        let json = serde_json::to_value(Border::outline(side)).unwrap();
        assert_eq!(json["top"]["style"], "SOLID_THICK");
        assert!(json.get("innerHorizontal").is_none());
        assert!(!Border::all(side).is_empty());
        assert!(Border::default().is_empty());
    }
}
