use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Serialize;
use thiserror::Error;

/// RGBA color as written in TMX attributes (`#RRGGBB` or `#AARRGGBB`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize)]
pub struct Color {
    /// Red channel.
    pub red: u8,
    /// Green channel.
    pub green: u8,
    /// Blue channel.
    pub blue: u8,
    /// Alpha channel, 255 when the text has no alpha component.
    pub alpha: u8,
}

impl Color {
    /// Opaque color from its three channels.
    pub const fn rgb(red: u8, green: u8, blue: u8) -> Self {
        Color {
            red,
            green,
            blue,
            alpha: 255,
        }
    }
}

/// Text that is not a `#RRGGBB` / `#AARRGGBB` color.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("expected #RRGGBB or #AARRGGBB, got {0:?}")]
pub struct ParseColorError(pub String);

impl FromStr for Color {
    type Err = ParseColorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let err = || ParseColorError(s.to_owned());
        let hex = s.strip_prefix('#').unwrap_or(s);
        if !hex.is_ascii() {
            return Err(err());
        }
        let channel = |i: usize| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| err());

        match hex.len() {
            6 => Ok(Color::rgb(channel(0)?, channel(2)?, channel(4)?)),
            8 => Ok(Color {
                alpha: channel(0)?,
                red: channel(2)?,
                green: channel(4)?,
                blue: channel(6)?,
            }),
            _ => Err(err()),
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{:02x}{:02x}{:02x}{:02x}",
            self.alpha, self.red, self.green, self.blue
        )
    }
}

/// Typed value of a custom property.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum PropertyValue {
    /// `type="string"` or no type at all.
    String(String),
    /// `type="int"`.
    Int(i64),
    /// `type="float"`.
    Float(f64),
    /// `type="bool"`.
    Bool(bool),
    /// `type="color"`.
    Color(Color),
    /// `type="file"`, a path relative to the owning document.
    File(String),
    /// `type="object"`, the id of an object in the same map; 0 means none.
    Object(u32),
    /// `type="class"`: a custom type whose members are nested properties.
    Class {
        /// Name of the custom type (`propertytype` attribute).
        property_type: String,
        /// Member values.
        members: Properties,
    },
}

/// Name-keyed custom properties of a map, tileset, tile, layer or object.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Properties(BTreeMap<String, PropertyValue>);

impl Properties {
    /// Empty property set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a property, returning the value it replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: PropertyValue) -> Option<PropertyValue> {
        self.0.insert(name.into(), value)
    }

    /// Raw access to a value.
    pub fn get(&self, name: &str) -> Option<&PropertyValue> {
        self.0.get(name)
    }

    /// Whether a property with this name exists.
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True when no properties are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Properties in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PropertyValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Boolean property.
    pub fn get_bool(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            PropertyValue::Bool(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer property.
    pub fn get_i64(&self, name: &str) -> Option<i64> {
        match self.get(name)? {
            PropertyValue::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Integer property that fits an `i32`.
    pub fn get_i32(&self, name: &str) -> Option<i32> {
        self.get_i64(name).and_then(|v| i32::try_from(v).ok())
    }

    /// Float property.
    pub fn get_f64(&self, name: &str) -> Option<f64> {
        match self.get(name)? {
            PropertyValue::Float(v) => Some(*v),
            _ => None,
        }
    }

    /// Float property narrowed to `f32`.
    pub fn get_f32(&self, name: &str) -> Option<f32> {
        self.get_f64(name).map(|v| v as f32)
    }

    /// String property.
    pub fn get_string(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::String(v) => Some(v),
            _ => None,
        }
    }

    /// File property.
    pub fn get_file(&self, name: &str) -> Option<&str> {
        match self.get(name)? {
            PropertyValue::File(v) => Some(v),
            _ => None,
        }
    }

    /// Color property.
    pub fn get_color(&self, name: &str) -> Option<Color> {
        match self.get(name)? {
            PropertyValue::Color(v) => Some(*v),
            _ => None,
        }
    }

    /// Object reference property.
    pub fn get_object(&self, name: &str) -> Option<u32> {
        match self.get(name)? {
            PropertyValue::Object(v) => Some(*v),
            _ => None,
        }
    }

    /// Members of a class property.
    pub fn get_class(&self, name: &str) -> Option<&Properties> {
        match self.get(name)? {
            PropertyValue::Class { members, .. } => Some(members),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_rgb_and_argb_colors() {
        assert_eq!("#ff8000".parse::<Color>(), Ok(Color::rgb(255, 128, 0)));
        assert_eq!(
            "#80102030".parse::<Color>(),
            Ok(Color {
                alpha: 0x80,
                red: 0x10,
                green: 0x20,
                blue: 0x30
            })
        );
        assert_eq!("00ff00".parse::<Color>(), Ok(Color::rgb(0, 255, 0)));
    }

    #[test]
    fn rejects_malformed_colors() {
        assert!("#fff".parse::<Color>().is_err());
        assert!("#gg0000".parse::<Color>().is_err());
        assert!("#ééé".parse::<Color>().is_err());
    }

    #[test]
    fn typed_getters_only_match_their_variant() {
        let mut props = Properties::new();
        props.insert("big", PropertyValue::Int(5_000_000_000));
        props.insert("speed", PropertyValue::Float(9.5));
        props.insert("path", PropertyValue::File("a.png".into()));

        assert_eq!(props.get_i64("big"), Some(5_000_000_000));
        assert_eq!(props.get_i32("big"), None);
        assert_eq!(props.get_f32("speed"), Some(9.5));
        assert_eq!(props.get_string("path"), None);
        assert_eq!(props.get_file("path"), Some("a.png"));
        assert_eq!(props.get_bool("missing"), None);
    }
}
