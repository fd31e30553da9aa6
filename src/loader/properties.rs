use roxmltree::Node;

use crate::error::MapError;
use crate::loader::xml::{self, child, elements, invalid, schema};
use crate::properties::{Color, Properties, PropertyValue};

/// Reads the `<properties>` child of `owner`, if any.
pub(crate) fn parse_properties(owner: Node) -> Result<Properties, MapError> {
    match child(owner, "properties") {
        Some(list) => parse_property_list(list),
        None => Ok(Properties::new()),
    }
}

fn parse_property_list(list: Node) -> Result<Properties, MapError> {
    let mut out = Properties::new();
    for node in elements(list).filter(|n| n.has_tag_name("property")) {
        let name = xml::required(node, "name")?;
        let value = parse_property(node)?;
        if out.insert(name, value).is_some() {
            return Err(schema(node, format!("duplicate property '{name}'")));
        }
    }
    Ok(out)
}

fn parse_property(node: Node) -> Result<PropertyValue, MapError> {
    let kind = node.attribute("type").unwrap_or("string");
    // multi-line strings are stored as text content instead of `value`
    let raw = node
        .attribute("value")
        .or_else(|| node.text())
        .unwrap_or_default();
    let bad = |e: &dyn std::fmt::Display| invalid(node, format!("{kind} property"), raw, e);

    let value = match kind {
        "string" => PropertyValue::String(raw.to_owned()),
        "file" => PropertyValue::File(raw.to_owned()),
        "int" => PropertyValue::Int(raw.trim().parse().map_err(|e| bad(&e))?),
        "float" => PropertyValue::Float(raw.trim().parse().map_err(|e| bad(&e))?),
        "bool" => match raw.trim() {
            "true" | "1" => PropertyValue::Bool(true),
            "false" | "0" => PropertyValue::Bool(false),
            _ => return Err(bad(&"expected true or false")),
        },
        // an unset color is written as an empty string
        "color" if raw.trim().is_empty() => PropertyValue::Color(Color::default()),
        "color" => PropertyValue::Color(raw.trim().parse().map_err(|e| bad(&e))?),
        "object" if raw.trim().is_empty() => PropertyValue::Object(0),
        "object" => PropertyValue::Object(raw.trim().parse().map_err(|e| bad(&e))?),
        "class" => PropertyValue::Class {
            property_type: xml::string_or_default(node, "propertytype"),
            members: parse_properties(node)?,
        },
        other => return Err(schema(node, format!("unsupported property type '{other}'"))),
    };
    Ok(value)
}
