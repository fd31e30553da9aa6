// Attribute helpers over roxmltree nodes. Every failure carries the
// `line:column` of the offending element.

use std::fmt::Display;
use std::str::FromStr;

use roxmltree::Node;

use crate::error::MapError;

pub(crate) fn location(node: Node) -> String {
    let pos = node.document().text_pos_at(node.range().start);
    format!("{}:{}", pos.row, pos.col)
}

pub(crate) fn schema(node: Node, message: impl Into<String>) -> MapError {
    MapError::schema(location(node), message)
}

pub(crate) fn invalid(node: Node, what: impl Into<String>, value: &str, reason: impl Display) -> MapError {
    MapError::Parse {
        location: location(node),
        what: what.into(),
        value: value.to_owned(),
        reason: reason.to_string(),
    }
}

pub(crate) fn expect_tag(node: Node, tag: &str) -> Result<(), MapError> {
    if node.has_tag_name(tag) {
        Ok(())
    } else {
        Err(schema(
            node,
            format!("expected <{tag}>, found <{}>", node.tag_name().name()),
        ))
    }
}

pub(crate) fn required<'a>(node: Node<'a, '_>, name: &str) -> Result<&'a str, MapError> {
    node.attribute(name).ok_or_else(|| {
        schema(
            node,
            format!("<{}> is missing required attribute '{name}'", node.tag_name().name()),
        )
    })
}

fn parse_value<T>(node: Node, name: &str, value: &str) -> Result<T, MapError>
where
    T: FromStr,
    T::Err: Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| invalid(node, format!("attribute '{name}'"), value, e))
}

pub(crate) fn parse_required<T>(node: Node, name: &str) -> Result<T, MapError>
where
    T: FromStr,
    T::Err: Display,
{
    parse_value(node, name, required(node, name)?)
}

pub(crate) fn parse_optional<T>(node: Node, name: &str) -> Result<Option<T>, MapError>
where
    T: FromStr,
    T::Err: Display,
{
    node.attribute(name)
        .map(|value| parse_value(node, name, value))
        .transpose()
}

pub(crate) fn parse_or<T>(node: Node, name: &str, default: T) -> Result<T, MapError>
where
    T: FromStr,
    T::Err: Display,
{
    Ok(parse_optional(node, name)?.unwrap_or(default))
}

/// TMX writes booleans as `0`/`1`; `true`/`false` is accepted too.
pub(crate) fn parse_bool_or(node: Node, name: &str, default: bool) -> Result<bool, MapError> {
    match node.attribute(name).map(str::trim) {
        None => Ok(default),
        Some("1") | Some("true") => Ok(true),
        Some("0") | Some("false") => Ok(false),
        Some(other) => Err(invalid(
            node,
            format!("attribute '{name}'"),
            other,
            "expected 0 or 1",
        )),
    }
}

pub(crate) fn string_or_default(node: Node, name: &str) -> String {
    node.attribute(name).unwrap_or_default().to_owned()
}

pub(crate) fn elements<'a, 'input>(node: Node<'a, 'input>) -> impl Iterator<Item = Node<'a, 'input>> {
    node.children().filter(|n| n.is_element())
}

pub(crate) fn child<'a, 'input>(node: Node<'a, 'input>, tag: &str) -> Option<Node<'a, 'input>> {
    elements(node).find(|n| n.has_tag_name(tag))
}

#[cfg(test)]
mod tests {
    use super::*;
    use roxmltree::Document;

    #[test]
    fn reports_location_of_bad_values() {
        let doc = Document::parse("<map>\n  <layer width=\"x\"/>\n</map>").unwrap();
        let layer = child(doc.root_element(), "layer").unwrap();
        let err = parse_required::<u32>(layer, "width").unwrap_err();
        match err {
            MapError::Parse { location, value, .. } => {
                assert_eq!(location, "2:3");
                assert_eq!(value, "x");
            }
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_required_attribute_is_a_schema_error() {
        let doc = Document::parse("<map/>").unwrap();
        let err = parse_required::<u32>(doc.root_element(), "width").unwrap_err();
        assert!(matches!(err, MapError::Schema { .. }));
    }

    #[test]
    fn reads_tmx_booleans() {
        let doc = Document::parse(r#"<layer visible="0" locked="true" odd="2"/>"#).unwrap();
        let node = doc.root_element();
        assert!(!parse_bool_or(node, "visible", true).unwrap());
        assert!(parse_bool_or(node, "locked", false).unwrap());
        assert!(parse_bool_or(node, "absent", true).unwrap());
        assert!(parse_bool_or(node, "odd", true).is_err());
    }
}
