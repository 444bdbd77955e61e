//! Purpose: Convert layer group XML subtrees to typed values and write them back.
//! Exports: name-list converters (`layer_list`, `publishable_list`, `style_list`), `bbox`,
//!          and the matching writers (`write_layers`, `write_styles`, `write_bbox`, `write_string`).
//! Role: Pure functions; resources pick which converter or writer applies to a field.
//! Invariants: Converters never fail; missing data degrades to `None` entries.
//! Invariants: Name lists keep document order, position, and count.

use tracing::debug;

use crate::core::bbox::BoundingBox;
use crate::core::error::ApiResult;
use crate::core::xml::{XmlBuilder, XmlElement};

/// Ordered member names; `None` marks a member without a `name` element.
pub type NameList = Vec<Option<String>>;

/// Builds a name list with every entry present.
pub fn names<I, S>(values: I) -> NameList
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    values.into_iter().map(|value| Some(value.into())).collect()
}

pub fn name_list(node: Option<&XmlElement>, member_tag: &str) -> Option<NameList> {
    let node = node?;
    Some(
        node.find_all(member_tag)
            .map(|member| member.find_text("name").map(str::to_string))
            .collect(),
    )
}

pub fn layer_list(node: Option<&XmlElement>) -> Option<NameList> {
    name_list(node, "layer")
}

pub fn publishable_list(node: Option<&XmlElement>) -> Option<NameList> {
    name_list(node, "published")
}

pub fn style_list(node: Option<&XmlElement>) -> Option<NameList> {
    name_list(node, "style")
}

/// Reads `minx`/`maxx`/`miny`/`maxy` and an optional `crs`. All four edges are required.
pub fn bbox(node: Option<&XmlElement>) -> Option<BoundingBox> {
    let node = node?;
    let edge = |tag: &str| -> Option<f64> {
        let text = node.find_text(tag)?;
        match text.parse() {
            Ok(value) => Some(value),
            Err(_) => {
                debug!(edge = tag, text, "ignoring non-numeric bounds edge");
                None
            }
        }
    };
    let minx = edge("minx")?;
    let maxx = edge("maxx")?;
    let miny = edge("miny")?;
    let maxy = edge("maxy")?;
    let crs = node.find_text("crs").map(str::to_string);
    Some(BoundingBox::new(minx, maxx, miny, maxy, crs))
}

pub fn write_name_list(
    builder: &mut XmlBuilder,
    container_tag: &str,
    member_tag: &str,
    names: &[Option<String>],
) -> ApiResult<()> {
    builder.start(container_tag)?;
    for name in names {
        builder.start(member_tag)?;
        if let Some(name) = name {
            builder.text_element("name", name)?;
        }
        builder.end(member_tag)?;
    }
    builder.end(container_tag)
}

pub fn write_layers(builder: &mut XmlBuilder, layers: &[Option<String>]) -> ApiResult<()> {
    write_name_list(builder, "layers", "layer", layers)
}

pub fn write_styles(builder: &mut XmlBuilder, styles: &[Option<String>]) -> ApiResult<()> {
    write_name_list(builder, "styles", "style", styles)
}

pub fn write_bbox(builder: &mut XmlBuilder, tag: &str, bounds: &BoundingBox) -> ApiResult<()> {
    builder.start(tag)?;
    builder.text_element("minx", &bounds.minx.to_string())?;
    builder.text_element("maxx", &bounds.maxx.to_string())?;
    builder.text_element("miny", &bounds.miny.to_string())?;
    builder.text_element("maxy", &bounds.maxy.to_string())?;
    if let Some(crs) = &bounds.crs {
        builder.start_with_attributes("crs", &[("class", "projected")])?;
        builder.data(crs)?;
        builder.end("crs")?;
    }
    builder.end(tag)
}

pub fn write_string(builder: &mut XmlBuilder, tag: &str, value: &str) -> ApiResult<()> {
    builder.text_element(tag, value)
}
