//! Purpose: JSON rendering of layer group fields for CLI output.
//! Exports: `layer_group_json`, `bounds_json`.
//! Invariants: Absent fields render as `null`; members without a name render as `null` entries.

use gsconfig::api::{BoundingBox, NameList};
use serde_json::{Map, Value, json};

pub(crate) fn bounds_json(bounds: &BoundingBox) -> Value {
    let mut map = Map::new();
    map.insert("minx".to_string(), json!(bounds.minx));
    map.insert("maxx".to_string(), json!(bounds.maxx));
    map.insert("miny".to_string(), json!(bounds.miny));
    map.insert("maxy".to_string(), json!(bounds.maxy));
    if let Some(crs) = &bounds.crs {
        map.insert("crs".to_string(), json!(crs));
    }
    Value::Object(map)
}

pub(crate) fn layer_group_json(
    name: &str,
    href: &str,
    layers: Option<&NameList>,
    styles: Option<&NameList>,
    bounds: Option<&BoundingBox>,
) -> Value {
    let mut map = Map::new();
    map.insert("name".to_string(), json!(name));
    map.insert("href".to_string(), json!(href));
    map.insert("layers".to_string(), json!(layers));
    map.insert("styles".to_string(), json!(styles));
    map.insert(
        "bounds".to_string(),
        bounds.map(bounds_json).unwrap_or(Value::Null),
    );
    Value::Object(map)
}

#[cfg(test)]
mod tests {
    use super::{bounds_json, layer_group_json};
    use gsconfig::api::{BoundingBox, names};
    use serde_json::{Value, json};

    #[test]
    fn bounds_json_omits_missing_crs() {
        let value = bounds_json(&BoundingBox::new(0.0, 1.0, 2.0, 3.0, None));
        assert_eq!(value, json!({"minx": 0.0, "maxx": 1.0, "miny": 2.0, "maxy": 3.0}));
    }

    #[test]
    fn layer_group_json_keeps_null_members() {
        let layers = names(["roads"]);
        let styles = vec![None];
        let value = layer_group_json("basemap", "http://h/lg.xml", Some(&layers), Some(&styles), None);
        assert_eq!(value["layers"], json!(["roads"]));
        assert_eq!(value["styles"], json!([null]));
        assert_eq!(value["bounds"], Value::Null);
    }
}
