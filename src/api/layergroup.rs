//! Purpose: Typed binding for the catalog's layer group resource.
//! Exports: `LayerGroup`, `LayerGroupField`, `Vocabulary`, `LEGACY_GSVERSION`.
//! Role: Reads fields from the dirty overlay or the fetched document; writes dirty fields on save.
//! Invariants: Names are validated before any catalog interaction.
//! Invariants: Unsaved groups start with every field dirty and are created with POST.
//! Invariants: The layers field is one slot whatever vocabulary the server reads with.

use std::fmt;

use tracing::debug;
use url::Url;

use super::catalog::{Catalog, SaveMethod, resource_url};
use super::resource::{BackingDocument, Dirty, Resource};
use crate::core::bbox::BoundingBox;
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::fields::{
    NameList, bbox, layer_list, publishable_list, style_list, write_bbox, write_layers,
    write_string, write_styles,
};
use crate::core::xml::{XmlBuilder, XmlElement};

/// Version string reported by servers that list members as `layers`/`layer`.
pub const LEGACY_GSVERSION: &str = "2.2.x";

const RESOURCE_TYPE: &str = "layerGroup";
const COLLECTION: &str = "layergroups";

/// Element names a server generation uses for layer group members.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Vocabulary {
    /// `<layers><layer><name>..`
    Legacy,
    /// `<publishables><published><name>..`
    Current,
}

impl Vocabulary {
    pub fn for_version(gsversion: &str) -> Self {
        if gsversion == LEGACY_GSVERSION {
            Vocabulary::Legacy
        } else {
            Vocabulary::Current
        }
    }

    pub fn container_tag(self) -> &'static str {
        match self {
            Vocabulary::Legacy => "layers",
            Vocabulary::Current => "publishables",
        }
    }

    pub fn member_tag(self) -> &'static str {
        match self {
            Vocabulary::Legacy => "layer",
            Vocabulary::Current => "published",
        }
    }

    /// Member names of a layer group document read with this vocabulary.
    pub fn members(self, dom: &XmlElement) -> Option<NameList> {
        let container = dom.find(self.container_tag());
        match self {
            Vocabulary::Legacy => layer_list(container),
            Vocabulary::Current => publishable_list(container),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum LayerGroupField {
    Name,
    Layers,
    Styles,
    Bounds,
}

#[derive(Clone, Debug, Default, PartialEq)]
struct DirtySet {
    name: Option<Dirty<String>>,
    layers: Option<Dirty<NameList>>,
    styles: Option<Dirty<NameList>>,
    bounds: Option<Dirty<BoundingBox>>,
}

type FieldWriter = fn(&DirtySet, &mut XmlBuilder) -> ApiResult<()>;

// Serialization order of dirty fields.
const WRITERS: [(LayerGroupField, FieldWriter); 4] = [
    (LayerGroupField::Name, write_name_field),
    (LayerGroupField::Layers, write_layers_field),
    (LayerGroupField::Styles, write_styles_field),
    (LayerGroupField::Bounds, write_bounds_field),
];

fn write_slot<T>(
    slot: Option<&Dirty<T>>,
    tag: &str,
    builder: &mut XmlBuilder,
    write: impl FnOnce(&mut XmlBuilder, &T) -> ApiResult<()>,
) -> ApiResult<()> {
    match slot {
        Some(Dirty::Set(value)) => write(builder, value),
        Some(Dirty::Cleared) => builder.empty_element(tag),
        None => Ok(()),
    }
}

fn write_name_field(dirty: &DirtySet, builder: &mut XmlBuilder) -> ApiResult<()> {
    write_slot(dirty.name.as_ref(), "name", builder, |builder, name| {
        write_string(builder, "name", name)
    })
}

fn write_layers_field(dirty: &DirtySet, builder: &mut XmlBuilder) -> ApiResult<()> {
    write_slot(dirty.layers.as_ref(), "layers", builder, |builder, layers| {
        write_layers(builder, layers)
    })
}

fn write_styles_field(dirty: &DirtySet, builder: &mut XmlBuilder) -> ApiResult<()> {
    write_slot(dirty.styles.as_ref(), "styles", builder, |builder, styles| {
        write_styles(builder, styles)
    })
}

fn write_bounds_field(dirty: &DirtySet, builder: &mut XmlBuilder) -> ApiResult<()> {
    write_slot(dirty.bounds.as_ref(), "bounds", builder, |builder, bounds| {
        write_bbox(builder, "bounds", bounds)
    })
}

impl DirtySet {
    fn contains(&self, field: LayerGroupField) -> bool {
        match field {
            LayerGroupField::Name => self.name.is_some(),
            LayerGroupField::Layers => self.layers.is_some(),
            LayerGroupField::Styles => self.styles.is_some(),
            LayerGroupField::Bounds => self.bounds.is_some(),
        }
    }
}

pub struct LayerGroup<'c> {
    catalog: &'c dyn Catalog,
    name: String,
    persisted: bool,
    dirty: DirtySet,
    document: BackingDocument,
}

impl<'c> LayerGroup<'c> {
    /// Binds to an existing layer group. Nothing is fetched until a field is read.
    pub fn new(catalog: &'c dyn Catalog, name: impl Into<String>) -> ApiResult<Self> {
        let name = name.into();
        ensure_layer_group_name(&name)?;
        Ok(Self {
            catalog,
            name,
            persisted: true,
            dirty: DirtySet::default(),
            document: BackingDocument::default(),
        })
    }

    /// A layer group that does not exist on the server yet. Every field is dirty, so the
    /// first save sends all of them; bounds default to [`BoundingBox::world`].
    pub fn unsaved(
        catalog: &'c dyn Catalog,
        name: impl Into<String>,
        layers: NameList,
        styles: NameList,
        bounds: Option<BoundingBox>,
    ) -> ApiResult<Self> {
        let mut group = Self::new(catalog, name)?;
        group.persisted = false;
        group.dirty = DirtySet {
            name: Some(Dirty::Set(group.name.clone())),
            layers: Some(Dirty::Set(layers)),
            styles: Some(Dirty::Set(styles)),
            bounds: Some(Dirty::Set(bounds.unwrap_or_else(BoundingBox::world))),
        };
        Ok(group)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn catalog(&self) -> &'c dyn Catalog {
        self.catalog
    }

    pub fn is_persisted(&self) -> bool {
        self.persisted
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty != DirtySet::default()
    }

    pub fn dom(&self) -> Option<&XmlElement> {
        self.document.dom()
    }

    /// Re-reads the server copy. Dirty fields keep their local values.
    pub fn fetch(&mut self) -> ApiResult<()> {
        let href = self.href()?;
        self.document
            .refresh(self.catalog, &href)
            .map_err(|err| err.with_resource(self.name.clone()))?;
        Ok(())
    }

    pub fn styles(&mut self) -> ApiResult<Option<NameList>> {
        if let Some(slot) = &self.dirty.styles {
            return Ok(slot.value().cloned());
        }
        Ok(style_list(self.document()?.find("styles")))
    }

    pub fn set_styles(&mut self, styles: NameList) {
        self.dirty.styles = Some(Dirty::Set(styles));
    }

    pub fn clear_styles(&mut self) {
        self.dirty.styles = Some(Dirty::Cleared);
    }

    pub fn bounds(&mut self) -> ApiResult<Option<BoundingBox>> {
        if let Some(slot) = &self.dirty.bounds {
            return Ok(slot.value().cloned());
        }
        Ok(bbox(self.document()?.find("bounds")))
    }

    pub fn set_bounds(&mut self, bounds: BoundingBox) {
        self.dirty.bounds = Some(Dirty::Set(bounds));
    }

    pub fn clear_bounds(&mut self) {
        self.dirty.bounds = Some(Dirty::Cleared);
    }

    /// Member layers and layer groups, read with the vocabulary matching the server version.
    pub fn layers(&mut self) -> ApiResult<Option<NameList>> {
        if let Some(slot) = &self.dirty.layers {
            return Ok(slot.value().cloned());
        }
        let gsversion = self.catalog.gsversion()?;
        let vocabulary = Vocabulary::for_version(&gsversion);
        debug!(group = %self.name, %gsversion, ?vocabulary, "reading layer group members");
        Ok(vocabulary.members(self.document()?))
    }

    pub fn set_layers(&mut self, layers: NameList) {
        self.dirty.layers = Some(Dirty::Set(layers));
    }

    pub fn clear_layers(&mut self) {
        self.dirty.layers = Some(Dirty::Cleared);
    }

    /// Sends the dirty fields, then drops the dirty set and the cached document.
    pub fn save(&mut self) -> ApiResult<()> {
        if !self.is_dirty() {
            debug!(group = %self.name, "nothing to save");
            return Ok(());
        }
        let request = self.save_request()?;
        debug!(
            group = %self.name,
            method = request.method.as_str(),
            href = %request.href,
            "saving layer group"
        );
        self.catalog
            .send_xml(request.method, &request.href, &request.body)
            .map_err(|err| err.with_resource(self.name.clone()))?;
        self.dirty = DirtySet::default();
        self.document.invalidate();
        self.persisted = true;
        Ok(())
    }

    fn document(&mut self) -> ApiResult<&XmlElement> {
        let href = self.href()?;
        let name = &self.name;
        self.document
            .get_or_fetch(self.catalog, &href)
            .map_err(|err| err.with_resource(name.clone()))
    }
}

impl Resource for LayerGroup<'_> {
    type Field = LayerGroupField;

    fn resource_type(&self) -> &'static str {
        RESOURCE_TYPE
    }

    fn href(&self) -> ApiResult<Url> {
        let service_url = self.catalog.service_url();
        if self.persisted {
            let document = format!("{}.xml", self.name);
            return resource_url(service_url, &[COLLECTION, document.as_str()]);
        }
        let mut url = resource_url(service_url, &[COLLECTION])?;
        url.query_pairs_mut().append_pair("name", &self.name);
        Ok(url)
    }

    fn save_method(&self) -> SaveMethod {
        if self.persisted {
            SaveMethod::Put
        } else {
            SaveMethod::Post
        }
    }

    fn dirty_fields(&self) -> Vec<LayerGroupField> {
        WRITERS
            .iter()
            .map(|(field, _)| *field)
            .filter(|field| self.dirty.contains(*field))
            .collect()
    }

    fn write_field(&self, field: LayerGroupField, builder: &mut XmlBuilder) -> ApiResult<()> {
        match WRITERS.iter().find(|(candidate, _)| *candidate == field) {
            Some((_, writer)) => writer(&self.dirty, builder),
            None => Ok(()),
        }
    }
}

impl fmt::Display for LayerGroup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<LayerGroup {}>", self.name)
    }
}

impl fmt::Debug for LayerGroup<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

fn ensure_layer_group_name(name: &str) -> ApiResult<()> {
    if name.is_empty() {
        return Err(Error::new(ErrorKind::Usage).with_message("layer group name must not be empty"));
    }
    if name.contains('/') {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("layer group names must not contain path separators")
            .with_resource(name.to_string()));
    }
    Ok(())
}
