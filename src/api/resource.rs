//! Purpose: Shared machinery for catalog resources with a dirty-field overlay.
//! Exports: `Resource`, `Dirty`, `BackingDocument`, `SaveRequest`.
//! Role: Generic half of every resource binding: lazy document fetch and dirty-only serialization.
//! Invariants: A dirty slot is authoritative over the fetched document for reads and saves.
//! Invariants: `message` serializes only dirty fields, in the resource's writer order.

use tracing::debug;
use url::Url;

use super::catalog::{Catalog, SaveMethod};
use crate::core::error::ApiResult;
use crate::core::xml::{XmlBuilder, XmlElement};

/// Locally set value for one field, pending the next save.
#[derive(Clone, Debug, PartialEq)]
pub enum Dirty<T> {
    Set(T),
    /// Remove the value on save.
    Cleared,
}

impl<T> Dirty<T> {
    pub fn value(&self) -> Option<&T> {
        match self {
            Dirty::Set(value) => Some(value),
            Dirty::Cleared => None,
        }
    }
}

/// Lazily fetched server copy of a resource.
#[derive(Clone, Debug, Default)]
pub struct BackingDocument {
    dom: Option<XmlElement>,
}

impl BackingDocument {
    pub fn dom(&self) -> Option<&XmlElement> {
        self.dom.as_ref()
    }

    /// Returns the cached document, fetching it on first use.
    pub fn get_or_fetch(&mut self, catalog: &dyn Catalog, href: &Url) -> ApiResult<&XmlElement> {
        let dom = match self.dom.take() {
            Some(dom) => dom,
            None => {
                debug!(%href, "fetching resource document");
                catalog.get_xml(href)?
            }
        };
        Ok(self.dom.insert(dom))
    }

    /// Replaces the cached document with a fresh copy.
    pub fn refresh(&mut self, catalog: &dyn Catalog, href: &Url) -> ApiResult<&XmlElement> {
        debug!(%href, "refreshing resource document");
        let dom = catalog.get_xml(href)?;
        Ok(self.dom.insert(dom))
    }

    pub fn invalidate(&mut self) {
        self.dom = None;
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SaveRequest {
    pub method: SaveMethod,
    pub href: Url,
    pub body: String,
}

pub trait Resource {
    type Field: Copy;

    /// Root element name of the resource's XML representation.
    fn resource_type(&self) -> &'static str;

    fn href(&self) -> ApiResult<Url>;

    fn save_method(&self) -> SaveMethod;

    /// Fields with a dirty slot, in writer order.
    fn dirty_fields(&self) -> Vec<Self::Field>;

    fn write_field(&self, field: Self::Field, builder: &mut XmlBuilder) -> ApiResult<()>;

    fn message(&self) -> ApiResult<String> {
        let mut builder = XmlBuilder::new();
        builder.start(self.resource_type())?;
        for field in self.dirty_fields() {
            self.write_field(field, &mut builder)?;
        }
        builder.end(self.resource_type())?;
        builder.finish()
    }

    fn save_request(&self) -> ApiResult<SaveRequest> {
        Ok(SaveRequest {
            method: self.save_method(),
            href: self.href()?,
            body: self.message()?,
        })
    }
}
