//! Purpose: Public Rust API for binding GeoServer catalog resources.
//! Exports: `Catalog`, `RestCatalog`, `LayerGroup`, and the value types they exchange.
//! Role: Stable boundary used by the CLI and integration tests.
//! Invariants: Resource bindings only reach the server through the `Catalog` trait.

mod catalog;
mod layergroup;
mod resource;
mod rest;

pub use crate::core::bbox::{BoundingBox, DEFAULT_CRS};
#[doc(hidden)]
pub use crate::core::error::to_exit_code;
pub use crate::core::error::{ApiResult, Error, ErrorKind};
pub use crate::core::fields::{NameList, names};
pub use crate::core::xml::{XmlBuilder, XmlElement};
pub use catalog::{Catalog, SaveMethod, resource_url};
pub use layergroup::{LEGACY_GSVERSION, LayerGroup, LayerGroupField, Vocabulary};
pub use resource::{BackingDocument, Dirty, Resource, SaveRequest};
pub use rest::RestCatalog;
