//! Purpose: Describe what a resource needs from the catalog that owns it.
//! Exports: `Catalog` (version, base URL, XML fetch/send), `SaveMethod`, `resource_url`.
//! Role: Seam between resource bindings and the transport; tests substitute an in-memory catalog.
//! Invariants: Resource URLs extend the service URL path; they never replace it.

use url::Url;

use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::xml::XmlElement;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SaveMethod {
    /// Update an existing resource in place.
    Put,
    /// Create a resource through its collection endpoint.
    Post,
}

impl SaveMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            SaveMethod::Put => "PUT",
            SaveMethod::Post => "POST",
        }
    }
}

pub trait Catalog {
    /// Base URL of the REST service, e.g. `http://localhost:8080/geoserver/rest`.
    fn service_url(&self) -> &Url;

    /// Version string reported by the server (`"2.2.x"` for legacy servers).
    fn gsversion(&self) -> ApiResult<String>;

    fn get_xml(&self, url: &Url) -> ApiResult<XmlElement>;

    fn send_xml(&self, method: SaveMethod, url: &Url, body: &str) -> ApiResult<()>;
}

pub fn resource_url(service_url: &Url, segments: &[&str]) -> ApiResult<Url> {
    let mut url = service_url.clone();
    {
        let mut path = url.path_segments_mut().map_err(|_| {
            Error::new(ErrorKind::Usage).with_message("service url cannot be a base")
        })?;
        path.pop_if_empty();
        for segment in segments {
            path.push(segment);
        }
    }
    Ok(url)
}
