//! Purpose: HTTP implementation of `Catalog` for a GeoServer REST endpoint.
//! Exports: `RestCatalog`.
//! Role: Thin blocking transport (ureq) plus server version discovery.
//! Invariants: The service URL keeps its path (e.g. `/geoserver/rest`); query and fragment are dropped.
//! Invariants: The server version is looked up at most once per catalog unless pinned.
#![allow(clippy::result_large_err)]

use std::sync::{Arc, OnceLock};

use tracing::{debug, warn};
use url::Url;

use super::catalog::{Catalog, SaveMethod, resource_url};
use super::layergroup::{LEGACY_GSVERSION, LayerGroup};
use crate::core::bbox::BoundingBox;
use crate::core::error::{ApiResult, Error, ErrorKind};
use crate::core::fields::NameList;
use crate::core::xml::XmlElement;

const XML_CONTENT_TYPE: &str = "application/xml";
const MAX_ERROR_BODY_CHARS: usize = 512;

#[derive(Clone)]
pub struct RestCatalog {
    inner: Arc<RestCatalogInner>,
}

struct RestCatalogInner {
    service_url: Url,
    agent: ureq::Agent,
    pinned_version: Option<String>,
    version: OnceLock<String>,
}

impl RestCatalog {
    pub fn new(service_url: impl Into<String>) -> ApiResult<Self> {
        let service_url = normalize_service_url(service_url.into())?;
        let agent = ureq::AgentBuilder::new().build();
        Ok(Self {
            inner: Arc::new(RestCatalogInner {
                service_url,
                agent,
                pinned_version: None,
                version: OnceLock::new(),
            }),
        })
    }

    /// Uses `version` instead of asking the server.
    pub fn with_gsversion(mut self, version: impl Into<String>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.pinned_version = Some(version.into());
        } else {
            self.inner = Arc::new(RestCatalogInner {
                service_url: self.inner.service_url.clone(),
                agent: self.inner.agent.clone(),
                pinned_version: Some(version.into()),
                version: OnceLock::new(),
            });
        }
        self
    }

    pub fn layer_group(&self, name: impl Into<String>) -> ApiResult<LayerGroup<'_>> {
        LayerGroup::new(self, name)
    }

    pub fn create_layer_group(
        &self,
        name: impl Into<String>,
        layers: NameList,
        styles: NameList,
        bounds: Option<BoundingBox>,
    ) -> ApiResult<LayerGroup<'_>> {
        LayerGroup::unsaved(self, name, layers, styles, bounds)
    }

    fn request(&self, method: &str, url: &Url) -> ureq::Request {
        self.inner.agent.request(method, url.as_str())
    }

    fn lookup_version(&self) -> ApiResult<String> {
        let url = resource_url(&self.inner.service_url, &["about", "version.xml"])?;
        let about = match self.get_xml(&url) {
            Ok(about) => about,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                warn!(%url, "server has no version resource; assuming {LEGACY_GSVERSION}");
                return Ok(LEGACY_GSVERSION.to_string());
            }
            Err(err) => return Err(err),
        };
        match geoserver_version(&about) {
            Some(version) => {
                debug!(%version, "resolved server version");
                Ok(version.to_string())
            }
            None => {
                warn!(%url, "version resource lists no GeoServer version; assuming {LEGACY_GSVERSION}");
                Ok(LEGACY_GSVERSION.to_string())
            }
        }
    }
}

impl Catalog for RestCatalog {
    fn service_url(&self) -> &Url {
        &self.inner.service_url
    }

    fn gsversion(&self) -> ApiResult<String> {
        if let Some(version) = &self.inner.pinned_version {
            return Ok(version.clone());
        }
        if let Some(version) = self.inner.version.get() {
            return Ok(version.clone());
        }
        let version = self.lookup_version()?;
        let _ = self.inner.version.set(version.clone());
        Ok(version)
    }

    fn get_xml(&self, url: &Url) -> ApiResult<XmlElement> {
        let response = self
            .request("GET", url)
            .set("Accept", XML_CONTENT_TYPE)
            .call();
        match response {
            Ok(resp) => read_xml_response(resp, url),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp, url)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_url(url.as_str())
                .with_source(err)),
        }
    }

    fn send_xml(&self, method: SaveMethod, url: &Url, body: &str) -> ApiResult<()> {
        let response = self
            .request(method.as_str(), url)
            .set("Content-Type", XML_CONTENT_TYPE)
            .send_string(body);
        match response {
            Ok(_) => Ok(()),
            Err(ureq::Error::Status(code, resp)) => Err(parse_error_response(code, resp, url)),
            Err(ureq::Error::Transport(err)) => Err(Error::new(ErrorKind::Io)
                .with_message("request failed")
                .with_url(url.as_str())
                .with_source(err)),
        }
    }
}

fn normalize_service_url(raw: String) -> ApiResult<Url> {
    let mut url = Url::parse(&raw).map_err(|err| {
        Error::new(ErrorKind::Usage)
            .with_message("invalid service url")
            .with_url(raw.clone())
            .with_source(err)
    })?;
    let scheme = url.scheme();
    if scheme != "http" && scheme != "https" {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("service url must use http or https scheme")
            .with_url(raw));
    }
    let path = url.path().trim_end_matches('/').to_string();
    url.set_path(if path.is_empty() { "/" } else { path.as_str() });
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}

fn geoserver_version(about: &XmlElement) -> Option<&str> {
    about
        .find_all("resource")
        .find(|resource| resource.attr("name") == Some("GeoServer"))
        .and_then(|resource| resource.find_text("Version"))
}

fn read_xml_response(response: ureq::Response, url: &Url) -> ApiResult<XmlElement> {
    let body = response.into_string().map_err(|err| {
        Error::new(ErrorKind::Io)
            .with_message("failed to read response body")
            .with_url(url.as_str())
            .with_source(err)
    })?;
    XmlElement::parse(&body).map_err(|err| err.with_url(url.as_str()))
}

fn parse_error_response(status: u16, response: ureq::Response, url: &Url) -> Error {
    let body = response.into_string().unwrap_or_default();
    let body = body.trim();
    let message = if body.is_empty() {
        format!("server returned status {status}")
    } else {
        body.chars().take(MAX_ERROR_BODY_CHARS).collect()
    };
    Error::new(error_kind_from_status(status))
        .with_message(message)
        .with_status(status)
        .with_url(url.as_str())
}

fn error_kind_from_status(status: u16) -> ErrorKind {
    match status {
        400 | 405 | 413 => ErrorKind::Usage,
        401 | 403 => ErrorKind::Permission,
        404 => ErrorKind::NotFound,
        409 => ErrorKind::AlreadyExists,
        500..=599 => ErrorKind::Internal,
        _ => ErrorKind::Io,
    }
}

#[cfg(test)]
mod tests {
    use super::{
        RestCatalog, error_kind_from_status, geoserver_version, normalize_service_url,
    };
    use crate::api::catalog::{Catalog, SaveMethod};
    use crate::api::resource::Resource;
    use crate::core::error::ErrorKind;
    use crate::core::fields::names;
    use crate::core::xml::XmlElement;

    #[test]
    fn normalize_service_url_keeps_path() {
        let url = normalize_service_url("http://localhost:8080/geoserver/rest/?x=1#top".to_string())
            .expect("url");
        assert_eq!(url.as_str(), "http://localhost:8080/geoserver/rest");
    }

    #[test]
    fn normalize_service_url_rejects_other_schemes() {
        let err = normalize_service_url("ftp://localhost/geoserver".to_string()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
        let err = normalize_service_url("not a url".to_string()).expect_err("err");
        assert_eq!(err.kind(), ErrorKind::Usage);
    }

    #[test]
    fn geoserver_version_picks_geoserver_resource() {
        let about = XmlElement::parse(
            r#"<about>
                <resource name="GeoTools"><Version>28.0</Version></resource>
                <resource name="GeoServer"><Version>2.22.0</Version></resource>
            </about>"#,
        )
        .expect("about");
        assert_eq!(geoserver_version(&about), Some("2.22.0"));
        let empty = XmlElement::parse("<about/>").expect("about");
        assert_eq!(geoserver_version(&empty), None);
    }

    #[test]
    fn error_kind_maps_statuses() {
        assert_eq!(error_kind_from_status(400), ErrorKind::Usage);
        assert_eq!(error_kind_from_status(401), ErrorKind::Permission);
        assert_eq!(error_kind_from_status(404), ErrorKind::NotFound);
        assert_eq!(error_kind_from_status(409), ErrorKind::AlreadyExists);
        assert_eq!(error_kind_from_status(503), ErrorKind::Internal);
        assert_eq!(error_kind_from_status(302), ErrorKind::Io);
    }

    #[test]
    fn pinned_version_skips_lookup() {
        let catalog = RestCatalog::new("http://127.0.0.1:9/geoserver/rest")
            .expect("catalog")
            .with_gsversion("2.2.x");
        assert_eq!(catalog.gsversion().expect("version"), "2.2.x");
    }

    #[test]
    fn create_layer_group_targets_collection() {
        let catalog = RestCatalog::new("http://localhost:8080/geoserver/rest").expect("catalog");
        let group = catalog
            .create_layer_group("lg1", names(["l1", "l2"]), names(["s1"]), None)
            .expect("group");
        assert_eq!(group.save_method(), SaveMethod::Post);
        assert_eq!(
            group.href().expect("href").as_str(),
            "http://localhost:8080/geoserver/rest/layergroups?name=lg1"
        );
    }
}
