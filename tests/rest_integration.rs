//! Purpose: End-to-end tests for `RestCatalog` against a loopback HTTP server.
//! Role: Validate version discovery, vocabulary selection, and save requests over TCP.
//! Invariants: The server answers a fixed script of canned responses, one per connection.
//! Invariants: Every request the client makes is recorded for assertions.

use std::io::{BufRead, BufReader, Read, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use gsconfig::api::{Catalog, ErrorKind, LEGACY_GSVERSION, Resource, RestCatalog, names};

type TestResult<T> = Result<T, Box<dyn std::error::Error>>;

const CURRENT_DOC: &str = r#"<layerGroup>
  <name>basemap</name>
  <mode>SINGLE</mode>
  <publishables>
    <published type="layer"><name>topp:roads</name></published>
    <published type="layerGroup"><name>water</name></published>
  </publishables>
  <styles><style><name>line</name></style><style/></styles>
  <bounds><minx>-10</minx><maxx>10</maxx><miny>-5</miny><maxy>5</maxy><crs>EPSG:4326</crs></bounds>
</layerGroup>"#;

const LEGACY_DOC: &str = r#"<layerGroup>
  <name>basemap</name>
  <layers><layer><name>topp:roads</name></layer><layer><name>water</name></layer></layers>
  <styles><style><name>line</name></style><style/></styles>
</layerGroup>"#;

const VERSION_DOC: &str = r#"<about>
  <resource name="GeoServer"><Build-Timestamp>01-Jan-2024</Build-Timestamp><Version>2.24.1</Version></resource>
  <resource name="GeoTools"><Version>30.1</Version></resource>
</about>"#;

#[derive(Clone, Debug)]
struct RecordedRequest {
    method: String,
    target: String,
    body: String,
}

struct CannedServer {
    service_url: String,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: JoinHandle<()>,
}

impl CannedServer {
    fn start(responses: Vec<(u16, &'static str)>) -> TestResult<Self> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let service_url = format!("http://{}/geoserver/rest", listener.local_addr()?);
        let requests = Arc::new(Mutex::new(Vec::new()));
        let recorded = Arc::clone(&requests);
        let handle = std::thread::spawn(move || {
            for (status, body) in responses {
                let (stream, _) = listener.accept().expect("accept");
                let request = read_request(&stream).expect("request");
                recorded.lock().expect("lock").push(request);
                write_response(&stream, status, body).expect("response");
            }
        });
        Ok(Self {
            service_url,
            requests,
            handle,
        })
    }

    fn finish(self) -> Vec<RecordedRequest> {
        self.handle.join().expect("server thread");
        let requests = self.requests.lock().expect("lock");
        requests.clone()
    }
}

fn read_request(stream: &std::net::TcpStream) -> std::io::Result<RecordedRequest> {
    let mut reader = BufReader::new(stream);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let target = parts.next().unwrap_or_default().to_string();

    let mut content_length = 0usize;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }
        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse().unwrap_or(0);
            }
        }
    }

    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body)?;
    Ok(RecordedRequest {
        method,
        target,
        body: String::from_utf8_lossy(&body).into_owned(),
    })
}

fn write_response(mut stream: &std::net::TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "Status",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Type: application/xml\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

#[test]
fn current_server_reads_publishables() -> TestResult<()> {
    let server = CannedServer::start(vec![(200, VERSION_DOC), (200, CURRENT_DOC)])?;
    let catalog = RestCatalog::new(server.service_url.clone())?;

    let mut group = catalog.layer_group("basemap")?;
    assert_eq!(group.layers()?, Some(names(["topp:roads", "water"])));
    assert_eq!(group.styles()?, Some(vec![Some("line".to_string()), None]));
    assert_eq!(group.bounds()?.map(|bounds| bounds.maxx), Some(10.0));
    assert_eq!(catalog.gsversion()?, "2.24.1");

    let requests = server.finish();
    let targets: Vec<_> = requests.iter().map(|request| request.target.as_str()).collect();
    assert_eq!(
        targets,
        [
            "/geoserver/rest/about/version.xml",
            "/geoserver/rest/layergroups/basemap.xml"
        ]
    );
    assert!(requests.iter().all(|request| request.method == "GET"));
    Ok(())
}

#[test]
fn server_without_version_resource_uses_legacy_vocabulary() -> TestResult<()> {
    let server = CannedServer::start(vec![(404, ""), (200, LEGACY_DOC)])?;
    let catalog = RestCatalog::new(server.service_url.clone())?;

    let mut group = catalog.layer_group("basemap")?;
    assert_eq!(group.layers()?, Some(names(["topp:roads", "water"])));
    assert_eq!(catalog.gsversion()?, LEGACY_GSVERSION);

    assert_eq!(server.finish().len(), 2);
    Ok(())
}

#[test]
fn save_puts_only_dirty_fields() -> TestResult<()> {
    let server = CannedServer::start(vec![(200, "")])?;
    let catalog = RestCatalog::new(server.service_url.clone())?.with_gsversion("2.24.1");

    let mut group = catalog.layer_group("basemap")?;
    group.set_styles(names(["polygon", "line"]));
    group.save()?;
    assert!(!group.is_dirty());

    let requests = server.finish();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "PUT");
    assert_eq!(requests[0].target, "/geoserver/rest/layergroups/basemap.xml");
    assert_eq!(
        requests[0].body,
        "<layerGroup><styles><style><name>polygon</name></style>\
         <style><name>line</name></style></styles></layerGroup>"
    );
    Ok(())
}

#[test]
fn create_posts_to_collection() -> TestResult<()> {
    let server = CannedServer::start(vec![(201, "lg1")])?;
    let catalog = RestCatalog::new(server.service_url.clone())?;

    let mut group = catalog.create_layer_group("lg1", names(["l1", "l2"]), names(["s1", "s2"]), None)?;
    group.save()?;
    assert!(group.is_persisted());
    assert!(group.href()?.as_str().ends_with("/geoserver/rest/layergroups/lg1.xml"));

    let requests = server.finish();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].method, "POST");
    assert_eq!(requests[0].target, "/geoserver/rest/layergroups?name=lg1");
    assert!(requests[0].body.starts_with("<layerGroup><name>lg1</name><layers>"));
    assert!(requests[0].body.contains("<minx>-180</minx>"));
    Ok(())
}

#[test]
fn missing_layer_group_maps_to_not_found() -> TestResult<()> {
    let server = CannedServer::start(vec![(404, "No such layer group: ghost")])?;
    let catalog = RestCatalog::new(server.service_url.clone())?.with_gsversion("2.24.1");

    let mut group = catalog.layer_group("ghost")?;
    let err = group.layers().expect_err("missing");
    assert_eq!(err.kind(), ErrorKind::NotFound);
    assert_eq!(err.status(), Some(404));
    assert_eq!(err.resource(), Some("ghost"));
    assert_eq!(err.message(), Some("No such layer group: ghost"));

    server.finish();
    Ok(())
}

#[test]
fn server_error_on_save_keeps_dirty_fields() -> TestResult<()> {
    let server = CannedServer::start(vec![(500, "boom")])?;
    let catalog = RestCatalog::new(server.service_url.clone())?.with_gsversion("2.24.1");

    let mut group = catalog.layer_group("basemap")?;
    group.set_layers(names(["roads"]));
    let err = group.save().expect_err("server error");
    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(group.is_dirty());
    assert_eq!(group.layers()?, Some(names(["roads"])));

    server.finish();
    Ok(())
}
