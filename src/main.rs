//! Purpose: `gsconfig` CLI entry point for layer group inspection and editing.
//! Role: Binary crate root; parses args, runs commands, emits JSON on stdout.
//! Invariants: Non-interactive errors are emitted as JSON on stderr.
//! Invariants: Process exit code is derived from `api::to_exit_code`.
//! Invariants: `--dry-run` renders the request without any network access.
#![allow(clippy::result_large_err)]
use std::error::Error as StdError;
use std::io::{self, IsTerminal};

use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value, json};
use tracing_subscriber::EnvFilter;

mod layergroup_json;

use gsconfig::api::{
    BoundingBox, Error, ErrorKind, LayerGroup, NameList, Resource, RestCatalog, SaveRequest,
    names, to_exit_code,
};
use layergroup_json::layer_group_json;

const DEFAULT_SERVICE_URL: &str = "http://localhost:8080/geoserver/rest";

#[derive(Parser)]
#[command(
    name = "gsconfig",
    version,
    about = "Inspect and edit GeoServer layer groups through the REST catalog",
    arg_required_else_help = true
)]
struct Cli {
    #[arg(
        long,
        env = "GSCONFIG_URL",
        default_value = DEFAULT_SERVICE_URL,
        help = "REST service base URL"
    )]
    url: String,
    #[arg(
        long = "gs-version",
        value_name = "VERSION",
        help = "Assume this server version instead of querying about/version.xml"
    )]
    gs_version: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Layer group commands
    #[command(subcommand, name = "layergroup")]
    LayerGroup(LayerGroupCommand),
}

#[derive(Subcommand)]
enum LayerGroupCommand {
    /// Print a layer group as JSON
    Show { name: String },
    /// Create a layer group (POST)
    Create {
        name: String,
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long, help = "Print the request instead of sending it")]
        dry_run: bool,
    },
    /// Send changed fields of an existing layer group (PUT)
    Update {
        name: String,
        #[command(flatten)]
        fields: FieldArgs,
        #[arg(long, help = "Print the request instead of sending it")]
        dry_run: bool,
    },
}

#[derive(Args)]
struct FieldArgs {
    #[arg(long = "layer", value_name = "NAME", help = "Member layer or layer group (repeatable)")]
    layers: Vec<String>,
    #[arg(long = "style", value_name = "NAME", help = "Style per member, in order (repeatable)")]
    styles: Vec<String>,
    #[arg(long, value_name = "MINX,MAXX,MINY,MAXY[,CRS]", help = "Bounding box")]
    bounds: Option<BoundingBox>,
}

#[derive(Serialize)]
struct SaveRequestJson<'a> {
    method: &'static str,
    href: &'a str,
    body: &'a str,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();
    let exit_code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            emit_error(&err);
            to_exit_code(err.kind())
        }
    };
    std::process::exit(exit_code);
}

fn run(cli: Cli) -> Result<(), Error> {
    let mut catalog = RestCatalog::new(cli.url.as_str())?;
    if let Some(version) = cli.gs_version {
        catalog = catalog.with_gsversion(version);
    }

    match cli.command {
        Command::LayerGroup(LayerGroupCommand::Show { name }) => {
            let mut group = catalog.layer_group(name)?;
            let layers = group.layers()?;
            let styles = group.styles()?;
            let bounds = group.bounds()?;
            let href = group.href()?;
            emit_json(&layer_group_json(
                group.name(),
                href.as_str(),
                layers.as_ref(),
                styles.as_ref(),
                bounds.as_ref(),
            ))
        }
        Command::LayerGroup(LayerGroupCommand::Create {
            name,
            fields,
            dry_run,
        }) => {
            let layers = names(fields.layers);
            let styles = member_styles(fields.styles, layers.len());
            let mut group = catalog.create_layer_group(name, layers, styles, fields.bounds)?;
            if dry_run {
                return emit_save_request(&group.save_request()?);
            }
            group.save()?;
            let href = group.href()?;
            emit_json(&json!({ "created": { "name": group.name(), "href": href.as_str() } }))
        }
        Command::LayerGroup(LayerGroupCommand::Update {
            name,
            fields,
            dry_run,
        }) => {
            let mut group = catalog.layer_group(name)?;
            apply_fields(&mut group, fields)?;
            if dry_run {
                return emit_save_request(&group.save_request()?);
            }
            let href = group.href()?;
            group.save()?;
            emit_json(&json!({ "updated": { "name": group.name(), "href": href.as_str() } }))
        }
    }
}

// Members without an explicit style use the server default (an empty `<style/>`).
fn member_styles(styles: Vec<String>, member_count: usize) -> NameList {
    let mut styles = names(styles);
    if styles.len() < member_count {
        styles.resize(member_count, None);
    }
    styles
}

fn apply_fields(group: &mut LayerGroup<'_>, fields: FieldArgs) -> Result<(), Error> {
    if !fields.layers.is_empty() {
        let layers = names(fields.layers);
        let styles = member_styles(fields.styles, layers.len());
        group.set_layers(layers);
        group.set_styles(styles);
    } else if !fields.styles.is_empty() {
        group.set_styles(names(fields.styles));
    }
    if let Some(bounds) = fields.bounds {
        group.set_bounds(bounds);
    }
    if !group.is_dirty() {
        return Err(Error::new(ErrorKind::Usage)
            .with_message("nothing to update")
            .with_hint("Pass --layer, --style, or --bounds."));
    }
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(false)
        .with_writer(io::stderr)
        .try_init();
}

fn emit_save_request(request: &SaveRequest) -> Result<(), Error> {
    let value = SaveRequestJson {
        method: request.method.as_str(),
        href: request.href.as_str(),
        body: &request.body,
    };
    let value = serde_json::to_value(&value).map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode json")
            .with_source(err)
    })?;
    emit_json(&value)
}

fn emit_json(value: &Value) -> Result<(), Error> {
    let text = if io::stdout().is_terminal() {
        serde_json::to_string_pretty(value)
    } else {
        serde_json::to_string(value)
    }
    .map_err(|err| {
        Error::new(ErrorKind::Internal)
            .with_message("failed to encode json")
            .with_source(err)
    })?;
    println!("{text}");
    Ok(())
}

fn emit_error(err: &Error) {
    if io::stderr().is_terminal() {
        eprintln!("{}", error_text(err));
        return;
    }
    let value = error_json(err);
    let json = serde_json::to_string(&value).unwrap_or_else(|_| {
        "{\"error\":{\"kind\":\"Internal\",\"message\":\"json encode failed\"}}".to_string()
    });
    eprintln!("{json}");
}

fn error_message(err: &Error) -> String {
    err.message()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{:?}", err.kind()))
}

fn error_causes(err: &Error) -> Vec<String> {
    let mut causes = Vec::new();
    let mut current = StdError::source(err);
    while let Some(cause) = current {
        causes.push(cause.to_string());
        current = cause.source();
    }
    causes
}

fn error_json(err: &Error) -> Value {
    let mut inner = Map::new();
    inner.insert("kind".to_string(), json!(format!("{:?}", err.kind())));
    inner.insert("message".to_string(), json!(error_message(err)));
    if let Some(hint) = err.hint() {
        inner.insert("hint".to_string(), json!(hint));
    }
    if let Some(resource) = err.resource() {
        inner.insert("resource".to_string(), json!(resource));
    }
    if let Some(status) = err.status() {
        inner.insert("status".to_string(), json!(status));
    }
    if let Some(url) = err.url() {
        inner.insert("url".to_string(), json!(url));
    }
    let causes = error_causes(err);
    if !causes.is_empty() {
        inner.insert("causes".to_string(), json!(causes));
    }

    let mut outer = Map::new();
    outer.insert("error".to_string(), Value::Object(inner));
    Value::Object(outer)
}

fn error_text(err: &Error) -> String {
    let mut lines = vec![format!("error: {}", error_message(err))];
    if let Some(hint) = err.hint() {
        lines.push(format!("hint: {hint}"));
    }
    if let Some(resource) = err.resource() {
        lines.push(format!("resource: {resource}"));
    }
    if let Some(status) = err.status() {
        lines.push(format!("status: {status}"));
    }
    if let Some(url) = err.url() {
        lines.push(format!("url: {url}"));
    }
    for cause in error_causes(err) {
        lines.push(format!("caused by: {cause}"));
    }
    lines.join("\n")
}
