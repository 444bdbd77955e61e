//! Purpose: Library crate behind the `gsconfig` CLI.
//! Exports: `core` (errors, XML tree, field converters/writers) and `api` (catalog + resources).
//! Role: Typed bindings for GeoServer REST catalog resources, starting with layer groups.
//! Invariants: `core` is pure and does no I/O; `api` reaches the network only via `Catalog`.
pub mod api;
pub mod core;
