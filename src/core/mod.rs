pub mod bbox;
pub mod error;
pub mod fields;
pub mod xml;
