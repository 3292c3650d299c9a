//! Utility modules: developer logging, JSON conversion, numeric coercion.
pub mod devlog;
pub mod json;
pub mod num;
