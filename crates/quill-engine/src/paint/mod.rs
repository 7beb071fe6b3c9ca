//! Paint model: color representation (linear premultiplied alpha) and parsing of
//! the color forms stroke settings arrive in.

pub mod color;

pub use color::{Color, ColorParseError};
