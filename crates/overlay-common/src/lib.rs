//! Common types shared across the grid-overlay crates.

pub mod bbox;
pub mod color;

pub use bbox::BoundingBox;
pub use color::Color;
