//! Terminal UI module using ratatui.
//!
//! - `render`: frame layout, title/filter/status bars and overlays
//! - `input`: keyboard event handling
//! - `styles`: color palette and text styles
//! - `panels`: per-resource panels (stations, weather, alerts, reports)

pub mod input;
pub mod panels;
pub mod render;
pub mod styles;
