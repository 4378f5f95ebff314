//! Output views of game state
//!
//! Read-only: nothing here mutates a session or its log.

pub mod map_image;
pub mod report;

pub use map_image::{export_png, render_snapshot};
pub use report::{describe_event, format_history, format_standings};
