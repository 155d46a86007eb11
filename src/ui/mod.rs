//! Plain-text rendering of the board for the terminal.

mod dashboard;
mod timeline;

pub use dashboard::{render_audit, render_card, render_dashboard, render_lookups};
pub use timeline::{render_project, render_timeline, tier_marker};
