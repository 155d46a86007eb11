pub mod config;
pub mod core;
pub mod error;
pub mod logging;
pub mod ui;

pub use config::{Config, ReorderMode};
pub use core::board::Board;
pub use core::db::BoardDb;
pub use core::timeline::ProjectTimeline;
pub use error::{Error, Result, ValidationError};
