pub mod board;
pub mod db;
pub mod forms;
pub mod timeline;
