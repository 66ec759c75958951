//! Rule builder: IF / ELSE IF / ELSE decision rules over nested boolean
//! condition trees, with drag-and-drop reordering and JSON documents.

pub mod application;
pub mod cli;
pub mod config;
pub mod domain;
pub mod exitcode;
pub mod infrastructure;
pub mod util;
