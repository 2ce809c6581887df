pub mod arguments;
pub mod bumper;
pub mod config;
pub mod format;
pub mod formatting;
pub mod parsers;
pub mod path;
pub mod selector;
pub mod targets;
