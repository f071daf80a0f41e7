pub mod analyzer;
pub mod archive;
pub mod config;
pub mod error;
pub mod filter;
pub mod finder;
pub mod graph;
pub mod internals;
pub mod location;
pub mod module;
pub mod ports;
