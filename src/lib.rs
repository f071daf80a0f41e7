//! jdeps library: class, package and module dependency analysis of
//! compiled Java archives.

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
