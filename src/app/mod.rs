pub mod deps;
pub mod dto;
pub mod inverse;
pub mod module_analyzer;
pub mod module_graph;
