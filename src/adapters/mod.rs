pub mod classfile;
pub mod resolver;
pub mod source;
