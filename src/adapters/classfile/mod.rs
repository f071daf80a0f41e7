//! JVM class-file reader: the default [`ClassReader`] adapter.

pub mod constant_pool;
pub mod descriptor;
pub mod module_info;
pub mod reader;

#[cfg(test)]
pub(crate) mod testing;

use crate::domain::module::ModuleDescriptor;
use crate::domain::ports::{ClassDescriptor, ClassReader};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClassParseError {
    #[error("unexpected end of class file")]
    UnexpectedEof,
    #[error("invalid class file magic header")]
    InvalidMagic,
    #[error("unsupported constant pool tag {tag}")]
    UnsupportedConstant { tag: u8 },
    #[error("invalid constant pool index {index}")]
    InvalidConstantIndex { index: u16 },
    #[error("malformed descriptor: {0}")]
    InvalidDescriptor(String),
    #[error("module-info has no Module attribute")]
    MissingModuleAttribute,
}

/// Reads dependencies from the constant pool, member descriptors and
/// signature attributes of a class file.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClassFileReader;

impl ClassFileReader {
    pub fn new() -> Self {
        Self
    }
}

impl ClassReader for ClassFileReader {
    fn read_class(&self, bytes: &[u8]) -> anyhow::Result<ClassDescriptor> {
        Ok(reader::parse_class(bytes)?)
    }

    fn read_module(&self, bytes: &[u8]) -> anyhow::Result<ModuleDescriptor> {
        Ok(module_info::parse_module_info(bytes)?)
    }
}

pub(crate) struct ByteReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> ByteReader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn expect_magic(&mut self) -> Result<(), ClassParseError> {
        const MAGIC: u32 = 0xCAFE_BABE;
        if self.read_u4()? != MAGIC {
            return Err(ClassParseError::InvalidMagic);
        }
        Ok(())
    }

    pub(crate) fn read_u1(&mut self) -> Result<u8, ClassParseError> {
        let value = *self.data.get(self.pos).ok_or(ClassParseError::UnexpectedEof)?;
        self.pos += 1;
        Ok(value)
    }

    pub(crate) fn read_u2(&mut self) -> Result<u16, ClassParseError> {
        let bytes = self.read_slice(2)?;
        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u4(&mut self) -> Result<u32, ClassParseError> {
        let bytes = self.read_slice(4)?;
        Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_slice(&mut self, len: usize) -> Result<&'a [u8], ClassParseError> {
        let end = self.pos.checked_add(len).ok_or(ClassParseError::UnexpectedEof)?;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(ClassParseError::UnexpectedEof)?;
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<(), ClassParseError> {
        self.read_slice(len).map(|_| ())
    }
}
