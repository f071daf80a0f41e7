use super::constant_pool::{Constant, ConstantPool};
use super::descriptor::{class_constant, referenced_classes};
use super::{ByteReader, ClassParseError};
use crate::domain::location::Location;
use crate::domain::ports::{AccessFlags, ClassDescriptor};
use std::collections::BTreeSet;

const ACC_PUBLIC: u16 = 0x0001;
const ACC_PROTECTED: u16 = 0x0004;

/// Collects referenced class names in first-seen order, once each.
#[derive(Default)]
struct References {
    seen: BTreeSet<String>,
    ordered: Vec<Location>,
}

impl References {
    fn add(&mut self, internal_name: String) {
        if self.seen.insert(internal_name.clone()) {
            self.ordered.push(Location::new(internal_name));
        }
    }

    fn add_signature(&mut self, signature: &str) -> Result<(), ClassParseError> {
        for name in referenced_classes(signature)? {
            self.add(name);
        }
        Ok(())
    }

    fn add_class_constant(&mut self, pool: &ConstantPool, index: u16) -> Result<(), ClassParseError> {
        if let Some(name) = class_constant(pool.class_name(index)?)? {
            self.add(name);
        }
        Ok(())
    }

    fn into_locations(self, this: &Location) -> Vec<Location> {
        self.ordered.into_iter().filter(|l| l != this).collect()
    }
}

struct Member {
    access_flags: u16,
    descriptor: String,
    signature: Option<String>,
    exceptions: Vec<u16>,
}

impl Member {
    fn is_api(&self) -> bool {
        self.access_flags & (ACC_PUBLIC | ACC_PROTECTED) != 0
    }
}

pub fn parse_class(bytes: &[u8]) -> Result<ClassDescriptor, ClassParseError> {
    let mut reader = ByteReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let pool = ConstantPool::parse(&mut reader)?;

    let access_flags = reader.read_u2()?;
    let this_class = reader.read_u2()?;
    let super_class = reader.read_u2()?;
    let interfaces_count = reader.read_u2()?;
    let mut interfaces = Vec::with_capacity(interfaces_count as usize);
    for _ in 0..interfaces_count {
        interfaces.push(reader.read_u2()?);
    }

    let mut members = Vec::new();
    for _ in 0..2 {
        let count = reader.read_u2()?;
        for _ in 0..count {
            members.push(read_member(&mut reader, &pool)?);
        }
    }

    let mut class_signature = None;
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let body = reader.read_slice(length)?;
        if pool.utf8(name_index)? == "Signature" {
            class_signature = Some(signature_of(body, &pool)?);
        }
    }

    let name = Location::new(pool.class_name(this_class)?);
    if access_flags & AccessFlags::ACC_MODULE != 0 {
        return Ok(ClassDescriptor {
            name,
            access_flags: AccessFlags(access_flags),
            dependencies: Vec::new(),
            api_dependencies: Vec::new(),
        });
    }

    let mut api = References::default();
    if super_class != 0 {
        api.add_class_constant(&pool, super_class)?;
    }
    for index in &interfaces {
        api.add_class_constant(&pool, *index)?;
    }
    if let Some(signature) = &class_signature {
        api.add_signature(signature)?;
    }
    for member in members.iter().filter(|m| m.is_api()) {
        api.add_signature(&member.descriptor)?;
        if let Some(signature) = &member.signature {
            api.add_signature(signature)?;
        }
        for index in &member.exceptions {
            api.add_class_constant(&pool, *index)?;
        }
    }

    let mut all = References::default();
    for (index, constant) in pool.entries().iter().enumerate() {
        match constant {
            Constant::Class { .. } if index != this_class as usize => {
                all.add_class_constant(&pool, index as u16)?;
            }
            Constant::NameAndType { descriptor_index }
            | Constant::MethodType { descriptor_index } => {
                all.add_signature(pool.utf8(*descriptor_index)?)?;
            }
            _ => {}
        }
    }
    for member in &members {
        all.add_signature(&member.descriptor)?;
        if let Some(signature) = &member.signature {
            all.add_signature(signature)?;
        }
    }
    if let Some(signature) = &class_signature {
        all.add_signature(signature)?;
    }

    Ok(ClassDescriptor {
        dependencies: all.into_locations(&name),
        api_dependencies: api.into_locations(&name),
        access_flags: AccessFlags(access_flags),
        name,
    })
}

fn read_member(reader: &mut ByteReader<'_>, pool: &ConstantPool) -> Result<Member, ClassParseError> {
    let access_flags = reader.read_u2()?;
    let _name_index = reader.read_u2()?;
    let descriptor = pool.utf8(reader.read_u2()?)?.to_string();
    let mut member = Member {
        access_flags,
        descriptor,
        signature: None,
        exceptions: Vec::new(),
    };
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let body = reader.read_slice(length)?;
        match pool.utf8(name_index)? {
            "Signature" => member.signature = Some(signature_of(body, pool)?),
            "Exceptions" => {
                let mut attr = ByteReader::new(body);
                let count = attr.read_u2()?;
                for _ in 0..count {
                    member.exceptions.push(attr.read_u2()?);
                }
            }
            _ => {}
        }
    }
    Ok(member)
}

fn signature_of(body: &[u8], pool: &ConstantPool) -> Result<String, ClassParseError> {
    let mut attr = ByteReader::new(body);
    Ok(pool.utf8(attr.read_u2()?)?.to_string())
}
