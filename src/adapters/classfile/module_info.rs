use super::constant_pool::ConstantPool;
use super::descriptor::class_constant;
use super::{ByteReader, ClassParseError};
use crate::domain::module::{Exports, ModuleDescriptor, Provides, Requires, RequiresModifier};

const ACC_OPEN: u16 = 0x0020;
const ACC_TRANSITIVE: u16 = 0x0020;
const ACC_STATIC_PHASE: u16 = 0x0040;
const ACC_SYNTHETIC: u16 = 0x1000;
const ACC_MANDATED: u16 = 0x8000;

pub fn parse_module_info(bytes: &[u8]) -> Result<ModuleDescriptor, ClassParseError> {
    let mut reader = ByteReader::new(bytes);
    reader.expect_magic()?;
    let _minor_version = reader.read_u2()?;
    let _major_version = reader.read_u2()?;
    let pool = ConstantPool::parse(&mut reader)?;

    let _access_flags = reader.read_u2()?;
    let _this_class = reader.read_u2()?;
    let _super_class = reader.read_u2()?;
    let interfaces_count = reader.read_u2()?;
    reader.skip(interfaces_count as usize * 2)?;
    for _ in 0..2 {
        let count = reader.read_u2()?;
        for _ in 0..count {
            reader.skip(6)?;
            let attributes = reader.read_u2()?;
            skip_attributes(&mut reader, attributes)?;
        }
    }

    let mut descriptor = None;
    let mut packages = Vec::new();
    let attributes_count = reader.read_u2()?;
    for _ in 0..attributes_count {
        let name_index = reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        let body = reader.read_slice(length)?;
        match pool.utf8(name_index)? {
            "Module" => descriptor = Some(read_module_attribute(body, &pool)?),
            "ModulePackages" => {
                let mut attr = ByteReader::new(body);
                let count = attr.read_u2()?;
                for _ in 0..count {
                    packages.push(pool.package_name(attr.read_u2()?)?);
                }
            }
            _ => {}
        }
    }

    let mut descriptor = descriptor.ok_or(ClassParseError::MissingModuleAttribute)?;
    descriptor.packages.extend(packages);
    let declared: Vec<String> = descriptor
        .exports
        .iter()
        .chain(&descriptor.opens)
        .map(|e| e.source.clone())
        .collect();
    descriptor.packages.extend(declared);
    Ok(descriptor)
}

fn read_module_attribute(body: &[u8], pool: &ConstantPool) -> Result<ModuleDescriptor, ClassParseError> {
    let mut attr = ByteReader::new(body);
    let mut descriptor = ModuleDescriptor::new(pool.module_name(attr.read_u2()?)?);
    descriptor.is_open = attr.read_u2()? & ACC_OPEN != 0;
    let _version_index = attr.read_u2()?;

    let requires_count = attr.read_u2()?;
    for _ in 0..requires_count {
        let mut requires = Requires::new(pool.module_name(attr.read_u2()?)?);
        let flags = attr.read_u2()?;
        let _version_index = attr.read_u2()?;
        for (flag, modifier) in [
            (ACC_TRANSITIVE, RequiresModifier::Transitive),
            (ACC_STATIC_PHASE, RequiresModifier::Static),
            (ACC_SYNTHETIC, RequiresModifier::Synthetic),
            (ACC_MANDATED, RequiresModifier::Mandated),
        ] {
            if flags & flag != 0 {
                requires.modifiers.insert(modifier);
            }
        }
        descriptor.requires.push(requires);
    }

    for target in [&mut descriptor.exports, &mut descriptor.opens] {
        let count = attr.read_u2()?;
        for _ in 0..count {
            let mut exports = Exports::new(pool.package_name(attr.read_u2()?)?);
            let _flags = attr.read_u2()?;
            let to_count = attr.read_u2()?;
            for _ in 0..to_count {
                exports.targets.insert(pool.module_name(attr.read_u2()?)?.to_string());
            }
            target.push(exports);
        }
    }

    let uses_count = attr.read_u2()?;
    for _ in 0..uses_count {
        if let Some(service) = class_constant(pool.class_name(attr.read_u2()?)?)? {
            descriptor.uses.insert(service.replace('/', "."));
        }
    }

    let provides_count = attr.read_u2()?;
    for _ in 0..provides_count {
        let service = pool.class_name(attr.read_u2()?)?.replace('/', ".");
        let with_count = attr.read_u2()?;
        let mut providers = Vec::with_capacity(with_count as usize);
        for _ in 0..with_count {
            providers.push(pool.class_name(attr.read_u2()?)?.replace('/', "."));
        }
        descriptor.provides.push(Provides { service, providers });
    }
    Ok(descriptor)
}

fn skip_attributes(reader: &mut ByteReader<'_>, count: u16) -> Result<(), ClassParseError> {
    for _ in 0..count {
        reader.read_u2()?;
        let length = reader.read_u4()? as usize;
        reader.skip(length)?;
    }
    Ok(())
}
