//! Byte-level class-file builder for reader tests.

use std::collections::HashMap;

#[derive(Default)]
struct PoolBuilder {
    entries: Vec<Vec<u8>>,
    index: HashMap<Vec<u8>, u16>,
}

impl PoolBuilder {
    fn add(&mut self, entry: Vec<u8>) -> u16 {
        if let Some(index) = self.index.get(&entry) {
            return *index;
        }
        self.entries.push(entry.clone());
        let index = self.entries.len() as u16;
        self.index.insert(entry, index);
        index
    }

    fn utf8(&mut self, value: &str) -> u16 {
        let mut entry = vec![1];
        entry.extend((value.len() as u16).to_be_bytes());
        entry.extend(value.as_bytes());
        self.add(entry)
    }

    fn tagged(&mut self, tag: u8, value: &str) -> u16 {
        let name = self.utf8(value);
        let mut entry = vec![tag];
        entry.extend(name.to_be_bytes());
        self.add(entry)
    }

    fn class(&mut self, name: &str) -> u16 {
        self.tagged(7, name)
    }

    fn module(&mut self, name: &str) -> u16 {
        self.tagged(19, name)
    }

    fn package(&mut self, name: &str) -> u16 {
        self.tagged(20, name)
    }

    fn write(&self, out: &mut Vec<u8>) {
        out.extend((self.entries.len() as u16 + 1).to_be_bytes());
        for entry in &self.entries {
            out.extend(entry);
        }
    }
}

struct MemberSpec {
    access: u16,
    descriptor: String,
    signature: Option<String>,
    exceptions: Vec<String>,
}

pub(crate) struct ModuleAttribute {
    pub name: String,
    pub open: bool,
    pub requires: Vec<(String, u16)>,
    pub exports: Vec<(String, Vec<String>)>,
    pub opens: Vec<(String, Vec<String>)>,
    pub uses: Vec<String>,
    pub provides: Vec<(String, Vec<String>)>,
    pub packages: Vec<String>,
}

pub(crate) struct ClassFileBuilder {
    name: String,
    access: u16,
    super_class: Option<String>,
    interfaces: Vec<String>,
    fields: Vec<MemberSpec>,
    methods: Vec<MemberSpec>,
    module: Option<ModuleAttribute>,
}

fn u2(out: &mut Vec<u8>, value: u16) {
    out.extend(value.to_be_bytes());
}

fn attribute(out: &mut Vec<u8>, name: u16, body: &[u8]) {
    u2(out, name);
    out.extend((body.len() as u32).to_be_bytes());
    out.extend(body);
}

impl ClassFileBuilder {
    pub(crate) fn new(name: &str, access: u16) -> Self {
        Self {
            name: name.to_string(),
            access,
            super_class: None,
            interfaces: Vec::new(),
            fields: Vec::new(),
            methods: Vec::new(),
            module: None,
        }
    }

    pub(crate) fn module_info(module: &ModuleAttribute) -> Vec<u8> {
        let mut builder = Self::new("module-info", 0x8000);
        builder.module = Some(ModuleAttribute {
            name: module.name.clone(),
            open: module.open,
            requires: module.requires.clone(),
            exports: module.exports.clone(),
            opens: module.opens.clone(),
            uses: module.uses.clone(),
            provides: module.provides.clone(),
            packages: module.packages.clone(),
        });
        builder.build()
    }

    pub(crate) fn super_class(mut self, name: &str) -> Self {
        self.super_class = Some(name.to_string());
        self
    }

    pub(crate) fn interface(mut self, name: &str) -> Self {
        self.interfaces.push(name.to_string());
        self
    }

    pub(crate) fn field(mut self, access: u16, descriptor: &str, signature: Option<&str>) -> Self {
        self.fields.push(MemberSpec {
            access,
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            exceptions: Vec::new(),
        });
        self
    }

    pub(crate) fn method(
        mut self,
        access: u16,
        descriptor: &str,
        signature: Option<&str>,
        exceptions: &[&str],
    ) -> Self {
        self.methods.push(MemberSpec {
            access,
            descriptor: descriptor.to_string(),
            signature: signature.map(str::to_string),
            exceptions: exceptions.iter().map(|s| s.to_string()).collect(),
        });
        self
    }

    pub(crate) fn build(&self) -> Vec<u8> {
        let mut pool = PoolBuilder::default();
        let mut body = Vec::new();

        u2(&mut body, self.access);
        u2(&mut body, pool.class(&self.name));
        let super_index = self.super_class.as_deref().map(|s| pool.class(s)).unwrap_or(0);
        u2(&mut body, super_index);
        u2(&mut body, self.interfaces.len() as u16);
        for interface in &self.interfaces {
            u2(&mut body, pool.class(interface));
        }

        for (prefix, members) in [("f", &self.fields), ("m", &self.methods)] {
            u2(&mut body, members.len() as u16);
            for (i, member) in members.iter().enumerate() {
                u2(&mut body, member.access);
                u2(&mut body, pool.utf8(&format!("{prefix}{i}")));
                u2(&mut body, pool.utf8(&member.descriptor));
                let mut attributes = Vec::new();
                let mut count = 0;
                if let Some(signature) = &member.signature {
                    let name = pool.utf8("Signature");
                    let value = pool.utf8(signature);
                    attribute(&mut attributes, name, &value.to_be_bytes());
                    count += 1;
                }
                if !member.exceptions.is_empty() {
                    let name = pool.utf8("Exceptions");
                    let mut exceptions = Vec::new();
                    u2(&mut exceptions, member.exceptions.len() as u16);
                    for exception in &member.exceptions {
                        u2(&mut exceptions, pool.class(exception));
                    }
                    attribute(&mut attributes, name, &exceptions);
                    count += 1;
                }
                u2(&mut body, count);
                body.extend(attributes);
            }
        }

        let mut attributes = Vec::new();
        let mut count = 0u16;
        if let Some(module) = &self.module {
            let name = pool.utf8("Module");
            let mut attr = Vec::new();
            u2(&mut attr, pool.module(&module.name));
            u2(&mut attr, if module.open { 0x0020 } else { 0 });
            u2(&mut attr, 0);
            u2(&mut attr, module.requires.len() as u16);
            for (requires, flags) in &module.requires {
                u2(&mut attr, pool.module(requires));
                u2(&mut attr, *flags);
                u2(&mut attr, 0);
            }
            for directives in [&module.exports, &module.opens] {
                u2(&mut attr, directives.len() as u16);
                for (package, targets) in directives {
                    u2(&mut attr, pool.package(package));
                    u2(&mut attr, 0);
                    u2(&mut attr, targets.len() as u16);
                    for target in targets {
                        u2(&mut attr, pool.module(target));
                    }
                }
            }
            u2(&mut attr, module.uses.len() as u16);
            for service in &module.uses {
                u2(&mut attr, pool.class(service));
            }
            u2(&mut attr, module.provides.len() as u16);
            for (service, providers) in &module.provides {
                u2(&mut attr, pool.class(service));
                u2(&mut attr, providers.len() as u16);
                for provider in providers {
                    u2(&mut attr, pool.class(provider));
                }
            }
            attribute(&mut attributes, name, &attr);
            count += 1;

            if !module.packages.is_empty() {
                let name = pool.utf8("ModulePackages");
                let mut attr = Vec::new();
                u2(&mut attr, module.packages.len() as u16);
                for package in &module.packages {
                    u2(&mut attr, pool.package(package));
                }
                attribute(&mut attributes, name, &attr);
                count += 1;
            }
        }
        u2(&mut body, count);
        body.extend(attributes);

        let mut out = vec![0xCA, 0xFE, 0xBA, 0xBE, 0, 0, 0, 61];
        pool.write(&mut out);
        out.extend(body);
        out
    }
}
