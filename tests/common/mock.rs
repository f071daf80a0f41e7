//! Mock implementations for integration tests.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::atomic::{AtomicUsize, Ordering};

use anyhow::{Result, anyhow, bail};
use jdeps::domain::location::Location;
use jdeps::domain::module::{Exports, ModuleDescriptor, Provides, Requires, RequiresModifier};
use jdeps::domain::ports::{AccessFlags, ClassDescriptor, ClassReader};

/// Reads a line-oriented text stand-in for class files.
///
/// Classes:
/// ```text
/// class p.A public
/// dep q.B        # referenced anywhere
/// api q.C        # referenced from the public surface (implies dep)
/// ```
/// Module descriptors:
/// ```text
/// module m [open]
/// requires n [transitive] [static]
/// exports p [to a b]
/// opens p
/// uses p.S
/// provides p.S with p.Impl
/// packages p q
/// ```
/// Any input containing `corrupt` fails to parse.
pub struct MockClassReader {
    class_reads: AtomicUsize,
}

impl MockClassReader {
    pub fn new() -> Self {
        Self {
            class_reads: AtomicUsize::new(0),
        }
    }

    /// Number of `read_class` calls so far.
    pub fn class_reads(&self) -> usize {
        self.class_reads.load(Ordering::SeqCst)
    }
}

impl Default for MockClassReader {
    fn default() -> Self {
        Self::new()
    }
}

fn text(bytes: &[u8]) -> Result<&str> {
    let text = std::str::from_utf8(bytes)?;
    if text.contains("corrupt") {
        bail!("corrupt class file");
    }
    Ok(text)
}

impl ClassReader for MockClassReader {
    fn read_class(&self, bytes: &[u8]) -> Result<ClassDescriptor> {
        self.class_reads.fetch_add(1, Ordering::SeqCst);
        let text = text(bytes)?;
        if text.trim_start().starts_with("module ") {
            return Ok(ClassDescriptor {
                name: Location::new("module-info"),
                access_flags: AccessFlags(AccessFlags::ACC_MODULE),
                dependencies: Vec::new(),
                api_dependencies: Vec::new(),
            });
        }

        let mut name = None;
        let mut flags = 0;
        let mut dependencies = Vec::new();
        let mut api_dependencies = Vec::new();
        for line in text.lines() {
            let words: Vec<&str> = line.split_whitespace().collect();
            match words.as_slice() {
                ["class", cn, modifiers @ ..] => {
                    name = Some(Location::new(cn));
                    if modifiers.contains(&"public") {
                        flags |= AccessFlags::ACC_PUBLIC;
                    }
                    if modifiers.contains(&"interface") {
                        flags |= AccessFlags::ACC_INTERFACE;
                    }
                }
                ["dep", cn] => dependencies.push(Location::new(cn)),
                ["api", cn] => {
                    dependencies.push(Location::new(cn));
                    api_dependencies.push(Location::new(cn));
                }
                [] => {}
                other => bail!("unexpected line: {}", other.join(" ")),
            }
        }
        Ok(ClassDescriptor {
            name: name.ok_or_else(|| anyhow!("missing class line"))?,
            access_flags: AccessFlags(flags),
            dependencies,
            api_dependencies,
        })
    }

    fn read_module(&self, bytes: &[u8]) -> Result<ModuleDescriptor> {
        let text = text(bytes)?;
        let mut descriptor: Option<ModuleDescriptor> = None;
        for line in text.lines() {
            let words: Vec<&str> = line.split_whitespace().collect();
            if let ["module", name, rest @ ..] = words.as_slice() {
                let mut md = ModuleDescriptor::new(*name);
                md.is_open = rest.contains(&"open");
                descriptor = Some(md);
                continue;
            }
            let md = descriptor
                .as_mut()
                .ok_or_else(|| anyhow!("module line must come first"))?;
            match words.as_slice() {
                ["requires", name, modifiers @ ..] => {
                    let mut requires = Requires::new(*name);
                    for m in modifiers {
                        requires = requires.with_modifier(match *m {
                            "transitive" => RequiresModifier::Transitive,
                            "static" => RequiresModifier::Static,
                            other => bail!("unknown modifier {other}"),
                        });
                    }
                    md.requires.push(requires);
                }
                ["exports", pn, "to", targets @ ..] => {
                    let mut exports = Exports::new(*pn);
                    for t in targets {
                        exports = exports.to(*t);
                    }
                    md.packages.insert(pn.to_string());
                    md.exports.push(exports);
                }
                ["exports", pn] => {
                    md.packages.insert(pn.to_string());
                    md.exports.push(Exports::new(*pn));
                }
                ["opens", pn] => {
                    md.packages.insert(pn.to_string());
                    md.opens.push(Exports::new(*pn));
                }
                ["uses", service] => {
                    md.uses.insert(service.to_string());
                }
                ["provides", service, "with", providers @ ..] => md.provides.push(Provides {
                    service: service.to_string(),
                    providers: providers.iter().map(|p| p.to_string()).collect(),
                }),
                ["packages", packages @ ..] => {
                    md.packages.extend(packages.iter().map(|p| p.to_string()))
                }
                [] => {}
                other => bail!("unexpected line: {}", other.join(" ")),
            }
        }
        descriptor.ok_or_else(|| anyhow!("missing module line"))
    }
}

/// Class text for [`MockClassReader`].
pub fn class_text(name: &str, public: bool, deps: &[&str], api: &[&str]) -> String {
    let mut text = format!("class {name}{}\n", if public { " public" } else { "" });
    for d in deps {
        text.push_str(&format!("dep {d}\n"));
    }
    for a in api {
        text.push_str(&format!("api {a}\n"));
    }
    text
}

pub fn package_set(packages: &[&str]) -> BTreeSet<String> {
    packages.iter().map(|p| p.to_string()).collect()
}
