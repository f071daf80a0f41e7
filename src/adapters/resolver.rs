use crate::domain::error::JdepsError;
use crate::domain::module::ModuleDescriptor;
use crate::domain::ports::ModuleResolver;
use anyhow::Result;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Resolves the requires-closure of the root modules.
///
/// A missing root or a missing non-static requires fails resolution;
/// `requires static` and mandated dependences may be absent.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequiresResolver;

impl ModuleResolver for RequiresResolver {
    fn resolve(
        &self,
        roots: &[String],
        descriptors: &BTreeMap<String, ModuleDescriptor>,
    ) -> Result<BTreeSet<String>> {
        let mut resolved = BTreeSet::new();
        let mut queue: VecDeque<&str> = VecDeque::new();
        for root in roots {
            if !descriptors.contains_key(root) {
                return Err(JdepsError::ModuleNotFound(root.clone()).into());
            }
            queue.push_back(root);
        }

        while let Some(name) = queue.pop_front() {
            if !resolved.insert(name.to_string()) {
                continue;
            }
            let Some(descriptor) = descriptors.get(name) else {
                continue;
            };
            for requires in &descriptor.requires {
                if descriptors.contains_key(&requires.name) {
                    queue.push_back(&requires.name);
                } else if !requires.is_static() && !requires.is_mandated() {
                    return Err(JdepsError::Resolution(format!(
                        "module {} not found, required by {name}",
                        requires.name
                    ))
                    .into());
                }
            }
        }
        Ok(resolved)
    }
}
