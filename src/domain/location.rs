use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a single class: its fully-qualified binary name.
///
/// Names are stored in dotted form (`java.util.Map$Entry`); the internal
/// form used inside class files (`java/util/Map$Entry`) is accepted by
/// [`Location::new`] and normalized.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    name: String,
}

impl Location {
    pub fn new(name: impl AsRef<str>) -> Self {
        Self {
            name: name.as_ref().replace('/', "."),
        }
    }

    /// Fully-qualified binary name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Package of the class; empty for the unnamed package.
    pub fn package_name(&self) -> &str {
        self.name.rsplit_once('.').map(|(pkg, _)| pkg).unwrap_or("")
    }

    /// Simple name including any `$` nesting suffix.
    pub fn simple_name(&self) -> &str {
        self.name
            .rsplit_once('.')
            .map(|(_, simple)| simple)
            .unwrap_or(&self.name)
    }

    /// Entry path of the class inside an archive (`p/q/A.class`).
    pub fn entry_name(&self) -> String {
        format!("{}.class", self.name.replace('.', "/"))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl From<&str> for Location {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}
