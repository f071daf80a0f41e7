use crate::domain::error::JdepsError;
use dashmap::DashMap;

pub const VERSIONS_DIR: &str = "META-INF/versions/";

/// Release chosen for each class overlaid from a multi-release jar.
#[derive(Debug, Default)]
pub struct ReleaseVersions {
    versions: DashMap<String, u32>,
}

impl ReleaseVersions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Associates `class` with `version`; a class can only ever have one.
    pub fn record(&self, class: &str, version: u32) -> Result<(), JdepsError> {
        let existing = *self.versions.entry(class.to_string()).or_insert(version);
        if existing != version {
            return Err(JdepsError::MultiReleaseConflict {
                class: class.to_string(),
                existing,
                version,
            });
        }
        Ok(())
    }

    pub fn version_of(&self, class: &str) -> Option<u32> {
        self.versions.get(class).map(|v| *v)
    }

    /// `"<N>/<class>"` for overlaid classes, the plain name otherwise.
    pub fn display_name(&self, class: &str) -> String {
        match self.version_of(class) {
            Some(version) => format!("{version}/{class}"),
            None => class.to_string(),
        }
    }
}

/// Splits `META-INF/versions/<N>/<path>` into `(N, path)`.
///
/// Returns `Ok(None)` for entries outside the versions directory.
pub fn split_versioned(entry: &str) -> Result<Option<(u32, &str)>, String> {
    let Some(rest) = entry.strip_prefix(VERSIONS_DIR) else {
        return Ok(None);
    };
    let Some((version, path)) = rest.split_once('/') else {
        return Err(entry.to_string());
    };
    if path.is_empty() {
        return Err(entry.to_string());
    }
    let version = version.parse::<u32>().map_err(|_| entry.to_string())?;
    Ok(Some((version, path)))
}
