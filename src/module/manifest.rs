use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ManifestError;

/// File name of a module manifest inside the module folder.
pub const MANIFEST_FILE: &str = "manifest.json";

/// A `name@version` module reference.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ModuleRef {
    /// Folder name of the module, matched ignoring case
    pub name: String,
    /// Exact version required
    pub version: String,
}

impl FromStr for ModuleRef {
    type Err = ManifestError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim().split_once('@') {
            Some((name, version)) if !name.is_empty() && !version.is_empty() => Ok(Self {
                name: name.to_string(),
                version: version.to_string(),
            }),
            _ => Err(ManifestError::InvalidModuleRef(raw.to_string())),
        }
    }
}

impl fmt::Display for ModuleRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// Per-module metadata read from `manifest.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleManifest {
    /// Global identity; activation is deduplicated on it
    pub uuid: String,
    /// Key of the module's shortcut table, compared lower-cased
    pub slug: String,
    /// Installed version, compared to the requested one by string equality
    pub version: String,
    /// `name@version` references activated along with this module
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Route file relative to the module folder, overriding `Routes/routes.*`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub routes: Option<String>,
    /// Shortcuts file relative to the module folder, overriding `Routes/shortcuts.*`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shortcuts: Option<String>,
}

impl ModuleManifest {
    /// Load the manifest of the module in `dir`.
    ///
    /// # Errors
    ///
    /// * [`ManifestError::ManifestMissing`] - no `manifest.json` in `dir`
    /// * [`ManifestError::Io`] - the file cannot be read
    /// * [`ManifestError::ManifestMalformed`] - invalid JSON or missing required fields
    pub fn load(dir: &Path, module: &str) -> Result<Self, ManifestError> {
        let path = super::folder::resolve_file_ci(dir, MANIFEST_FILE).ok_or_else(|| {
            ManifestError::ManifestMissing {
                module: module.to_string(),
                path: dir.join(MANIFEST_FILE),
            }
        })?;
        let content = fs::read_to_string(&path).map_err(|source| ManifestError::Io {
            path: path.clone(),
            source,
        })?;
        serde_json::from_str(&content).map_err(|e| ManifestError::ManifestMalformed {
            module: module.to_string(),
            message: e.to_string(),
        })
    }

    /// Parsed dependency references.
    ///
    /// # Errors
    ///
    /// [`ManifestError::InvalidModuleRef`] for an entry not in `name@version` form.
    pub fn dependency_refs(&self) -> Result<Vec<ModuleRef>, ManifestError> {
        self.dependencies.iter().map(|d| d.parse()).collect()
    }

    /// Name to show in logs and listings: `name`, or the slug.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.slug)
    }
}

/// The activation list file: `{"Modules": {"essentials": [...], "active": [...]}}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivationList {
    #[serde(rename = "Modules")]
    pub modules: ModuleLists,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleLists {
    #[serde(default)]
    pub essentials: Vec<String>,
    #[serde(default)]
    pub active: Vec<String>,
}

impl ActivationList {
    /// Load the activation list at `path` (JSON).
    ///
    /// # Errors
    ///
    /// [`ManifestError::ActivationList`] if the file is missing or malformed.
    pub fn load(path: &Path) -> Result<Self, ManifestError> {
        let list_error = |message: String| ManifestError::ActivationList {
            path: PathBuf::from(path),
            message,
        };
        let content = fs::read_to_string(path).map_err(|e| list_error(e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| list_error(e.to_string()))
    }
}
