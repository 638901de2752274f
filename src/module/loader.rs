use std::collections::HashMap;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::folder::{resolve_dir_ci, resolve_first_file_ci};
use super::manifest::{ActivationList, ModuleManifest, ModuleRef};
use super::routes_file::{self, Shortcuts, ROUTE_FILES, SHORTCUT_FILES};
use crate::error::{ConfigurationError, ManifestError, RouteError};
use crate::router::RouteTable;

/// Name of the folder holding a module's route and shortcut files.
pub const ROUTES_FOLDER: &str = "Routes";

/// Compiled-in route registration for one module.
pub type RouteInstaller = Arc<dyn Fn(&mut RouteTable) -> Result<(), RouteError> + Send + Sync>;

/// When a module's routes are registered relative to its dependencies.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ActivationOrder {
    /// Register the module's routes, then activate its dependencies
    #[default]
    SelfFirst,
    /// Activate dependencies first; dependency cycles are reported
    DependenciesFirst,
}

impl FromStr for ActivationOrder {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "self-first" => Ok(ActivationOrder::SelfFirst),
            "dependencies-first" => Ok(ActivationOrder::DependenciesFirst),
            _ => Err(ConfigurationError::InvalidActivationOrder(s.to_string())),
        }
    }
}

impl fmt::Display for ActivationOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ActivationOrder::SelfFirst => "self-first",
            ActivationOrder::DependenciesFirst => "dependencies-first",
        })
    }
}

/// A module that completed activation.
#[derive(Debug, Clone)]
pub struct ActivatedModule {
    pub manifest: ModuleManifest,
    /// Module folder as found on disk
    pub dir: PathBuf,
    /// Number of routes the module registered
    pub routes_added: usize,
}

/// Activated modules in activation order, plus per-slug shortcut tables.
///
/// Grows monotonically while modules are activated.
#[derive(Debug, Clone, Default)]
pub struct ModuleRegistry {
    modules: Vec<ActivatedModule>,
    by_uuid: HashMap<String, usize>,
    shortcuts: HashMap<String, Shortcuts>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn is_activated(&self, uuid: &str) -> bool {
        self.by_uuid.contains_key(uuid)
    }

    #[must_use]
    pub fn get(&self, uuid: &str) -> Option<&ActivatedModule> {
        self.by_uuid.get(uuid).map(|&idx| &self.modules[idx])
    }

    /// Activated modules, in activation order.
    #[must_use]
    pub fn modules(&self) -> &[ActivatedModule] {
        &self.modules
    }

    /// Shortcut table recorded for `slug` (compared lower-cased).
    #[must_use]
    pub fn shortcuts(&self, slug: &str) -> Option<&Shortcuts> {
        self.shortcuts.get(&slug.to_ascii_lowercase())
    }

    /// Every recorded shortcut table, keyed by lower-cased slug.
    #[must_use]
    pub fn all_shortcuts(&self) -> &HashMap<String, Shortcuts> {
        &self.shortcuts
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    fn record(&mut self, module: ActivatedModule) {
        self.by_uuid
            .insert(module.manifest.uuid.clone(), self.modules.len());
        self.modules.push(module);
    }
}

/// Activates modules found under a module root and registers their routes.
///
/// Activation is idempotent per manifest uuid for the lifetime of the loader.
pub struct ModuleLoader {
    module_root: PathBuf,
    order: ActivationOrder,
    activation_list: Option<PathBuf>,
    installers: HashMap<String, RouteInstaller>,
    registry: ModuleRegistry,
}

impl ModuleLoader {
    pub fn new<P: Into<PathBuf>>(module_root: P, order: ActivationOrder) -> Self {
        Self {
            module_root: module_root.into(),
            order,
            activation_list: None,
            installers: HashMap::new(),
            registry: ModuleRegistry::default(),
        }
    }

    /// Activation list read by [`load_essential_modules`](Self::load_essential_modules)
    /// and [`load_active_modules`](Self::load_active_modules).
    #[must_use]
    pub fn with_activation_list<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.activation_list = Some(path.into());
        self
    }

    /// Register a route installer for the module with `slug` (compared lower-cased).
    /// It runs when the module is activated, before the module's route file.
    #[must_use]
    pub fn with_installer<F>(mut self, slug: &str, installer: F) -> Self
    where
        F: Fn(&mut RouteTable) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.add_installer(slug, Arc::new(installer));
        self
    }

    pub fn add_installer(&mut self, slug: &str, installer: RouteInstaller) {
        self.installers.insert(slug.to_ascii_lowercase(), installer);
    }

    #[must_use]
    pub fn module_root(&self) -> &Path {
        &self.module_root
    }

    #[must_use]
    pub fn order(&self) -> ActivationOrder {
        self.order
    }

    #[must_use]
    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    #[must_use]
    pub fn into_registry(self) -> ModuleRegistry {
        self.registry
    }

    /// Activate the `essentials` list of the activation list.
    ///
    /// # Errors
    ///
    /// [`ManifestError::ActivationList`] if no list is configured or it cannot be
    /// read, or any activation error.
    pub fn load_essential_modules(&mut self, table: &mut RouteTable) -> Result<(), ManifestError> {
        let list = self.read_activation_list()?;
        self.activate(&list.modules.essentials, table)
    }

    /// Activate the `active` list of the activation list.
    ///
    /// # Errors
    ///
    /// Same as [`load_essential_modules`](Self::load_essential_modules).
    pub fn load_active_modules(&mut self, table: &mut RouteTable) -> Result<(), ManifestError> {
        let list = self.read_activation_list()?;
        self.activate(&list.modules.active, table)
    }

    /// Activate a single `name@version` module.
    ///
    /// # Errors
    ///
    /// Any activation error.
    pub fn load_module(&mut self, module: &str, table: &mut RouteTable) -> Result<(), ManifestError> {
        self.activate(&[module], table)
    }

    /// Activate `refs` in order, each with its dependencies.
    ///
    /// For every reference: resolve the module folder ignoring case, load the
    /// manifest, skip it if its uuid is already active, require the exact version,
    /// then register its routes and activate its dependencies in the configured
    /// [`ActivationOrder`].
    ///
    /// # Errors
    ///
    /// The first [`ManifestError`]; modules activated before it stay activated.
    pub fn activate<S: AsRef<str>>(
        &mut self,
        refs: &[S],
        table: &mut RouteTable,
    ) -> Result<(), ManifestError> {
        let mut visiting = Vec::new();
        for raw in refs {
            let module_ref: ModuleRef = raw.as_ref().parse()?;
            self.activate_one(&module_ref, table, &mut visiting)?;
        }
        Ok(())
    }

    fn read_activation_list(&self) -> Result<ActivationList, ManifestError> {
        let path = self
            .activation_list
            .as_ref()
            .ok_or_else(|| ManifestError::ActivationList {
                path: PathBuf::new(),
                message: "no activation list configured".to_string(),
            })?;
        ActivationList::load(path)
    }

    fn activate_one(
        &mut self,
        module_ref: &ModuleRef,
        table: &mut RouteTable,
        visiting: &mut Vec<(String, String)>,
    ) -> Result<(), ManifestError> {
        let dir = resolve_dir_ci(&self.module_root, &module_ref.name).ok_or_else(|| {
            ManifestError::ModuleNotFound {
                name: module_ref.name.clone(),
                root: self.module_root.clone(),
            }
        })?;
        let manifest = ModuleManifest::load(&dir, &module_ref.name)?;

        if self.registry.is_activated(&manifest.uuid) {
            debug!(module = %module_ref, uuid = %manifest.uuid, "Module already active, skipped");
            return Ok(());
        }
        if let Some(pos) = visiting.iter().position(|(uuid, _)| *uuid == manifest.uuid) {
            let mut chain: Vec<String> = visiting[pos..].iter().map(|(_, n)| n.clone()).collect();
            chain.push(module_ref.name.clone());
            return Err(ManifestError::DependencyCycle { chain });
        }
        if manifest.version != module_ref.version {
            return Err(ManifestError::VersionMismatch {
                module: module_ref.name.clone(),
                required: module_ref.version.clone(),
                installed: manifest.version,
            });
        }
        let dependencies = manifest.dependency_refs()?;

        match self.order {
            ActivationOrder::SelfFirst => {
                let routes_added = self.install(&manifest, &dir, table)?;
                self.finish(manifest, dir, routes_added);
                for dep in &dependencies {
                    self.activate_one(dep, table, visiting)?;
                }
            }
            ActivationOrder::DependenciesFirst => {
                visiting.push((manifest.uuid.clone(), module_ref.name.clone()));
                for dep in &dependencies {
                    self.activate_one(dep, table, visiting)?;
                }
                visiting.pop();
                let routes_added = self.install(&manifest, &dir, table)?;
                self.finish(manifest, dir, routes_added);
            }
        }
        Ok(())
    }

    fn finish(&mut self, manifest: ModuleManifest, dir: PathBuf, routes_added: usize) {
        info!(
            module = %manifest.display_name(),
            slug = %manifest.slug,
            version = %manifest.version,
            uuid = %manifest.uuid,
            routes_added,
            order = %self.order,
            "Module activated"
        );
        self.registry.record(ActivatedModule {
            manifest,
            dir,
            routes_added,
        });
    }

    /// Run the module's installer and route file, record its shortcuts.
    /// Returns the number of routes registered.
    fn install(
        &mut self,
        manifest: &ModuleManifest,
        dir: &Path,
        table: &mut RouteTable,
    ) -> Result<usize, ManifestError> {
        let slug = manifest.slug.to_ascii_lowercase();
        let before = table.len();
        let registration = |source: RouteError| ManifestError::Registration {
            module: manifest.slug.clone(),
            source,
        };

        if let Some(installer) = self.installers.get(&slug) {
            installer(table).map_err(registration)?;
        }

        let routes_dir = resolve_dir_ci(dir, ROUTES_FOLDER);
        if let Some(path) = entry_file(dir, routes_dir.as_deref(), manifest.routes.as_deref(), &ROUTE_FILES)? {
            let entries = routes_file::load_routes(&path, &manifest.slug)?;
            routes_file::apply(&entries, table).map_err(registration)?;
            debug!(module = %manifest.slug, path = %path.display(), "Route file applied");
        }
        if let Some(path) = entry_file(
            dir,
            routes_dir.as_deref(),
            manifest.shortcuts.as_deref(),
            &SHORTCUT_FILES,
        )? {
            let shortcuts = routes_file::load_shortcuts(&path, &manifest.slug)?;
            debug!(module = %manifest.slug, count = shortcuts.len(), "Shortcuts recorded");
            self.registry.shortcuts.insert(slug, shortcuts);
        }

        Ok(table.len() - before)
    }
}

/// Locate a module entry file: the manifest override if set (it must exist), else the
/// first default name found in the `Routes` folder.
fn entry_file(
    dir: &Path,
    routes_dir: Option<&Path>,
    declared: Option<&str>,
    defaults: &[&str],
) -> Result<Option<PathBuf>, ManifestError> {
    if let Some(rel) = declared {
        let path = dir.join(rel);
        if !path.is_file() {
            return Err(ManifestError::Io {
                path,
                source: io::Error::from(io::ErrorKind::NotFound),
            });
        }
        return Ok(Some(path));
    }
    Ok(routes_dir.and_then(|rd| resolve_first_file_ci(rd, defaults)))
}

impl fmt::Debug for ModuleLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut installers: Vec<&String> = self.installers.keys().collect();
        installers.sort_unstable();
        f.debug_struct("ModuleLoader")
            .field("module_root", &self.module_root)
            .field("order", &self.order)
            .field("activation_list", &self.activation_list)
            .field("installers", &installers)
            .field("registry", &self.registry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_activation_order_parse() {
        assert_eq!("self-first".parse::<ActivationOrder>().unwrap(), ActivationOrder::SelfFirst);
        assert_eq!(
            "Dependencies_First".parse::<ActivationOrder>().unwrap(),
            ActivationOrder::DependenciesFirst
        );
        assert!("random".parse::<ActivationOrder>().is_err());
        assert_eq!(ActivationOrder::default(), ActivationOrder::SelfFirst);
    }

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let mut registry = ModuleRegistry::default();
        registry
            .shortcuts
            .insert("blog".into(), Shortcuts::from([("home".into(), "/blog".into())]));
        assert_eq!(registry.shortcuts("Blog").unwrap()["home"], "/blog");
        assert!(registry.shortcuts("shop").is_none());
    }
}
