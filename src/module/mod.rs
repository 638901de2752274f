//! # Module Module
//!
//! Manifest-driven module activation.
//!
//! A module is a folder under the module root holding a `manifest.json`:
//!
//! ```json
//! { "uuid": "3f1c...", "slug": "blog", "version": "1.0", "dependencies": ["users@2.1"] }
//! ```
//!
//! Activating `blog@1.0` resolves the `blog` folder ignoring case, checks the
//! version, registers the module's routes (a compiled-in installer for the slug, then
//! `Routes/routes.{json,yaml,yml}`), records `Routes/shortcuts.*` under the slug and
//! activates the dependencies. Each manifest uuid is activated at most once per
//! [`ModuleLoader`], so repeated references and diamond-shaped dependency graphs
//! register a module's routes exactly once.
//!
//! The activation list (`{"Modules": {"essentials": [...], "active": [...]}}`) feeds
//! [`ModuleLoader::load_essential_modules`] and [`ModuleLoader::load_active_modules`].

pub mod folder;
mod loader;
mod manifest;
mod routes_file;

pub use loader::{
    ActivatedModule, ActivationOrder, ModuleLoader, ModuleRegistry, RouteInstaller, ROUTES_FOLDER,
};
pub use manifest::{ActivationList, ModuleLists, ModuleManifest, ModuleRef, MANIFEST_FILE};
pub use routes_file::{
    apply as apply_route_entries, load_routes, load_shortcuts, FileHandler, RouteEntry, Shortcuts,
    ROUTE_FILES, SHORTCUT_FILES,
};
