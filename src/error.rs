//! Error taxonomy.
//!
//! Startup errors ([`ConfigurationError`], [`ManifestError`], [`RouteError`]) are
//! never recovered: they surface before the first request is served. Per-request
//! errors ([`DispatchError`]) terminate only the current dispatch and are turned
//! into a terminal response by the dispatcher.

use std::path::PathBuf;
use thiserror::Error;

/// A required setting is absent or unusable.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    /// Required setting is not set in the config file or the environment.
    #[error("required setting '{0}' is not defined")]
    MissingSetting(&'static str),

    /// `router_mode` holds something other than VIEW or JSON.
    #[error("unknown router mode '{0}', expected VIEW or JSON")]
    InvalidRouterMode(String),

    /// `activation_order` holds an unknown value.
    #[error("unknown activation order '{0}', expected self-first or dependencies-first")]
    InvalidActivationOrder(String),

    /// A setting names a file that does not exist.
    #[error("file for setting '{setting}' not found at {path}")]
    FileNotFound { setting: &'static str, path: PathBuf },

    /// The configuration file could not be read.
    #[error("failed to read configuration file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The configuration file could not be parsed.
    #[error("failed to parse configuration file {path}: {message}")]
    Parse { path: PathBuf, message: String },
}

/// Fatal failure while resolving or activating a module.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// A module reference is not in `name@version` form.
    #[error("invalid module reference '{0}', expected name@version")]
    InvalidModuleRef(String),

    /// No folder under the module root matches the module name.
    #[error("module '{name}' not found under {root}")]
    ModuleNotFound { name: String, root: PathBuf },

    /// The module folder has no manifest file.
    #[error("manifest for module '{module}' not found at {path}")]
    ManifestMissing { module: String, path: PathBuf },

    /// Reading a module file failed.
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest is not valid JSON or misses required fields.
    #[error("failed to decode manifest of module '{module}': {message}")]
    ManifestMalformed { module: String, message: String },

    /// The installed version differs from the requested one.
    #[error(
        "module '{module}' version is incompatible: required {required}, installed {installed}"
    )]
    VersionMismatch {
        module: String,
        required: String,
        installed: String,
    },

    /// A module depends on itself, directly or through other modules.
    #[error("dependency cycle detected: {}", chain.join(" -> "))]
    DependencyCycle { chain: Vec<String> },

    /// A route or shortcuts file could not be decoded.
    #[error("failed to decode {path} of module '{module}': {message}")]
    RouteFileMalformed {
        module: String,
        path: PathBuf,
        message: String,
    },

    /// A module's routes could not be registered.
    #[error("module '{module}' failed to register its routes: {source}")]
    Registration {
        module: String,
        #[source]
        source: RouteError,
    },

    /// The activation list file is missing or malformed.
    #[error("failed to load activation list {path}: {message}")]
    ActivationList { path: PathBuf, message: String },
}

/// Malformed middleware spec or missing capability action.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiddlewareConfigError {
    /// The middleware spec has no `::` separator or an empty capability/action part.
    #[error("invalid middleware format: '{0}'")]
    MalformedSpec(String),

    /// No capability with this name is registered.
    #[error("middleware capability '{capability}' is not registered")]
    UnknownCapability { capability: String },

    /// The capability exists but has no such action.
    #[error("method '{action}' does not exist on middleware '{capability}'")]
    UnknownAction { capability: String, action: String },
}

/// Registration-time failure raised by the route table.
#[derive(Debug, Error)]
pub enum RouteError {
    /// The method is not one of GET, POST, PUT, DELETE.
    #[error("unsupported route method '{0}'")]
    UnsupportedMethod(String),

    /// No controller with this name is registered.
    #[error("controller '{controller}' is not registered")]
    UnknownController { controller: String },

    /// The controller has no such action.
    #[error("action '{action}' does not exist on controller '{controller}'")]
    UnknownAction { controller: String, action: String },

    /// One of the route's middleware specs is invalid.
    #[error(transparent)]
    Middleware(#[from] MiddlewareConfigError),
}

/// Per-request failure. Each variant maps to a terminal response.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// A PUT/DELETE body declared as JSON could not be decoded.
    #[error("failed to decode JSON: {0}")]
    MalformedRequest(String),

    /// A middleware spec could not be resolved while running the chain.
    #[error(transparent)]
    Middleware(#[from] MiddlewareConfigError),

    /// No route matches the effective method and path.
    #[error("no route matches {method} {path}")]
    NotFound { method: String, path: String },

    /// VIEW mode needs a not-found view and it is unusable.
    #[error(transparent)]
    NotFoundView(#[from] ConfigurationError),

    /// The handler panicked.
    #[error("handler panicked: {0}")]
    HandlerPanicked(String),
}

impl DispatchError {
    /// Status code of the terminal response for this error.
    ///
    /// A malformed JSON body answers 500, not 400; clients observe this.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            DispatchError::NotFound { .. } => 404,
            DispatchError::MalformedRequest(_)
            | DispatchError::Middleware(_)
            | DispatchError::NotFoundView(_)
            | DispatchError::HandlerPanicked(_) => 500,
        }
    }
}
