//! # Application Configuration
//!
//! [`AppConfig`] collects the process-wide settings read once at startup: the response
//! mode, where modules and views live, the activation list and error display.
//!
//! ## Sources
//!
//! A configuration file (YAML, JSON or TOML, chosen by extension) is read first, then
//! environment variables override individual settings:
//!
//! | Variable | Setting |
//! |---|---|
//! | `BRRTK_ROUTER_MODE` | `router_mode` (`VIEW` or `JSON`, required) |
//! | `BRRTK_MODULE_PATH` | `module_path` |
//! | `BRRTK_INI_PATH` | `ini_path` |
//! | `BRRTK_NOT_FOUND_VIEW` | `not_found_view` |
//! | `BRRTK_VIEW_PATH` | `view_path` |
//! | `BRRTK_STORAGE_PATH` | `storage_path` |
//! | `BRRTK_DISPLAY_ERRORS` | `display_errors` |
//! | `BRRTK_ACTIVATION_ORDER` | `activation_order` |
//!
//! Relative paths in a file are resolved against the file's directory.
//!
//! ```yaml
//! router_mode: JSON
//! module_path: modules
//! view_path: views
//! not_found_view: views/404.html
//! activation_order: dependencies-first
//! ```

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::dispatcher::{DispatchConfig, ResponseMode};
use crate::error::ConfigurationError;
use crate::module::ActivationOrder;

/// Default file name of the activation list, next to the configuration file.
pub const DEFAULT_INI_FILE: &str = "system-ini.json";

/// Startup configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppConfig {
    /// VIEW or JSON; required before the application is built
    pub router_mode: Option<ResponseMode>,
    /// Root directory of the module folders
    pub module_path: Option<PathBuf>,
    /// Activation list file
    pub ini_path: Option<PathBuf>,
    /// Page rendered for unmatched requests in VIEW mode
    pub not_found_view: Option<PathBuf>,
    /// Root directory of application views
    pub view_path: Option<PathBuf>,
    /// Writable storage root; logs go to `<storage_path>/logs`
    pub storage_path: Option<PathBuf>,
    pub display_errors: bool,
    pub activation_order: ActivationOrder,
    /// Directory relative paths are resolved against
    pub base_dir: PathBuf,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    router_mode: Option<String>,
    module_path: Option<PathBuf>,
    ini_path: Option<PathBuf>,
    not_found_view: Option<PathBuf>,
    view_path: Option<PathBuf>,
    storage_path: Option<PathBuf>,
    display_errors: Option<bool>,
    activation_order: Option<String>,
}

impl AppConfig {
    /// Build the configuration from environment variables alone.
    ///
    /// # Errors
    ///
    /// An environment variable holds an unparsable value.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        let mut config = Self {
            base_dir: env::current_dir().unwrap_or_else(|_| PathBuf::from(".")),
            ..Self::default()
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Read a configuration file, then apply environment overrides.
    ///
    /// # Errors
    ///
    /// * [`ConfigurationError::Io`] - the file cannot be read
    /// * [`ConfigurationError::Parse`] - the file does not parse
    /// * [`ConfigurationError::InvalidRouterMode`] / [`ConfigurationError::InvalidActivationOrder`]
    pub fn load(path: &Path) -> Result<Self, ConfigurationError> {
        let mut config = Self::from_file(path)?;
        config.apply_env()?;
        Ok(config)
    }

    /// Read a configuration file without looking at the environment.
    ///
    /// # Errors
    ///
    /// See [`load`](Self::load).
    pub fn from_file(path: &Path) -> Result<Self, ConfigurationError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigurationError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_error = |message: String| ConfigurationError::Parse {
            path: path.to_path_buf(),
            message,
        };
        let file: ConfigFile = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml" | "yml") => {
                serde_yaml::from_str(&content).map_err(|e| parse_error(e.to_string()))?
            }
            Some("toml") => toml::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
            _ => serde_json::from_str(&content).map_err(|e| parse_error(e.to_string()))?,
        };

        let base_dir = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| PathBuf::from("."), Path::to_path_buf);
        let resolve = |p: Option<PathBuf>| p.map(|p| base_dir.join(p));

        let config = Self {
            router_mode: file.router_mode.as_deref().map(str::parse).transpose()?,
            module_path: resolve(file.module_path),
            ini_path: resolve(file.ini_path),
            not_found_view: resolve(file.not_found_view),
            view_path: resolve(file.view_path),
            storage_path: resolve(file.storage_path),
            display_errors: file.display_errors.unwrap_or(false),
            activation_order: file
                .activation_order
                .as_deref()
                .map(str::parse)
                .transpose()?
                .unwrap_or_default(),
            base_dir: base_dir.clone(),
        };
        debug!(path = %path.display(), "Configuration file loaded");
        Ok(config)
    }

    /// Apply `BRRTK_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// An override holds an unparsable mode or activation order.
    pub fn apply_env(&mut self) -> Result<(), ConfigurationError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(mode) = lookup("BRRTK_ROUTER_MODE") {
            self.router_mode = Some(mode.parse()?);
        }
        if let Some(order) = lookup("BRRTK_ACTIVATION_ORDER") {
            self.activation_order = order.parse()?;
        }
        let path = |key: &str| lookup(key).filter(|v| !v.is_empty()).map(PathBuf::from);
        if let Some(p) = path("BRRTK_MODULE_PATH") {
            self.module_path = Some(p);
        }
        if let Some(p) = path("BRRTK_INI_PATH") {
            self.ini_path = Some(p);
        }
        if let Some(p) = path("BRRTK_NOT_FOUND_VIEW") {
            self.not_found_view = Some(p);
        }
        if let Some(p) = path("BRRTK_VIEW_PATH") {
            self.view_path = Some(p);
        }
        if let Some(p) = path("BRRTK_STORAGE_PATH") {
            self.storage_path = Some(p);
        }
        if let Some(flag) = lookup("BRRTK_DISPLAY_ERRORS") {
            self.display_errors = matches!(
                flag.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }
        Ok(())
    }

    /// The configured response mode.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::MissingSetting`] when `router_mode` was never set.
    pub fn mode(&self) -> Result<ResponseMode, ConfigurationError> {
        self.router_mode
            .ok_or(ConfigurationError::MissingSetting("router_mode"))
    }

    /// Check the settings needed to build an application.
    ///
    /// The not-found view is not checked here: a missing page surfaces when an
    /// unmatched request is served in VIEW mode.
    ///
    /// # Errors
    ///
    /// * [`ConfigurationError::MissingSetting`] - no `router_mode`
    /// * [`ConfigurationError::FileNotFound`] - `module_path` does not exist
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.mode()?;
        if let Some(module_path) = &self.module_path {
            if !module_path.is_dir() {
                return Err(ConfigurationError::FileNotFound {
                    setting: "module_path",
                    path: module_path.clone(),
                });
            }
        }
        Ok(())
    }

    /// Activation list location: `ini_path`, or `system-ini.json` in the base directory.
    #[must_use]
    pub fn activation_list_path(&self) -> PathBuf {
        self.ini_path
            .clone()
            .unwrap_or_else(|| self.base_dir.join(DEFAULT_INI_FILE))
    }

    /// Log directory derived from `storage_path`.
    #[must_use]
    pub fn log_dir(&self) -> Option<PathBuf> {
        self.storage_path.as_ref().map(|s| s.join("logs"))
    }

    /// Dispatcher settings.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::MissingSetting`] when `router_mode` was never set.
    pub fn dispatch_config(&self) -> Result<DispatchConfig, ConfigurationError> {
        let mut config = DispatchConfig::new(self.mode()?).with_display_errors(self.display_errors);
        if let Some(view) = &self.not_found_view {
            config = config.with_not_found_view(view);
        }
        Ok(config)
    }
}
