//! Template rendering for VIEW-mode handlers.
//!
//! Views are minijinja templates stored as `<name>.html`. Application views live
//! under the configured view root; module views under `<module_root>/<Module>/Views/`,
//! where both folder names are matched ignoring case. A layout is rendered after the
//! view with the view's output available as `content`.

use std::fs;
use std::path::{Path, PathBuf};

use minijinja::Environment;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::module::folder::resolve_dir_ci;

/// File extension of view templates.
pub const VIEW_EXTENSION: &str = "html";

const VIEWS_FOLDER: &str = "Views";

#[derive(Debug, Error)]
pub enum ViewError {
    #[error("module '{0}' not found")]
    ModuleNotFound(String),

    #[error("'Views' folder of module '{0}' not found")]
    ViewsFolderNotFound(String),

    #[error("view '{0}' not found")]
    ViewNotFound(String),

    #[error("layout '{0}' not found")]
    LayoutNotFound(String),

    #[error("module views requested but no module root is configured")]
    NoModuleRoot,

    #[error("no view root is configured (view_path)")]
    NoViewRoot,

    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to render {path}: {source}")]
    Template {
        path: PathBuf,
        #[source]
        source: minijinja::Error,
    },
}

/// Renders views and layouts from the application and module view folders.
#[derive(Debug, Clone)]
pub struct ViewRenderer {
    view_path: PathBuf,
    module_path: Option<PathBuf>,
}

impl ViewRenderer {
    pub fn new<P: Into<PathBuf>>(view_path: P) -> Self {
        Self {
            view_path: view_path.into(),
            module_path: None,
        }
    }

    #[must_use]
    pub fn with_module_path<P: Into<PathBuf>>(mut self, module_path: P) -> Self {
        self.module_path = Some(module_path.into());
        self
    }

    /// Render `view` with `data`, optionally wrapped in `layout`.
    ///
    /// With `module` set, the view is looked up in the module's views folder first
    /// and falls back to the application view root; the layout must then come from
    /// the module's views folder.
    ///
    /// # Errors
    ///
    /// A [`ViewError`] when the module, its views folder, the view or the layout is
    /// missing, or when a template fails to render.
    pub fn render(
        &self,
        view: &str,
        data: &Value,
        layout: Option<&str>,
        module: Option<&str>,
    ) -> Result<String, ViewError> {
        let module_views = module.map(|m| self.module_views(m)).transpose()?;

        let app_view = self.view_path.join(file_name(view));
        let view_file = module_views
            .as_ref()
            .map(|dir| dir.join(file_name(view)))
            .filter(|p| p.is_file())
            .unwrap_or(app_view);
        if !view_file.is_file() {
            return Err(ViewError::ViewNotFound(view.to_string()));
        }
        let content = render_file(&view_file, data)?;
        debug!(view, module = ?module, path = %view_file.display(), "View rendered");

        let Some(layout) = layout else {
            return Ok(content);
        };
        let layout_file = match &module_views {
            Some(dir) => dir.join(file_name(layout)),
            None => self.view_path.join(file_name(layout)),
        };
        if !layout_file.is_file() {
            return Err(ViewError::LayoutNotFound(layout.to_string()));
        }

        let mut ctx = match data {
            Value::Object(map) => map.clone(),
            _ => Map::new(),
        };
        ctx.insert("content".to_string(), Value::String(content));
        render_file(&layout_file, &Value::Object(ctx))
    }

    fn module_views(&self, module: &str) -> Result<PathBuf, ViewError> {
        let root = self.module_path.as_deref().ok_or(ViewError::NoModuleRoot)?;
        let module_dir = resolve_dir_ci(root, module)
            .ok_or_else(|| ViewError::ModuleNotFound(module.to_string()))?;
        resolve_dir_ci(&module_dir, VIEWS_FOLDER)
            .ok_or_else(|| ViewError::ViewsFolderNotFound(module.to_string()))
    }
}

/// Render a single template file with `ctx`.
///
/// Output is not HTML-escaped; templates escape explicitly with `|e`.
///
/// # Errors
///
/// [`ViewError::Io`] if the file cannot be read, [`ViewError::Template`] if it does not
/// compile or render.
pub fn render_file(path: &Path, ctx: &Value) -> Result<String, ViewError> {
    let source = fs::read_to_string(path).map_err(|source| ViewError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let template_error = |source| ViewError::Template {
        path: path.to_path_buf(),
        source,
    };
    let mut env = Environment::new();
    env.add_template("tpl", &source).map_err(template_error)?;
    let tmpl = env.get_template("tpl").map_err(template_error)?;
    tmpl.render(ctx).map_err(template_error)
}

fn file_name(view: &str) -> String {
    format!("{}.{VIEW_EXTENSION}", view.trim_matches('/'))
}
