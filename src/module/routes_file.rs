//! Declarative module route and shortcut files.
//!
//! A route file is an ordered list of entries, each either a route or a group:
//!
//! ```yaml
//! - method: GET
//!   path: /posts/{id}
//!   handler: [Posts, show]
//! - group: /admin
//!   middlewares: ["Auth::check"]
//!   routes:
//!     - method: DELETE
//!       path: /posts/{id}
//!       handler: Posts@destroy
//! ```
//!
//! Entries are applied through the regular registration API, in file order.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::{ManifestError, RouteError};
use crate::registry::HandlerRef;
use crate::router::{parse_method, RouteTable};

/// Candidate file names for the route file inside the `Routes` folder.
pub const ROUTE_FILES: [&str; 3] = ["routes.json", "routes.yaml", "routes.yml"];

/// Candidate file names for the shortcuts file inside the `Routes` folder.
pub const SHORTCUT_FILES: [&str; 3] = ["shortcuts.json", "shortcuts.yaml", "shortcuts.yml"];

/// Alias name -> route path.
pub type Shortcuts = BTreeMap<String, String>;

/// One entry of a route file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum RouteEntry {
    Group {
        group: String,
        #[serde(default)]
        middlewares: Vec<String>,
        routes: Vec<RouteEntry>,
    },
    Route {
        method: String,
        path: String,
        handler: FileHandler,
        #[serde(default)]
        middlewares: Vec<String>,
    },
}

/// Handler written as `[Controller, action]` or `"Controller@action"`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(try_from = "RawHandler")]
pub struct FileHandler(pub HandlerRef);

#[derive(Deserialize)]
#[serde(untagged)]
enum RawHandler {
    Pair(String, String),
    Joined(String),
}

impl TryFrom<RawHandler> for FileHandler {
    type Error = String;

    fn try_from(raw: RawHandler) -> Result<Self, Self::Error> {
        match raw {
            RawHandler::Pair(controller, action) => Ok(Self(HandlerRef::new(controller, action))),
            RawHandler::Joined(joined) => match joined.split_once('@') {
                Some((c, a)) if !c.is_empty() && !a.is_empty() => Ok(Self(HandlerRef::new(c, a))),
                _ => Err(format!("invalid handler '{joined}', expected Controller@action")),
            },
        }
    }
}

/// Register `entries` into `table`, in order.
///
/// # Errors
///
/// The first [`RouteError`] raised by the registration API.
pub fn apply(entries: &[RouteEntry], table: &mut RouteTable) -> Result<(), RouteError> {
    for entry in entries {
        match entry {
            RouteEntry::Group {
                group,
                middlewares,
                routes,
            } => {
                let specs: Vec<&str> = middlewares.iter().map(String::as_str).collect();
                table.group(group, &specs, |t| apply(routes, t))?;
            }
            RouteEntry::Route {
                method,
                path,
                handler,
                middlewares,
            } => {
                let specs: Vec<&str> = middlewares.iter().map(String::as_str).collect();
                table.add_route(parse_method(method)?, path, handler.0.clone(), &specs)?;
            }
        }
    }
    Ok(())
}

/// Load a route file.
///
/// # Errors
///
/// [`ManifestError::Io`] or [`ManifestError::RouteFileMalformed`].
pub fn load_routes(path: &Path, module: &str) -> Result<Vec<RouteEntry>, ManifestError> {
    load_file(path, module)
}

/// Load a shortcuts file.
///
/// # Errors
///
/// [`ManifestError::Io`] or [`ManifestError::RouteFileMalformed`].
pub fn load_shortcuts(path: &Path, module: &str) -> Result<Shortcuts, ManifestError> {
    load_file(path, module)
}

fn load_file<T: DeserializeOwned>(path: &Path, module: &str) -> Result<T, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let malformed = |message: String| ManifestError::RouteFileMalformed {
        module: module.to_string(),
        path: path.to_path_buf(),
        message,
    };
    match path.extension().and_then(|e| e.to_str()) {
        Some("yaml" | "yml") => serde_yaml::from_str(&content).map_err(|e| malformed(e.to_string())),
        _ => serde_json::from_str(&content).map_err(|e| malformed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::dispatcher::{HandlerRequest, HandlerResponse};
    use crate::middleware::MiddlewareRegistry;
    use crate::registry::HandlerRegistry;

    fn table() -> RouteTable {
        let mut handlers = HandlerRegistry::new();
        handlers
            .register("Posts", "show", |_: &HandlerRequest, _: &mut HandlerResponse| {})
            .register("Posts", "destroy", |_: &HandlerRequest, _: &mut HandlerResponse| {});
        let mut middleware = MiddlewareRegistry::new();
        middleware.register("Auth", "check", |_: &HandlerRequest, _: &mut HandlerResponse, _: &[String]| true);
        RouteTable::new(Arc::new(handlers), Arc::new(middleware))
    }

    #[test]
    fn test_apply_yaml_entries() {
        let yaml = r#"
- method: get
  path: /posts/{id}
  handler: [Posts, show]
- group: /admin
  middlewares: ["Auth::check"]
  routes:
    - method: DELETE
      path: /posts/{id}
      handler: Posts@destroy
"#;
        let entries: Vec<RouteEntry> = serde_yaml::from_str(yaml).unwrap();
        let mut t = table();
        apply(&entries, &mut t).unwrap();

        assert_eq!(t.len(), 2);
        assert_eq!(t.routes()[0].path, "/posts/{id}");
        assert_eq!(t.routes()[1].path, "/admin/posts/{id}");
        assert_eq!(t.routes()[1].middlewares.len(), 1);
    }

    #[test]
    fn test_bad_handler_is_decode_error() {
        let res: Result<Vec<RouteEntry>, _> =
            serde_json::from_str(r#"[{"method":"GET","path":"/","handler":"Posts"}]"#);
        assert!(res.is_err());
    }

    #[test]
    fn test_load_file_by_extension() {
        let dir = tempfile::tempdir().unwrap();
        let json = dir.path().join("shortcuts.json");
        fs::write(&json, r#"{"home": "/blog"}"#).unwrap();
        let yaml = dir.path().join("shortcuts.yml");
        fs::write(&yaml, "home: /blog\npost: /blog/{id}\n").unwrap();

        assert_eq!(load_shortcuts(&json, "blog").unwrap()["home"], "/blog");
        assert_eq!(load_shortcuts(&yaml, "blog").unwrap().len(), 2);

        fs::write(&json, "{").unwrap();
        assert!(matches!(
            load_shortcuts(&json, "blog"),
            Err(ManifestError::RouteFileMalformed { .. })
        ));
    }
}
