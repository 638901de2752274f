//! Typed controller/action table.
//!
//! Routes name their handler as a `(controller, action)` pair. The pair is resolved
//! against this table when the route is registered, so a missing controller or action
//! fails startup instead of surfacing per request.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::RouteError;

/// A resolved handler. Writes its output into the pending response.
pub type Handler = Arc<dyn Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync>;

/// Name of a handler as written at registration: `(controller, action)`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandlerRef {
    pub controller: String,
    pub action: String,
}

impl HandlerRef {
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            controller: controller.into(),
            action: action.into(),
        }
    }
}

impl From<(&str, &str)> for HandlerRef {
    fn from((controller, action): (&str, &str)) -> Self {
        Self::new(controller, action)
    }
}

impl From<(String, String)> for HandlerRef {
    fn from((controller, action): (String, String)) -> Self {
        Self { controller, action }
    }
}

impl fmt::Display for HandlerRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@{}", self.controller, self.action)
    }
}

/// Controller name -> action name -> handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    controllers: HashMap<String, HashMap<String, Handler>>,
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` as `controller`'s `action`. Re-registering replaces.
    pub fn register<F>(&mut self, controller: &str, action: &str, handler: F) -> &mut Self
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.controllers
            .entry(controller.to_string())
            .or_default()
            .insert(action.to_string(), Arc::new(handler));
        debug!(controller, action, "Handler registered");
        self
    }

    /// Resolve a handler reference.
    ///
    /// # Errors
    ///
    /// [`RouteError::UnknownController`] or [`RouteError::UnknownAction`].
    pub fn resolve(&self, handler: &HandlerRef) -> Result<Handler, RouteError> {
        let actions = self.controllers.get(&handler.controller).ok_or_else(|| {
            RouteError::UnknownController {
                controller: handler.controller.clone(),
            }
        })?;
        actions
            .get(&handler.action)
            .map(Arc::clone)
            .ok_or_else(|| RouteError::UnknownAction {
                controller: handler.controller.clone(),
                action: handler.action.clone(),
            })
    }

    /// Number of registered actions across all controllers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.controllers.values().map(HashMap::len).sum()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;

    fn noop(_: &HandlerRequest, _: &mut HandlerResponse) {}

    #[test]
    fn test_resolve_registered_action() {
        let mut registry = HandlerRegistry::new();
        registry.register("Items", "show", |_: &HandlerRequest, res: &mut HandlerResponse| {
            res.status = 204;
        });
        let handler = registry.resolve(&("Items", "show").into()).unwrap();
        let mut res = HandlerResponse::default();
        handler(&HandlerRequest::new(Method::GET, "/"), &mut res);
        assert_eq!(res.status, 204);
    }

    #[test]
    fn test_unknown_controller_and_action() {
        let mut registry = HandlerRegistry::new();
        registry.register("Items", "show", noop);
        assert!(matches!(
            registry.resolve(&("Users", "show").into()),
            Err(RouteError::UnknownController { .. })
        ));
        assert!(matches!(
            registry.resolve(&("Items", "destroy").into()),
            Err(RouteError::UnknownAction { .. })
        ));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_display() {
        assert_eq!(HandlerRef::new("Items", "show").to_string(), "Items@show");
    }
}
