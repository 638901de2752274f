//! Route table - ordered registration and first-match lookup.
//!
//! Routes are kept in registration order and scanned linearly; the first route whose
//! method equals the effective method and whose pattern matches the path wins. Later
//! routes that would also match are never considered.

#![deny(clippy::inefficient_to_string)]
#![deny(clippy::format_push_string)]

use std::fmt;
use std::io;
use std::sync::Arc;
use std::time::Instant;

use http::Method;
use tracing::{debug, info};

use super::group::{GroupContext, GroupScope};
use super::matcher::{match_path, normalize_path, param_name, ParamVec};
use crate::error::RouteError;
use crate::middleware::{MiddlewareRegistry, MiddlewareSpec};
use crate::registry::{Handler, HandlerRef, HandlerRegistry};

/// Methods a route may be registered for.
pub const SUPPORTED_METHODS: [Method; 4] = [Method::GET, Method::POST, Method::PUT, Method::DELETE];

/// Parse a textual method (any case) into one of [`SUPPORTED_METHODS`].
///
/// # Errors
///
/// [`RouteError::UnsupportedMethod`] for anything but GET, POST, PUT or DELETE.
pub fn parse_method(method: &str) -> Result<Method, RouteError> {
    let upper = method.to_ascii_uppercase();
    SUPPORTED_METHODS
        .iter()
        .find(|m| m.as_str() == upper)
        .cloned()
        .ok_or(RouteError::UnsupportedMethod(upper))
}

/// A registered route. Immutable once registered.
pub struct Route {
    /// One of GET, POST, PUT, DELETE
    pub method: Method,
    /// Normalized pattern, e.g. `/users/{id}`
    pub path: String,
    /// Handler name as registered
    pub handler: HandlerRef,
    /// Group middlewares first, then the route's own
    pub middlewares: Vec<MiddlewareSpec>,
    /// Names of the pattern's parameter tokens, in pattern order
    pub param_names: Vec<String>,
    endpoint: Handler,
}

impl Route {
    /// The handler resolved at registration.
    #[must_use]
    pub fn endpoint(&self) -> &Handler {
        &self.endpoint
    }

    /// Positional parameters if this route accepts `method` and `path`.
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> Option<ParamVec> {
        if self.method != *method {
            return None;
        }
        match_path(&self.path, path)
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler", &self.handler)
            .field("middlewares", &self.middlewares)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.method, self.path, self.handler)?;
        if !self.middlewares.is_empty() {
            let names: Vec<String> = self.middlewares.iter().map(ToString::to_string).collect();
            write!(f, " [{}]", names.join(", "))?;
        }
        Ok(())
    }
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch {
    /// The winning route
    pub route: Arc<Route>,
    /// Captured segments, one per parameter token, in pattern order
    pub params: ParamVec,
}

impl RouteMatch {
    /// Get a captured parameter by its token name.
    ///
    /// If a name appears twice in the pattern the last occurrence wins.
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        self.route
            .param_names
            .iter()
            .zip(self.params.iter())
            .rfind(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_str())
    }
}

/// Ordered collection of registered routes.
///
/// Filled during startup through [`add_route`](Self::add_route) and the method
/// shortcuts, then shared read-only (usually behind an `Arc`) with the dispatcher.
pub struct RouteTable {
    routes: Vec<Arc<Route>>,
    handlers: Arc<HandlerRegistry>,
    middleware: Arc<MiddlewareRegistry>,
    context: GroupContext,
}

impl RouteTable {
    /// Create an empty table resolving handlers and middleware against the given registries.
    #[must_use]
    pub fn new(handlers: Arc<HandlerRegistry>, middleware: Arc<MiddlewareRegistry>) -> Self {
        Self {
            routes: Vec::new(),
            handlers,
            middleware,
            context: GroupContext::default(),
        }
    }

    /// Register a route.
    ///
    /// The stored path is the open group prefix joined with `uri`, normalized. The
    /// route's middleware chain is the open group's middlewares followed by
    /// `middlewares`.
    ///
    /// # Errors
    ///
    /// * [`RouteError::UnsupportedMethod`] - method other than GET, POST, PUT, DELETE
    /// * [`RouteError::UnknownController`] / [`RouteError::UnknownAction`] - handler not registered
    /// * [`RouteError::Middleware`] - malformed spec or unregistered capability/action
    pub fn add_route(
        &mut self,
        method: Method,
        uri: &str,
        handler: impl Into<HandlerRef>,
        middlewares: &[&str],
    ) -> Result<(), RouteError> {
        if !SUPPORTED_METHODS.contains(&method) {
            return Err(RouteError::UnsupportedMethod(method.to_string()));
        }
        let handler = handler.into();
        let endpoint = self.handlers.resolve(&handler)?;
        let own = self.validate_specs(middlewares)?;

        let mut joined = String::with_capacity(self.context.prefix.len() + uri.len() + 1);
        joined.push_str(&self.context.prefix);
        joined.push('/');
        joined.push_str(uri);
        let path = normalize_path(&joined);

        let param_names = path
            .split('/')
            .filter_map(param_name)
            .map(str::to_string)
            .collect();

        let mut chain = self.context.middlewares.clone();
        chain.extend(own);

        debug!(
            method = %method,
            path = %path,
            handler = %handler,
            middlewares = chain.len(),
            "Route registered"
        );

        self.routes.push(Arc::new(Route {
            method,
            path,
            handler,
            middlewares: chain,
            param_names,
            endpoint,
        }));
        Ok(())
    }

    pub fn get(
        &mut self,
        uri: &str,
        handler: impl Into<HandlerRef>,
        middlewares: &[&str],
    ) -> Result<(), RouteError> {
        self.add_route(Method::GET, uri, handler, middlewares)
    }

    pub fn post(
        &mut self,
        uri: &str,
        handler: impl Into<HandlerRef>,
        middlewares: &[&str],
    ) -> Result<(), RouteError> {
        self.add_route(Method::POST, uri, handler, middlewares)
    }

    pub fn put(
        &mut self,
        uri: &str,
        handler: impl Into<HandlerRef>,
        middlewares: &[&str],
    ) -> Result<(), RouteError> {
        self.add_route(Method::PUT, uri, handler, middlewares)
    }

    pub fn delete(
        &mut self,
        uri: &str,
        handler: impl Into<HandlerRef>,
        middlewares: &[&str],
    ) -> Result<(), RouteError> {
        self.add_route(Method::DELETE, uri, handler, middlewares)
    }

    /// Register the routes of `body` under `prefix` and `middlewares`.
    ///
    /// `prefix` is appended to the prefix of any enclosing group and `middlewares`
    /// to its middleware list. The enclosing context is restored when `body`
    /// returns, whether it succeeded, failed or panicked.
    ///
    /// # Example
    ///
    /// ```rust
    /// # use std::sync::Arc;
    /// # use brrtkit::dispatcher::{HandlerRequest, HandlerResponse};
    /// # use brrtkit::middleware::MiddlewareRegistry;
    /// # use brrtkit::registry::HandlerRegistry;
    /// # use brrtkit::router::RouteTable;
    /// let mut handlers = HandlerRegistry::new();
    /// handlers.register("Admin", "index", |_: &HandlerRequest, _: &mut HandlerResponse| {});
    /// let mut table = RouteTable::new(Arc::new(handlers), Arc::new(MiddlewareRegistry::new()));
    ///
    /// table.group("/admin", &[], |t| {
    ///     t.group("/v1", &[], |t| t.get("/dashboard", ("Admin", "index"), &[]))
    /// })?;
    /// table.get("/home", ("Admin", "index"), &[])?;
    ///
    /// assert_eq!(table.routes()[0].path, "/admin/v1/dashboard");
    /// assert_eq!(table.routes()[1].path, "/home");
    /// # Ok::<(), brrtkit::error::RouteError>(())
    /// ```
    pub fn group<F>(&mut self, prefix: &str, middlewares: &[&str], body: F) -> Result<(), RouteError>
    where
        F: FnOnce(&mut RouteTable) -> Result<(), RouteError>,
    {
        let specs = self.validate_specs(middlewares)?;
        let mut scope = GroupScope::enter(self, prefix, &specs);
        body(&mut *scope)
    }

    /// Find the first route accepting `method` and `path`, in registration order.
    #[must_use]
    pub fn find(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        debug!(method = %method, path = %path, routes = self.routes.len(), "Route match attempt");
        let started = Instant::now();

        for route in &self.routes {
            if let Some(params) = route.matches(method, path) {
                info!(
                    method = %method,
                    path = %path,
                    route_pattern = %route.path,
                    handler = %route.handler,
                    path_params = ?params,
                    duration_us = started.elapsed().as_micros(),
                    "Route matched"
                );
                return Some(RouteMatch {
                    route: Arc::clone(route),
                    params,
                });
            }
        }
        None
    }

    /// Registered routes in registration order.
    #[must_use]
    pub fn routes(&self) -> &[Arc<Route>] {
        &self.routes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Capability table the route middlewares were validated against.
    #[must_use]
    pub fn middleware(&self) -> &Arc<MiddlewareRegistry> {
        &self.middleware
    }

    /// The group context currently open (empty outside any group).
    #[must_use]
    pub fn context(&self) -> &GroupContext {
        &self.context
    }

    pub(crate) fn replace_context(&mut self, context: GroupContext) -> GroupContext {
        std::mem::replace(&mut self.context, context)
    }

    /// Print all registered routes to stdout.
    /// Write the table, one route per line, in registration order.
    ///
    /// # Errors
    ///
    /// Any error from `out`.
    pub fn write_routes<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        writeln!(out, "[routes] count={}", self.routes.len())?;
        for route in &self.routes {
            writeln!(out, "[route] {route}")?;
        }
        Ok(())
    }

    fn validate_specs(&self, raw: &[&str]) -> Result<Vec<MiddlewareSpec>, RouteError> {
        let specs = MiddlewareSpec::parse_all(raw)?;
        for spec in &specs {
            self.middleware.resolve(spec)?;
        }
        Ok(specs)
    }
}

impl fmt::Debug for RouteTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteTable")
            .field("routes", &self.routes)
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}
