use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use http::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use smallvec::SmallVec;
use tracing::{debug, error, info, info_span, warn};
use url::form_urlencoded;

use super::body::{effective_method, extract_body, is_form, parse_urlencoded};
use crate::error::{ConfigurationError, DispatchError};
use crate::ids::RequestId;
use crate::middleware::MiddlewareRunner;
use crate::router::{normalize_path, ParamVec, Route, RouteTable, MAX_INLINE_PARAMS};
use crate::view::{render_file, ViewError};

/// Maximum inline headers before heap allocation.
pub const MAX_INLINE_HEADERS: usize = 16;

/// Header storage. Names keep the case they arrived with; lookups ignore case.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Decoded query string pairs in arrival order.
pub type QueryVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

const JSON_CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// How handler output and dispatch errors are presented. Fixed for the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ResponseMode {
    /// Server-rendered pages; handler output is emitted as-is
    View,
    /// JSON API; the JSON content type is set before the handler runs
    Json,
}

impl FromStr for ResponseMode {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "VIEW" => Ok(ResponseMode::View),
            "JSON" => Ok(ResponseMode::Json),
            _ => Err(ConfigurationError::InvalidRouterMode(s.to_string())),
        }
    }
}

impl fmt::Display for ResponseMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ResponseMode::View => "VIEW",
            ResponseMode::Json => "JSON",
        })
    }
}

/// A request as handed over by the hosting environment.
#[derive(Debug, Clone, Default)]
pub struct IncomingRequest {
    /// Method as received, any case
    pub method: String,
    /// Path plus optional query string
    pub uri: String,
    pub headers: HeaderVec,
    pub body: Vec<u8>,
}

impl IncomingRequest {
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            uri: uri.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((Arc::from(name), value.into()));
        self
    }

    #[must_use]
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Get a header by name (case-insensitive)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// Per-dispatch request context handed to middleware and handlers.
#[derive(Debug, Clone)]
pub struct HandlerRequest {
    /// Unique request ID for tracing and correlation
    pub request_id: RequestId,
    /// Effective method, after any `_method` override
    pub method: Method,
    /// Normalized request path without query string
    pub path: String,
    /// The route being dispatched (absent outside a dispatch)
    pub route: Option<Arc<Route>>,
    /// Captured path segments in pattern order
    pub params: ParamVec,
    /// Decoded body for PUT and DELETE; `None` for other methods
    pub body: Option<Value>,
    /// Query string parameters
    pub query_params: QueryVec,
    /// Urlencoded POST fields (empty map otherwise)
    pub form: Value,
    pub headers: HeaderVec,
    /// Raw request body as received
    pub raw_body: Vec<u8>,
}

impl HandlerRequest {
    /// A bare request with no route, params, headers or body.
    #[must_use]
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            request_id: RequestId::new(),
            method,
            path: normalize_path(path),
            route: None,
            params: ParamVec::new(),
            body: None,
            query_params: QueryVec::new(),
            form: Value::Object(Map::new()),
            headers: HeaderVec::new(),
            raw_body: Vec::new(),
        }
    }

    /// Positional handler arguments: every captured parameter in pattern order,
    /// followed by the body map for PUT and DELETE.
    #[must_use]
    pub fn arguments(&self) -> Vec<Value> {
        let mut args: Vec<Value> = self.params.iter().cloned().map(Value::String).collect();
        if self.method == Method::PUT || self.method == Method::DELETE {
            args.push(
                self.body
                    .clone()
                    .unwrap_or_else(|| Value::Object(Map::new())),
            );
        }
        args
    }

    /// Get a path parameter by its token name (last occurrence wins).
    #[must_use]
    pub fn param(&self, name: &str) -> Option<&str> {
        let route = self.route.as_ref()?;
        route
            .param_names
            .iter()
            .zip(self.params.iter())
            .rfind(|(n, _)| n.as_str() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a query parameter by name (last occurrence wins).
    #[must_use]
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query_params
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get a header by name (case-insensitive per RFC 7230)
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }
}

/// The response being built for the current dispatch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HandlerResponse {
    pub status: u16,
    #[serde(skip_serializing)]
    pub headers: HeaderVec,
    /// `String` is written raw, `Null` as an empty body, anything else as JSON
    pub body: Value,
}

impl Default for HandlerResponse {
    fn default() -> Self {
        Self {
            status: 200,
            headers: HeaderVec::new(),
            body: Value::Null,
        }
    }
}

impl HandlerResponse {
    #[must_use]
    pub fn new(status: u16, headers: HeaderVec, body: Value) -> Self {
        Self {
            status,
            headers,
            body,
        }
    }

    /// JSON body with the JSON content type.
    #[must_use]
    pub fn json(status: u16, body: Value) -> Self {
        let mut res = Self::new(status, HeaderVec::new(), body);
        res.set_header("content-type", JSON_CONTENT_TYPE.to_string());
        res
    }

    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        let mut res = Self::new(status, HeaderVec::new(), Value::String(body.into()));
        res.set_header("content-type", "text/plain; charset=utf-8".to_string());
        res
    }

    #[must_use]
    pub fn html(status: u16, body: impl Into<String>) -> Self {
        let mut res = Self::new(status, HeaderVec::new(), Value::String(body.into()));
        res.set_header("content-type", "text/html; charset=utf-8".to_string());
        res
    }

    /// `{"success": false, "message": ...}` with the JSON content type.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, json!({ "success": false, "message": message }))
    }

    /// Get a header by name
    #[must_use]
    pub fn get_header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// Add or replace a header
    pub fn set_header(&mut self, name: &str, value: String) {
        self.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        self.headers.push((Arc::from(name), value));
    }

    /// Body bytes as written to the wire.
    #[must_use]
    pub fn body_bytes(&self) -> Vec<u8> {
        match &self.body {
            Value::Null => Vec::new(),
            Value::String(s) => s.clone().into_bytes(),
            other => serde_json::to_vec(other).unwrap_or_default(),
        }
    }
}

fn find_header<'a>(headers: &'a HeaderVec, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Process-wide presentation settings of the dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchConfig {
    pub mode: ResponseMode,
    /// Template rendered for unmatched requests in VIEW mode
    pub not_found_view: Option<PathBuf>,
    /// Include panic details in 500 responses
    pub display_errors: bool,
}

impl DispatchConfig {
    #[must_use]
    pub fn new(mode: ResponseMode) -> Self {
        Self {
            mode,
            not_found_view: None,
            display_errors: false,
        }
    }

    #[must_use]
    pub fn with_not_found_view<P: Into<PathBuf>>(mut self, path: P) -> Self {
        self.not_found_view = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_display_errors(mut self, display: bool) -> Self {
        self.display_errors = display;
        self
    }
}

/// Resolves requests against a [`RouteTable`] and produces the terminal response.
///
/// The table is shared read-only; a dispatcher can serve any number of requests
/// concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    routes: Arc<RouteTable>,
    config: DispatchConfig,
}

impl Dispatcher {
    #[must_use]
    pub fn new(routes: Arc<RouteTable>, config: DispatchConfig) -> Self {
        Self { routes, config }
    }

    #[must_use]
    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.routes
    }

    #[must_use]
    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Dispatch one request and always produce a response.
    ///
    /// Dispatch errors are turned into their terminal response here; see
    /// [`try_dispatch`](Self::try_dispatch) for the error-returning form.
    pub fn dispatch(&self, incoming: IncomingRequest) -> HandlerResponse {
        let request_id = RequestId::from_header_or_new(incoming.header("x-request-id"));
        let raw_path = incoming
            .uri
            .split_once('?')
            .map_or(incoming.uri.as_str(), |(p, _)| p);
        let path = normalize_path(raw_path);
        let span = info_span!(
            "dispatch",
            request_id = %request_id,
            method = %incoming.method,
            path = %path
        );
        let _entered = span.enter();
        let started = Instant::now();

        let mut res = match self.dispatch_inner(request_id, incoming) {
            Ok(res) => res,
            Err(DispatchError::NotFound { method, path }) => {
                warn!(method = %method, path = %path, "No route matched");
                self.not_found().unwrap_or_else(|err| self.error_response(&err))
            }
            Err(err) => {
                error!(error = %err, status = err.status_code(), "Dispatch failed");
                self.error_response(&err)
            }
        };
        res.set_header("x-request-id", request_id.to_string());

        info!(
            status = res.status,
            latency_us = started.elapsed().as_micros(),
            "Request complete"
        );
        res
    }

    /// Dispatch one request, returning dispatch errors to the caller.
    ///
    /// A halting middleware is not an error: its response is returned as `Ok`.
    ///
    /// # Errors
    ///
    /// * [`DispatchError::MalformedRequest`] - PUT/DELETE JSON body does not parse
    /// * [`DispatchError::NotFound`] - no route accepts the effective method and path
    /// * [`DispatchError::Middleware`] - a middleware spec no longer resolves
    /// * [`DispatchError::HandlerPanicked`] - the handler panicked
    pub fn try_dispatch(&self, incoming: IncomingRequest) -> Result<HandlerResponse, DispatchError> {
        let request_id = RequestId::from_header_or_new(incoming.header("x-request-id"));
        self.dispatch_inner(request_id, incoming)
    }

    fn dispatch_inner(
        &self,
        request_id: RequestId,
        incoming: IncomingRequest,
    ) -> Result<HandlerResponse, DispatchError> {
        let IncomingRequest {
            method,
            uri,
            headers,
            body: raw_body,
        } = incoming;

        let (raw_path, query) = uri.split_once('?').unwrap_or((uri.as_str(), ""));
        let path = normalize_path(raw_path);
        let query_params: QueryVec = form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (Arc::from(k.as_ref()), v.into_owned()))
            .collect();
        let content_type = find_header(&headers, "content-type").map(str::to_string);

        let form = if method.eq_ignore_ascii_case("POST") && is_form(content_type.as_deref()) {
            parse_urlencoded(&raw_body)
        } else {
            Value::Object(Map::new())
        };

        let effective = effective_method(&method, &form);
        if effective != method {
            debug!(from = %method, to = %effective, "Method resolved");
        }
        let not_found = || DispatchError::NotFound {
            method: effective.clone(),
            path: path.clone(),
        };
        let Ok(method) = Method::from_bytes(effective.as_bytes()) else {
            return Err(not_found());
        };

        let body = if method == Method::PUT || method == Method::DELETE {
            Some(extract_body(&method, content_type.as_deref(), &raw_body)?)
        } else {
            None
        };

        let found = self.routes.find(&method, &path).ok_or_else(not_found)?;

        let req = HandlerRequest {
            request_id,
            method,
            path,
            route: Some(Arc::clone(&found.route)),
            params: found.params,
            body,
            query_params,
            form,
            headers,
            raw_body,
        };
        let mut res = HandlerResponse::default();

        let runner = MiddlewareRunner::new(self.routes.middleware());
        if !runner.run(&found.route.middlewares, &req, &mut res)? {
            return Ok(res);
        }

        if self.config.mode == ResponseMode::Json {
            res.set_header("content-type", JSON_CONTENT_TYPE.to_string());
        }

        info!(
            handler = %found.route.handler,
            route_pattern = %found.route.path,
            "Request dispatched to handler"
        );
        let endpoint = found.route.endpoint();
        let started = Instant::now();
        if let Err(panic) = catch_unwind(AssertUnwindSafe(|| endpoint(&req, &mut res))) {
            let message = panic_message(panic.as_ref());
            error!(
                handler = %found.route.handler,
                panic_message = %message,
                "Handler panicked"
            );
            return Err(DispatchError::HandlerPanicked(message));
        }
        debug!(
            handler = %found.route.handler,
            execution_time_us = started.elapsed().as_micros(),
            status = res.status,
            "Handler execution complete"
        );
        Ok(res)
    }

    fn not_found(&self) -> Result<HandlerResponse, DispatchError> {
        match self.config.mode {
            ResponseMode::Json => Ok(HandlerResponse::error(404, "Page not found.")),
            ResponseMode::View => {
                let path = self
                    .config
                    .not_found_view
                    .as_ref()
                    .ok_or(ConfigurationError::MissingSetting("not_found_view"))?;
                if !path.is_file() {
                    return Err(ConfigurationError::FileNotFound {
                        setting: "not_found_view",
                        path: path.clone(),
                    }
                    .into());
                }
                let page = render_file(path, &json!({})).map_err(|err| match err {
                    ViewError::Io { path, source } => ConfigurationError::Io { path, source },
                    other => ConfigurationError::Parse {
                        path: path.clone(),
                        message: other.to_string(),
                    },
                })?;
                Ok(HandlerResponse::html(404, page))
            }
        }
    }

    fn error_response(&self, err: &DispatchError) -> HandlerResponse {
        let status = err.status_code();
        match err {
            DispatchError::HandlerPanicked(detail) => match self.config.mode {
                ResponseMode::Json => {
                    let mut body = json!({ "error": true, "message": "Internal server error." });
                    if self.config.display_errors {
                        body["detail"] = Value::String(detail.clone());
                    }
                    HandlerResponse::json(status, body)
                }
                ResponseMode::View => {
                    let mut text = String::from("Internal server error.");
                    if self.config.display_errors {
                        text.push_str("\n\n");
                        text.push_str(detail);
                    }
                    HandlerResponse::text(status, text)
                }
            },
            other => HandlerResponse::error(status, &other.to_string()),
        }
    }
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
