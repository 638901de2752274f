//! # Dispatcher Module
//!
//! Turns one incoming request into one terminal response.
//!
//! ## Request Flow
//!
//! 1. Resolve the effective method: a POST whose urlencoded form carries `_method`
//!    is matched as that method, upper-cased
//! 2. For PUT and DELETE, decode the body (JSON or urlencoded form); an undecodable
//!    JSON body ends the dispatch with a 500
//! 3. Scan the route table in registration order; the first route whose method and
//!    pattern match wins
//! 4. Run the route's middleware chain; a halting guard ends the dispatch with the
//!    response it wrote
//! 5. Invoke the handler resolved at registration
//!
//! No match yields the not-found response of the configured [`ResponseMode`]: a JSON
//! 404 body, or the configured not-found view in VIEW mode.
//!
//! ## Error Handling
//!
//! Every [`DispatchError`](crate::error::DispatchError) ends only the current
//! dispatch. Handler panics are caught and answered with a 500.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use brrtkit::dispatcher::{
//!     DispatchConfig, Dispatcher, HandlerRequest, HandlerResponse, IncomingRequest, ResponseMode,
//! };
//! use brrtkit::middleware::MiddlewareRegistry;
//! use brrtkit::registry::HandlerRegistry;
//! use brrtkit::router::RouteTable;
//! use serde_json::json;
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers.register("Items", "show", |req: &HandlerRequest, res: &mut HandlerResponse| {
//!     res.body = json!({ "id": req.param("id") });
//! });
//! let mut table = RouteTable::new(Arc::new(handlers), Arc::new(MiddlewareRegistry::new()));
//! table.get("/items/{id}", ("Items", "show"), &[]).unwrap();
//!
//! let dispatcher = Dispatcher::new(Arc::new(table), DispatchConfig::new(ResponseMode::Json));
//! let res = dispatcher.dispatch(IncomingRequest::new("GET", "/items/42?x=1"));
//! assert_eq!(res.status, 200);
//! assert_eq!(res.body, json!({ "id": "42" }));
//!
//! let res = dispatcher.dispatch(IncomingRequest::new("GET", "/nowhere"));
//! assert_eq!(res.status, 404);
//! ```

mod body;
mod core;

pub use body::{effective_method, extract_body, is_form, is_json, parse_urlencoded, METHOD_OVERRIDE_FIELD};
pub use core::{
    DispatchConfig, Dispatcher, HandlerRequest, HandlerResponse, HeaderVec, IncomingRequest,
    QueryVec, ResponseMode, MAX_INLINE_HEADERS,
};
