//! # Router Module
//!
//! Path matching and the ordered route table.
//!
//! ## Overview
//!
//! - [`match_path`] compares a route pattern with a concrete path segment by segment,
//!   capturing one value per `{name}` token in pattern order.
//! - [`RouteTable`] keeps routes in registration order. [`RouteTable::group`] applies a
//!   prefix and a middleware list to every route registered inside its body, nesting
//!   to any depth.
//! - [`RouteTable::find`] scans linearly and returns the first route whose method and
//!   pattern both match. Registration order decides between overlapping routes.
//!
//! ## Example
//!
//! ```rust
//! use std::sync::Arc;
//! use brrtkit::dispatcher::{HandlerRequest, HandlerResponse};
//! use brrtkit::middleware::MiddlewareRegistry;
//! use brrtkit::registry::HandlerRegistry;
//! use brrtkit::router::RouteTable;
//! use http::Method;
//!
//! let mut handlers = HandlerRegistry::new();
//! handlers.register("Items", "show", |_: &HandlerRequest, _: &mut HandlerResponse| {});
//!
//! let mut table = RouteTable::new(Arc::new(handlers), Arc::new(MiddlewareRegistry::new()));
//! table.get("/items/{id}", ("Items", "show"), &[]).unwrap();
//!
//! let found = table.find(&Method::GET, "/items/7").unwrap();
//! assert_eq!(found.param("id"), Some("7"));
//! assert!(table.find(&Method::POST, "/items/7").is_none());
//! ```

mod core;
mod group;
mod matcher;
#[cfg(test)]
mod tests;

pub use core::{parse_method, Route, RouteMatch, RouteTable, SUPPORTED_METHODS};
pub use group::{GroupContext, GroupScope};
pub use matcher::{is_param_token, match_path, normalize_path, param_name, ParamVec, MAX_INLINE_PARAMS};
