//! # Middleware Module
//!
//! Named pre-dispatch guards. A route carries an ordered list of specs in the textual
//! form `Capability::action[:arg1[:arg2...]]`; each spec names an action registered on a
//! capability in a [`MiddlewareRegistry`]. The [`MiddlewareRunner`] executes the chain as
//! a lazy logical AND: the first guard that halts stops the chain and dispatch ends with
//! whatever response that guard wrote.
//!
//! ## Example
//!
//! ```rust
//! use brrtkit::dispatcher::{HandlerRequest, HandlerResponse};
//! use brrtkit::middleware::{MiddlewareRegistry, MiddlewareRunner};
//! use http::Method;
//!
//! let mut registry = MiddlewareRegistry::new();
//! registry.register("Auth", "check", |req: &HandlerRequest, res: &mut HandlerResponse, _: &[String]| {
//!     let ok = req.header("authorization").is_some();
//!     if !ok {
//!         res.status = 401;
//!     }
//!     ok
//! });
//!
//! let req = HandlerRequest::new(Method::GET, "/admin");
//! let mut res = HandlerResponse::default();
//! let passed = MiddlewareRunner::new(&registry)
//!     .run_specs(&["Auth::check"], &req, &mut res)
//!     .unwrap();
//! assert!(!passed);
//! assert_eq!(res.status, 401);
//! ```

mod core;
mod spec;

pub use core::{Guard, MiddlewareRegistry, MiddlewareRunner, Verdict};
pub use spec::MiddlewareSpec;
