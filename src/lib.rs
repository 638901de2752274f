//! # brrtkit
//!
//! **brrtkit** is a modular request router and dispatcher: applications register
//! routes against controller actions, guard them with middleware chains, and grow
//! their route table by activating self-contained modules described by manifests.
//!
//! ## Overview
//!
//! Everything is resolved at startup. Handler and middleware names are looked up
//! when a route is registered, so an unknown controller, action or capability fails
//! the build of the [`Application`](app::Application) instead of a request. Once
//! built, the route table is frozen and shared by every request.
//!
//! ## Architecture
//!
//! - **[`router`]** - path patterns, the route table and nested route groups
//! - **[`middleware`]** - `Capability::action:arg1:arg2` specs and the chain runner
//! - **[`registry`]** - controller/action handler table
//! - **[`dispatcher`]** - method override, body extraction, matching and the terminal response
//! - **[`module`]** - manifests, activation lists, declarative route files, shortcuts
//! - **[`view`]** - template rendering with module view lookup and layouts
//! - **[`app`]** - the application context tying the pieces together
//! - **[`server`]** - HTTP hosting on `may_minihttp`
//! - **[`runtime_config`]**, **[`logging`]**, **[`error`]**, **[`ids`]**, **[`cli`]**
//!
//! ### Request Handling Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Client
//!     participant Server as HttpServer<br/>(may_minihttp)
//!     participant Dispatcher
//!     participant Table as RouteTable
//!     participant Chain as MiddlewareRunner
//!     participant Handler
//!
//!     Client->>Server: POST /posts/7 (_method=PUT)
//!     Server->>Dispatcher: IncomingRequest
//!     Dispatcher->>Dispatcher: effective method, body extraction
//!     Dispatcher->>Table: first route matching method + path
//!     alt no route
//!         Dispatcher-->>Client: 404 (JSON body or not-found view)
//!     end
//!     Dispatcher->>Chain: group middlewares, then route middlewares
//!     alt a guard halts
//!         Chain-->>Client: response written by the guard
//!     end
//!     Dispatcher->>Handler: params, body, query, form
//!     Handler-->>Client: HandlerResponse
//! ```
//!
//! ### Module Activation
//!
//! The activation list names `name@version` references. Each module folder is
//! found ignoring case, its manifest is read, and it is skipped if its uuid is
//! already active. Its route installer and route file then register routes and its
//! dependencies are activated, in the configured
//! [`ActivationOrder`](module::ActivationOrder).
//!
//! ## Quick Start
//!
//! ```rust
//! use brrtkit::app::Application;
//! use brrtkit::dispatcher::{HandlerRequest, HandlerResponse, IncomingRequest, ResponseMode};
//! use brrtkit::runtime_config::AppConfig;
//! use serde_json::json;
//!
//! let config = AppConfig {
//!     router_mode: Some(ResponseMode::Json),
//!     ..AppConfig::default()
//! };
//! let app = Application::builder(config)
//!     .handler("Posts", "show", |req: &HandlerRequest, res: &mut HandlerResponse| {
//!         res.body = json!({ "id": req.param("id") });
//!     })
//!     .middleware("Auth", "check", |req: &HandlerRequest, res: &mut HandlerResponse, _: &[String]| {
//!         if req.header("authorization").is_none() {
//!             *res = HandlerResponse::error(401, "Unauthorized");
//!             return false;
//!         }
//!         true
//!     })
//!     .routes(|t| t.group("/api", &["Auth::check"], |t| t.get("/posts/{id}", ("Posts", "show"), &[])))
//!     .build()
//!     .unwrap();
//!
//! let res = app.dispatch(IncomingRequest::new("GET", "/api/posts/7"));
//! assert_eq!(res.status, 401);
//!
//! let res = app.dispatch(
//!     IncomingRequest::new("GET", "/api/posts/7").with_header("Authorization", "Bearer x"),
//! );
//! assert_eq!(res.body, json!({ "id": "7" }));
//! ```

pub mod app;
pub mod cli;
pub mod dispatcher;
pub mod error;
pub mod ids;
pub mod logging;
pub mod middleware;
pub mod module;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;
pub mod view;

pub use app::{Application, ApplicationBuilder};
pub use error::{ConfigurationError, DispatchError, ManifestError, MiddlewareConfigError, RouteError};
