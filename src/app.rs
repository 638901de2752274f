//! # Application Context
//!
//! [`Application`] owns everything a running process needs to serve requests: the
//! frozen route table, the dispatcher, the activated modules with their shortcut
//! tables and the view renderer. Nothing is global; the context is built once by
//! [`ApplicationBuilder::build`] and then shared read-only.
//!
//! Build order:
//!
//! 1. handler and middleware registries are frozen
//! 2. application routes are registered, in the order their closures were added
//! 3. when `module_path` is configured, the `essentials` list and then the `active`
//!    list of the activation list are activated
//! 4. the table is frozen behind an `Arc` and handed to the [`Dispatcher`]
//!
//! ```rust,no_run
//! use brrtkit::app::Application;
//! use brrtkit::dispatcher::{HandlerRequest, HandlerResponse, IncomingRequest};
//! use brrtkit::runtime_config::AppConfig;
//! use serde_json::json;
//!
//! # fn main() -> anyhow::Result<()> {
//! let app = Application::builder(AppConfig::load(std::path::Path::new("config/app.yaml"))?)
//!     .handler("Home", "index", |_req: &HandlerRequest, res: &mut HandlerResponse| {
//!         res.body = json!({"hello": "world"});
//!     })
//!     .routes(|t| t.get("/", ("Home", "index"), &[]))
//!     .build()?;
//!
//! let res = app.dispatch(IncomingRequest::new("GET", "/"));
//! assert_eq!(res.status, 200);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde_json::Value;
use tracing::info;

use crate::dispatcher::{Dispatcher, HandlerRequest, HandlerResponse, IncomingRequest};
use crate::error::RouteError;
use crate::middleware::{MiddlewareRegistry, Verdict};
use crate::module::{ModuleLoader, ModuleRegistry, Shortcuts};
use crate::registry::HandlerRegistry;
use crate::router::RouteTable;
use crate::runtime_config::AppConfig;
use crate::view::{ViewError, ViewRenderer};

type RoutesFn = Box<dyn FnOnce(&mut RouteTable) -> Result<(), RouteError>>;

/// Collects registrations, then builds an [`Application`].
pub struct ApplicationBuilder {
    config: AppConfig,
    handlers: HandlerRegistry,
    middleware: MiddlewareRegistry,
    installers: Vec<(String, crate::module::RouteInstaller)>,
    routes: Vec<RoutesFn>,
}

impl ApplicationBuilder {
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            handlers: HandlerRegistry::new(),
            middleware: MiddlewareRegistry::new(),
            installers: Vec::new(),
            routes: Vec::new(),
        }
    }

    /// Register the handler for `controller@action`.
    #[must_use]
    pub fn handler<F>(mut self, controller: &str, action: &str, handler: F) -> Self
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse) + Send + Sync + 'static,
    {
        self.handlers.register(controller, action, handler);
        self
    }

    /// Register the middleware action `capability::action`.
    #[must_use]
    pub fn middleware<F, V>(mut self, capability: &str, action: &str, guard: F) -> Self
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse, &[String]) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        self.middleware.register(capability, action, guard);
        self
    }

    /// Register a compiled-in route installer for the module with `slug`.
    #[must_use]
    pub fn module_installer<F>(mut self, slug: &str, installer: F) -> Self
    where
        F: Fn(&mut RouteTable) -> Result<(), RouteError> + Send + Sync + 'static,
    {
        self.installers.push((slug.to_string(), Arc::new(installer)));
        self
    }

    /// Add application routes; they are registered before any module route.
    #[must_use]
    pub fn routes<F>(mut self, routes: F) -> Self
    where
        F: FnOnce(&mut RouteTable) -> Result<(), RouteError> + 'static,
    {
        self.routes.push(Box::new(routes));
        self
    }

    /// Validate the configuration, register all routes and activate modules.
    ///
    /// # Errors
    ///
    /// Any configuration, registration or module activation error. Nothing is
    /// served from a partially built application.
    pub fn build(self) -> Result<Application> {
        let Self {
            config,
            handlers,
            middleware,
            installers,
            routes,
        } = self;

        config.validate().context("Invalid configuration")?;
        let dispatch_config = config.dispatch_config()?;

        let mut table = RouteTable::new(Arc::new(handlers), Arc::new(middleware));
        for register in routes {
            register(&mut table).context("Failed to register application routes")?;
        }
        let app_routes = table.len();

        let modules = match &config.module_path {
            Some(module_path) => {
                let mut loader = ModuleLoader::new(module_path, config.activation_order)
                    .with_activation_list(config.activation_list_path());
                for (slug, installer) in installers {
                    loader.add_installer(&slug, installer);
                }
                loader
                    .load_essential_modules(&mut table)
                    .context("Failed to activate essential modules")?;
                loader
                    .load_active_modules(&mut table)
                    .context("Failed to activate modules")?;
                loader.into_registry()
            }
            None => ModuleRegistry::default(),
        };

        let views = config.view_path.as_ref().map(|view_path| {
            let renderer = ViewRenderer::new(view_path);
            match &config.module_path {
                Some(module_path) => renderer.with_module_path(module_path),
                None => renderer,
            }
        });

        info!(
            mode = %dispatch_config.mode,
            app_routes,
            module_routes = table.len() - app_routes,
            modules = modules.len(),
            "Application built"
        );

        let dispatcher = Dispatcher::new(Arc::new(table), dispatch_config);
        Ok(Application {
            config,
            dispatcher,
            modules: Arc::new(modules),
            views,
        })
    }
}

/// The application context.
///
/// Cloning is cheap; clones share the route table and module registry.
#[derive(Clone)]
pub struct Application {
    config: AppConfig,
    dispatcher: Dispatcher,
    modules: Arc<ModuleRegistry>,
    views: Option<ViewRenderer>,
}

impl Application {
    #[must_use]
    pub fn builder(config: AppConfig) -> ApplicationBuilder {
        ApplicationBuilder::new(config)
    }

    /// Dispatch one request.
    pub fn dispatch(&self, request: IncomingRequest) -> HandlerResponse {
        self.dispatcher.dispatch(request)
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    #[must_use]
    pub fn routes(&self) -> &RouteTable {
        self.dispatcher.routes()
    }

    #[must_use]
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    /// Shortcut table of the module with `slug`, ignoring case.
    #[must_use]
    pub fn shortcuts(&self, slug: &str) -> Option<&Shortcuts> {
        self.modules.shortcuts(slug)
    }

    #[must_use]
    pub fn views(&self) -> Option<&ViewRenderer> {
        self.views.as_ref()
    }

    /// Render a view through the configured renderer.
    ///
    /// # Errors
    ///
    /// [`ViewError::NoViewRoot`] when no `view_path` is configured, or any
    /// rendering error.
    pub fn render(
        &self,
        view: &str,
        data: &Value,
        layout: Option<&str>,
        module: Option<&str>,
    ) -> Result<String, ViewError> {
        let renderer = self.views.as_ref().ok_or(ViewError::NoViewRoot)?;
        renderer.render(view, data, layout, module)
    }
}

impl fmt::Debug for Application {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Application")
            .field("mode", &self.dispatcher.config().mode)
            .field("routes", &self.routes().len())
            .field("modules", &self.modules.len())
            .finish()
    }
}
