use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::MiddlewareSpec;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::MiddlewareConfigError;

/// Outcome of a single guard invocation.
///
/// Only [`Verdict::Halt`] stops a chain. Guards may return `bool` (`false` halts)
/// or `()` (always continues); both convert into a verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Continue,
    Halt,
}

impl From<bool> for Verdict {
    fn from(allowed: bool) -> Self {
        if allowed {
            Verdict::Continue
        } else {
            Verdict::Halt
        }
    }
}

impl From<()> for Verdict {
    fn from(_: ()) -> Self {
        Verdict::Continue
    }
}

/// A registered guard action.
///
/// Receives the request, the pending response (a halting guard writes its own
/// status/body there) and the arguments parsed from the middleware spec.
pub type Guard =
    Arc<dyn Fn(&HandlerRequest, &mut HandlerResponse, &[String]) -> Verdict + Send + Sync>;

/// Capability table: capability name -> action name -> guard.
///
/// Built once at startup, read-only afterwards.
#[derive(Clone, Default)]
pub struct MiddlewareRegistry {
    capabilities: HashMap<String, HashMap<String, Guard>>,
}

impl MiddlewareRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `action` on `capability`. A later registration of the same pair replaces
    /// the earlier one.
    pub fn register<F, V>(&mut self, capability: &str, action_name: &str, action: F) -> &mut Self
    where
        F: Fn(&HandlerRequest, &mut HandlerResponse, &[String]) -> V + Send + Sync + 'static,
        V: Into<Verdict>,
    {
        let guard: Guard = Arc::new(
            move |req: &HandlerRequest, res: &mut HandlerResponse, args: &[String]| -> Verdict {
                action(req, res, args).into()
            },
        );
        self.capabilities
            .entry(capability.to_string())
            .or_default()
            .insert(action_name.to_string(), guard);
        debug!(capability, action = action_name, "Middleware action registered");
        self
    }

    /// Look up the guard for a spec.
    pub fn resolve(&self, spec: &MiddlewareSpec) -> Result<&Guard, MiddlewareConfigError> {
        let actions = self.capabilities.get(&spec.capability).ok_or_else(|| {
            MiddlewareConfigError::UnknownCapability {
                capability: spec.capability.clone(),
            }
        })?;
        actions
            .get(&spec.action)
            .ok_or_else(|| MiddlewareConfigError::UnknownAction {
                capability: spec.capability.clone(),
                action: spec.action.clone(),
            })
    }

    /// Registered capability names, sorted.
    #[must_use]
    pub fn capability_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.capabilities.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// Runs a route's middleware chain as a lazy logical AND.
pub struct MiddlewareRunner<'a> {
    registry: &'a MiddlewareRegistry,
}

impl<'a> MiddlewareRunner<'a> {
    #[must_use]
    pub fn new(registry: &'a MiddlewareRegistry) -> Self {
        Self { registry }
    }

    /// Run `specs` in order.
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - every guard ran and none halted
    /// * `Ok(false)` - a guard halted; later guards were not invoked
    /// * `Err(_)` - a spec names a capability or action that is not registered
    pub fn run(
        &self,
        specs: &[MiddlewareSpec],
        req: &HandlerRequest,
        res: &mut HandlerResponse,
    ) -> Result<bool, MiddlewareConfigError> {
        for (idx, spec) in specs.iter().enumerate() {
            let guard = self.registry.resolve(spec)?;
            if guard(req, res, &spec.args) == Verdict::Halt {
                info!(
                    request_id = %req.request_id,
                    middleware = %spec,
                    middleware_idx = idx,
                    skipped = specs.len() - idx - 1,
                    "Middleware halted dispatch"
                );
                return Ok(false);
            }
            debug!(request_id = %req.request_id, middleware = %spec, "Middleware passed");
        }
        Ok(true)
    }

    /// Parse the textual specs, then [`run`](Self::run) them.
    pub fn run_specs<S: AsRef<str>>(
        &self,
        raw: &[S],
        req: &HandlerRequest,
        res: &mut HandlerResponse,
    ) -> Result<bool, MiddlewareConfigError> {
        let specs = MiddlewareSpec::parse_all(raw)?;
        self.run(&specs, req, res)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counting(
        calls: &Arc<AtomicUsize>,
        verdict: bool,
    ) -> impl Fn(&HandlerRequest, &mut HandlerResponse, &[String]) -> bool {
        let calls = Arc::clone(calls);
        move |_, _, _| {
            calls.fetch_add(1, Ordering::SeqCst);
            verdict
        }
    }

    #[test]
    fn test_chain_short_circuits_on_false() {
        let a = Arc::new(AtomicUsize::new(0));
        let b = Arc::new(AtomicUsize::new(0));
        let c = Arc::new(AtomicUsize::new(0));
        let mut registry = MiddlewareRegistry::new();
        registry
            .register("A", "check", counting(&a, true))
            .register("B", "check", counting(&b, false))
            .register("C", "check", counting(&c, true));

        let req = HandlerRequest::new(Method::GET, "/");
        let mut res = HandlerResponse::default();
        let passed = MiddlewareRunner::new(&registry)
            .run_specs(&["A::check", "B::check", "C::check"], &req, &mut res)
            .unwrap();

        assert!(!passed);
        assert_eq!(a.load(Ordering::SeqCst), 1);
        assert_eq!(b.load(Ordering::SeqCst), 1);
        assert_eq!(c.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unit_return_continues() {
        let mut registry = MiddlewareRegistry::new();
        registry.register("Log", "touch", |_: &HandlerRequest, _: &mut HandlerResponse, _: &[String]| {});
        let req = HandlerRequest::new(Method::GET, "/");
        let mut res = HandlerResponse::default();
        assert!(MiddlewareRunner::new(&registry)
            .run_specs(&["Log::touch", "Log::touch"], &req, &mut res)
            .unwrap());
    }

    #[test]
    fn test_args_are_passed_in_order() {
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let mut registry = MiddlewareRegistry::new();
        registry.register("Permission", "require", move |_: &HandlerRequest, _: &mut HandlerResponse, args: &[String]| {
            sink.lock().unwrap().extend_from_slice(args);
            true
        });
        let req = HandlerRequest::new(Method::GET, "/");
        let mut res = HandlerResponse::default();
        MiddlewareRunner::new(&registry)
            .run_specs(&["Permission::require:ADMIN:OWNER"], &req, &mut res)
            .unwrap();
        assert_eq!(*seen.lock().unwrap(), vec!["ADMIN", "OWNER"]);
    }

    #[test]
    fn test_unknown_action_is_config_error() {
        let mut registry = MiddlewareRegistry::new();
        registry.register("Auth", "check", |_: &HandlerRequest, _: &mut HandlerResponse, _: &[String]| true);
        let req = HandlerRequest::new(Method::GET, "/");
        let mut res = HandlerResponse::default();
        let runner = MiddlewareRunner::new(&registry);

        let err = runner.run_specs(&["Auth::missing"], &req, &mut res).unwrap_err();
        assert_eq!(
            err,
            MiddlewareConfigError::UnknownAction {
                capability: "Auth".into(),
                action: "missing".into()
            }
        );
        let err = runner.run_specs(&["Nope::check"], &req, &mut res).unwrap_err();
        assert!(matches!(err, MiddlewareConfigError::UnknownCapability { .. }));
        let err = runner.run_specs(&["no-separator"], &req, &mut res).unwrap_err();
        assert!(matches!(err, MiddlewareConfigError::MalformedSpec(_)));
    }

    #[test]
    fn test_halting_guard_writes_response() {
        let mut registry = MiddlewareRegistry::new();
        registry.register("Auth", "deny", |_: &HandlerRequest, res: &mut HandlerResponse, _: &[String]| {
            res.status = 401;
            false
        });
        let req = HandlerRequest::new(Method::GET, "/");
        let mut res = HandlerResponse::default();
        let passed = MiddlewareRunner::new(&registry)
            .run_specs(&["Auth::deny"], &req, &mut res)
            .unwrap();
        assert!(!passed);
        assert_eq!(res.status, 401);
    }
}
