//! Middleware chains: parsing, lazy AND semantics and registry checks.

use std::sync::{Arc, Mutex};

use brrtkit::dispatcher::{HandlerRequest, HandlerResponse};
use brrtkit::error::MiddlewareConfigError;
use brrtkit::middleware::{MiddlewareRegistry, MiddlewareRunner, MiddlewareSpec, Verdict};
use http::Method;

mod common;
use common::apps::recording_guard;

fn registry(log: &Arc<Mutex<Vec<String>>>) -> MiddlewareRegistry {
    let mut registry = MiddlewareRegistry::new();
    registry
        .register("A", "check", recording_guard(log, "A::check", true))
        .register("B", "checkThatReturnsFalse", recording_guard(log, "B::check", false))
        .register("C", "check", recording_guard(log, "C::check", true))
        .register("Unit", "touch", |_: &HandlerRequest, res: &mut HandlerResponse, _: &[String]| {
            res.set_header("x-touched", "1".to_string());
        })
        .register("Gate", "verdict", |_: &HandlerRequest, _: &mut HandlerResponse, _: &[String]| {
            Verdict::Continue
        });
    registry
}

#[test]
fn test_spec_parsing() {
    let spec: MiddlewareSpec = "Role::require:admin:editor".parse().unwrap();
    assert_eq!(spec.capability, "Role");
    assert_eq!(spec.action, "require");
    assert_eq!(spec.args, ["admin", "editor"]);
    assert_eq!(spec.to_string(), "Role::require:admin:editor");

    assert_eq!(
        MiddlewareSpec::new("Auth", "check").with_arg("strict"),
        "Auth::check:strict".parse().unwrap()
    );
    assert!(matches!(
        "Auth:check".parse::<MiddlewareSpec>(),
        Err(MiddlewareConfigError::MalformedSpec(_))
    ));
}

#[test]
fn test_false_short_circuits_the_chain() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = registry(&log);
    let runner = MiddlewareRunner::new(&registry);
    let req = HandlerRequest::new(Method::GET, "/");
    let mut res = HandlerResponse::default();

    let passed = runner
        .run_specs(
            &["A::check", "B::checkThatReturnsFalse", "C::check"],
            &req,
            &mut res,
        )
        .unwrap();

    assert!(!passed);
    assert_eq!(*log.lock().unwrap(), ["A::check", "B::check"]);
}

#[test]
fn test_non_boolean_results_continue() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = registry(&log);
    let runner = MiddlewareRunner::new(&registry);
    let req = HandlerRequest::new(Method::GET, "/");
    let mut res = HandlerResponse::default();

    let passed = runner
        .run_specs(&["Unit::touch", "Gate::verdict", "C::check:x:y"], &req, &mut res)
        .unwrap();

    assert!(passed);
    assert_eq!(res.get_header("x-touched"), Some("1"));
    assert_eq!(*log.lock().unwrap(), ["C::check(x,y)"]);
}

#[test]
fn test_empty_chain_passes() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = registry(&log);
    let runner = MiddlewareRunner::new(&registry);
    let empty: [&str; 0] = [];
    assert!(runner
        .run_specs(&empty, &HandlerRequest::new(Method::GET, "/"), &mut HandlerResponse::default())
        .unwrap());
}

#[test]
fn test_unknown_action_fails_the_run_before_later_guards() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let registry = registry(&log);
    let runner = MiddlewareRunner::new(&registry);
    let req = HandlerRequest::new(Method::GET, "/");
    let mut res = HandlerResponse::default();

    let err = runner
        .run_specs(&["A::check", "A::missing", "C::check"], &req, &mut res)
        .unwrap_err();
    assert!(matches!(err, MiddlewareConfigError::UnknownAction { .. }));
    assert_eq!(*log.lock().unwrap(), ["A::check"]);

    let err = runner
        .run_specs(&["NoSeparator"], &req, &mut res)
        .unwrap_err();
    assert!(matches!(err, MiddlewareConfigError::MalformedSpec(_)));
}

#[test]
fn test_later_registration_replaces_action() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let mut registry = registry(&log);
    registry.register("A", "check", recording_guard(&log, "A::check(v2)", false));

    let runner = MiddlewareRunner::new(&registry);
    let passed = runner
        .run_specs(
            &["A::check"],
            &HandlerRequest::new(Method::GET, "/"),
            &mut HandlerResponse::default(),
        )
        .unwrap();
    assert!(!passed);
    assert_eq!(*log.lock().unwrap(), ["A::check(v2)"]);

    let mut names = registry.capability_names();
    names.sort_unstable();
    assert_eq!(names, ["A", "B", "C", "Gate", "Unit"]);
}
