use std::sync::Arc;

use http::Method;

use super::RouteTable;
use crate::dispatcher::{HandlerRequest, HandlerResponse};
use crate::error::{MiddlewareConfigError, RouteError};
use crate::middleware::{MiddlewareRegistry, MiddlewareSpec};
use crate::registry::HandlerRegistry;

fn table() -> RouteTable {
    let mut handlers = HandlerRegistry::new();
    for action in ["first", "second", "index"] {
        handlers.register("Pages", action, move |_: &HandlerRequest, res: &mut HandlerResponse| {
            res.body = serde_json::Value::String(action.to_string());
        });
    }
    let mut middleware = MiddlewareRegistry::new();
    middleware
        .register("Auth", "check", |_: &HandlerRequest, _: &mut HandlerResponse, _: &[String]| true)
        .register("Log", "touch", |_: &HandlerRequest, _: &mut HandlerResponse, _: &[String]| {});
    RouteTable::new(Arc::new(handlers), Arc::new(middleware))
}

#[test]
fn test_nested_groups_restore_prefix() {
    let mut t = table();
    t.group("/a", &[], |t| {
        t.group("/b", &[], |t| t.get("/c", ("Pages", "index"), &[]))?;
        t.get("/d", ("Pages", "index"), &[])
    })
    .unwrap();
    t.get("/e", ("Pages", "index"), &[]).unwrap();

    let paths: Vec<&str> = t.routes().iter().map(|r| r.path.as_str()).collect();
    assert_eq!(paths, ["/a/b/c", "/a/d", "/e"]);
    assert!(t.context().prefix.is_empty());
    assert!(t.context().middlewares.is_empty());
}

#[test]
fn test_group_middlewares_come_first() {
    let mut t = table();
    t.group("/admin", &["Auth::check"], |t| {
        t.get("/", ("Pages", "index"), &["Log::touch"])
    })
    .unwrap();
    t.get("/open", ("Pages", "index"), &[]).unwrap();

    let route = &t.routes()[0];
    assert_eq!(route.path, "/admin");
    assert_eq!(
        route.middlewares,
        vec![MiddlewareSpec::new("Auth", "check"), MiddlewareSpec::new("Log", "touch")]
    );
    assert!(t.routes()[1].middlewares.is_empty());
}

#[test]
fn test_failed_group_body_restores_context() {
    let mut t = table();
    let err = t
        .group("/broken", &["Auth::check"], |t| t.get("/x", ("Missing", "index"), &[]))
        .unwrap_err();
    assert!(matches!(err, RouteError::UnknownController { .. }));
    assert_eq!(t.context(), &super::GroupContext::default());

    t.get("/after", ("Pages", "index"), &[]).unwrap();
    assert_eq!(t.routes()[0].path, "/after");
    assert!(t.routes()[0].middlewares.is_empty());
}

#[test]
fn test_panicking_group_body_restores_context() {
    let mut t = table();
    let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _ = t.group("/p", &["Log::touch"], |_| panic!("boom"));
    }));
    assert!(outcome.is_err());
    assert!(t.context().prefix.is_empty());
    assert!(t.context().middlewares.is_empty());
}

#[test]
fn test_unknown_middleware_rejected_at_registration() {
    let mut t = table();
    let err = t.get("/x", ("Pages", "index"), &["Auth::nope"]).unwrap_err();
    assert!(matches!(
        err,
        RouteError::Middleware(MiddlewareConfigError::UnknownAction { .. })
    ));
    let err = t.get("/x", ("Pages", "index"), &["Auth"]).unwrap_err();
    assert!(matches!(
        err,
        RouteError::Middleware(MiddlewareConfigError::MalformedSpec(_))
    ));
    assert!(t.is_empty());
}

#[test]
fn test_unsupported_method() {
    let mut t = table();
    let err = t.add_route(Method::PATCH, "/x", ("Pages", "index"), &[]).unwrap_err();
    assert!(matches!(err, RouteError::UnsupportedMethod(m) if m == "PATCH"));
    assert_eq!(super::parse_method("delete").unwrap(), Method::DELETE);
    assert!(super::parse_method("HEAD").is_err());
}

#[test]
fn test_prefix_is_concatenated_raw() {
    let mut t = table();
    t.group("api", &[], |t| t.group("v1/", &[], |t| t.get("users/", ("Pages", "index"), &[])))
        .unwrap();
    assert_eq!(t.routes()[0].path, "/apiv1/users");
}
