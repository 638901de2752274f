//! HTTP hosting for an [`Application`](crate::app::Application).
//!
//! [`AppService`] adapts `may_minihttp` requests into
//! [`IncomingRequest`](crate::dispatcher::IncomingRequest)s and writes the dispatcher's
//! response back; [`HttpServer`] runs it on the `may` coroutine runtime.

mod http_server;
mod request;
mod response;
mod service;

pub use http_server::{configure_runtime, HttpServer, ServerHandle, DEFAULT_STACK_SIZE};
pub use request::to_incoming;
pub use response::write_handler_response;
pub use service::AppService;
